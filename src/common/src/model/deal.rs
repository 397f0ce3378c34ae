use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use super::{parse_amount, parse_flag};
use crate::error::{Error, Result};

pub const STAGE_BEFORE_COMMISSIONING: &str = "受託前";
pub const STAGE_CASE_IN_PROGRESS: &str = "案件化中";
pub const STAGE_CANDIDATE_UNDECIDED: &str = "候補未定";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DealStage {
    BeforeCommissioning,
    CaseInProgress,
    CandidateUndecided,
    #[default]
    Other,
}

impl DealStage {
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            STAGE_BEFORE_COMMISSIONING => DealStage::BeforeCommissioning,
            STAGE_CASE_IN_PROGRESS => DealStage::CaseInProgress,
            STAGE_CANDIDATE_UNDECIDED => DealStage::CandidateUndecided,
            _ => DealStage::Other,
        }
    }
}

/// A deal available to buyers.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Deal {
    pub id: String,
    pub owner_id: String,
    pub region: String,
    pub country_of_residence: String,
    pub legacy_industry: String,
    /// Up to three industry codes, blanks removed
    pub industries: Vec<String>,
    pub stage: DealStage,
    pub rank: String,
    pub hidden: bool,
    pub asking_price: Option<BigDecimal>,
    pub reference_amount: Option<BigDecimal>,
    pub sales: Option<BigDecimal>,
}

/// One line of the deals export file, as read.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DealRow {
    pub id: String,
    #[serde(rename = "ownerid")]
    pub owner_id: String,
    #[serde(rename = "prefname__c")]
    pub region: String,
    #[serde(rename = "countryresidence__c")]
    pub country_of_residence: String,
    #[serde(rename = "industry_small__c")]
    pub legacy_industry: String,
    #[serde(rename = "industrysmall1__c")]
    pub industry1: String,
    #[serde(rename = "industrysmall2__c")]
    pub industry2: String,
    #[serde(rename = "industrysmall3__c")]
    pub industry3: String,
    #[serde(rename = "dealstage__c")]
    pub stage: String,
    #[serde(rename = "corp_rank__c")]
    pub rank: String,
    #[serde(rename = "hidden__c")]
    pub hidden: String,
    #[serde(rename = "askingprice__c")]
    pub asking_price: String,
    #[serde(rename = "refa__c")]
    pub reference_amount: String,
    #[serde(rename = "sales__c")]
    pub sales: String,
}

impl TryFrom<DealRow> for Deal {
    type Error = Error;

    fn try_from(row: DealRow) -> Result<Self> {
        if row.id.trim().is_empty() {
            return Err(Error::validation("Deal without id"));
        }

        let asking_price = parse_amount(&row.id, "asking price", &row.asking_price)?;
        let reference_amount = parse_amount(&row.id, "reference amount", &row.reference_amount)?;
        let sales = parse_amount(&row.id, "sales", &row.sales)?;

        let industries = [row.industry1, row.industry2, row.industry3]
            .into_iter()
            .filter(|code| !code.trim().is_empty())
            .collect();

        Ok(Deal {
            stage: DealStage::from_label(&row.stage),
            hidden: parse_flag(&row.hidden),
            industries,
            asking_price,
            reference_amount,
            sales,
            id: row.id,
            owner_id: row.owner_id,
            region: row.region,
            country_of_residence: row.country_of_residence,
            legacy_industry: row.legacy_industry,
            rank: row.rank,
        })
    }
}
