use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use super::{parse_amount, split_list};
use crate::error::{Error, Result};

/// A buying need: the search criteria one buyer registered.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Need {
    pub id: String,
    pub owner_id: String,
    pub account_id: String,
    pub regions: Vec<String>,
    pub countries_of_residence: Vec<String>,
    /// Single industry list of the older search form. Non-empty selects legacy matching.
    pub legacy_industries: Vec<String>,
    /// Industry list of the current search form, matched against all three deal industries
    pub industries: Vec<String>,
    pub investable_lower: Option<BigDecimal>,
    pub investable_upper: Option<BigDecimal>,
    pub sales_scale_lower: Option<BigDecimal>,
    pub sales_scale_upper: Option<BigDecimal>,
}

/// One line of the needs export file, as read.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NeedRow {
    pub id: String,
    #[serde(rename = "ownerid")]
    pub owner_id: String,
    #[serde(rename = "account__c")]
    pub account: String,
    #[serde(rename = "prefname__c")]
    pub regions: String,
    #[serde(rename = "countryresidence__c")]
    pub countries_of_residence: String,
    #[serde(rename = "industry_small__c")]
    pub legacy_industries: String,
    #[serde(rename = "desiredindustrysmall__c")]
    pub industries: String,
    #[serde(rename = "investableamountlower__c")]
    pub investable_lower: String,
    #[serde(rename = "investableamountupper__c")]
    pub investable_upper: String,
    #[serde(rename = "salesscalelower__c")]
    pub sales_scale_lower: String,
    #[serde(rename = "salesscaleupper__c")]
    pub sales_scale_upper: String,
}

impl TryFrom<NeedRow> for Need {
    type Error = Error;

    fn try_from(row: NeedRow) -> Result<Self> {
        if row.id.trim().is_empty() {
            return Err(Error::validation("Buying need without id"));
        }

        let investable_lower = parse_amount(&row.id, "investable lower bound", &row.investable_lower)?;
        let investable_upper = parse_amount(&row.id, "investable upper bound", &row.investable_upper)?;
        let sales_scale_lower = parse_amount(&row.id, "sales scale lower bound", &row.sales_scale_lower)?;
        let sales_scale_upper = parse_amount(&row.id, "sales scale upper bound", &row.sales_scale_upper)?;

        Ok(Need {
            regions: split_list(&row.regions),
            countries_of_residence: split_list(&row.countries_of_residence),
            legacy_industries: split_list(&row.legacy_industries),
            industries: split_list(&row.industries),
            investable_lower,
            investable_upper,
            sales_scale_lower,
            sales_scale_upper,
            id: row.id,
            owner_id: row.owner_id,
            account_id: row.account,
        })
    }
}
