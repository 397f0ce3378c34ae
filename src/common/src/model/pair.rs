use serde::{Deserialize, Serialize};
use std::fmt;

/// Which output list a need/deal pair belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    Needs,
    Deal,
}

impl Role {
    /// Both roles, in emission order
    pub const ALL: [Role; 2] = [Role::Needs, Role::Deal];

    /// Suffix appended to the deal id in the stored sort key
    pub fn sort_suffix(self) -> &'static str {
        match self {
            Role::Needs => "_Needs",
            Role::Deal => "_Deal",
        }
    }

    /// Object name written in the first column of export rows
    pub fn export_label(self) -> &'static str {
        match self {
            Role::Needs => "AWS_Search_Needs__c",
            Role::Deal => "AWS_Search_Deal__c",
        }
    }

    /// Recover the role from a stored sort key
    pub fn from_sort_key(sort_key: &str) -> Option<Role> {
        Role::ALL
            .into_iter()
            .find(|role| sort_key.ends_with(role.sort_suffix()))
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Needs => write!(f, "Needs"),
            Role::Deal => write!(f, "Deal"),
        }
    }
}

/// A pair as it lives in the key-value store.
///
/// Partition key is the need id, sort key is `{deal_id}_{role suffix}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoredPair {
    pub need_id: String,
    pub sort_key: String,
    pub deal_id: String,
}

/// A pair recorded by an earlier invocation
pub type ExistingPairRecord = StoredPair;

impl StoredPair {
    pub fn role(&self) -> Option<Role> {
        Role::from_sort_key(&self.sort_key)
    }
}

/// A pair to be created for one need.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NewPairRecord {
    pub role: Role,
    pub deal_id: String,
    pub need_id: String,
    pub account_id: String,
    /// Need owner for [`Role::Needs`], deal owner for [`Role::Deal`]
    pub owner_id: String,
}

impl NewPairRecord {
    pub fn sort_key(&self) -> String {
        format!("{}_{}", self.deal_id, self.role.sort_suffix())
    }

    pub fn to_stored(&self) -> StoredPair {
        StoredPair {
            need_id: self.need_id.clone(),
            sort_key: self.sort_key(),
            deal_id: self.deal_id.clone(),
        }
    }

    pub fn to_export_row(&self) -> ExportRow {
        ExportRow {
            label: self.role.export_label().to_string(),
            deal_id: self.deal_id.clone(),
            need_id: self.need_id.clone(),
            account_id: self.account_id.clone(),
            owner_id: self.owner_id.clone(),
        }
    }
}

/// Flattened pair, one line of an export file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRow {
    #[serde(rename = "sObject")]
    pub label: String,
    #[serde(rename = "DealId__c")]
    pub deal_id: String,
    #[serde(rename = "NeedsId__c")]
    pub need_id: String,
    #[serde(rename = "AccountId__c")]
    pub account_id: String,
    #[serde(rename = "OwnerId")]
    pub owner_id: String,
}
