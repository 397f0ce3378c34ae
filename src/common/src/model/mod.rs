pub mod deal;
pub mod need;
pub mod pair;

pub use deal::{Deal, DealRow, DealStage};
pub use need::{Need, NeedRow};
pub use pair::{ExistingPairRecord, ExportRow, NewPairRecord, Role, StoredPair};

use bigdecimal::BigDecimal;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Separator for multi-valued source fields
pub const LIST_SEPARATOR: char = ';';

/// Split a multi-valued field. Blank input and blank segments yield nothing.
pub fn split_list(field: &str) -> Vec<String> {
    field
        .split(LIST_SEPARATOR)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse an optional decimal amount. Blank means absent.
pub(crate) fn parse_amount(record_id: &str, field: &str, raw: &str) -> Result<Option<BigDecimal>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }

    BigDecimal::from_str(raw).map(Some).map_err(|e| {
        Error::validation(format!(
            "Record [{record_id}] has a non-numeric {field}: {raw:?}"
        ))
        .with_source(e)
    })
}

pub(crate) fn parse_flag(raw: &str) -> bool {
    raw.trim().eq_ignore_ascii_case("true")
}
