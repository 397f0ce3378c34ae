//! Need/deal matching and pair reconciliation.
//!
//! Pure crate: receives parsed needs, deals and previously stored pairs,
//! returns the pairs that still have to be written. No store or file IO.

pub mod eligibility;
pub mod pipeline;
pub mod range;
pub mod reconcile;

pub use eligibility::{Eligibility, EligibilityClassifier};
pub use pipeline::{MatchStrategy, MatchingPipeline};
pub use range::{AmountRange, within_any, within_range};
pub use reconcile::reconcile;
