pub mod config;
pub mod domain;
pub mod errors;
pub mod underwriting;

pub use domain::decision::{Classification, Decision};
pub use domain::policy::{FieldIssue, PolicyId, PolicyRecord};
pub use errors::{ApplicationError, DomainError};
pub use underwriting::{
    underwriter_for, AccumulationThresholds, HardGateThresholds, HardGateUnderwriter,
    RiskAccumulationUnderwriter, RuleSet, RunSummary, Underwriter,
};
