//! Deterministic underwriting rule engine.
//!
//! Two rule sets classify a [`PolicyRecord`] as SAFE or NOT SAFE behind one
//! [`Underwriter`] trait: a hard-gate sequence that short-circuits on the
//! first violated gate, and a risk-accumulation pass that collects soft
//! signals and decides on the aggregate. Both are pure functions over the
//! record and their threshold configuration.

pub mod accumulation;
pub mod hard_gate;
pub mod summary;

use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::decision::Decision;
use crate::domain::policy::PolicyRecord;
use crate::errors::DomainError;

pub use accumulation::{AccumulationThresholds, RiskAccumulationUnderwriter};
pub use hard_gate::{HardGateThresholds, HardGateUnderwriter};
pub use summary::RunSummary;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleSet {
    HardGate,
    RiskAccumulation,
}

impl RuleSet {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HardGate => "hard_gate",
            Self::RiskAccumulation => "risk_accumulation",
        }
    }
}

impl std::fmt::Display for RuleSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RuleSet {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "hard_gate" | "hardgate" => Ok(Self::HardGate),
            "risk_accumulation" | "accumulation" => Ok(Self::RiskAccumulation),
            other => Err(DomainError::UnknownRuleSet(other.to_string())),
        }
    }
}

/// A rule set the pipeline can run a policy through. Implementations are
/// side-effect free and reentrant; callers may evaluate policies from any
/// number of tasks without coordination.
pub trait Underwriter: Send + Sync {
    fn rule_set(&self) -> RuleSet;
    fn evaluate(&self, policy: &PolicyRecord) -> Decision;
}

/// Select an underwriter by rule set, with that rule set's default
/// thresholds. Callers never branch on rule-set identity themselves.
pub fn underwriter_for(rule_set: RuleSet) -> Box<dyn Underwriter> {
    match rule_set {
        RuleSet::HardGate => Box::new(HardGateUnderwriter::default()),
        RuleSet::RiskAccumulation => Box::new(RiskAccumulationUnderwriter::default()),
    }
}

/// Monetary amount for rationale text: thousands separators, cents only
/// when present.
pub(crate) fn format_amount(amount: Decimal) -> String {
    let rounded = amount.round_dp(2);
    let magnitude = rounded.abs();
    let integral = magnitude.trunc().to_string();

    let mut grouped = String::with_capacity(integral.len() + integral.len() / 3);
    for (offset, digit) in integral.chars().enumerate() {
        if offset > 0 && (integral.len() - offset) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let fractional = magnitude.fract();
    if !fractional.is_zero() {
        let cents = (fractional * Decimal::from(100)).round().to_u32().unwrap_or(0);
        grouped = format!("{grouped}.{cents:02}");
    }

    if rounded.is_sign_negative() {
        format!("-{grouped}")
    } else {
        grouped
    }
}

pub(crate) fn join_narrative(header: &str, parts: &[String]) -> String {
    format!("{header}\n{}", parts.join("\n"))
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{format_amount, underwriter_for, RuleSet};

    #[test]
    fn rule_set_parses_common_spellings() {
        assert_eq!("hard_gate".parse::<RuleSet>().expect("parse"), RuleSet::HardGate);
        assert_eq!("Hard-Gate".parse::<RuleSet>().expect("parse"), RuleSet::HardGate);
        assert_eq!(
            "risk_accumulation".parse::<RuleSet>().expect("parse"),
            RuleSet::RiskAccumulation
        );
        assert_eq!(
            "accumulation".parse::<RuleSet>().expect("parse"),
            RuleSet::RiskAccumulation
        );
        assert!("fuzzy".parse::<RuleSet>().is_err());
    }

    #[test]
    fn selector_returns_matching_rule_set() {
        assert_eq!(underwriter_for(RuleSet::HardGate).rule_set(), RuleSet::HardGate);
        assert_eq!(
            underwriter_for(RuleSet::RiskAccumulation).rule_set(),
            RuleSet::RiskAccumulation
        );
    }

    #[test]
    fn amounts_group_thousands_and_keep_cents() {
        assert_eq!(format_amount(Decimal::from(60_000_000_i64)), "60,000,000");
        assert_eq!(format_amount(Decimal::from(999)), "999");
        assert_eq!(format_amount(Decimal::new(8_000_050, 2)), "80,000.50");
        assert_eq!(format_amount(Decimal::ZERO), "0");
    }
}
