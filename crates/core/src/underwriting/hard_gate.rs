use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::decision::{Classification, Decision};
use crate::domain::policy::PolicyRecord;

use super::{format_amount, join_narrative, RuleSet, Underwriter};

/// Threshold set for the hard-gate rule sequence. Defaults carry the
/// current guideline values; the struct exists so a revised guideline ships
/// as configuration, not as edits to the gate logic.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardGateThresholds {
    pub tiv_limit: Decimal,
    pub tiv_target_min: Decimal,
    pub tiv_target_max: Decimal,
    pub premium_min: Decimal,
    pub premium_max: Decimal,
    pub premium_target_min: Decimal,
    pub premium_target_max: Decimal,
    /// Buildings from this year or earlier are declined.
    pub building_year_cutoff: i32,
    pub building_year_target: i32,
    pub loss_value_limit: Decimal,
    pub acceptable_states: Vec<String>,
    pub target_states: Vec<String>,
    pub approved_construction: Vec<String>,
}

impl Default for HardGateThresholds {
    fn default() -> Self {
        Self {
            tiv_limit: Decimal::from(150_000_000_i64),
            tiv_target_min: Decimal::from(50_000_000_i64),
            tiv_target_max: Decimal::from(100_000_000_i64),
            premium_min: Decimal::from(50_000),
            premium_max: Decimal::from(175_000),
            premium_target_min: Decimal::from(75_000),
            premium_target_max: Decimal::from(100_000),
            building_year_cutoff: 1990,
            building_year_target: 2010,
            loss_value_limit: Decimal::from(100_000),
            acceptable_states: to_strings(&[
                "OH", "PA", "MD", "CO", "CA", "FL", "NC", "SC", "GA", "VA", "UT",
            ]),
            target_states: to_strings(&["OH", "PA", "MD", "CO", "CA", "FL"]),
            approved_construction: to_strings(&[
                "jm",
                "non combustible",
                "steel",
                "masonry non combustible",
                "masonry",
                "concrete",
            ]),
        }
    }
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| (*value).to_string()).collect()
}

/// Fail-fast gate sequence: the first violated gate declines the policy and
/// no later gate runs. A policy that clears every gate is SAFE with one
/// note per gate.
pub struct HardGateUnderwriter {
    thresholds: HardGateThresholds,
}

impl HardGateUnderwriter {
    pub fn new(thresholds: HardGateThresholds) -> Self {
        Self { thresholds }
    }
}

impl Default for HardGateUnderwriter {
    fn default() -> Self {
        Self::new(HardGateThresholds::default())
    }
}

impl Underwriter for HardGateUnderwriter {
    fn rule_set(&self) -> RuleSet {
        RuleSet::HardGate
    }

    fn evaluate(&self, policy: &PolicyRecord) -> Decision {
        evaluate_gates(&self.thresholds, policy)
    }
}

fn evaluate_gates(thresholds: &HardGateThresholds, policy: &PolicyRecord) -> Decision {
    let mut notes = Vec::new();

    // Gate 1: submission type. Only an explicit renewal declines.
    let submission = policy.renewal_or_new_business.trim().to_ascii_uppercase();
    if submission == "RENEWAL" {
        return Decision::rejected(
            "Renewal business is not acceptable under current guidelines".to_string(),
        );
    } else if submission == "NEW BUSINESS" {
        notes.push("New business submission is acceptable".to_string());
    } else {
        notes.push(format!("Unknown submission type '{submission}' - accepted with caution"));
    }

    // Gate 2: line of business.
    let line_of_business = policy.line_of_business.to_ascii_uppercase();
    if !line_of_business.contains("PROPERTY") {
        return Decision::rejected(format!(
            "Line of business '{}' is not acceptable - only property business is written",
            policy.line_of_business
        ));
    }
    notes.push("Property line of business is acceptable".to_string());

    // Gate 3: primary risk state.
    let state = policy.primary_risk_state.trim().to_ascii_uppercase();
    if !thresholds.acceptable_states.iter().any(|candidate| candidate == &state) {
        return Decision::rejected(format!("State '{state}' is not in the acceptable states list"));
    }
    if thresholds.target_states.iter().any(|candidate| candidate == &state) {
        notes.push(format!("State '{state}' is in the target states"));
    } else {
        notes.push(format!("State '{state}' is acceptable"));
    }

    // Gate 4: total insured value.
    if policy.tiv > thresholds.tiv_limit {
        return Decision::rejected(format!(
            "TIV of ${} exceeds the ${} limit",
            format_amount(policy.tiv),
            format_amount(thresholds.tiv_limit)
        ));
    }
    if policy.tiv >= thresholds.tiv_target_min && policy.tiv <= thresholds.tiv_target_max {
        notes.push(format!(
            "TIV of ${} is in the target range (${}-${})",
            format_amount(policy.tiv),
            format_amount(thresholds.tiv_target_min),
            format_amount(thresholds.tiv_target_max)
        ));
    } else {
        notes.push(format!(
            "TIV of ${} is acceptable (under ${})",
            format_amount(policy.tiv),
            format_amount(thresholds.tiv_limit)
        ));
    }

    // Gate 5: total premium.
    if policy.total_premium < thresholds.premium_min
        || policy.total_premium > thresholds.premium_max
    {
        return Decision::rejected(format!(
            "Total premium of ${} is outside the acceptable range (${}-${})",
            format_amount(policy.total_premium),
            format_amount(thresholds.premium_min),
            format_amount(thresholds.premium_max)
        ));
    }
    if policy.total_premium >= thresholds.premium_target_min
        && policy.total_premium <= thresholds.premium_target_max
    {
        notes.push(format!(
            "Premium of ${} is in the target range (${}-${})",
            format_amount(policy.total_premium),
            format_amount(thresholds.premium_target_min),
            format_amount(thresholds.premium_target_max)
        ));
    } else {
        notes.push(format!(
            "Premium of ${} is acceptable (${}-${})",
            format_amount(policy.total_premium),
            format_amount(thresholds.premium_min),
            format_amount(thresholds.premium_max)
        ));
    }

    // Gate 6: building age.
    if policy.oldest_building <= thresholds.building_year_cutoff {
        return Decision::rejected(format!(
            "Oldest building from {} is not newer than {} - not acceptable",
            policy.oldest_building, thresholds.building_year_cutoff
        ));
    }
    if policy.oldest_building >= thresholds.building_year_target {
        notes.push(format!(
            "Building from {} is newer than {} (target)",
            policy.oldest_building, thresholds.building_year_target
        ));
    } else {
        notes.push(format!(
            "Building from {} is newer than {} (acceptable)",
            policy.oldest_building, thresholds.building_year_cutoff
        ));
    }

    // Gate 7: construction type, substring-matched against the approved
    // categories.
    let construction = policy.construction_type.to_ascii_lowercase();
    if thresholds.approved_construction.iter().any(|kind| construction.contains(kind.as_str())) {
        notes.push(format!(
            "Construction type '{}' is acceptable",
            policy.construction_type
        ));
    } else {
        return Decision::rejected(format!(
            "Construction type '{}' is not acceptable - must be JM, non combustible/steel, or masonry non combustible",
            policy.construction_type
        ));
    }

    // Gate 8: prior losses.
    if policy.loss_value > thresholds.loss_value_limit {
        return Decision::rejected(format!(
            "Loss value of ${} exceeds the ${} limit",
            format_amount(policy.loss_value),
            format_amount(thresholds.loss_value_limit)
        ));
    }
    notes.push(format!(
        "Loss value of ${} is under ${}",
        format_amount(policy.loss_value),
        format_amount(thresholds.loss_value_limit)
    ));

    Decision {
        classification: Classification::Safe,
        narrative: join_narrative("Policy meets all underwriting criteria:", &notes),
        reasoning: notes,
        risk_factors: Vec::new(),
    }
}
