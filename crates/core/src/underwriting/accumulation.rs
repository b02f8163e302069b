use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::decision::{Classification, Decision};
use crate::domain::policy::PolicyRecord;

use super::{format_amount, join_narrative, RuleSet, Underwriter};

/// Threshold set for the risk-accumulation rule set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccumulationThresholds {
    pub tiv_limit: Decimal,
    pub tiv_support_min: Decimal,
    /// States treated as catastrophe-exposed for age, construction and
    /// geography signals.
    pub catastrophe_states: Vec<String>,
    /// Buildings older than this decline outright in a catastrophe state.
    pub pre_catastrophe_year: i32,
    pub winnability_floor: i64,
    /// Winnability at or above this lets a policy absorb a couple of soft
    /// risk factors and still bind.
    pub winnability_override: i64,
    pub winnability_strong: i64,
    pub winnability_moderate: i64,
    pub ratio_floor_pct: Decimal,
    pub ratio_support_min_pct: Decimal,
    pub ratio_support_max_pct: Decimal,
    pub frame_quake_year: i32,
    pub building_recent_year: i32,
    pub building_acceptable_year: i32,
    pub max_soft_risks: usize,
    pub safe_construction: Vec<String>,
}

impl Default for AccumulationThresholds {
    fn default() -> Self {
        Self {
            tiv_limit: Decimal::from(100_000_000_i64),
            tiv_support_min: Decimal::from(1_000_000_i64),
            catastrophe_states: vec!["CA".to_string(), "FL".to_string(), "TX".to_string()],
            pre_catastrophe_year: 1950,
            winnability_floor: 50,
            winnability_override: 70,
            winnability_strong: 80,
            winnability_moderate: 60,
            ratio_floor_pct: Decimal::new(3, 1),
            ratio_support_min_pct: Decimal::new(5, 1),
            ratio_support_max_pct: Decimal::new(50, 1),
            frame_quake_year: 1970,
            building_recent_year: 1980,
            building_acceptable_year: 1960,
            max_soft_risks: 2,
            safe_construction: vec![
                "masonry".to_string(),
                "concrete".to_string(),
                "steel".to_string(),
                "non-combustible".to_string(),
            ],
        }
    }
}

/// Two-phase rule set: absolute limits decline immediately; past those,
/// every soft signal is scored and the aggregate decides. Unlike the
/// hard-gate sequence this never short-circuits inside phase two.
pub struct RiskAccumulationUnderwriter {
    thresholds: AccumulationThresholds,
}

impl RiskAccumulationUnderwriter {
    pub fn new(thresholds: AccumulationThresholds) -> Self {
        Self { thresholds }
    }
}

impl Default for RiskAccumulationUnderwriter {
    fn default() -> Self {
        Self::new(AccumulationThresholds::default())
    }
}

impl Underwriter for RiskAccumulationUnderwriter {
    fn rule_set(&self) -> RuleSet {
        RuleSet::RiskAccumulation
    }

    fn evaluate(&self, policy: &PolicyRecord) -> Decision {
        evaluate_accumulation(&self.thresholds, policy)
    }
}

fn evaluate_accumulation(thresholds: &AccumulationThresholds, policy: &PolicyRecord) -> Decision {
    let construction = policy.construction_type.to_ascii_lowercase();
    let state = policy.primary_risk_state.trim().to_ascii_uppercase();
    let in_catastrophe_state =
        thresholds.catastrophe_states.iter().any(|candidate| candidate == &state);
    let ratio = policy.premium_ratio_pct();

    // Phase 1: absolute declines, first match wins.
    if policy.tiv > thresholds.tiv_limit {
        return Decision::rejected(format!(
            "TIV of ${} exceeds the ${} limit without special approval",
            format_amount(policy.tiv),
            format_amount(thresholds.tiv_limit)
        ));
    }

    if policy.oldest_building < thresholds.pre_catastrophe_year && in_catastrophe_state {
        return Decision::rejected(format!(
            "Building from {} in high-risk state {state} - too old",
            policy.oldest_building
        ));
    }

    if policy.winnability < thresholds.winnability_floor {
        return Decision::rejected(format!(
            "Winnability score of {} is below the minimum threshold of {}",
            policy.winnability, thresholds.winnability_floor
        ));
    }

    if ratio < thresholds.ratio_floor_pct {
        return Decision::rejected(format!(
            "Premium ratio of {ratio:.2}% is below {}% - inadequate pricing",
            thresholds.ratio_floor_pct
        ));
    }

    if construction.contains("frame")
        && policy.oldest_building < thresholds.frame_quake_year
        && state == "CA"
    {
        return Decision::rejected(format!(
            "Frame construction with a pre-{} building in California - unacceptable earthquake exposure",
            thresholds.frame_quake_year
        ));
    }

    // Phase 2: soft signals. Each signal lands in at most one list; all six
    // are always evaluated.
    let mut supporting = Vec::new();
    let mut risk_factors = Vec::new();

    if policy.tiv >= thresholds.tiv_support_min && policy.tiv <= thresholds.tiv_limit {
        supporting.push(format!(
            "TIV of ${} is within the acceptable range",
            format_amount(policy.tiv)
        ));
    } else if policy.tiv < thresholds.tiv_support_min {
        risk_factors.push(format!(
            "Low TIV of ${} may indicate insufficient coverage",
            format_amount(policy.tiv)
        ));
    }

    if thresholds.safe_construction.iter().any(|kind| construction.contains(kind.as_str())) {
        supporting.push(format!("Construction type '{}' is low-risk", policy.construction_type));
    } else if construction.contains("frame") {
        if in_catastrophe_state {
            risk_factors.push(format!("Frame construction in high-risk state {state}"));
        } else {
            supporting.push(format!("Frame construction is acceptable in {state}"));
        }
    }

    if policy.oldest_building >= thresholds.building_recent_year {
        supporting.push(format!("Building from {} is relatively new", policy.oldest_building));
    } else if policy.oldest_building >= thresholds.building_acceptable_year {
        supporting.push(format!(
            "Building from {} is older but acceptable",
            policy.oldest_building
        ));
    } else {
        risk_factors.push(format!(
            "Building from {} is very old - high risk",
            policy.oldest_building
        ));
    }

    if in_catastrophe_state {
        risk_factors.push(format!("{state} is a moderate-to-high risk state"));
    } else {
        supporting.push(format!("{state} is a low-risk geographic area"));
    }

    if policy.winnability >= thresholds.winnability_strong {
        supporting.push(format!("Winnability score of {} is excellent", policy.winnability));
    } else if policy.winnability >= thresholds.winnability_moderate {
        supporting.push(format!("Winnability score of {} is moderate", policy.winnability));
    } else {
        risk_factors.push(format!("Winnability score of {} is concerning", policy.winnability));
    }

    if ratio >= thresholds.ratio_support_min_pct && ratio <= thresholds.ratio_support_max_pct {
        supporting.push(format!("Premium ratio of {ratio:.2}% is appropriate"));
    } else if ratio < thresholds.ratio_support_min_pct {
        risk_factors.push(format!("Premium ratio of {ratio:.2}% may be too low"));
    } else {
        risk_factors.push(format!("Premium ratio of {ratio:.2}% is high - indicates risk"));
    }

    // Aggregate decision: the counts alone decide, with a winnability
    // override absorbing a small number of soft risks.
    if risk_factors.is_empty() {
        Decision {
            classification: Classification::Safe,
            narrative: join_narrative("Policy meets all safety criteria:", &supporting),
            reasoning: supporting,
            risk_factors,
        }
    } else if risk_factors.len() <= thresholds.max_soft_risks
        && policy.winnability >= thresholds.winnability_override
    {
        let ordered: Vec<String> =
            supporting.iter().chain(risk_factors.iter()).cloned().collect();
        Decision {
            classification: Classification::Safe,
            narrative: join_narrative(
                "Policy is acceptable despite minor risk factors:",
                &ordered,
            ),
            reasoning: ordered,
            risk_factors,
        }
    } else {
        let ordered: Vec<String> =
            risk_factors.iter().chain(supporting.iter()).cloned().collect();
        Decision {
            classification: Classification::NotSafe,
            narrative: join_narrative("Policy carries too many risk factors:", &ordered),
            reasoning: ordered,
            risk_factors,
        }
    }
}
