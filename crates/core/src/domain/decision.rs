use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Classification {
    #[serde(rename = "SAFE")]
    Safe,
    #[serde(rename = "NOT SAFE")]
    NotSafe,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Safe => "SAFE",
            Self::NotSafe => "NOT SAFE",
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Classification {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "SAFE" => Ok(Self::Safe),
            "NOT SAFE" => Ok(Self::NotSafe),
            other => Err(DomainError::InvariantViolation(format!(
                "unknown classification `{other}`"
            ))),
        }
    }
}

/// Outcome of evaluating one policy against one rule set. A decision is a
/// value: produced fresh per evaluation, immutable once returned, persisted
/// (or not) entirely by the caller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub classification: Classification,
    /// Assembled human-readable rationale, ready for storage or display.
    pub narrative: String,
    /// Ordered explanation trail behind the narrative.
    pub reasoning: Vec<String>,
    /// Soft negative signals; only populated by the risk-accumulation
    /// rule set.
    pub risk_factors: Vec<String>,
}

impl Decision {
    pub fn rejected(reason: String) -> Self {
        Self {
            classification: Classification::NotSafe,
            narrative: reason.clone(),
            reasoning: vec![reason],
            risk_factors: Vec::new(),
        }
    }

    pub fn is_safe(&self) -> bool {
        self.classification == Classification::Safe
    }
}
