// =============================================================================
// Market Regime — closed label enumeration
// =============================================================================
//
// The regime label arrives as part of the inbound cycle snapshot; an external
// classifier produces it. This engine only consumes it, so the enumeration
// must be closed: every label the classifier can emit maps to exactly one
// variant, and every variant has an explicit modifier for every component
// (see scoring::regime_modifier). An unknown label is a configuration bug
// and is rejected at parse time, never silently defaulted at score time.
// =============================================================================

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::EngineError;

/// High-level market-condition label used to modulate component trust.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Regime {
    /// Broad risk appetite — flow and momentum components are most reliable.
    RiskOn,
    /// Defensive tape — positioning and pressure components dominate.
    RiskOff,
    /// Blended state: the classifier could not commit to either side.
    Mixed,
}

pub const ALL_REGIMES: [Regime; 3] = [Regime::RiskOn, Regime::RiskOff, Regime::Mixed];

impl Default for Regime {
    /// A missing label means the classifier could not commit — Mixed.
    fn default() -> Self {
        Self::Mixed
    }
}

impl std::fmt::Display for Regime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RiskOn => write!(f, "risk_on"),
            Self::RiskOff => write!(f, "risk_off"),
            Self::Mixed => write!(f, "mixed"),
        }
    }
}

impl FromStr for Regime {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "risk_on" | "risk-on" | "riskon" => Ok(Self::RiskOn),
            "risk_off" | "risk-off" | "riskoff" => Ok(Self::RiskOff),
            "mixed" | "blended" | "neutral" => Ok(Self::Mixed),
            other => Err(EngineError::RegimeUnrecognized(other.to_string())),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_known_labels() {
        assert_eq!("risk_on".parse::<Regime>().unwrap(), Regime::RiskOn);
        assert_eq!("Risk-Off".parse::<Regime>().unwrap(), Regime::RiskOff);
        assert_eq!("MIXED".parse::<Regime>().unwrap(), Regime::Mixed);
        // The classifier's blended synonym resolves to Mixed, not an error.
        assert_eq!("blended".parse::<Regime>().unwrap(), Regime::Mixed);
    }

    #[test]
    fn unknown_label_is_rejected() {
        let err = "sideways_crab".parse::<Regime>().unwrap_err();
        assert!(matches!(err, EngineError::RegimeUnrecognized(_)));
    }

    #[test]
    fn display_roundtrips_through_fromstr() {
        for regime in ALL_REGIMES {
            assert_eq!(regime.to_string().parse::<Regime>().unwrap(), regime);
        }
    }
}
