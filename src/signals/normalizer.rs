// =============================================================================
// Signal Normalizer — raw source fields to bounded contributions
// =============================================================================
//
// Pure function of the raw record. Each component resolves the first present
// key from its `raw_keys` list and maps the value through its own explicit
// range rules into [-1, 1].
//
// Absence is a first-class outcome: a missing key (or a present but
// unparseable / non-finite value) yields `Contribution::Absent`, which is
// distinguishable from a genuine 0.0 reading — absent components contribute
// nothing to the composite and never count as learning evidence.
// =============================================================================

use tracing::debug;

use crate::signals::component::SignalComponent;
use crate::types::RawRecord;

/// Outcome of normalizing one component against one raw record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Contribution {
    /// No accepted key present, or the value was malformed. Treated
    /// identically either way: zero contribution, no learning evidence.
    Absent,
    /// Normalized contribution in [-1, 1].
    Present(f64),
}

impl Contribution {
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// The contribution value, with absence reading as 0.0.
    pub fn value_or_zero(&self) -> f64 {
        match self {
            Self::Absent => 0.0,
            Self::Present(v) => *v,
        }
    }
}

/// Normalize one component's raw reading into a bounded contribution.
pub fn normalize(component: SignalComponent, record: &RawRecord) -> Contribution {
    let raw = match resolve_raw(component, record) {
        Some(v) => v,
        None => return Contribution::Absent,
    };

    Contribution::Present(map_raw(component, raw))
}

/// Resolve the first present, parseable, finite value among the component's
/// accepted keys. First present key wins even if it fails to parse — a
/// malformed primary reading must not fall through to a stale fallback key.
///
/// Public because the entry gate reads some components (UW quality,
/// survivorship) at their raw scale for bypass thresholds.
pub fn resolve_raw(component: SignalComponent, record: &RawRecord) -> Option<f64> {
    for key in component.raw_keys() {
        let Some(value) = record.get(*key) else {
            continue;
        };

        let parsed = match value {
            serde_json::Value::Number(n) => n.as_f64(),
            // Several upstream feeds serialize numbers as strings.
            serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };

        return match parsed {
            Some(v) if v.is_finite() => Some(v),
            _ => {
                debug!(
                    component = %component,
                    key,
                    value = %value,
                    "malformed raw value — treating component as absent"
                );
                None
            }
        };
    }
    None
}

/// Component-specific mapping from raw value to contribution.
///
/// Every range edge is explicit; middle bands that still carry information
/// contribute a partial amount rather than falling into an accidental gap.
fn map_raw(component: SignalComponent, raw: f64) -> f64 {
    use SignalComponent::*;

    let v = match component {
        // Aggregated options-flow score, source range roughly [-100, 100].
        OptionsFlow => raw / 100.0,

        // Dark-pool buy ratio [0, 1]; ~0.42 is the long-run baseline, so a
        // wide neutral band sits around it.
        DarkPool => {
            if raw >= 0.60 {
                1.0
            } else if raw >= 0.50 {
                0.5
            } else if raw >= 0.35 {
                0.0
            } else if raw >= 0.25 {
                -0.5
            } else {
                -1.0
            }
        }

        // Net insider dollar flow; $1M net buying saturates the signal.
        InsiderTrades => raw / 1_000_000.0,

        // Net congressional purchase flow; smaller notional, $500k saturates.
        CongressTrades => raw / 500_000.0,

        // IV term-structure slope (front minus back, in vol points / 0.2).
        // Backwardation (positive slope) reads as stress.
        IvTermStructure => -raw / 0.2,

        // Dealer gamma exposure in dollars. Deep negative GEX means dealers
        // chase moves (fuel); large positive GEX pins price.
        GammaExposure => {
            if raw <= -1_000_000_000.0 {
                1.0
            } else if raw < 0.0 {
                0.4
            } else if raw <= 1_000_000_000.0 {
                0.0
            } else {
                -0.5
            }
        }

        // Short interest as a fraction of float. Graduated squeeze fuel.
        ShortInterest => {
            if raw >= 0.20 {
                1.0
            } else if raw >= 0.10 {
                0.5
            } else if raw >= 0.05 {
                0.2
            } else {
                0.0
            }
        }

        // Fails-to-deliver as a fraction of float.
        FtdPressure => {
            if raw >= 0.010 {
                1.0
            } else if raw >= 0.005 {
                0.5
            } else if raw >= 0.001 {
                0.2
            } else {
                0.0
            }
        }

        // UW-style flow quality grade [0, 100]; 50 is neutral.
        UwQuality => (raw - 50.0) / 50.0,

        // Net analyst estimate revisions (up minus down, count).
        AnalystRevisions => raw / 10.0,

        // Post-earnings drift score, already [-1, 1] at the source.
        EarningsDrift => raw,

        // Social chatter z-score; +/-3 sigma saturates.
        SocialSentiment => raw / 3.0,

        // Headline sentiment, already [-1, 1] at the source.
        NewsSentiment => raw,

        // Open-interest change as a fraction; +/-50% saturates.
        OiChange => raw / 0.5,

        // Put/call ratio, contrarian. Elevated fear is constructive;
        // complacency is a mild negative. 0.5–0.8 is the unremarkable band.
        PutCallRatio => {
            if raw >= 1.2 {
                0.8
            } else if raw >= 0.8 {
                0.3
            } else if raw >= 0.5 {
                0.0
            } else {
                -0.5
            }
        }

        // Relative volume vs 20-day average. Graduated interest signal.
        RelativeVolume => {
            if raw >= 3.0 {
                1.0
            } else if raw >= 2.0 {
                0.6
            } else if raw >= 1.5 {
                0.3
            } else {
                0.0
            }
        }

        // 20-day return; +/-15% saturates.
        Momentum => raw / 0.15,

        // 5-day z-score, contrarian: stretched below the mean is a long.
        MeanReversion => -raw / 2.5,

        // Sector relative strength, already [-1, 1] at the source.
        SectorStrength => raw,

        // Fraction of advancers [0, 1]; 0.5 is neutral.
        MarketBreadth => (raw - 0.5) * 2.0,

        // Setup survivorship quality [0, 1]; 0.5 is neutral.
        Survivorship => (raw - 0.5) * 2.0,
    };

    v.clamp(-1.0, 1.0)
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(pairs: &[(&str, serde_json::Value)]) -> RawRecord {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn missing_key_is_absent() {
        let rec = RawRecord::new();
        for component in SignalComponent::ALL {
            assert_eq!(normalize(component, &rec), Contribution::Absent);
        }
    }

    #[test]
    fn contributions_stay_bounded_for_extreme_inputs() {
        for component in SignalComponent::ALL {
            for raw in [-1e12, -5.0, -0.3, 0.0, 0.3, 5.0, 1e12] {
                let rec = record(&[(component.raw_keys()[0], json!(raw))]);
                match normalize(component, &rec) {
                    Contribution::Present(v) => {
                        assert!(
                            (-1.0..=1.0).contains(&v),
                            "{} out of bounds for raw {}: {}",
                            component,
                            raw,
                            v
                        );
                    }
                    Contribution::Absent => panic!("{} absent with key present", component),
                }
            }
        }
    }

    #[test]
    fn first_present_key_wins() {
        // oi_change present alongside a conflicting oi fallback: only the
        // primary key is read.
        let rec = record(&[("oi_change", json!(0.5)), ("oi", json!(-0.5))]);
        assert_eq!(
            normalize(SignalComponent::OiChange, &rec),
            Contribution::Present(1.0)
        );
    }

    #[test]
    fn fallback_key_used_when_primary_missing() {
        let rec = record(&[("oi", json!(0.25))]);
        assert_eq!(
            normalize(SignalComponent::OiChange, &rec),
            Contribution::Present(0.5)
        );
    }

    #[test]
    fn numeric_string_values_are_accepted() {
        let rec = record(&[("si_pct", json!("0.22"))]);
        assert_eq!(
            normalize(SignalComponent::ShortInterest, &rec),
            Contribution::Present(1.0)
        );
    }

    #[test]
    fn malformed_value_is_absent_not_a_panic() {
        let rec = record(&[("flow_score", json!("n/a"))]);
        assert_eq!(normalize(SignalComponent::OptionsFlow, &rec), Contribution::Absent);

        let rec = record(&[("flow_score", json!({"nested": true}))]);
        assert_eq!(normalize(SignalComponent::OptionsFlow, &rec), Contribution::Absent);
    }

    #[test]
    fn malformed_primary_does_not_fall_through_to_fallback() {
        let rec = record(&[("oi_change", json!("garbage")), ("oi", json!(0.5))]);
        assert_eq!(normalize(SignalComponent::OiChange, &rec), Contribution::Absent);
    }

    #[test]
    fn absent_is_distinguishable_from_zero_reading() {
        let absent = normalize(SignalComponent::Momentum, &RawRecord::new());
        let zero = normalize(
            SignalComponent::Momentum,
            &record(&[("mom_20d", json!(0.0))]),
        );
        assert!(absent.is_absent());
        assert!(!zero.is_absent());
        assert_eq!(absent.value_or_zero(), zero.value_or_zero());
    }

    #[test]
    fn short_interest_band_edges_are_explicit() {
        let cases = [
            (0.25, 1.0),
            (0.20, 1.0),
            (0.15, 0.5),
            (0.10, 0.5),
            (0.07, 0.2),
            (0.05, 0.2),
            (0.03, 0.0),
        ];
        for (raw, expected) in cases {
            let rec = record(&[("si_pct", json!(raw))]);
            assert_eq!(
                normalize(SignalComponent::ShortInterest, &rec),
                Contribution::Present(expected),
                "si_pct = {raw}"
            );
        }
    }

    #[test]
    fn put_call_middle_band_contributes_partially() {
        let rec = record(&[("pcr", json!(0.9))]);
        assert_eq!(
            normalize(SignalComponent::PutCallRatio, &rec),
            Contribution::Present(0.3)
        );
    }
}
