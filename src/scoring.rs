// =============================================================================
// Composite Scorer — regime-aware weighted signal aggregation
// =============================================================================
//
// For every canonical component: normalize the raw reading, multiply by the
// learned current weight from the per-cycle snapshot, then by a
// component/regime modifier in [0, 1]. Absent components contribute nothing
// and are excluded from the contribution list so they never pollute
// attribution.
//
// The composite score is a deterministic, pure function of
// (raw record, weight snapshot, regime). It is unbounded: callers compare it
// against thresholds, they do not read it as a probability.
// =============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::EngineError;
use crate::regime::{Regime, ALL_REGIMES};
use crate::signals::{normalize, Contribution, SignalComponent};
use crate::types::RawRecord;
use crate::weights::WeightSnapshot;

/// One component's weighted, regime-modified contribution to a score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentContribution {
    pub component: SignalComponent,
    /// Normalized reading in [-1, 1].
    pub normalized: f64,
    /// Learned weight applied.
    pub weight: f64,
    /// Regime modifier applied.
    pub regime_modifier: f64,
    /// normalized × weight × regime_modifier — what actually entered the sum.
    pub weighted: f64,
}

/// Result of scoring one symbol in one cycle. Ephemeral: lives only as long
/// as the decision that consumes it plus its attribution record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositeResult {
    pub symbol: String,
    pub score: f64,
    /// Present components only — absent ones are excluded, not recorded as
    /// zero contributions.
    pub contributions: Vec<ComponentContribution>,
    pub regime: Regime,
    pub timestamp: DateTime<Utc>,
}

/// Per-component regime sensitivity, in [0, 1].
///
/// Exhaustive over both enums by construction: adding a component or regime
/// variant without extending this table is a compile error, so an
/// unrecognized pairing cannot reach score time. `Mixed` rows are explicit
/// values, never a pass-through.
pub fn regime_modifier(component: SignalComponent, regime: Regime) -> f64 {
    use Regime::*;
    use SignalComponent::*;

    match (component, regime) {
        // Flow and momentum read best when risk appetite is broad.
        (OptionsFlow, RiskOn) => 1.0,
        (OptionsFlow, RiskOff) => 0.6,
        (OptionsFlow, Mixed) => 0.8,

        (Momentum, RiskOn) => 1.0,
        (Momentum, RiskOff) => 0.5,
        (Momentum, Mixed) => 0.7,

        (RelativeVolume, RiskOn) => 1.0,
        (RelativeVolume, RiskOff) => 0.7,
        (RelativeVolume, Mixed) => 0.85,

        (SocialSentiment, RiskOn) => 0.9,
        (SocialSentiment, RiskOff) => 0.4,
        (SocialSentiment, Mixed) => 0.6,

        (EarningsDrift, RiskOn) => 1.0,
        (EarningsDrift, RiskOff) => 0.7,
        (EarningsDrift, Mixed) => 0.85,

        // Positioning and pressure components carry more signal in stress.
        (ShortInterest, RiskOn) => 0.8,
        (ShortInterest, RiskOff) => 1.0,
        (ShortInterest, Mixed) => 0.9,

        (FtdPressure, RiskOn) => 0.7,
        (FtdPressure, RiskOff) => 1.0,
        (FtdPressure, Mixed) => 0.85,

        (PutCallRatio, RiskOn) => 0.7,
        (PutCallRatio, RiskOff) => 1.0,
        (PutCallRatio, Mixed) => 0.85,

        (GammaExposure, RiskOn) => 0.9,
        (GammaExposure, RiskOff) => 1.0,
        (GammaExposure, Mixed) => 0.95,

        (IvTermStructure, RiskOn) => 0.8,
        (IvTermStructure, RiskOff) => 1.0,
        (IvTermStructure, Mixed) => 0.9,

        (MeanReversion, RiskOn) => 0.7,
        (MeanReversion, RiskOff) => 1.0,
        (MeanReversion, Mixed) => 0.85,

        // Slow-moving fundamentals are regime-insensitive.
        (InsiderTrades, RiskOn) => 1.0,
        (InsiderTrades, RiskOff) => 1.0,
        (InsiderTrades, Mixed) => 1.0,

        (CongressTrades, RiskOn) => 1.0,
        (CongressTrades, RiskOff) => 1.0,
        (CongressTrades, Mixed) => 1.0,

        (AnalystRevisions, RiskOn) => 1.0,
        (AnalystRevisions, RiskOff) => 0.9,
        (AnalystRevisions, Mixed) => 0.95,

        (UwQuality, RiskOn) => 1.0,
        (UwQuality, RiskOff) => 0.9,
        (UwQuality, Mixed) => 0.95,

        (Survivorship, RiskOn) => 1.0,
        (Survivorship, RiskOff) => 0.9,
        (Survivorship, Mixed) => 0.95,

        (DarkPool, RiskOn) => 0.9,
        (DarkPool, RiskOff) => 0.9,
        (DarkPool, Mixed) => 0.9,

        (OiChange, RiskOn) => 0.9,
        (OiChange, RiskOff) => 0.8,
        (OiChange, Mixed) => 0.85,

        (NewsSentiment, RiskOn) => 0.8,
        (NewsSentiment, RiskOff) => 0.6,
        (NewsSentiment, Mixed) => 0.7,

        (SectorStrength, RiskOn) => 0.9,
        (SectorStrength, RiskOff) => 0.7,
        (SectorStrength, Mixed) => 0.8,

        (MarketBreadth, RiskOn) => 0.8,
        (MarketBreadth, RiskOff) => 0.9,
        (MarketBreadth, Mixed) => 0.85,
    }
}

/// Startup validation: every (component, regime) pair must resolve to a
/// modifier in [0, 1]. A violation is a configuration bug and fails loud
/// here, never at score time.
pub fn validate_modifier_table() -> Result<(), EngineError> {
    for component in SignalComponent::ALL {
        for regime in ALL_REGIMES {
            let m = regime_modifier(component, regime);
            if !(0.0..=1.0).contains(&m) {
                return Err(EngineError::Config(format!(
                    "regime modifier out of range for {component}/{regime}: {m}"
                )));
            }
        }
    }
    Ok(())
}

/// Score one symbol's raw record against a weight snapshot under a regime.
pub fn score(
    symbol: &str,
    record: &RawRecord,
    regime: Regime,
    weights: &WeightSnapshot,
) -> CompositeResult {
    let mut contributions = Vec::new();
    let mut total = 0.0;

    for component in SignalComponent::ALL {
        let normalized = match normalize(component, record) {
            Contribution::Absent => continue,
            Contribution::Present(v) => v,
        };

        let weight = weights
            .get(&component)
            .copied()
            .unwrap_or_else(|| component.base_weight());
        let modifier = regime_modifier(component, regime);
        let weighted = normalized * weight * modifier;

        contributions.push(ComponentContribution {
            component,
            normalized,
            weight,
            regime_modifier: modifier,
            weighted,
        });
        total += weighted;
    }

    debug!(
        symbol,
        score = format!("{:.4}", total),
        components = contributions.len(),
        regime = %regime,
        "composite scored"
    );

    CompositeResult {
        symbol: symbol.to_string(),
        score: total,
        contributions,
        regime,
        timestamp: Utc::now(),
    }
}
