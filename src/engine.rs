// =============================================================================
// Evaluation Engine — one decision cycle, end to end
// =============================================================================
//
// Within a cycle everything runs sequentially and synchronously per symbol:
// score → gate → record, then exit evaluation for open positions. All inputs
// are pre-fetched snapshots; nothing in here touches the network or blocks.
// The weight snapshot is taken once at the top of the cycle, so a learner
// pass landing mid-cycle can never produce a half-old, half-new scoring run.
//
// One symbol's bad data must never take down the rest of the cycle: scoring
// and gating are total over arbitrary raw records (absent/malformed reads as
// no contribution), and attribution writes are fire-and-forget.
// =============================================================================

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, info};

use crate::attribution::{AttributionRecord, AttributionRecorder};
use crate::config::EngineConfig;
use crate::exit::{ExitEvaluator, MarketContext, SwingExitPolicy, WheelExitPolicy};
use crate::gate::{self, GateContext, GateDecision};
use crate::regime::Regime;
use crate::scoring;
use crate::signals::{resolve_raw, SignalComponent};
use crate::types::{Direction, ExitEvent, Position, RawRecord};
use crate::weights::WeightStore;

/// Pre-fetched inputs for one evaluation cycle, produced by the external
/// data collaborators. Deserializes directly from the snapshot cache, so an
/// unrecognized regime label fails at load time, not at score time.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CycleInput {
    /// Raw signal record per symbol. A symbol may be present with any subset
    /// of component keys.
    #[serde(default)]
    pub symbols: HashMap<String, RawRecord>,

    pub regime: Regime,

    /// Open positions owned by the trading runtime.
    #[serde(default)]
    pub positions: Vec<Position>,

    /// Last prices for exit evaluation.
    #[serde(default)]
    pub prices: HashMap<String, f64>,

    /// True when the book is full and a new entry would displace an
    /// existing position.
    #[serde(default)]
    pub capacity_reached: bool,
}

/// Everything one cycle produced, for the caller's logging/reporting.
#[derive(Debug, Default)]
pub struct CycleReport {
    pub decisions: Vec<GateDecision>,
    pub exit_events: Vec<ExitEvent>,
}

pub struct EvaluationEngine {
    config: EngineConfig,
    store: Arc<WeightStore>,
    recorder: Arc<AttributionRecorder>,
    exits: ExitEvaluator,
}

impl EvaluationEngine {
    pub fn new(
        config: EngineConfig,
        store: Arc<WeightStore>,
        recorder: Arc<AttributionRecorder>,
    ) -> Self {
        let exits = ExitEvaluator::new(
            WheelExitPolicy::new(config.wheel.clone()),
            SwingExitPolicy::new(config.swing.clone()),
        );
        Self {
            config,
            store,
            recorder,
            exits,
        }
    }

    /// Run one full decision cycle over the snapshot.
    pub fn run_cycle(&self, input: &CycleInput) -> CycleReport {
        let weights = self.store.snapshot();
        let composite_version = self.store.version();

        let mut report = CycleReport::default();
        let mut cycle_scores: HashMap<String, f64> = HashMap::new();

        // Snapshot entries outside the configured universe are ignored; an
        // empty symbol list disables the filter. Sorted for stable log
        // ordering; symbols are independent.
        let mut symbols: Vec<&String> = input
            .symbols
            .keys()
            .filter(|s| self.config.symbols.is_empty() || self.config.symbols.contains(*s))
            .collect();
        symbols.sort();

        for symbol in symbols {
            let record = &input.symbols[symbol];

            let composite = scoring::score(symbol, record, input.regime, &weights);

            let direction = if composite.score >= 0.0 {
                Direction::Long
            } else {
                Direction::Short
            };

            let ctx = GateContext {
                mode: self.config.account_mode,
                uw_quality_raw: resolve_raw(SignalComponent::UwQuality, record),
                displacement_blocked: input.capacity_reached,
                challenger_survivorship: resolve_raw(SignalComponent::Survivorship, record),
            };

            let decision = gate::decide(&composite, direction, &ctx, &self.config.gate);

            // Best-effort: a failing disk never blocks the decision.
            self.recorder.record(&AttributionRecord::from_decision(
                &decision,
                composite_version,
                &composite.contributions,
            ));

            cycle_scores.insert(symbol.clone(), composite.score);
            report.decisions.push(decision);
        }

        // --- Exit evaluation --------------------------------------------------
        let market_ctx = MarketContext {
            prices: input.prices.clone(),
            scores: cycle_scores,
            now: Utc::now(),
        };

        let events = self.exits.evaluate(&input.positions, &market_ctx);
        for event in &events {
            self.recorder.record(&AttributionRecord::from_exit(event));
        }
        report.exit_events = events;

        let approved = report.decisions.iter().filter(|d| d.approved()).count();
        info!(
            symbols = report.decisions.len(),
            approved,
            blocked = report.decisions.len() - approved,
            exits_requested = report.exit_events.len(),
            composite_version,
            regime = %input.regime,
            "cycle complete"
        );
        debug!(health = ?self.recorder.health(), "recorder health");

        report
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PositionState, StrategyKind};
    use serde_json::json;

    fn engine(dir: &tempfile::TempDir) -> EvaluationEngine {
        let config = EngineConfig::default();
        let store = Arc::new(WeightStore::load(
            dir.path().join("weights.json"),
            config.weights.bounds(),
        ));
        let recorder = Arc::new(AttributionRecorder::new(dir.path().join("attribution.jsonl")));
        EvaluationEngine::new(config, store, recorder)
    }

    fn strong_record() -> RawRecord {
        [
            ("flow_score", json!(90.0)),
            ("uw_score", json!(80.0)),
            ("mom_20d", json!(0.2)),
            ("si_pct", json!(0.25)),
            ("rvol", json!(3.5)),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }

    #[test]
    fn cycle_scores_gates_and_records_every_symbol() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(&dir);

        let mut input = CycleInput {
            regime: Regime::RiskOn,
            ..Default::default()
        };
        input.symbols.insert("NVDA".to_string(), strong_record());
        input.symbols.insert("TSLA".to_string(), RawRecord::new());

        let report = engine.run_cycle(&input);
        assert_eq!(report.decisions.len(), 2);

        let nvda = report.decisions.iter().find(|d| d.symbol == "NVDA").unwrap();
        let tsla = report.decisions.iter().find(|d| d.symbol == "TSLA").unwrap();
        assert!(nvda.approved());
        assert!(!tsla.approved());
        assert_eq!(tsla.reason, crate::gate::REASON_SCORE_FLOOR);

        // Both decisions landed in the attribution log.
        let log = std::fs::read_to_string(dir.path().join("attribution.jsonl")).unwrap();
        assert_eq!(log.lines().count(), 2);
    }

    #[test]
    fn cycle_requests_exits_for_open_positions() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(&dir);

        let position = Position {
            id: "pos-1".to_string(),
            decision_id: "d-0".to_string(),
            symbol: "TSLA".to_string(),
            side: Direction::Long,
            strategy: StrategyKind::Wheel,
            state: PositionState::Open,
            entry_price: 250.0,
            entry_ts: Utc::now(),
            entry_score: 3.0,
            days_to_expiry: Some(2.0),
            premium_captured: Some(0.1),
        };

        let input = CycleInput {
            regime: Regime::Mixed,
            positions: vec![position],
            ..Default::default()
        };

        let report = engine.run_cycle(&input);
        assert_eq!(report.exit_events.len(), 1);
        assert_eq!(report.exit_events[0].reason, "expiry_close");

        let log = std::fs::read_to_string(dir.path().join("attribution.jsonl")).unwrap();
        assert_eq!(log.lines().count(), 1);
    }

    #[test]
    fn one_symbol_with_junk_data_does_not_poison_the_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(&dir);

        let junk: RawRecord = [
            ("flow_score", json!("total garbage")),
            ("gex", json!({"oops": []})),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        let mut input = CycleInput {
            regime: Regime::RiskOff,
            ..Default::default()
        };
        input.symbols.insert("AMD".to_string(), junk);
        input.symbols.insert("NVDA".to_string(), strong_record());

        let report = engine.run_cycle(&input);
        assert_eq!(report.decisions.len(), 2);
        let junk_decision = report.decisions.iter().find(|d| d.symbol == "AMD").unwrap();
        assert_eq!(junk_decision.score, 0.0);
    }

    #[test]
    fn snapshot_symbols_outside_the_configured_universe_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = EngineConfig::default();
        config.symbols = vec!["NVDA".to_string()];
        let store = Arc::new(WeightStore::load(
            dir.path().join("weights.json"),
            config.weights.bounds(),
        ));
        let recorder = Arc::new(AttributionRecorder::new(dir.path().join("attribution.jsonl")));
        let engine = EvaluationEngine::new(config, store, recorder);

        let mut input = CycleInput {
            regime: Regime::RiskOn,
            ..Default::default()
        };
        input.symbols.insert("NVDA".to_string(), strong_record());
        input.symbols.insert("DOGE".to_string(), strong_record());

        let report = engine.run_cycle(&input);
        assert_eq!(report.decisions.len(), 1);
        assert_eq!(report.decisions[0].symbol, "NVDA");
    }

    #[test]
    fn snapshot_deserializes_from_collaborator_json() {
        let raw = r#"{
            "regime": "risk_on",
            "symbols": { "SPY": { "flow_score": 12.5 } },
            "prices": { "SPY": 512.0 },
            "capacity_reached": false
        }"#;
        let input: CycleInput = serde_json::from_str(raw).unwrap();
        assert_eq!(input.regime, Regime::RiskOn);
        assert!(input.symbols.contains_key("SPY"));
    }

    #[test]
    fn unknown_regime_label_fails_at_snapshot_load() {
        let raw = r#"{ "regime": "sideways_crab", "symbols": {} }"#;
        assert!(serde_json::from_str::<CycleInput>(raw).is_err());
    }
}
