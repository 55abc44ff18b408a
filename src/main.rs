// =============================================================================
// Vantage Composite Nexus — Main Entry Point
// =============================================================================
//
// Wires the engine together and drives it on two cadences: the decision
// cycle (score → gate → exit checks, every cycle_interval_secs) and the
// slower weight-learner pass. Inbound data arrives as a pre-fetched snapshot
// file maintained by the external data collaborators; a missing or stale
// snapshot skips the cycle, it never crashes it.
//
// The engine starts in Paper mode for safety; Live mode is a config change.
// =============================================================================

use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use vantage_engine::attribution::{AttributionReader, AttributionRecorder};
use vantage_engine::config::EngineConfig;
use vantage_engine::engine::{CycleInput, EvaluationEngine};
use vantage_engine::scoring::validate_modifier_table;
use vantage_engine::types::AccountMode;
use vantage_engine::weights::{LearnerConfig, WeightLearner, WeightStore};

const CONFIG_PATH: &str = "engine_config.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║        Vantage Composite Nexus — Starting Up            ║");
    info!("╚══════════════════════════════════════════════════════════╝");

    let mut config = EngineConfig::load(CONFIG_PATH).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        EngineConfig::default()
    });

    // SAFETY: force Paper mode on startup; Live is an explicit operator step.
    config.account_mode = AccountMode::Paper;

    // Override symbols from env if available.
    if let Ok(syms) = std::env::var("VANTAGE_SYMBOLS") {
        config.symbols = syms
            .split(',')
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect();
    }

    info!(
        symbols = ?config.symbols,
        account_mode = %config.account_mode,
        "Engine starting in SAFE mode (Paper)"
    );

    // ── 2. Startup validation ────────────────────────────────────────────
    // A regime/component pair without a sane modifier is a configuration
    // bug; refuse to start rather than mis-score later.
    validate_modifier_table()?;

    // ── 3. Persistent state ──────────────────────────────────────────────
    // A missing or corrupt store must not prevent trading: load falls back
    // to neutral defaults per component and logs loudly.
    let store = Arc::new(WeightStore::load(
        &config.weight_store_path,
        config.weights.bounds(),
    ));

    let recorder = Arc::new(AttributionRecorder::new(&config.attribution_log_path));
    let reader = AttributionReader::new(&config.attribution_log_path);

    let learner = WeightLearner::new(
        &config.learner_cursor_path,
        LearnerConfig {
            ewma_alpha: config.weights.ewma_alpha,
            enable_decay_to_neutral: config.weights.enable_decay_to_neutral,
            decay_after_days: config.weights.decay_after_days,
            decay_step: config.weights.decay_step,
        },
    );

    let engine = EvaluationEngine::new(config.clone(), store.clone(), recorder.clone());

    // ── 4. Decision cycle loop ───────────────────────────────────────────
    let snapshot_path = config.snapshot_path.clone();
    let cycle_secs = config.cycle_interval_secs;
    let cycle_recorder = recorder.clone();
    tokio::spawn(async move {
        let mut ticker =
            tokio::time::interval(tokio::time::Duration::from_secs(cycle_secs.max(1)));
        loop {
            ticker.tick().await;

            let input = match std::fs::read_to_string(&snapshot_path) {
                Ok(content) => match serde_json::from_str::<CycleInput>(&content) {
                    Ok(input) => input,
                    Err(e) => {
                        // Includes an unrecognized regime label — a
                        // collaborator bug, surfaced loudly, cycle skipped.
                        error!(path = %snapshot_path, error = %e, "cycle snapshot unparseable — skipping cycle");
                        continue;
                    }
                },
                Err(e) => {
                    warn!(path = %snapshot_path, error = %e, "cycle snapshot unavailable — skipping cycle");
                    continue;
                }
            };

            let report = engine.run_cycle(&input);

            let health = cycle_recorder.health();
            if health.write_failures > 0 {
                warn!(
                    failures = health.write_failures,
                    last_error = ?health.last_error,
                    "attribution writes degraded — learning will lag, trading unaffected"
                );
            }

            for event in &report.exit_events {
                info!(
                    position_id = %event.position_id,
                    symbol = %event.symbol,
                    reason = %event.reason,
                    "exit handed to execution layer"
                );
            }
        }
    });

    // ── 5. Weight learner loop (slower cadence) ──────────────────────────
    let learner_secs = config.learner_interval_secs;
    let learner_store = store.clone();
    tokio::spawn(async move {
        let mut ticker =
            tokio::time::interval(tokio::time::Duration::from_secs(learner_secs.max(1)));
        // First tick fires immediately; skip it so the first pass runs a
        // full interval after startup.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match learner.run_pass(&reader, &learner_store) {
                Ok(summary) => {
                    if summary.closed_trades > 0 {
                        info!(
                            closed_trades = summary.closed_trades,
                            components_updated = summary.components_updated,
                            "weights adapted from realized outcomes"
                        );
                    }
                }
                Err(e) => error!(error = %e, "weight learner pass failed"),
            }
        }
    });

    info!("All subsystems running. Press Ctrl+C to stop.");

    // ── 6. Graceful shutdown ─────────────────────────────────────────────
    tokio::signal::ctrl_c().await?;
    warn!("Shutdown signal received — stopping gracefully");

    if let Err(e) = store.save() {
        error!(error = %e, "Failed to save weight store on shutdown");
    }
    if let Err(e) = config.save(CONFIG_PATH) {
        error!(error = %e, "Failed to save engine config on shutdown");
    }

    info!("Vantage Composite Nexus shut down complete.");
    Ok(())
}
