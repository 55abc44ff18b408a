// =============================================================================
// Weight Learner — realized outcomes back into weight bands
// =============================================================================
//
// Runs on its own cadence, slower than the decision cycle, as the store's
// single writer. Each pass replays the attribution log: confirmed exits
// beyond the durable line cursor are joined to their entry decision's
// contributions, and every component that contributed non-zero to the
// composite gets its band updated:
//
//   ewma    = α·outcome + (1−α)·ewma          (outcome: win 1, loss 0)
//   current = clamp(neutral + (ewma − 0.5)·2·span, min, max)
//
// where span is max−neutral above the midline and neutral−min below it.
//
// A component never referenced in a closed trade keeps `current` at
// neutral — absence of evidence is not poor performance. The optional
// decay-to-neutral rule is config-gated, time-bounded, and only ever moves
// a stale band toward neutral, a bounded step per pass.
// =============================================================================

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::attribution::AttributionReader;
use crate::weights::store::WeightStore;

/// Learning-rate and decay knobs, built from `config::WeightParams`.
#[derive(Debug, Clone)]
pub struct LearnerConfig {
    pub ewma_alpha: f64,
    pub enable_decay_to_neutral: bool,
    pub decay_after_days: f64,
    pub decay_step: f64,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self {
            ewma_alpha: 0.2,
            enable_decay_to_neutral: false,
            decay_after_days: 30.0,
            decay_step: 0.05,
        }
    }
}

/// Durable processing cursor: how many attribution-log lines previous
/// passes have consumed. Restart resumes here instead of reprocessing.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Cursor {
    #[serde(default)]
    lines_consumed: u64,
}

/// What one pass did, for logging and tests.
#[derive(Debug, Default, Clone)]
pub struct PassSummary {
    pub closed_trades: usize,
    pub components_updated: usize,
    pub bands_decayed: usize,
    pub cursor: u64,
}

pub struct WeightLearner {
    cursor_path: PathBuf,
    config: LearnerConfig,
}

impl WeightLearner {
    pub fn new(cursor_path: impl AsRef<Path>, config: LearnerConfig) -> Self {
        Self {
            cursor_path: cursor_path.as_ref().to_path_buf(),
            config,
        }
    }

    /// One learning pass: replay new confirmed exits, compute band updates,
    /// advance the durable cursor, then commit. Replaying with a correctly
    /// advanced cursor is a no-op, and a pass that cannot persist its cursor
    /// commits nothing.
    pub fn run_pass(&self, reader: &AttributionReader, store: &WeightStore) -> Result<PassSummary> {
        let cursor = self.load_cursor();
        let view = reader.replay_from(cursor.lines_consumed)?;

        let mut bands = store.all_bands();
        let mut touched: HashSet<crate::signals::SignalComponent> = HashSet::new();

        for trade in &view.new_closed_trades {
            let Some(contributions) = view.contributions.get(&trade.decision_id) else {
                debug!(
                    decision_id = %trade.decision_id,
                    symbol = %trade.symbol,
                    "exit has no matching decision record — skipping attribution"
                );
                continue;
            };

            // Win 1.0, loss 0.0; a scratch counts as a sample but moves the
            // EWMA toward neither side.
            let outcome = if trade.pnl > 0.0 {
                1.0
            } else if trade.pnl < 0.0 {
                0.0
            } else {
                0.5
            };

            for (component, weighted) in contributions {
                if *weighted == 0.0 {
                    continue;
                }
                let Some(band) = bands.get_mut(component) else {
                    continue;
                };

                band.sample_count += 1;
                if trade.pnl > 0.0 {
                    band.wins += 1;
                } else if trade.pnl < 0.0 {
                    band.losses += 1;
                }
                band.total_pnl += trade.pnl;
                band.ewma_performance = self.config.ewma_alpha * outcome
                    + (1.0 - self.config.ewma_alpha) * band.ewma_performance;
                band.current = band.current_from_ewma();
                band.last_updated = Utc::now();

                touched.insert(*component);
            }
        }

        // --- Optional, bounded decay toward neutral for stale bands ----------
        let mut decayed = 0usize;
        if self.config.enable_decay_to_neutral {
            let stale_before =
                Utc::now() - Duration::seconds((self.config.decay_after_days * 86_400.0) as i64);
            for (component, band) in bands.iter_mut() {
                if touched.contains(component) || band.last_updated > stale_before {
                    continue;
                }
                if (band.current - band.neutral).abs() < 1e-9 {
                    continue;
                }
                band.current += (band.neutral - band.current) * self.config.decay_step;
                band.current = band.current.clamp(band.min_weight, band.max_weight);
                touched.insert(*component);
                decayed += 1;
            }
        }

        let summary = PassSummary {
            closed_trades: view.new_closed_trades.len(),
            components_updated: touched.len(),
            bands_decayed: decayed,
            cursor: view.lines_scanned,
        };

        // The cursor goes durable before the bands: if it cannot be saved,
        // the pass fails without committing and the next pass re-reads the
        // same exits instead of double-applying them.
        self.save_cursor(&Cursor {
            lines_consumed: view.lines_scanned,
        })?;

        if !touched.is_empty() {
            let updated = bands
                .into_iter()
                .filter(|(c, _)| touched.contains(c))
                .collect();
            store.commit(updated);

            // Persistence failures are isolated: the in-memory update stands
            // and the next successful save catches up.
            if let Err(e) = store.save() {
                warn!(error = %e, "weight store save failed after learner pass");
            }
        }

        info!(
            closed_trades = summary.closed_trades,
            components_updated = summary.components_updated,
            bands_decayed = summary.bands_decayed,
            cursor = summary.cursor,
            "weight learner pass complete"
        );

        Ok(summary)
    }

    /// Operator action: forget the cursor so the next pass reprocesses the
    /// full log (after an explicit store reset, typically).
    pub fn reset_cursor(&self) -> Result<()> {
        self.save_cursor(&Cursor::default())
    }

    fn load_cursor(&self) -> Cursor {
        match std::fs::read_to_string(&self.cursor_path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!(
                    path = %self.cursor_path.display(),
                    error = %e,
                    "learner cursor corrupt — restarting from zero"
                );
                Cursor::default()
            }),
            Err(_) => Cursor::default(),
        }
    }

    fn save_cursor(&self, cursor: &Cursor) -> Result<()> {
        if let Some(parent) = self.cursor_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("create {}", parent.display()))?;
            }
        }
        let content = serde_json::to_string(cursor).context("serialise learner cursor")?;
        let tmp = self.cursor_path.with_extension("json.tmp");
        std::fs::write(&tmp, &content)
            .with_context(|| format!("write tmp cursor to {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.cursor_path)
            .with_context(|| format!("rename tmp cursor to {}", self.cursor_path.display()))?;
        Ok(())
    }
}
