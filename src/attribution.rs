// =============================================================================
// Attribution Recorder — append-only, best-effort decision/outcome log
// =============================================================================
//
// Every gate decision and every exit event lands here as one JSONL line,
// carrying enough context (per-component contributions, store version,
// decision id) to later attribute realized P&L back to components.
//
// Hard contract: `record` never propagates a failure into the decision
// path. Any I/O or serialization failure is swallowed at this boundary,
// counted, and surfaced only through `health()`. A slow or failing disk may
// degrade future learning; it must never block or corrupt a present trading
// decision.
//
// The file is append-only: nothing here ever truncates or rewrites a prior
// record.
// =============================================================================

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::gate::GateDecision;
use crate::scoring::ComponentContribution;
use crate::signals::SignalComponent;
use crate::types::ExitEvent;

// =============================================================================
// Record types
// =============================================================================

/// One line in the attribution log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttributionRecord {
    Decision(DecisionRecord),
    Exit(ExitRecord),
}

/// A gate decision with the contributions exactly as scored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub ts: DateTime<Utc>,
    pub decision_id: String,
    pub symbol: String,
    pub direction: String,
    /// Weight-store version in force when the score was computed.
    pub composite_version: u64,
    pub decision: String,
    pub reason: String,
    pub overrides_applied: Vec<String>,
    pub score: f64,
    pub threshold_used: f64,
    /// Weighted contribution per present component.
    pub contributions: Vec<RecordedContribution>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedContribution {
    pub component: SignalComponent,
    pub weighted: f64,
}

/// An exit event; `pnl` is present once the execution layer confirms the
/// close, and only then does the record count as learning evidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExitRecord {
    pub ts: DateTime<Utc>,
    pub decision_id: String,
    pub position_id: String,
    pub symbol: String,
    pub reason: String,
    #[serde(default)]
    pub pnl: Option<f64>,
}

impl AttributionRecord {
    pub fn from_decision(
        decision: &GateDecision,
        composite_version: u64,
        contributions: &[ComponentContribution],
    ) -> Self {
        Self::Decision(DecisionRecord {
            ts: decision.created_at,
            decision_id: decision.id.clone(),
            symbol: decision.symbol.clone(),
            direction: decision.direction.to_string(),
            composite_version,
            decision: decision.decision.to_string(),
            reason: decision.reason.clone(),
            overrides_applied: decision.overrides_applied.clone(),
            score: decision.score,
            threshold_used: decision.threshold_used,
            contributions: contributions
                .iter()
                .map(|c| RecordedContribution {
                    component: c.component,
                    weighted: c.weighted,
                })
                .collect(),
        })
    }

    pub fn from_exit(event: &ExitEvent) -> Self {
        Self::Exit(ExitRecord {
            ts: event.ts,
            decision_id: event.decision_id.clone(),
            position_id: event.position_id.clone(),
            symbol: event.symbol.clone(),
            reason: event.reason.clone(),
            pnl: event.pnl,
        })
    }
}

// =============================================================================
// Recorder
// =============================================================================

/// Health counters surfaced on a side channel instead of errors.
#[derive(Debug, Clone, Serialize)]
pub struct RecorderHealth {
    pub records_written: u64,
    pub write_failures: u64,
    pub last_error: Option<String>,
}

pub struct AttributionRecorder {
    path: PathBuf,
    records_written: AtomicU64,
    write_failures: AtomicU64,
    last_error: Mutex<Option<String>>,
}

impl AttributionRecorder {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            records_written: AtomicU64::new(0),
            write_failures: AtomicU64::new(0),
            last_error: Mutex::new(None),
        }
    }

    /// Append one record. Infallible from the caller's point of view:
    /// failures are counted and logged, never returned.
    pub fn record(&self, record: &AttributionRecord) {
        if let Err(e) = self.try_append(record) {
            self.write_failures.fetch_add(1, Ordering::Relaxed);
            *self.last_error.lock() = Some(e.to_string());
            warn!(
                path = %self.path.display(),
                error = %e,
                failures = self.write_failures.load(Ordering::Relaxed),
                "attribution write failed — decision path continues"
            );
        } else {
            self.records_written.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn try_append(&self, record: &AttributionRecord) -> Result<()> {
        let line = serde_json::to_string(record).context("serialise attribution record")?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("create {}", parent.display()))?;
            }
        }

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("open {} for append", self.path.display()))?;

        // One write call for record + newline: the reader treats an
        // unterminated tail as an append in flight, so the tear window
        // must not span the terminator.
        file.write_all(format!("{line}\n").as_bytes())
            .with_context(|| format!("append to {}", self.path.display()))?;
        Ok(())
    }

    pub fn health(&self) -> RecorderHealth {
        RecorderHealth {
            records_written: self.records_written.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            last_error: self.last_error.lock().clone(),
        }
    }
}

// =============================================================================
// Reader — replay for the weight learner
// =============================================================================

/// A confirmed closed trade joined to the contributions that opened it.
#[derive(Debug, Clone)]
pub struct ClosedTrade {
    pub decision_id: String,
    pub symbol: String,
    pub pnl: f64,
}

/// Replay view of the log for one learner pass.
#[derive(Debug, Default)]
pub struct ReplayView {
    /// Contributions by decision id, built from *all* decision lines — the
    /// log is append-only and a decision may be long before its exit.
    pub contributions: HashMap<String, Vec<(SignalComponent, f64)>>,
    /// Confirmed exits that appear at or beyond the cursor line, in order.
    pub new_closed_trades: Vec<ClosedTrade>,
    /// Total line count after this scan — the next cursor position.
    pub lines_scanned: u64,
}

pub struct AttributionReader {
    path: PathBuf,
}

impl AttributionReader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Scan the log, collecting decision contributions from every line and
    /// confirmed exits from lines at index >= `cursor_lines`.
    ///
    /// A missing log is an empty view, not an error. Malformed mid-file
    /// lines are skipped with a warning; they still advance the cursor so a
    /// single bad line cannot wedge the learner forever.
    ///
    /// The recorder appends concurrently, so the *tail* is handled
    /// differently: an unterminated or unparseable final line may be an
    /// append in flight and is left unconsumed — `lines_scanned` stops at
    /// the last fully-terminated, decodable prefix and the next pass picks
    /// the line up once the write has landed.
    pub fn replay_from(&self, cursor_lines: u64) -> Result<ReplayView> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "attribution log missing — empty replay");
                return Ok(ReplayView::default());
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("open attribution log {}", self.path.display()))
            }
        };

        let mut view = ReplayView::default();
        let segments: Vec<&str> = content.split_inclusive('\n').collect();

        for (idx, segment) in segments.iter().enumerate() {
            if !segment.ends_with('\n') {
                debug!(line = idx, "unterminated final line — left for the next pass");
                break;
            }

            let line = segment.trim_end();
            if line.is_empty() {
                view.lines_scanned += 1;
                continue;
            }

            let record: AttributionRecord = match serde_json::from_str(line) {
                Ok(r) => r,
                Err(e) => {
                    if idx + 1 == segments.len() {
                        // Once later lines land behind it, the line is
                        // provably complete and gets skipped like any other
                        // malformed one.
                        debug!(line = idx, error = %e, "unparseable final line — left for the next pass");
                        break;
                    }
                    warn!(line = idx, error = %e, "skipping malformed attribution line");
                    view.lines_scanned += 1;
                    continue;
                }
            };
            view.lines_scanned += 1;

            match record {
                AttributionRecord::Decision(d) => {
                    view.contributions.insert(
                        d.decision_id,
                        d.contributions
                            .into_iter()
                            .map(|c| (c.component, c.weighted))
                            .collect(),
                    );
                }
                AttributionRecord::Exit(e) => {
                    if (idx as u64) < cursor_lines {
                        continue; // already consumed by a previous pass
                    }
                    if let Some(pnl) = e.pnl {
                        view.new_closed_trades.push(ClosedTrade {
                            decision_id: e.decision_id,
                            symbol: e.symbol,
                            pnl,
                        });
                    }
                }
            }
        }

        Ok(view)
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Direction;

    fn exit_event(decision_id: &str, pnl: Option<f64>) -> ExitEvent {
        ExitEvent {
            position_id: "pos-1".to_string(),
            decision_id: decision_id.to_string(),
            symbol: "NVDA".to_string(),
            reason: "premium_target_hit".to_string(),
            ts: Utc::now(),
            pnl,
        }
    }

    fn decision(id: &str) -> GateDecision {
        GateDecision {
            id: id.to_string(),
            symbol: "NVDA".to_string(),
            direction: Direction::Long,
            score: 3.0,
            threshold_used: 2.0,
            decision: crate::gate::GateVerdict::Approved,
            reason: String::new(),
            overrides_applied: Vec::new(),
            created_at: Utc::now(),
        }
    }

    fn contributions() -> Vec<ComponentContribution> {
        vec![ComponentContribution {
            component: SignalComponent::Momentum,
            normalized: 1.0,
            weight: 1.0,
            regime_modifier: 1.0,
            weighted: 1.0,
        }]
    }

    #[test]
    fn records_append_as_jsonl_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attribution.jsonl");
        let recorder = AttributionRecorder::new(&path);

        recorder.record(&AttributionRecord::from_decision(
            &decision("d-1"),
            3,
            &contributions(),
        ));
        recorder.record(&AttributionRecord::from_exit(&exit_event("d-1", Some(120.0))));

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);

        let health = recorder.health();
        assert_eq!(health.records_written, 2);
        assert_eq!(health.write_failures, 0);
        assert!(health.last_error.is_none());
    }

    #[test]
    fn write_failure_is_swallowed_and_counted() {
        let dir = tempfile::tempdir().unwrap();
        // The log path IS a directory: every append must fail.
        let recorder = AttributionRecorder::new(dir.path());

        recorder.record(&AttributionRecord::from_exit(&exit_event("d-1", Some(1.0))));
        recorder.record(&AttributionRecord::from_exit(&exit_event("d-2", Some(2.0))));

        let health = recorder.health();
        assert_eq!(health.records_written, 0);
        assert_eq!(health.write_failures, 2);
        assert!(health.last_error.is_some());
    }

    #[test]
    fn replay_joins_exits_to_decision_contributions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attribution.jsonl");
        let recorder = AttributionRecorder::new(&path);

        recorder.record(&AttributionRecord::from_decision(
            &decision("d-1"),
            1,
            &contributions(),
        ));
        recorder.record(&AttributionRecord::from_exit(&exit_event("d-1", Some(50.0))));

        let view = AttributionReader::new(&path).replay_from(0).unwrap();
        assert_eq!(view.lines_scanned, 2);
        assert_eq!(view.new_closed_trades.len(), 1);
        assert_eq!(view.new_closed_trades[0].decision_id, "d-1");
        assert!(view.contributions.contains_key("d-1"));
    }

    #[test]
    fn cursor_skips_consumed_exits_but_keeps_all_decisions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attribution.jsonl");
        let recorder = AttributionRecorder::new(&path);

        recorder.record(&AttributionRecord::from_decision(
            &decision("d-1"),
            1,
            &contributions(),
        ));
        recorder.record(&AttributionRecord::from_exit(&exit_event("d-1", Some(50.0))));

        // First pass consumed both lines; a later exit for an old decision
        // must still find the decision's contributions.
        recorder.record(&AttributionRecord::from_exit(&exit_event("d-1", Some(-20.0))));

        let view = AttributionReader::new(&path).replay_from(2).unwrap();
        assert_eq!(view.new_closed_trades.len(), 1);
        assert!((view.new_closed_trades[0].pnl + 20.0).abs() < f64::EPSILON);
        assert!(view.contributions.contains_key("d-1"));
    }

    #[test]
    fn unconfirmed_exits_are_not_learning_evidence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attribution.jsonl");
        let recorder = AttributionRecorder::new(&path);

        recorder.record(&AttributionRecord::from_exit(&exit_event("d-1", None)));

        let view = AttributionReader::new(&path).replay_from(0).unwrap();
        assert!(view.new_closed_trades.is_empty());
        assert_eq!(view.lines_scanned, 1);
    }

    #[test]
    fn missing_log_is_an_empty_view() {
        let dir = tempfile::tempdir().unwrap();
        let view = AttributionReader::new(dir.path().join("nope.jsonl"))
            .replay_from(0)
            .unwrap();
        assert_eq!(view.lines_scanned, 0);
        assert!(view.new_closed_trades.is_empty());
    }

    #[test]
    fn unterminated_tail_is_left_for_the_next_pass() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attribution.jsonl");
        let recorder = AttributionRecorder::new(&path);

        recorder.record(&AttributionRecord::from_decision(
            &decision("d-1"),
            1,
            &contributions(),
        ));
        recorder.record(&AttributionRecord::from_exit(&exit_event("d-1", Some(50.0))));

        // A concurrent append caught mid-write: valid prefix, no newline.
        let full = serde_json::to_string(&AttributionRecord::from_exit(&exit_event(
            "d-2",
            Some(9.0),
        )))
        .unwrap();
        let (head, tail) = full.split_at(10);
        {
            use std::io::Write;
            let mut f = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
            f.write_all(head.as_bytes()).unwrap();
        }

        let reader = AttributionReader::new(&path);
        let view = reader.replay_from(0).unwrap();
        assert_eq!(view.lines_scanned, 2);
        assert_eq!(view.new_closed_trades.len(), 1);

        // The write lands; the next pass consumes the completed line.
        {
            use std::io::Write;
            let mut f = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
            f.write_all(tail.as_bytes()).unwrap();
            f.write_all(b"\n").unwrap();
        }
        let view = reader.replay_from(view.lines_scanned).unwrap();
        assert_eq!(view.lines_scanned, 3);
        assert_eq!(view.new_closed_trades.len(), 1);
        assert_eq!(view.new_closed_trades[0].decision_id, "d-2");
    }

    #[test]
    fn unparseable_final_line_does_not_advance_the_cursor() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attribution.jsonl");
        let recorder = AttributionRecorder::new(&path);

        recorder.record(&AttributionRecord::from_exit(&exit_event("d-1", Some(10.0))));
        {
            use std::io::Write;
            let mut f = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
            f.write_all(b"not json\n").unwrap();
        }

        let reader = AttributionReader::new(&path);
        let view = reader.replay_from(0).unwrap();
        assert_eq!(view.lines_scanned, 1);

        // Another record lands behind the bad line: it is now provably
        // complete, gets skipped, and the new exit is consumed.
        recorder.record(&AttributionRecord::from_exit(&exit_event("d-2", Some(-5.0))));
        let view = reader.replay_from(view.lines_scanned).unwrap();
        assert_eq!(view.lines_scanned, 3);
        assert_eq!(view.new_closed_trades.len(), 1);
        assert_eq!(view.new_closed_trades[0].decision_id, "d-2");
    }

    #[test]
    fn malformed_line_is_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attribution.jsonl");
        std::fs::write(&path, "this is not json\n").unwrap();

        let recorder = AttributionRecorder::new(&path);
        recorder.record(&AttributionRecord::from_exit(&exit_event("d-1", Some(5.0))));

        let view = AttributionReader::new(&path).replay_from(0).unwrap();
        assert_eq!(view.lines_scanned, 2);
        assert_eq!(view.new_closed_trades.len(), 1);
    }
}
