// =============================================================================
// Exit Policy State Machine
// =============================================================================
//
// Each strategy defines its exit policy as a pure predicate over (position,
// market context). Policies are total: any well-formed position gets a
// decision, never a panic — missing context data reads as "no exit", the
// safe default.
//
// The state machine is deliberately small: `Open → ExitRequested` is the
// only transition this engine performs. `Closed` is reached when the
// external execution layer confirms the close; the predicate requests an
// exit, it does not force one, and it never mutates position state.
// =============================================================================

pub mod swing;
pub mod wheel;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::types::{ExitEvent, Position, PositionState};

pub use swing::SwingExitPolicy;
pub use wheel::WheelExitPolicy;

/// Pre-fetched market snapshot the policies read. Prices and scores may be
/// missing for any symbol; policies treat that as data unavailable.
#[derive(Debug, Clone, Default)]
pub struct MarketContext {
    /// Last price per symbol.
    pub prices: HashMap<String, f64>,
    /// Current-cycle composite score per symbol.
    pub scores: HashMap<String, f64>,
    pub now: DateTime<Utc>,
}

/// A requested exit with the name of the predicate that fired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitRequest {
    pub reason: String,
}

impl ExitRequest {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Strategy-specific exit predicate. First matching condition wins, in a
/// deterministic priority order defined by each implementation.
pub trait ExitPolicy {
    fn should_exit(&self, position: &Position, ctx: &MarketContext) -> Option<ExitRequest>;
}

/// Dispatches each position to its strategy's policy once per cycle.
pub struct ExitEvaluator {
    wheel: WheelExitPolicy,
    swing: SwingExitPolicy,
}

impl ExitEvaluator {
    pub fn new(wheel: WheelExitPolicy, swing: SwingExitPolicy) -> Self {
        Self { wheel, swing }
    }

    /// Evaluate every open position; emit an exit event for each requested
    /// exit. Positions already in `ExitRequested` or `Closed` are skipped —
    /// the request was made, the rest is up to the execution layer.
    pub fn evaluate(&self, positions: &[Position], ctx: &MarketContext) -> Vec<ExitEvent> {
        let mut events = Vec::new();

        for position in positions {
            if position.state != PositionState::Open {
                continue;
            }

            let policy: &dyn ExitPolicy = match position.strategy {
                crate::types::StrategyKind::Wheel => &self.wheel,
                crate::types::StrategyKind::Swing => &self.swing,
            };

            if let Some(request) = policy.should_exit(position, ctx) {
                info!(
                    position_id = %position.id,
                    symbol = %position.symbol,
                    strategy = %position.strategy,
                    reason = %request.reason,
                    "exit requested"
                );
                events.push(ExitEvent {
                    position_id: position.id.clone(),
                    decision_id: position.decision_id.clone(),
                    symbol: position.symbol.clone(),
                    reason: request.reason,
                    ts: ctx.now,
                    pnl: None,
                });
            }
        }

        events
    }
}
