// =============================================================================
// Shared types used across the Vantage composite engine
// =============================================================================

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Raw per-symbol signal snapshot as delivered by the upstream data
/// collaborators. Keys are source field names; values are whatever the
/// sources emit (numbers, numeric strings, occasionally junk).
pub type RawRecord = HashMap<String, serde_json::Value>;

/// Whether thresholds run at paper or live strictness. Affects gating only,
/// never scoring mechanics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountMode {
    Paper,
    Live,
}

impl Default for AccountMode {
    fn default() -> Self {
        Self::Paper
    }
}

impl std::fmt::Display for AccountMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Paper => write!(f, "Paper"),
            Self::Live => write!(f, "Live"),
        }
    }
}

/// Trade direction for a gate decision or open position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Long => write!(f, "LONG"),
            Self::Short => write!(f, "SHORT"),
        }
    }
}

/// Which exit policy governs a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrategyKind {
    /// Cash-secured put / covered call wheel — premium capture.
    Wheel,
    /// Directional equity swing.
    Swing,
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Wheel => write!(f, "wheel"),
            Self::Swing => write!(f, "swing"),
        }
    }
}

/// Lifecycle state of a position with respect to exit handling.
///
/// The engine only ever moves `Open → ExitRequested`; `Closed` is reached
/// when the external execution layer confirms the close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionState {
    Open,
    ExitRequested,
    Closed,
}

/// Snapshot of one open position, owned by the external trading runtime.
/// The exit policies read it and return a decision; they never mutate it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    /// Position identifier assigned by the trading runtime.
    pub id: String,

    /// Gate decision that opened this position (joins exits back to the
    /// attribution log).
    pub decision_id: String,

    pub symbol: String,
    pub side: Direction,
    pub strategy: StrategyKind,
    pub state: PositionState,

    pub entry_price: f64,
    pub entry_ts: DateTime<Utc>,

    /// Composite score at entry time.
    pub entry_score: f64,

    // --- Strategy-specific fields (wheel) ------------------------------------
    /// Calendar days until the short option expires.
    #[serde(default)]
    pub days_to_expiry: Option<f64>,

    /// Fraction of the collected premium already captured [0, 1].
    #[serde(default)]
    pub premium_captured: Option<f64>,
}

/// Emitted when an exit policy requests a close.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExitEvent {
    pub position_id: String,
    pub decision_id: String,
    pub symbol: String,

    /// Name of the exit predicate that fired (e.g. `expiry_close`).
    pub reason: String,

    pub ts: DateTime<Utc>,

    /// Realized P&L, filled in by the execution layer once the close is
    /// confirmed. `None` while the exit is merely requested.
    #[serde(default)]
    pub pnl: Option<f64>,
}
