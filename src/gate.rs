// =============================================================================
// Entry Gate — composite score to approve/block decision
// =============================================================================
//
// Base rule: approved iff score >= threshold(mode, regime). Override rules
// run before a block can finalize: a high-confidence UW quality reading
// waives the score floor, and a challenger's survivorship score waives a
// displacement block. Overrides are independent and cumulative — several may
// fire in one decision.
//
// The gate persists nothing; every decision (approved or blocked) is handed
// to the attribution recorder by the engine.
// =============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::GateParams;
use crate::scoring::CompositeResult;
use crate::types::{AccountMode, Direction};

/// Blocker reason names, stable across the attribution log.
pub const REASON_SCORE_FLOOR: &str = "score_floor_breach";
pub const REASON_DISPLACEMENT: &str = "displacement_block";

/// Override names recorded when a blocker is waived.
pub const OVERRIDE_UW_QUALITY: &str = "uw_quality_bypass";
pub const OVERRIDE_SURVIVORSHIP: &str = "survivorship_bypass";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateVerdict {
    Approved,
    Blocked,
}

impl std::fmt::Display for GateVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Approved => write!(f, "APPROVED"),
            Self::Blocked => write!(f, "BLOCKED"),
        }
    }
}

/// Context the gate needs beyond the composite result. All values are
/// pre-fetched snapshots; the gate never blocks on I/O.
#[derive(Debug, Clone, Default)]
pub struct GateContext {
    pub mode: AccountMode,

    /// Raw UW-style quality grade [0, 100] for the bypass rule, if the
    /// source reported one this cycle.
    pub uw_quality_raw: Option<f64>,

    /// True when opening this position would displace an existing one
    /// (capacity reached), which blocks unless the challenger survives.
    pub displacement_blocked: bool,

    /// Challenger survivorship score [0, 1] for the displacement bypass.
    pub challenger_survivorship: Option<f64>,
}

/// Append-only record of one approve/block decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateDecision {
    /// UUID v4, joins the entry to its eventual exit in the attribution log.
    pub id: String,
    pub symbol: String,
    pub direction: Direction,
    pub score: f64,
    pub threshold_used: f64,
    pub decision: GateVerdict,
    /// First unwaived blocker, or empty when approved.
    pub reason: String,
    /// Every override that fired, even when another blocker still blocks.
    pub overrides_applied: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl GateDecision {
    pub fn approved(&self) -> bool {
        self.decision == GateVerdict::Approved
    }
}

/// Decide whether a candidate entry passes the gate.
pub fn decide(
    composite: &CompositeResult,
    direction: Direction,
    ctx: &GateContext,
    params: &GateParams,
) -> GateDecision {
    let threshold = params.threshold(ctx.mode, composite.regime);

    let mut blockers: Vec<&str> = Vec::new();
    let mut overrides: Vec<String> = Vec::new();

    // --- Base rule: score floor ---------------------------------------------
    if composite.score < threshold {
        let waived = ctx
            .uw_quality_raw
            .map(|q| q >= params.uw_quality_bypass)
            .unwrap_or(false);
        if waived {
            overrides.push(OVERRIDE_UW_QUALITY.to_string());
        } else {
            blockers.push(REASON_SCORE_FLOOR);
        }
    }

    // --- Displacement block -------------------------------------------------
    if ctx.displacement_blocked {
        let waived = ctx
            .challenger_survivorship
            .map(|s| s >= params.survivorship_bypass)
            .unwrap_or(false);
        if waived {
            overrides.push(OVERRIDE_SURVIVORSHIP.to_string());
        } else {
            blockers.push(REASON_DISPLACEMENT);
        }
    }

    let (verdict, reason) = match blockers.first() {
        Some(first) => (GateVerdict::Blocked, first.to_string()),
        None => (GateVerdict::Approved, String::new()),
    };

    debug!(
        symbol = %composite.symbol,
        direction = %direction,
        score = format!("{:.4}", composite.score),
        threshold = format!("{:.4}", threshold),
        verdict = %verdict,
        reason = %reason,
        overrides = ?overrides,
        "gate decision"
    );

    GateDecision {
        id: uuid::Uuid::new_v4().to_string(),
        symbol: composite.symbol.clone(),
        direction,
        score: composite.score,
        threshold_used: threshold,
        decision: verdict,
        reason,
        overrides_applied: overrides,
        created_at: Utc::now(),
    }
}
