// =============================================================================
// Wheel Exit Policy — premium-capture close predicates
// =============================================================================
//
// For wheel positions (short puts / covered calls), checked in strict
// priority order, first match wins:
//
//   1. expiry_close        — too few days to expiry; never ride into
//                            assignment week.
//   2. premium_target_hit  — enough of the premium is captured; decay has
//                            done its job.
//   3. strike_breach       — the underlying moved through the reference
//                            strike by more than the breach threshold.
// =============================================================================

use crate::config::WheelParams;
use crate::exit::{ExitPolicy, ExitRequest, MarketContext};
use crate::types::{Direction, Position};

pub const REASON_EXPIRY_CLOSE: &str = "expiry_close";
pub const REASON_PREMIUM_TARGET: &str = "premium_target_hit";
pub const REASON_STRIKE_BREACH: &str = "strike_breach";

pub struct WheelExitPolicy {
    params: WheelParams,
}

impl WheelExitPolicy {
    pub fn new(params: WheelParams) -> Self {
        Self { params }
    }
}

impl ExitPolicy for WheelExitPolicy {
    fn should_exit(&self, position: &Position, ctx: &MarketContext) -> Option<ExitRequest> {
        // 1. Expiry window — fires regardless of any other field.
        if let Some(dte) = position.days_to_expiry {
            if dte <= self.params.dte_close_threshold {
                return Some(ExitRequest::new(REASON_EXPIRY_CLOSE));
            }
        }

        // 2. Premium capture target.
        if let Some(captured) = position.premium_captured {
            if captured >= self.params.premium_target {
                return Some(ExitRequest::new(REASON_PREMIUM_TARGET));
            }
        }

        // 3. Strike breach. Price unavailable reads as no breach.
        if let Some(price) = ctx.prices.get(&position.symbol) {
            if position.entry_price > 0.0 {
                let breach_frac = self.params.breach_exit_pct / 100.0;
                let breached = match position.side {
                    // Short put exposure: underlying falling through the
                    // strike is the risk.
                    Direction::Long => *price < position.entry_price * (1.0 - breach_frac),
                    // Covered-call side: underlying ripping through it.
                    Direction::Short => *price > position.entry_price * (1.0 + breach_frac),
                };
                if breached {
                    return Some(ExitRequest::new(REASON_STRIKE_BREACH));
                }
            }
        }

        None
    }
}
