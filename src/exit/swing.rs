// =============================================================================
// Swing Exit Policy — directional position close predicates
// =============================================================================
//
// For directional swing positions, checked in strict priority order, first
// match wins:
//
//   1. stop_loss      — adverse move beyond the stop percentage.
//   2. profit_target  — favourable move beyond the target percentage.
//   3. time_stop      — held past the maximum holding period.
//   4. score_decay    — the composite score that justified the entry has
//                       collapsed; the thesis is gone even if price has not
//                       moved much yet.
// =============================================================================

use crate::config::SwingParams;
use crate::exit::{ExitPolicy, ExitRequest, MarketContext};
use crate::types::{Direction, Position};

pub const REASON_STOP_LOSS: &str = "stop_loss";
pub const REASON_PROFIT_TARGET: &str = "profit_target";
pub const REASON_TIME_STOP: &str = "time_stop";
pub const REASON_SCORE_DECAY: &str = "score_decay";

pub struct SwingExitPolicy {
    params: SwingParams,
}

impl SwingExitPolicy {
    pub fn new(params: SwingParams) -> Self {
        Self { params }
    }

    /// Signed move in the position's favour, as a percentage of entry.
    fn favourable_move_pct(&self, position: &Position, price: f64) -> Option<f64> {
        if position.entry_price <= 0.0 {
            return None;
        }
        let raw = (price - position.entry_price) / position.entry_price * 100.0;
        Some(match position.side {
            Direction::Long => raw,
            Direction::Short => -raw,
        })
    }
}

impl ExitPolicy for SwingExitPolicy {
    fn should_exit(&self, position: &Position, ctx: &MarketContext) -> Option<ExitRequest> {
        let price = ctx.prices.get(&position.symbol).copied();

        // 1 & 2. Price barriers, only when a price is available.
        if let Some(move_pct) = price.and_then(|p| self.favourable_move_pct(position, p)) {
            if move_pct <= -self.params.stop_loss_pct {
                return Some(ExitRequest::new(REASON_STOP_LOSS));
            }
            if move_pct >= self.params.profit_target_pct {
                return Some(ExitRequest::new(REASON_PROFIT_TARGET));
            }
        }

        // 3. Time stop.
        let held_days = (ctx.now - position.entry_ts).num_seconds() as f64 / 86_400.0;
        if held_days >= self.params.max_holding_days {
            return Some(ExitRequest::new(REASON_TIME_STOP));
        }

        // 4. Score decay: only meaningful for positive entry scores.
        if position.entry_score > 0.0 {
            if let Some(current) = ctx.scores.get(&position.symbol) {
                if *current < position.entry_score * self.params.score_decay_floor {
                    return Some(ExitRequest::new(REASON_SCORE_DECAY));
                }
            }
        }

        None
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PositionState, StrategyKind};
    use chrono::{Duration, Utc};

    fn swing_position() -> Position {
        Position {
            id: "pos-2".to_string(),
            decision_id: "d-2".to_string(),
            symbol: "AMD".to_string(),
            side: Direction::Long,
            strategy: StrategyKind::Swing,
            state: PositionState::Open,
            entry_price: 200.0,
            entry_ts: Utc::now(),
            entry_score: 4.0,
            days_to_expiry: None,
            premium_captured: None,
        }
    }

    fn policy() -> SwingExitPolicy {
        SwingExitPolicy::new(SwingParams::default())
    }

    fn ctx_with_price(price: f64) -> MarketContext {
        let mut ctx = MarketContext {
            now: Utc::now(),
            ..Default::default()
        };
        ctx.prices.insert("AMD".to_string(), price);
        ctx
    }

    #[test]
    fn stop_loss_fires_on_adverse_move() {
        let pos = swing_position();
        let request = policy().should_exit(&pos, &ctx_with_price(184.0)).unwrap(); // -8%
        assert_eq!(request.reason, REASON_STOP_LOSS);
    }

    #[test]
    fn profit_target_fires_on_favourable_move() {
        let pos = swing_position();
        let request = policy().should_exit(&pos, &ctx_with_price(232.0)).unwrap(); // +16%
        assert_eq!(request.reason, REASON_PROFIT_TARGET);
    }

    #[test]
    fn short_side_inverts_the_barriers() {
        let mut pos = swing_position();
        pos.side = Direction::Short;

        // Price falling is favourable for a short.
        let request = policy().should_exit(&pos, &ctx_with_price(168.0)).unwrap(); // -16%
        assert_eq!(request.reason, REASON_PROFIT_TARGET);

        let request = policy().should_exit(&pos, &ctx_with_price(216.0)).unwrap(); // +8%
        assert_eq!(request.reason, REASON_STOP_LOSS);
    }

    #[test]
    fn time_stop_fires_after_max_holding_days() {
        let mut pos = swing_position();
        pos.entry_ts = Utc::now() - Duration::days(25);

        let request = policy().should_exit(&pos, &ctx_with_price(201.0)).unwrap();
        assert_eq!(request.reason, REASON_TIME_STOP);
    }

    #[test]
    fn score_decay_fires_when_thesis_collapses() {
        let pos = swing_position(); // entry score 4.0, floor 0.25 → exit below 1.0
        let mut ctx = ctx_with_price(202.0);
        ctx.scores.insert("AMD".to_string(), 0.5);

        let request = policy().should_exit(&pos, &ctx).unwrap();
        assert_eq!(request.reason, REASON_SCORE_DECAY);
    }

    #[test]
    fn holds_inside_all_barriers() {
        let pos = swing_position();
        let mut ctx = ctx_with_price(205.0); // +2.5%
        ctx.scores.insert("AMD".to_string(), 3.5);

        assert!(policy().should_exit(&pos, &ctx).is_none());
    }

    #[test]
    fn stop_loss_has_priority_over_time_stop() {
        let mut pos = swing_position();
        pos.entry_ts = Utc::now() - Duration::days(40);

        let request = policy().should_exit(&pos, &ctx_with_price(180.0)).unwrap(); // -10%
        assert_eq!(request.reason, REASON_STOP_LOSS);
    }

    #[test]
    fn missing_price_is_not_an_exit() {
        let pos = swing_position();
        let ctx = MarketContext {
            now: Utc::now(),
            ..Default::default()
        };
        assert!(policy().should_exit(&pos, &ctx).is_none());
    }
}
