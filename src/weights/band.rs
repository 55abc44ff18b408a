// =============================================================================
// Weight Band — bounded, learned trust level for one component
// =============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Hard clamp bounds plus the no-evidence weight, injected from config.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WeightBounds {
    pub min_weight: f64,
    pub max_weight: f64,
    pub neutral: f64,
}

impl Default for WeightBounds {
    fn default() -> Self {
        Self {
            min_weight: 0.25,
            max_weight: 2.5,
            neutral: 1.0,
        }
    }
}

/// Learned state for one component. `current` is the weight applied at
/// scoring time; only the weight learner (and explicit operator reset) ever
/// writes it, and it never leaves `[min_weight, max_weight]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightBand {
    pub min_weight: f64,
    pub max_weight: f64,
    pub neutral: f64,
    pub current: f64,

    /// Exponentially weighted realized performance, ~[0, 1], 0.5 = neutral.
    pub ewma_performance: f64,

    /// Attributed closed-trade count. Absent readings never increment this.
    pub sample_count: u64,
    pub wins: u64,
    pub losses: u64,
    pub total_pnl: f64,

    pub last_updated: DateTime<Utc>,
}

impl WeightBand {
    /// Fresh band with no learning evidence: `current` sits at neutral.
    pub fn fresh(bounds: WeightBounds) -> Self {
        Self {
            min_weight: bounds.min_weight,
            max_weight: bounds.max_weight,
            neutral: bounds.neutral,
            current: bounds.neutral,
            ewma_performance: 0.5,
            sample_count: 0,
            wins: 0,
            losses: 0,
            total_pnl: 0.0,
            last_updated: Utc::now(),
        }
    }

    /// Map `ewma_performance` onto the band and clamp. Above the 0.5 midline
    /// the excursion spans `neutral → max_weight`; below it spans
    /// `neutral → min_weight`.
    pub fn current_from_ewma(&self) -> f64 {
        let span = if self.ewma_performance >= 0.5 {
            self.max_weight - self.neutral
        } else {
            self.neutral - self.min_weight
        };
        let raw = self.neutral + (self.ewma_performance - 0.5) * 2.0 * span;
        raw.clamp(self.min_weight, self.max_weight)
    }

    /// True when the clamp invariant holds.
    pub fn is_consistent(&self) -> bool {
        self.min_weight <= self.current
            && self.current <= self.max_weight
            && self.min_weight <= self.neutral
            && self.neutral <= self.max_weight
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_band_is_neutral_and_consistent() {
        let band = WeightBand::fresh(WeightBounds::default());
        assert_eq!(band.current, 1.0);
        assert_eq!(band.ewma_performance, 0.5);
        assert_eq!(band.sample_count, 0);
        assert!(band.is_consistent());
    }

    #[test]
    fn ewma_midline_maps_to_neutral() {
        let band = WeightBand::fresh(WeightBounds::default());
        assert!((band.current_from_ewma() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn ewma_extremes_map_to_clamp_bounds() {
        let mut band = WeightBand::fresh(WeightBounds::default());

        band.ewma_performance = 1.0;
        assert!((band.current_from_ewma() - 2.5).abs() < 1e-12);

        band.ewma_performance = 0.0;
        assert!((band.current_from_ewma() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn current_never_leaves_bounds_for_any_ewma() {
        let mut band = WeightBand::fresh(WeightBounds::default());
        // Including out-of-range ewma values that a bad outcome stream could
        // only approach, never reach.
        for ewma in [-0.5, 0.0, 0.2, 0.49, 0.5, 0.51, 0.8, 1.0, 1.5] {
            band.ewma_performance = ewma;
            let current = band.current_from_ewma();
            assert!(current >= band.min_weight && current <= band.max_weight);
        }
    }

    #[test]
    fn asymmetric_bounds_use_correct_span() {
        let mut band = WeightBand::fresh(WeightBounds {
            min_weight: 0.5,
            max_weight: 3.0,
            neutral: 1.0,
        });

        // Halfway up: neutral + 0.5 * (max - neutral) = 2.0.
        band.ewma_performance = 0.75;
        assert!((band.current_from_ewma() - 2.0).abs() < 1e-12);

        // Halfway down: neutral - 0.5 * (neutral - min) = 0.75.
        band.ewma_performance = 0.25;
        assert!((band.current_from_ewma() - 0.75).abs() < 1e-12);
    }
}
