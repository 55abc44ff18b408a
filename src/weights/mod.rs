// =============================================================================
// Learned per-component trust weights
// =============================================================================

pub mod band;
pub mod learner;
pub mod store;

pub use band::{WeightBand, WeightBounds};
pub use learner::{LearnerConfig, WeightLearner};
pub use store::{WeightSnapshot, WeightStore};
