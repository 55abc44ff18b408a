// =============================================================================
// Vantage — adaptive composite signal scoring & weight-learning engine
// =============================================================================
//
// Closed-loop pipeline: normalize raw signal components → composite score →
// entry gate → (trade lifecycle) → exit policies → attribution log → weight
// learner → weight store → next cycle's scoring. Learning and logging are
// deliberately decoupled from the decision path: a failing disk degrades
// future learning, never a present decision.
// =============================================================================

pub mod attribution;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exit;
pub mod gate;
pub mod regime;
pub mod scoring;
pub mod signals;
pub mod types;
pub mod weights;
