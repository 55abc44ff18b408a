// =============================================================================
// Signal components and normalization
// =============================================================================

pub mod component;
pub mod normalizer;

pub use component::SignalComponent;
pub use normalizer::{normalize, resolve_raw, Contribution};
