// =============================================================================
// Engine error taxonomy
// =============================================================================
//
// Only configuration- and persistence-path failures are errors. A missing or
// unparseable raw signal value is *not* an error — it is an absent
// contribution handled inline by the normalizer. Attribution write failures
// never surface here either; they are counted on the recorder's health
// channel.
// =============================================================================

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// A regime label that is not part of the closed enumeration. This can
    /// only occur while parsing configuration or an inbound snapshot and is
    /// treated as a configuration bug: fail at startup validation, never at
    /// score time.
    #[error("unrecognized regime label: {0:?}")]
    RegimeUnrecognized(String),

    /// A single component's persisted weight band failed to deserialize.
    /// The store falls back to a default band for that component only.
    #[error("weight band for component {component:?} is corrupt: {detail}")]
    WeightStoreCorrupt { component: String, detail: String },

    /// Configuration file present but invalid.
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
