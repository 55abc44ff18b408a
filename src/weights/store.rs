// =============================================================================
// Weight Store — persisted component-weight bands with atomic save
// =============================================================================
//
// Single source of truth for how much each component is trusted. Single
// writer: only the weight learner (and explicit operator reset) mutates
// bands. Scorers take an immutable per-cycle snapshot and never see a
// half-applied update.
//
// Persistence uses the tmp + rename pattern so a crash never leaves a
// partially written store. An unavailable or corrupt store must never stop
// trading: missing components initialize to neutral defaults, corrupt
// entries fall back individually, and both are logged loudly.
// =============================================================================

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::EngineError;
use crate::signals::SignalComponent;
use crate::weights::band::{WeightBand, WeightBounds};

/// Immutable per-cycle view of current weights, cheap to clone across
/// parallel symbol evaluations.
pub type WeightSnapshot = Arc<HashMap<SignalComponent, f64>>;

/// On-disk layout. Bands are keyed by stable component name; values are kept
/// loose so one corrupt entry cannot poison the rest of the file.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedStore {
    #[serde(default)]
    version: u64,
    #[serde(default)]
    bands: HashMap<String, serde_json::Value>,
}

struct StoreInner {
    bands: HashMap<SignalComponent, WeightBand>,
    /// Incremented on every committed learner pass; stamped into attribution
    /// records as `composite_version`.
    version: u64,
}

pub struct WeightStore {
    path: PathBuf,
    bounds: WeightBounds,
    inner: RwLock<StoreInner>,
}

impl WeightStore {
    /// Load the store from `path`, default-initializing every canonical
    /// component that is missing or corrupt. Never fails the startup path:
    /// a completely unavailable store yields all defaults plus a warning.
    pub fn load(path: impl AsRef<Path>, bounds: WeightBounds) -> Self {
        let path = path.as_ref().to_path_buf();

        let persisted = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<PersistedStore>(&content) {
                Ok(p) => Some(p),
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "weight store unparseable — ALL components fall back to defaults"
                    );
                    None
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(
                    path = %path.display(),
                    "weight store missing — initializing all components at neutral defaults"
                );
                None
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "weight store unreadable — ALL components fall back to defaults"
                );
                None
            }
        };

        let mut bands = HashMap::with_capacity(SignalComponent::ALL.len());
        let mut recovered = 0usize;
        let mut corrupt = 0usize;

        for component in SignalComponent::ALL {
            let band = persisted
                .as_ref()
                .and_then(|p| p.bands.get(component.name()))
                .and_then(|value| {
                    match serde_json::from_value::<WeightBand>(value.clone()) {
                        Ok(band) if band.is_consistent() => {
                            recovered += 1;
                            Some(band)
                        }
                        Ok(_) => {
                            corrupt += 1;
                            warn!(
                                component = %component,
                                "weight band violates clamp invariant — resetting to defaults"
                            );
                            None
                        }
                        Err(e) => {
                            corrupt += 1;
                            let err = EngineError::WeightStoreCorrupt {
                                component: component.name().to_string(),
                                detail: e.to_string(),
                            };
                            warn!(error = %err, "resetting component to defaults");
                            None
                        }
                    }
                })
                .unwrap_or_else(|| WeightBand::fresh(bounds));

            bands.insert(component, band);
        }

        let version = persisted.map(|p| p.version).unwrap_or(0);

        info!(
            path = %path.display(),
            components = bands.len(),
            recovered,
            corrupt,
            version,
            "weight store loaded"
        );

        Self {
            path,
            bounds,
            inner: RwLock::new(StoreInner { bands, version }),
        }
    }

    /// Persist atomically (tmp + rename).
    pub fn save(&self) -> Result<()> {
        let persisted = {
            let inner = self.inner.read();
            PersistedStore {
                version: inner.version,
                bands: inner
                    .bands
                    .iter()
                    .map(|(c, b)| {
                        (
                            c.name().to_string(),
                            serde_json::to_value(b).unwrap_or(serde_json::Value::Null),
                        )
                    })
                    .collect(),
            }
        };

        let content = serde_json::to_string_pretty(&persisted)
            .context("failed to serialise weight store")?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("create {}", parent.display()))?;
            }
        }

        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp store to {}", tmp_path.display()))?;
        std::fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("failed to rename tmp store to {}", self.path.display()))?;

        Ok(())
    }

    /// Immutable snapshot of current weights for one evaluation cycle.
    pub fn snapshot(&self) -> WeightSnapshot {
        let inner = self.inner.read();
        Arc::new(
            inner
                .bands
                .iter()
                .map(|(c, b)| (*c, b.current))
                .collect(),
        )
    }

    /// Copy of one component's band.
    pub fn band(&self, component: SignalComponent) -> WeightBand {
        self.inner
            .read()
            .bands
            .get(&component)
            .cloned()
            .unwrap_or_else(|| WeightBand::fresh(self.bounds))
    }

    /// Copy of every band, for reporting.
    pub fn all_bands(&self) -> HashMap<SignalComponent, WeightBand> {
        self.inner.read().bands.clone()
    }

    /// Store version stamped into attribution records.
    pub fn version(&self) -> u64 {
        self.inner.read().version
    }

    /// Apply a learner pass: replace the updated bands and bump the version.
    /// This is the only mutation path besides `reset`; callers are the weight
    /// learner, on its own cadence.
    pub fn commit(&self, updated: HashMap<SignalComponent, WeightBand>) {
        let mut inner = self.inner.write();
        for (component, band) in updated {
            debug_assert!(band.is_consistent());
            inner.bands.insert(component, band);
        }
        inner.version += 1;
    }

    /// Operator action: return one component's band to neutral defaults.
    pub fn reset(&self, component: SignalComponent) {
        let bounds = self.bounds;
        let mut inner = self.inner.write();
        inner.bands.insert(component, WeightBand::fresh(bounds));
        inner.version += 1;
        info!(component = %component, "weight band reset to defaults");
    }
}
