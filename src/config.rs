// =============================================================================
// Engine Configuration — injected thresholds with atomic save
// =============================================================================
//
// Every tunable the engine consumes lives here: score floors, bypass
// thresholds, clamp bounds, learning rate, exit parameters, file paths.
// Operators tune these without a rebuild; the engine never embeds the
// numeric literals itself.
//
// Persistence uses the atomic tmp + rename pattern to prevent corruption on
// crash. All fields carry `#[serde(default)]` so that adding new fields
// never breaks loading an older config file.
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::regime::Regime;
use crate::types::AccountMode;
use crate::weights::WeightBounds;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_symbols() -> Vec<String> {
    vec![
        "SPY".to_string(),
        "NVDA".to_string(),
        "TSLA".to_string(),
        "AMD".to_string(),
        "PLTR".to_string(),
    ]
}

fn default_cycle_interval_secs() -> u64 {
    60
}

fn default_learner_interval_secs() -> u64 {
    900
}

fn default_paper_score_floor() -> f64 {
    2.0
}

fn default_live_score_floor() -> f64 {
    2.5
}

fn default_risk_on_adjust() -> f64 {
    0.0
}

fn default_risk_off_adjust() -> f64 {
    0.75
}

fn default_mixed_adjust() -> f64 {
    0.4
}

fn default_uw_quality_bypass() -> f64 {
    90.0
}

fn default_survivorship_bypass() -> f64 {
    0.85
}

fn default_min_weight() -> f64 {
    0.25
}

fn default_max_weight() -> f64 {
    2.5
}

fn default_neutral_weight() -> f64 {
    1.0
}

fn default_ewma_alpha() -> f64 {
    0.2
}

fn default_decay_after_days() -> f64 {
    30.0
}

fn default_decay_step() -> f64 {
    0.05
}

fn default_dte_close_threshold() -> f64 {
    5.0
}

fn default_premium_target() -> f64 {
    0.75
}

fn default_breach_exit_pct() -> f64 {
    8.0
}

fn default_stop_loss_pct() -> f64 {
    7.0
}

fn default_profit_target_pct() -> f64 {
    15.0
}

fn default_max_holding_days() -> f64 {
    20.0
}

fn default_score_decay_floor() -> f64 {
    0.25
}

fn default_weight_store_path() -> String {
    "state/weights.json".to_string()
}

fn default_attribution_log_path() -> String {
    "state/attribution.jsonl".to_string()
}

fn default_learner_cursor_path() -> String {
    "state/learner_cursor.json".to_string()
}

fn default_snapshot_path() -> String {
    "state/cycle_snapshot.json".to_string()
}

// =============================================================================
// GateParams
// =============================================================================

/// Entry-gate thresholds. The floor depends on account mode; the regime adds
/// a per-regime adjustment on top.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateParams {
    #[serde(default = "default_paper_score_floor")]
    pub paper_score_floor: f64,

    #[serde(default = "default_live_score_floor")]
    pub live_score_floor: f64,

    #[serde(default = "default_risk_on_adjust")]
    pub risk_on_adjust: f64,

    #[serde(default = "default_risk_off_adjust")]
    pub risk_off_adjust: f64,

    #[serde(default = "default_mixed_adjust")]
    pub mixed_adjust: f64,

    /// Raw UW-style quality grade [0, 100] above which the score floor is
    /// waived.
    #[serde(default = "default_uw_quality_bypass")]
    pub uw_quality_bypass: f64,

    /// Challenger survivorship score [0, 1] above which a displacement
    /// block is waived.
    #[serde(default = "default_survivorship_bypass")]
    pub survivorship_bypass: f64,
}

impl Default for GateParams {
    fn default() -> Self {
        Self {
            paper_score_floor: default_paper_score_floor(),
            live_score_floor: default_live_score_floor(),
            risk_on_adjust: default_risk_on_adjust(),
            risk_off_adjust: default_risk_off_adjust(),
            mixed_adjust: default_mixed_adjust(),
            uw_quality_bypass: default_uw_quality_bypass(),
            survivorship_bypass: default_survivorship_bypass(),
        }
    }
}

impl GateParams {
    /// Effective entry threshold for a mode/regime pair.
    pub fn threshold(&self, mode: AccountMode, regime: Regime) -> f64 {
        let floor = match mode {
            AccountMode::Paper => self.paper_score_floor,
            AccountMode::Live => self.live_score_floor,
        };
        let adjust = match regime {
            Regime::RiskOn => self.risk_on_adjust,
            Regime::RiskOff => self.risk_off_adjust,
            Regime::Mixed => self.mixed_adjust,
        };
        floor + adjust
    }
}

// =============================================================================
// WeightParams
// =============================================================================

/// Clamp bounds and learning-rate knobs for the weight learner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightParams {
    #[serde(default = "default_min_weight")]
    pub min_weight: f64,

    #[serde(default = "default_max_weight")]
    pub max_weight: f64,

    #[serde(default = "default_neutral_weight")]
    pub neutral: f64,

    /// EWMA learning rate for attributed outcomes.
    #[serde(default = "default_ewma_alpha")]
    pub ewma_alpha: f64,

    /// Optional decay-to-neutral for stale bands. OFF by default: absence of
    /// evidence must not shrink a component's weight.
    #[serde(default)]
    pub enable_decay_to_neutral: bool,

    /// A band must go this many days without attributed evidence before the
    /// decay rule may touch it.
    #[serde(default = "default_decay_after_days")]
    pub decay_after_days: f64,

    /// Fraction of the gap to neutral closed per learner pass when decaying.
    #[serde(default = "default_decay_step")]
    pub decay_step: f64,
}

impl Default for WeightParams {
    fn default() -> Self {
        Self {
            min_weight: default_min_weight(),
            max_weight: default_max_weight(),
            neutral: default_neutral_weight(),
            ewma_alpha: default_ewma_alpha(),
            enable_decay_to_neutral: false,
            decay_after_days: default_decay_after_days(),
            decay_step: default_decay_step(),
        }
    }
}

impl WeightParams {
    pub fn bounds(&self) -> WeightBounds {
        WeightBounds {
            min_weight: self.min_weight,
            max_weight: self.max_weight,
            neutral: self.neutral,
        }
    }
}

// =============================================================================
// Exit policy parameters
// =============================================================================

/// Wheel (premium-capture) exit thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WheelParams {
    /// Close when this many (or fewer) calendar days remain to expiry.
    #[serde(default = "default_dte_close_threshold")]
    pub dte_close_threshold: f64,

    /// Close once this fraction of the premium is captured.
    #[serde(default = "default_premium_target")]
    pub premium_target: f64,

    /// Close when the underlying breaches the strike by this percentage.
    #[serde(default = "default_breach_exit_pct")]
    pub breach_exit_pct: f64,
}

impl Default for WheelParams {
    fn default() -> Self {
        Self {
            dte_close_threshold: default_dte_close_threshold(),
            premium_target: default_premium_target(),
            breach_exit_pct: default_breach_exit_pct(),
        }
    }
}

/// Directional swing exit thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwingParams {
    #[serde(default = "default_stop_loss_pct")]
    pub stop_loss_pct: f64,

    #[serde(default = "default_profit_target_pct")]
    pub profit_target_pct: f64,

    #[serde(default = "default_max_holding_days")]
    pub max_holding_days: f64,

    /// Exit when the current composite score falls below this fraction of
    /// the score at entry (only meaningful for positive entry scores).
    #[serde(default = "default_score_decay_floor")]
    pub score_decay_floor: f64,
}

impl Default for SwingParams {
    fn default() -> Self {
        Self {
            stop_loss_pct: default_stop_loss_pct(),
            profit_target_pct: default_profit_target_pct(),
            max_holding_days: default_max_holding_days(),
            score_decay_floor: default_score_decay_floor(),
        }
    }
}

// =============================================================================
// EngineConfig
// =============================================================================

/// Top-level configuration for the Vantage engine.
///
/// Every field has a serde default so that older JSON files missing new
/// fields will still deserialise correctly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Paper or live thresholds. Affects gating capacity, never scoring.
    #[serde(default)]
    pub account_mode: AccountMode,

    /// Symbols the engine evaluates each cycle. Snapshot entries outside
    /// this list are ignored; an empty list disables the filter.
    #[serde(default = "default_symbols")]
    pub symbols: Vec<String>,

    /// Decision-cycle cadence.
    #[serde(default = "default_cycle_interval_secs")]
    pub cycle_interval_secs: u64,

    /// Weight-learner cadence. Deliberately slower than the decision cycle.
    #[serde(default = "default_learner_interval_secs")]
    pub learner_interval_secs: u64,

    #[serde(default)]
    pub gate: GateParams,

    #[serde(default)]
    pub weights: WeightParams,

    #[serde(default)]
    pub wheel: WheelParams,

    #[serde(default)]
    pub swing: SwingParams,

    // --- File paths -----------------------------------------------------------
    #[serde(default = "default_weight_store_path")]
    pub weight_store_path: String,

    #[serde(default = "default_attribution_log_path")]
    pub attribution_log_path: String,

    #[serde(default = "default_learner_cursor_path")]
    pub learner_cursor_path: String,

    /// Pre-fetched cycle snapshot written by the external data collaborators.
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            account_mode: AccountMode::Paper,
            symbols: default_symbols(),
            cycle_interval_secs: default_cycle_interval_secs(),
            learner_interval_secs: default_learner_interval_secs(),
            gate: GateParams::default(),
            weights: WeightParams::default(),
            wheel: WheelParams::default(),
            swing: SwingParams::default(),
            weight_store_path: default_weight_store_path(),
            attribution_log_path: default_attribution_log_path(),
            learner_cursor_path: default_learner_cursor_path(),
            snapshot_path: default_snapshot_path(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist or fails to parse, returns an error so the
    /// caller can fall back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read engine config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse engine config from {}", path.display()))?;

        info!(
            path = %path.display(),
            symbols = ?config.symbols,
            account_mode = %config.account_mode,
            "engine config loaded"
        );

        Ok(config)
    }

    /// Persist the current configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content =
            serde_json::to_string_pretty(self).context("failed to serialise engine config")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "engine config saved (atomic)");
        Ok(())
    }
}
