// =============================================================================
// Canonical signal components
// =============================================================================
//
// The component universe is closed at build time: exactly 21 named sources,
// each with an ordered list of accepted raw field names (first present wins)
// and a static fallback weight. Everything downstream — scoring, weight
// bands, attribution — is keyed by this enum, never by ad hoc strings.
// =============================================================================

use serde::{Deserialize, Serialize};

/// One independent signal source contributing to the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalComponent {
    OptionsFlow,
    DarkPool,
    InsiderTrades,
    CongressTrades,
    IvTermStructure,
    GammaExposure,
    ShortInterest,
    FtdPressure,
    UwQuality,
    AnalystRevisions,
    EarningsDrift,
    SocialSentiment,
    NewsSentiment,
    OiChange,
    PutCallRatio,
    RelativeVolume,
    Momentum,
    MeanReversion,
    SectorStrength,
    MarketBreadth,
    Survivorship,
}

impl SignalComponent {
    /// The full canonical component set. The weight store initializes one
    /// band per entry; the scorer walks this exhaustively every cycle.
    pub const ALL: [SignalComponent; 21] = [
        Self::OptionsFlow,
        Self::DarkPool,
        Self::InsiderTrades,
        Self::CongressTrades,
        Self::IvTermStructure,
        Self::GammaExposure,
        Self::ShortInterest,
        Self::FtdPressure,
        Self::UwQuality,
        Self::AnalystRevisions,
        Self::EarningsDrift,
        Self::SocialSentiment,
        Self::NewsSentiment,
        Self::OiChange,
        Self::PutCallRatio,
        Self::RelativeVolume,
        Self::Momentum,
        Self::MeanReversion,
        Self::SectorStrength,
        Self::MarketBreadth,
        Self::Survivorship,
    ];

    /// Stable snake_case name used in persisted state and attribution logs.
    pub fn name(self) -> &'static str {
        match self {
            Self::OptionsFlow => "options_flow",
            Self::DarkPool => "dark_pool",
            Self::InsiderTrades => "insider_trades",
            Self::CongressTrades => "congress_trades",
            Self::IvTermStructure => "iv_term_structure",
            Self::GammaExposure => "gamma_exposure",
            Self::ShortInterest => "short_interest",
            Self::FtdPressure => "ftd_pressure",
            Self::UwQuality => "uw_quality",
            Self::AnalystRevisions => "analyst_revisions",
            Self::EarningsDrift => "earnings_drift",
            Self::SocialSentiment => "social_sentiment",
            Self::NewsSentiment => "news_sentiment",
            Self::OiChange => "oi_change",
            Self::PutCallRatio => "put_call_ratio",
            Self::RelativeVolume => "relative_volume",
            Self::Momentum => "momentum",
            Self::MeanReversion => "mean_reversion",
            Self::SectorStrength => "sector_strength",
            Self::MarketBreadth => "market_breadth",
            Self::Survivorship => "survivorship",
        }
    }

    /// Accepted raw field names in the inbound snapshot, highest priority
    /// first. The normalizer resolves the first key present and ignores the
    /// rest, so a record carrying both `oi_change` and `oi` is counted once.
    pub fn raw_keys(self) -> &'static [&'static str] {
        match self {
            Self::OptionsFlow => &["flow_score", "options_flow"],
            Self::DarkPool => &["dp_ratio", "dark_pool_ratio"],
            Self::InsiderTrades => &["insider_net", "insider_buys"],
            Self::CongressTrades => &["congress_net", "congress_score"],
            Self::IvTermStructure => &["iv_slope", "term_slope"],
            Self::GammaExposure => &["gex", "gamma_exposure"],
            Self::ShortInterest => &["si_pct", "short_interest"],
            Self::FtdPressure => &["ftd_ratio", "ftd"],
            Self::UwQuality => &["uw_score", "uw_quality"],
            Self::AnalystRevisions => &["revision_net", "analyst_revisions"],
            Self::EarningsDrift => &["pead_score", "earnings_drift"],
            Self::SocialSentiment => &["social_zscore", "social_sentiment"],
            Self::NewsSentiment => &["news_score", "news_sentiment"],
            Self::OiChange => &["oi_change", "oi"],
            Self::PutCallRatio => &["pcr", "put_call_ratio"],
            Self::RelativeVolume => &["rvol", "relative_volume"],
            Self::Momentum => &["mom_20d", "momentum"],
            Self::MeanReversion => &["zscore_5d", "mean_reversion"],
            Self::SectorStrength => &["sector_rs", "sector_strength"],
            Self::MarketBreadth => &["breadth_pct", "breadth"],
            Self::Survivorship => &["survivorship_score", "survivorship"],
        }
    }

    /// Static fallback weight, used only if a component is somehow missing
    /// from the weight snapshot (the store initializes the full set, so this
    /// is a last-resort default, mirroring the per-signal fallback the
    /// learned band normally replaces).
    pub fn base_weight(self) -> f64 {
        match self {
            Self::OptionsFlow => 1.2,
            Self::DarkPool => 1.0,
            Self::InsiderTrades => 0.8,
            Self::CongressTrades => 0.6,
            Self::IvTermStructure => 0.9,
            Self::GammaExposure => 1.1,
            Self::ShortInterest => 0.9,
            Self::FtdPressure => 0.5,
            Self::UwQuality => 1.3,
            Self::AnalystRevisions => 0.5,
            Self::EarningsDrift => 0.6,
            Self::SocialSentiment => 0.4,
            Self::NewsSentiment => 0.4,
            Self::OiChange => 0.8,
            Self::PutCallRatio => 0.7,
            Self::RelativeVolume => 0.6,
            Self::Momentum => 1.0,
            Self::MeanReversion => 0.7,
            Self::SectorStrength => 0.5,
            Self::MarketBreadth => 0.5,
            Self::Survivorship => 0.8,
        }
    }
}

impl std::fmt::Display for SignalComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
