//! Pipeline configuration.
//!
//! Everything the matcher and EV calculator tune on lives in explicit config
//! objects passed into their constructors, so parallel runs with different
//! settings never share state. All fields default to values that work with
//! no configuration present.

use rustc_hash::FxHashMap;
use serde::Deserialize;

/// Similarity score (0-100) a pair must reach to count as a match.
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 82.0;
/// Floor for each per-team component score within an orientation.
pub const DEFAULT_MIN_COMPONENT_SCORE: f64 = 78.0;
/// If both orientations score within this margin, prefer direct and warn.
pub const DEFAULT_ORIENTATION_MARGIN: f64 = 15.0;
/// Rows with |EV| above this are treated as stale-line artifacts.
pub const DEFAULT_EV_SANITY_LIMIT: f64 = 15.0;

/// Known name variants collapsed to the form the candidate book uses.
/// Values must be stable under normalization or alias application loops.
const DEFAULT_TEAM_ALIASES: &[(&str, &str)] = &[
    ("internazionale", "inter milan"),
    ("manchester united", "man united"),
    ("manchester city", "man city"),
    ("bayern munich", "bayern"),
    ("psg", "paris saint germain"),
    ("athletic bilbao", "athletic club"),
    ("real sociedad", "sociedad"),
    ("juventus", "juve"),
    ("roma", "as roma"),
    ("napoli", "ssc napoli"),
    ("sporting", "sporting cp"),
    ("porto", "fc porto"),
    ("benfica", "sl benfica"),
    ("sevilla", "fc sevilla"),
    ("betis", "real betis"),
];

/// Substrings that mark an event as a prop or future listing. Such events are
/// not 1:1 matchable across books and are excluded from matching entirely.
const DEFAULT_NON_MATCHABLE_INDICATORS: &[&str] = &[
    "to lift the trophy",
    "lift the trophy",
    "mvp",
    "futures",
    "outright",
    "coach of the year",
    "player of the year",
    "series correct score",
    "when will series finish",
    "most points in series",
    "most assists in series",
    "most rebounds in series",
    "margin of victory",
    "to win the tournament",
    "to win group",
    "series price",
    "corners",
    "bookings",
    "hits+runs+errors",
    "double chance",
    "clean sheet",
    "both teams to score",
    "anytime scorer",
    "first scorer",
    "last scorer",
    "win either half",
    "win both halves",
    "shots on target",
    "goalscorer",
    "player props",
    "team props",
];

/// Tuning for the event matcher.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    pub fuzzy_threshold: f64,
    pub min_component_score: f64,
    pub orientation_margin: f64,
    /// Raw-name variant -> canonical form, applied during normalization.
    pub team_aliases: FxHashMap<String, String>,
    /// Substrings flagging an event as a non-matchable prop/future.
    pub non_matchable_indicators: Vec<String>,
    /// Reference event id -> candidate event id pairs that bypass scoring.
    pub manual_overrides: FxHashMap<String, String>,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            min_component_score: DEFAULT_MIN_COMPONENT_SCORE,
            orientation_margin: DEFAULT_ORIENTATION_MARGIN,
            team_aliases: DEFAULT_TEAM_ALIASES
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            non_matchable_indicators: DEFAULT_NON_MATCHABLE_INDICATORS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            manual_overrides: FxHashMap::default(),
        }
    }
}

/// Tuning for the EV calculator.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct EvConfig {
    /// Absolute EV percentage above which a row is dropped as implausible.
    pub ev_sanity_limit: f64,
}

impl Default for EvConfig {
    fn default() -> Self {
        Self {
            ev_sanity_limit: DEFAULT_EV_SANITY_LIMIT,
        }
    }
}

/// Full pipeline configuration.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub matching: MatchConfig,
    pub ev: EvConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_thresholds() {
        let config = MatchConfig::default();
        assert_eq!(config.fuzzy_threshold, 82.0);
        assert_eq!(config.min_component_score, 78.0);
        assert_eq!(config.orientation_margin, 15.0);
        assert!(config.manual_overrides.is_empty());
        assert_eq!(
            config.team_aliases.get("internazionale").map(String::as_str),
            Some("inter milan")
        );
    }

    #[test]
    fn test_partial_json_config_fills_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"matching":{"fuzzy_threshold":90.0}}"#).unwrap();
        assert_eq!(config.matching.fuzzy_threshold, 90.0);
        assert_eq!(config.matching.min_component_score, 78.0);
        assert_eq!(config.ev.ev_sanity_limit, 15.0);
        assert!(!config.matching.non_matchable_indicators.is_empty());
    }
}
