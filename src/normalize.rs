//! Team name normalization.
//!
//! Canonicalizes raw team/market strings into comparable keys before fuzzy
//! scoring, and flags prop/future listings that are not 1:1 matchable across
//! books. Normalization is a pure function of the input and config: same
//! input, same output, no hidden state. It never fails: on input that
//! normalizes away to nothing it falls back to the lowercased, trimmed
//! original and lets the matcher score it low.

use crate::config::MatchConfig;
use crate::types::RawEvent;
use regex::Regex;
use rustc_hash::FxHashMap;
use std::sync::OnceLock;

/// League/country tags books append to team names ("Inter Milan Serie A").
const LEAGUE_SUFFIXES: &[&str] = &[
    "mlb",
    "nba",
    "nfl",
    "nhl",
    "ncaaf",
    "ncaab",
    "wnba",
    "poland",
    "bulgaria",
    "uruguay",
    "colombia",
    "peru",
    "argentina",
    "sweden",
    "romania",
    "finland",
    "england",
    "japan",
    "austria",
    "liga 1",
    "serie a",
    "bundesliga",
    "la liga",
    "ligue 1",
    "premier league",
    "epl",
    "mls",
];

/// Club-form prefixes that vary between books ("FC Porto" vs "Porto").
const CLUB_PREFIXES: &[&str] = &[
    "if ", "fc ", "sc ", "bk ", "sk ", "ac ", "as ", "fk ", "cd ", "ca ", "afc ", "cfr ", "scr ",
];

fn leading_numbers_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+\s*").unwrap())
}

fn parenthetical_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\([^)]*\)").unwrap())
}

/// Pitcher/starter annotations on MLB listings, e.g. "Braves Fried M - L must start".
fn pitcher_note_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r" [a-z]+ [a-z] - [lr]( must start)?").unwrap())
}

fn non_alphanumeric_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-z0-9 ]+").unwrap())
}

/// Canonicalizes team names for matching.
pub struct Normalizer {
    aliases: FxHashMap<String, String>,
    indicators: Vec<String>,
}

impl Normalizer {
    pub fn new(config: &MatchConfig) -> Self {
        Self {
            // Lookup happens on lowercased names and the substituted value
            // feeds the punctuation strip, so fold both sides here rather
            // than trusting config case.
            aliases: config
                .team_aliases
                .iter()
                .map(|(k, v)| (k.to_lowercase(), v.to_lowercase()))
                .collect(),
            indicators: config
                .non_matchable_indicators
                .iter()
                .map(|s| s.to_lowercase())
                .collect(),
        }
    }

    /// Canonicalize a raw team name. Transformation order matters; each step
    /// is pure:
    /// lowercase/trim -> leading numbers -> parentheticals -> pitcher notes
    /// -> league suffix -> club prefixes -> alias map -> punctuation strip
    /// -> whitespace collapse.
    pub fn normalize(&self, raw: &str) -> String {
        let lowered = raw.trim().to_lowercase();
        if lowered.is_empty() {
            return lowered;
        }

        let mut name = leading_numbers_re().replace(&lowered, "").into_owned();
        name = parenthetical_re().replace_all(&name, " ").into_owned();
        name = pitcher_note_re().replace_all(&name, " ").into_owned();
        name = collapse_whitespace(&name);

        name = strip_league_suffix(&name);
        // Books stack club prefixes ("AFC FC ..."), so strip up to twice.
        name = strip_club_prefix(&name);
        name = strip_club_prefix(&name);

        if let Some(canonical) = self.aliases.get(name.trim()) {
            name = canonical.clone();
        }

        name = non_alphanumeric_re().replace_all(&name, " ").into_owned();
        name = collapse_whitespace(&name);

        if name.is_empty() {
            lowered
        } else {
            name
        }
    }

    /// Returns the first configured prop/future indicator found in `name`.
    pub fn non_matchable_indicator(&self, name: &str) -> Option<&str> {
        let lowered = name.to_lowercase();
        self.indicators
            .iter()
            .find(|ind| lowered.contains(ind.as_str()))
            .map(String::as_str)
    }

    /// Checks whether an event is a prop/future listing that should be
    /// excluded from matching entirely. Returns the offending indicator.
    pub fn event_exclusion(&self, event: &RawEvent) -> Option<String> {
        for name in [&event.home_team, &event.away_team] {
            if let Some(ind) = self.non_matchable_indicator(name) {
                return Some(ind.to_string());
            }
        }
        // "The Field" entries and yes/no listings are futures in disguise.
        let away = event.away_team.to_lowercase();
        if away.contains("field") && away.contains("the") {
            return Some("the field".to_string());
        }
        if event.home_team.eq_ignore_ascii_case("yes") && event.away_team.eq_ignore_ascii_case("no")
        {
            return Some("yes/no listing".to_string());
        }
        None
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn strip_league_suffix(name: &str) -> String {
    for suffix in LEAGUE_SUFFIXES {
        if name == *suffix {
            continue;
        }
        if let Some(stripped) = name.strip_suffix(suffix) {
            let stripped = stripped.trim_end();
            if !stripped.is_empty() {
                return stripped.to_string();
            }
        }
    }
    name.to_string()
}

fn strip_club_prefix(name: &str) -> String {
    for prefix in CLUB_PREFIXES {
        if let Some(stripped) = name.strip_prefix(prefix) {
            let stripped = stripped.trim_start();
            if !stripped.is_empty() {
                return stripped.to_string();
            }
        }
    }
    name.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Market, MarketKind, RawEvent, Selection};

    fn normalizer() -> Normalizer {
        Normalizer::new(&MatchConfig::default())
    }

    fn event(home: &str, away: &str) -> RawEvent {
        RawEvent {
            event_id: "e1".to_string(),
            home_team: home.to_string(),
            away_team: away.to_string(),
            league: String::new(),
            sport: None,
            start_time: None,
            markets: vec![Market {
                kind: MarketKind::Moneyline,
                selection: Selection::Home,
                line: None,
                price: -110,
            }],
        }
    }

    #[test]
    fn test_lowercases_and_trims() {
        let n = normalizer();
        assert_eq!(n.normalize("  Boston Celtics  "), "boston celtics");
    }

    #[test]
    fn test_strips_parentheticals() {
        let n = normalizer();
        assert_eq!(n.normalize("Yankees (Games)"), "yankees");
        assert_eq!(n.normalize("Inter Milan (ITA)"), "inter milan");
    }

    #[test]
    fn test_strips_pitcher_notes() {
        let n = normalizer();
        assert_eq!(n.normalize("Braves Fried M - L must start"), "braves");
    }

    #[test]
    fn test_strips_leading_numbers() {
        let n = normalizer();
        assert_eq!(n.normalize("501 Milwaukee Brewers"), "milwaukee brewers");
    }

    #[test]
    fn test_applies_alias_map() {
        let n = normalizer();
        assert_eq!(n.normalize("Internazionale"), "inter milan");
        assert_eq!(n.normalize("Manchester United"), "man united");
    }

    #[test]
    fn test_capitalized_alias_value_survives_normalization() {
        let mut config = MatchConfig::default();
        config
            .team_aliases
            .insert("Internazionale".to_string(), "Inter Milan".to_string());
        let n = Normalizer::new(&config);
        assert_eq!(n.normalize("Internazionale"), "inter milan");
    }

    #[test]
    fn test_strips_league_suffix_and_club_prefix() {
        let n = normalizer();
        assert_eq!(n.normalize("Arsenal England"), "arsenal");
        assert_eq!(n.normalize("FC Midtjylland"), "midtjylland");
        // A name that IS a league word survives.
        assert_eq!(n.normalize("MLS"), "mls");
    }

    #[test]
    fn test_collapses_punctuation_and_whitespace() {
        let n = normalizer();
        assert_eq!(n.normalize("St.   Louis  Cardinals!"), "st louis cardinals");
    }

    #[test]
    fn test_idempotent() {
        let n = normalizer();
        for raw in [
            "Los Angeles Lakers",
            "Internazionale",
            "FC Porto",
            "Yankees (Games)",
            "501 Milwaukee Brewers",
            "(???)",
            "St. Louis Cardinals",
            "AS Roma",
        ] {
            let once = n.normalize(raw);
            assert_eq!(n.normalize(&once), once, "not idempotent for {raw:?}");
        }
    }

    #[test]
    fn test_never_returns_empty_for_nonempty_input() {
        let n = normalizer();
        let out = n.normalize("(???)");
        assert!(!out.is_empty());
        assert_eq!(out, "(???)");
    }

    #[test]
    fn test_non_matchable_indicator() {
        let n = normalizer();
        assert_eq!(
            n.non_matchable_indicator("Inter Milan To Lift The Trophy"),
            Some("to lift the trophy")
        );
        assert_eq!(n.non_matchable_indicator("Inter Milan"), None);
    }

    #[test]
    fn test_event_exclusion_flags_props_and_field_entries() {
        let n = normalizer();
        assert!(n
            .event_exclusion(&event("Inter Milan to lift the trophy", "Juventus"))
            .is_some());
        assert!(n.event_exclusion(&event("Djokovic", "The Field")).is_some());
        assert!(n.event_exclusion(&event("Yes", "No")).is_some());
        assert!(n
            .event_exclusion(&event("Lakers", "Warriors"))
            .is_none());
    }
}
