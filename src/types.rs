//! Core data records shared across the matching and EV pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Market category carried on a raw event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketKind {
    Moneyline,
    Spread,
    Total,
}

impl fmt::Display for MarketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketKind::Moneyline => write!(f, "Moneyline"),
            MarketKind::Spread => write!(f, "Spread"),
            MarketKind::Total => write!(f, "Total"),
        }
    }
}

/// A selectable outcome inside a market.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Selection {
    Home,
    Away,
    Draw,
    Over,
    Under,
}

impl Selection {
    /// Remap a selection across a flipped home/away orientation.
    /// Draw and totals selections are orientation-independent.
    pub fn flipped(self) -> Self {
        match self {
            Selection::Home => Selection::Away,
            Selection::Away => Selection::Home,
            other => other,
        }
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::Home => write!(f, "Home"),
            Selection::Away => write!(f, "Away"),
            Selection::Draw => write!(f, "Draw"),
            Selection::Over => write!(f, "Over"),
            Selection::Under => write!(f, "Under"),
        }
    }
}

/// One priced outcome as listed by a book. Prices are American odds;
/// `line` is the handicap or total where applicable. Scraped feeds carry
/// lines in assorted string formats, so deserialization accepts those too.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Market {
    pub kind: MarketKind,
    pub selection: Selection,
    #[serde(default, deserialize_with = "deserialize_line")]
    pub line: Option<f64>,
    pub price: i32,
}

/// Parse a scraped line string: "½" fraction marks, decimal commas, Asian
/// split lines ("2.5/3" -> 2.75) and pick'em spellings ("pk", "+0", "-0").
pub fn parse_line(raw: &str) -> Option<f64> {
    let cleaned = raw.trim().to_lowercase().replace('½', ".5").replace(' ', "");
    if cleaned.is_empty() {
        return None;
    }
    if cleaned == "pk" || cleaned == "pick" || cleaned == "+0" || cleaned == "-0" {
        return Some(0.0);
    }
    if let Some((a, b)) = cleaned.split_once('/') {
        let a: f64 = a.replace(',', ".").parse().ok()?;
        let b: f64 = b.replace(',', ".").parse().ok()?;
        return Some((a + b) / 2.0);
    }
    cleaned.replace(',', ".").parse().ok()
}

fn deserialize_line<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum LineRepr {
        Number(f64),
        Text(String),
    }

    match Option::<LineRepr>::deserialize(deserializer)? {
        None => Ok(None),
        Some(LineRepr::Number(n)) => Ok(Some(n)),
        Some(LineRepr::Text(s)) => Ok(parse_line(&s)),
    }
}

/// One book's listing of a match, as supplied by a feed or scraper
/// collaborator. Immutable once captured; lives for a single pipeline run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    pub event_id: String,
    pub home_team: String,
    pub away_team: String,
    #[serde(default)]
    pub league: String,
    #[serde(default)]
    pub sport: Option<String>,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub markets: Vec<Market>,
}

impl RawEvent {
    /// "Home vs Away" label used in rows and diagnostics.
    pub fn matchup(&self) -> String {
        format!("{} vs {}", self.home_team, self.away_team)
    }
}

/// Whether a candidate's home/away assignment lined up straight with the
/// reference event or swapped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Direct,
    Flipped,
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Orientation::Direct => write!(f, "direct"),
            Orientation::Flipped => write!(f, "flipped"),
        }
    }
}

/// A scored reference/candidate pairing that survived matching.
/// At most one exists per reference event.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MatchCandidate {
    pub reference: RawEvent,
    pub candidate: RawEvent,
    /// Combined similarity score, 0-100.
    pub score: f64,
    pub orientation: Orientation,
    /// True when both orientations scored within the configured margin and
    /// the direct tie-break was applied.
    pub ambiguous: bool,
}

/// One row of the EV table: a single comparable market selection with its
/// fair (no-vig) price and expected value. Not mutated after creation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EvRow {
    pub matchup: String,
    pub league: String,
    pub market: MarketKind,
    pub selection: Selection,
    #[serde(default)]
    pub line: Option<f64>,
    /// Reference book price for this selection, American.
    pub reference_price: i32,
    /// Price offered by the candidate book, American.
    pub offered_price: i32,
    /// De-vigged fair price, decimal.
    pub fair_price: f64,
    /// Expected value per unit stake, percent, rounded to 2 decimals.
    pub ev_percent: f64,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
}

/// Why a reference event ended the run without a match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmatchReason {
    NoCandidates,
    BelowThreshold,
    /// Its best candidate was claimed by a higher-scoring reference event.
    CandidateConsumed,
}

/// Diagnostic record for a reference event that found no match, carrying the
/// best near-miss score so operators can tune aliases and thresholds.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UnmatchedEvent {
    pub event_id: String,
    pub matchup: String,
    pub best_score: f64,
    pub nearest_candidate: Option<String>,
    pub reason: UnmatchReason,
}

/// An event excluded from matching because it looks like a prop or future.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExcludedEvent {
    pub event_id: String,
    pub matchup: String,
    pub indicator: String,
}

/// Why a matched pair produced no EV row for a given market selection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapReason {
    /// No de-viggable reference counterpart for the offered selection.
    MissingReferencePrice,
    InvalidPrice,
    /// EV landed outside the sanity band, usually a stale or mismapped line.
    ImplausibleEv { ev_percent: f64 },
}

/// A skipped market selection, counted rather than zero-filled.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CalculationGap {
    pub event_id: String,
    pub market: MarketKind,
    pub selection: Selection,
    #[serde(default)]
    pub line: Option<f64>,
    pub reason: GapReason,
}

/// Pipeline step names for error attribution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStep {
    FetchReference,
    FetchCandidates,
    Match,
    Calculate,
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineStep::FetchReference => write!(f, "fetch_reference"),
            PipelineStep::FetchCandidates => write!(f, "fetch_candidates"),
            PipelineStep::Match => write!(f, "match"),
            PipelineStep::Calculate => write!(f, "calculate"),
        }
    }
}

/// A step-level failure recorded on the run instead of aborting it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StepError {
    pub step: PipelineStep,
    pub message: String,
}

/// Which steps completed during a run.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct StepStatus {
    pub fetched: bool,
    pub scraped: bool,
    pub matched: bool,
    pub calculated: bool,
}

/// Everything operators need to tune a run: unmatched events with near-miss
/// scores, excluded props, ambiguity count, calculation gaps, step errors.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    pub unmatched_reference: Vec<UnmatchedEvent>,
    pub excluded: Vec<ExcludedEvent>,
    pub ambiguous: usize,
    pub calculation_gaps: Vec<CalculationGap>,
    pub step_errors: Vec<StepError>,
}

/// Aggregate of one orchestration pass. Replaced wholesale by the next run;
/// nothing here is persisted by the core.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PipelineRun {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub reference_in: usize,
    pub candidates_in: usize,
    pub matched: usize,
    pub rows: Vec<EvRow>,
    pub diagnostics: Diagnostics,
    pub steps: StepStatus,
}

impl PipelineRun {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            reference_in: 0,
            candidates_in: 0,
            matched: 0,
            rows: Vec::new(),
            diagnostics: Diagnostics::default(),
            steps: StepStatus::default(),
        }
    }
}

impl Default for PipelineRun {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_flip() {
        assert_eq!(Selection::Home.flipped(), Selection::Away);
        assert_eq!(Selection::Away.flipped(), Selection::Home);
        assert_eq!(Selection::Draw.flipped(), Selection::Draw);
        assert_eq!(Selection::Over.flipped(), Selection::Over);
        assert_eq!(Selection::Under.flipped(), Selection::Under);
    }

    #[test]
    fn test_raw_event_roundtrips_through_json() {
        let event = RawEvent {
            event_id: "1611309203".to_string(),
            home_team: "Los Angeles Lakers".to_string(),
            away_team: "Golden State Warriors".to_string(),
            league: "NBA".to_string(),
            sport: Some("basketball".to_string()),
            start_time: None,
            markets: vec![Market {
                kind: MarketKind::Moneyline,
                selection: Selection::Home,
                line: None,
                price: -110,
            }],
        };

        let json = serde_json::to_string(&event).unwrap();
        let back: RawEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_parse_line_formats() {
        assert_eq!(parse_line("2.5"), Some(2.5));
        assert_eq!(parse_line("-3.5"), Some(-3.5));
        assert_eq!(parse_line("2,5"), Some(2.5));
        assert_eq!(parse_line("2½"), Some(2.5));
        assert_eq!(parse_line("2.5/3"), Some(2.75));
        assert_eq!(parse_line("pk"), Some(0.0));
        assert_eq!(parse_line("+0"), Some(0.0));
        assert_eq!(parse_line("-0"), Some(0.0));
        assert_eq!(parse_line("n/a"), None);
        assert_eq!(parse_line(""), None);
    }

    #[test]
    fn test_market_line_deserializes_from_string_or_number() {
        let m: Market = serde_json::from_str(
            r#"{"kind":"spread","selection":"home","line":"-5½","price":-110}"#,
        )
        .unwrap();
        assert_eq!(m.line, Some(-5.5));
        let m: Market = serde_json::from_str(
            r#"{"kind":"total","selection":"over","line":224.5,"price":-105}"#,
        )
        .unwrap();
        assert_eq!(m.line, Some(224.5));
    }

    #[test]
    fn test_raw_event_defaults_optional_fields() {
        let json = r#"{"event_id":"1","home_team":"Lakers","away_team":"Warriors"}"#;
        let event: RawEvent = serde_json::from_str(json).unwrap();
        assert!(event.markets.is_empty());
        assert!(event.start_time.is_none());
        assert_eq!(event.matchup(), "Lakers vs Warriors");
    }
}
