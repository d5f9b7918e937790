//! Event matching.
//!
//! Pairs reference events (the sharp book) with candidate events (the scraped
//! book) by fuzzy name similarity. Scoring is bidirectional: each pair is
//! scored with home/away mapped straight (direct) and swapped (flipped), and
//! the better orientation wins. Matching is name-based only; league and
//! start time are never used to reject a pair, only a loose sport-category
//! screen prunes obviously cross-sport comparisons.
//!
//! Given identical inputs and config the output is identical: pair scoring is
//! order-independent, rayon workers return independent lists merged by the
//! caller, and final assignment is a greedy pass in descending score order
//! with index tie-breaks.

use crate::config::MatchConfig;
use crate::normalize::Normalizer;
use crate::types::{
    ExcludedEvent, MatchCandidate, Orientation, RawEvent, UnmatchReason, UnmatchedEvent,
};
use rayon::prelude::*;
use std::collections::BTreeSet;
use strsim::normalized_levenshtein;
use tracing::{debug, info, warn};

/// Everything one matching pass produces: surviving pairs plus the
/// diagnostics operators use to tune aliases and thresholds.
#[derive(Clone, Debug, Default)]
pub struct MatchOutcome {
    pub matches: Vec<MatchCandidate>,
    pub unmatched_reference: Vec<UnmatchedEvent>,
    pub excluded: Vec<ExcludedEvent>,
    pub ambiguous: usize,
}

fn ratio(a: &str, b: &str) -> f64 {
    normalized_levenshtein(a, b) * 100.0
}

fn join_parts(base: &str, rest: &str) -> String {
    match (base.is_empty(), rest.is_empty()) {
        (true, _) => rest.to_string(),
        (_, true) => base.to_string(),
        _ => format!("{base} {rest}"),
    }
}

/// Token-set similarity on a 0-100 scale. Word order never costs score, and
/// shared tokens are compared against each full token set separately, so a
/// short nickname contained in a longer listing still scores high
/// ("Lakers" vs "Los Angeles Lakers" -> 100).
pub fn token_set_ratio(a: &str, b: &str) -> f64 {
    let tokens_a: BTreeSet<&str> = a.split_whitespace().collect();
    let tokens_b: BTreeSet<&str> = b.split_whitespace().collect();
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }

    let shared = tokens_a
        .intersection(&tokens_b)
        .cloned()
        .collect::<Vec<_>>()
        .join(" ");
    let only_a = tokens_a
        .difference(&tokens_b)
        .cloned()
        .collect::<Vec<_>>()
        .join(" ");
    let only_b = tokens_b
        .difference(&tokens_a)
        .cloned()
        .collect::<Vec<_>>()
        .join(" ");

    let combined_a = join_parts(&shared, &only_a);
    let combined_b = join_parts(&shared, &only_b);

    ratio(&shared, &combined_a)
        .max(ratio(&shared, &combined_b))
        .max(ratio(&combined_a, &combined_b))
}

/// Broad sport families used for the loose cross-sport screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SportCategory {
    Basketball,
    Football,
    Baseball,
    Soccer,
    Hockey,
}

fn sport_category(event: &RawEvent) -> Option<SportCategory> {
    let haystack = format!(
        "{} {}",
        event.league.to_lowercase(),
        event.sport.as_deref().unwrap_or("").to_lowercase()
    );
    let any = |words: &[&str]| words.iter().any(|w| haystack.contains(w));

    if any(&["basketball", "nba", "wnba", "ncaab", "euroleague"]) {
        Some(SportCategory::Basketball)
    } else if any(&["nfl", "ncaaf", "college football", "american football"]) {
        Some(SportCategory::Football)
    } else if any(&["baseball", "mlb"]) {
        Some(SportCategory::Baseball)
    } else if any(&[
        "soccer",
        "mls",
        "epl",
        "premier league",
        "la liga",
        "bundesliga",
        "serie a",
        "ligue 1",
        "champions league",
        "europa league",
    ]) {
        Some(SportCategory::Soccer)
    } else if any(&["hockey", "nhl"]) {
        Some(SportCategory::Hockey)
    } else {
        None
    }
}

/// Score of one reference/candidate pair.
#[derive(Clone, Copy, Debug)]
struct PairScore {
    /// Accepted (score, orientation, ambiguous) if both component gates and
    /// the orientation rules passed.
    accepted: Option<(f64, Orientation, bool)>,
    /// Best raw orientation mean regardless of gates, for near-miss
    /// diagnostics.
    raw: f64,
}

pub struct Matcher {
    config: MatchConfig,
    normalizer: Normalizer,
}

impl Matcher {
    pub fn new(config: MatchConfig) -> Self {
        let normalizer = Normalizer::new(&config);
        Self { config, normalizer }
    }

    /// Find the best-scoring candidate pairing for each reference event.
    ///
    /// At most one match survives per reference event, and each candidate
    /// event is consumed by at most one reference event. Reference events
    /// with no candidate above threshold are reported unmatched with their
    /// best near-miss score.
    pub fn match_events(&self, reference: &[RawEvent], candidates: &[RawEvent]) -> MatchOutcome {
        let mut outcome = MatchOutcome::default();

        info!(
            reference_in = reference.len(),
            candidates_in = candidates.len(),
            "starting event matching"
        );

        // Prop/future listings are excluded before any scoring.
        let mut live_reference: Vec<&RawEvent> = Vec::with_capacity(reference.len());
        for event in reference {
            match self.normalizer.event_exclusion(event) {
                Some(indicator) => {
                    debug!(event = %event.matchup(), %indicator, "excluding non-matchable reference event");
                    outcome.excluded.push(ExcludedEvent {
                        event_id: event.event_id.clone(),
                        matchup: event.matchup(),
                        indicator,
                    });
                }
                None => live_reference.push(event),
            }
        }
        let mut live_candidates: Vec<&RawEvent> = Vec::with_capacity(candidates.len());
        for event in candidates {
            match self.normalizer.event_exclusion(event) {
                Some(indicator) => {
                    debug!(event = %event.matchup(), %indicator, "excluding non-matchable candidate event");
                    outcome.excluded.push(ExcludedEvent {
                        event_id: event.event_id.clone(),
                        matchup: event.matchup(),
                        indicator,
                    });
                }
                None => live_candidates.push(event),
            }
        }

        let mut candidate_taken = vec![false; live_candidates.len()];
        let mut reference_matched = vec![false; live_reference.len()];

        // Manual overrides pair directly and bypass scoring.
        for (ref_idx, ref_event) in live_reference.iter().enumerate() {
            let Some(cand_id) = self.config.manual_overrides.get(&ref_event.event_id) else {
                continue;
            };
            let Some(cand_idx) = live_candidates.iter().position(|c| &c.event_id == cand_id)
            else {
                warn!(
                    reference = %ref_event.event_id,
                    candidate = %cand_id,
                    "manual override target not found among candidates"
                );
                continue;
            };
            if candidate_taken[cand_idx] {
                warn!(
                    reference = %ref_event.event_id,
                    candidate = %cand_id,
                    "manual override target already consumed"
                );
                continue;
            }
            let cand_event = live_candidates[cand_idx];
            // Orientation still has to be determined for odds mapping.
            let pair = self.score_pair(ref_event, cand_event);
            let (score, orientation, ambiguous) =
                pair.accepted.unwrap_or((pair.raw, Orientation::Direct, false));
            info!(
                reference = %ref_event.matchup(),
                candidate = %cand_event.matchup(),
                "manual override applied"
            );
            candidate_taken[cand_idx] = true;
            reference_matched[ref_idx] = true;
            if ambiguous {
                outcome.ambiguous += 1;
            }
            outcome.matches.push(MatchCandidate {
                reference: (*ref_event).clone(),
                candidate: cand_event.clone(),
                score,
                orientation,
                ambiguous,
            });
        }

        // Score every remaining pair. Reference events are partitioned across
        // rayon workers; each worker returns an independent list.
        let scored: Vec<Vec<(usize, usize, PairScore)>> = live_reference
            .par_iter()
            .enumerate()
            .map(|(ref_idx, ref_event)| {
                if reference_matched[ref_idx] {
                    return Vec::new();
                }
                let ref_cat = sport_category(ref_event);
                let mut row = Vec::new();
                for (cand_idx, cand_event) in live_candidates.iter().enumerate() {
                    if let (Some(rc), Some(cc)) = (ref_cat, sport_category(cand_event)) {
                        if rc != cc {
                            continue;
                        }
                    }
                    row.push((ref_idx, cand_idx, self.score_pair(ref_event, cand_event)));
                }
                row
            })
            .collect();

        // Near-miss bookkeeping per reference event.
        let mut best_raw: Vec<(f64, Option<usize>)> = vec![(0.0, None); live_reference.len()];
        let mut surviving: Vec<(usize, usize, f64, Orientation, bool)> = Vec::new();
        for row in &scored {
            for &(ref_idx, cand_idx, pair) in row {
                if pair.raw > best_raw[ref_idx].0 {
                    best_raw[ref_idx] = (pair.raw, Some(cand_idx));
                }
                if let Some((score, orientation, ambiguous)) = pair.accepted {
                    if score >= self.config.fuzzy_threshold {
                        surviving.push((ref_idx, cand_idx, score, orientation, ambiguous));
                    }
                }
            }
        }

        // Greedy assignment in descending score order keeps both sides
        // at-most-one and makes ties deterministic.
        surviving.sort_by(|a, b| {
            b.2.partial_cmp(&a.2)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
                .then(a.1.cmp(&b.1))
        });
        for (ref_idx, cand_idx, score, orientation, ambiguous) in surviving {
            if reference_matched[ref_idx] || candidate_taken[cand_idx] {
                continue;
            }
            reference_matched[ref_idx] = true;
            candidate_taken[cand_idx] = true;
            let ref_event = live_reference[ref_idx];
            let cand_event = live_candidates[cand_idx];
            if ambiguous {
                outcome.ambiguous += 1;
                warn!(
                    reference = %ref_event.matchup(),
                    candidate = %cand_event.matchup(),
                    score,
                    "orientation ambiguous within margin, keeping direct"
                );
            }
            info!(
                reference = %ref_event.matchup(),
                candidate = %cand_event.matchup(),
                score,
                orientation = %orientation,
                "matched"
            );
            outcome.matches.push(MatchCandidate {
                reference: ref_event.clone(),
                candidate: cand_event.clone(),
                score,
                orientation,
                ambiguous,
            });
        }

        for (ref_idx, ref_event) in live_reference.iter().enumerate() {
            if reference_matched[ref_idx] {
                continue;
            }
            let (raw, nearest_idx) = best_raw[ref_idx];
            let reason = if live_candidates.is_empty() || nearest_idx.is_none() {
                UnmatchReason::NoCandidates
            } else if raw >= self.config.fuzzy_threshold {
                UnmatchReason::CandidateConsumed
            } else {
                UnmatchReason::BelowThreshold
            };
            let nearest_candidate = nearest_idx.map(|i| live_candidates[i].matchup());
            warn!(
                reference = %ref_event.matchup(),
                best_score = raw,
                nearest = nearest_candidate.as_deref().unwrap_or("-"),
                ?reason,
                "no match"
            );
            outcome.unmatched_reference.push(UnmatchedEvent {
                event_id: ref_event.event_id.clone(),
                matchup: ref_event.matchup(),
                best_score: raw,
                nearest_candidate,
                reason,
            });
        }

        info!(
            matched = outcome.matches.len(),
            unmatched = outcome.unmatched_reference.len(),
            excluded = outcome.excluded.len(),
            ambiguous = outcome.ambiguous,
            "matching complete"
        );
        outcome
    }

    /// Score both orientations of a reference/candidate pair.
    ///
    /// An orientation's score is the mean of its two per-team component
    /// scores; an orientation is rejected outright if either component falls
    /// below the configured floor. If both orientations pass and land within
    /// the orientation margin of each other, direct wins the tie-break and
    /// the pair is flagged ambiguous.
    fn score_pair(&self, reference: &RawEvent, candidate: &RawEvent) -> PairScore {
        let ref_home = self.normalizer.normalize(&reference.home_team);
        let ref_away = self.normalizer.normalize(&reference.away_team);
        let cand_home = self.normalizer.normalize(&candidate.home_team);
        let cand_away = self.normalizer.normalize(&candidate.away_team);

        let direct_components = (
            token_set_ratio(&ref_home, &cand_home),
            token_set_ratio(&ref_away, &cand_away),
        );
        let flipped_components = (
            token_set_ratio(&ref_home, &cand_away),
            token_set_ratio(&ref_away, &cand_home),
        );

        let direct_mean = (direct_components.0 + direct_components.1) / 2.0;
        let flipped_mean = (flipped_components.0 + flipped_components.1) / 2.0;
        let raw = direct_mean.max(flipped_mean);

        let gate = self.config.min_component_score;
        let direct_ok = direct_components.0 >= gate && direct_components.1 >= gate;
        let flipped_ok = flipped_components.0 >= gate && flipped_components.1 >= gate;

        let accepted = match (direct_ok, flipped_ok) {
            (true, true) => {
                if (direct_mean - flipped_mean).abs() <= self.config.orientation_margin {
                    Some((direct_mean.max(flipped_mean), Orientation::Direct, true))
                } else if direct_mean >= flipped_mean {
                    Some((direct_mean, Orientation::Direct, false))
                } else {
                    Some((flipped_mean, Orientation::Flipped, false))
                }
            }
            (true, false) => Some((direct_mean, Orientation::Direct, false)),
            (false, true) => Some((flipped_mean, Orientation::Flipped, false)),
            (false, false) => None,
        };

        PairScore { accepted, raw }
    }
}
