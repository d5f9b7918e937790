//! Expected value calculation.
//!
//! For every matched pair, joins the candidate book's offered markets against
//! the reference book's markets on (market kind, selection, line), de-vigs
//! the reference side, and emits one EV row per comparable selection.
//! EV per unit stake is the closed form over fair decimal odds:
//! `(offered_decimal / fair_decimal - 1) * 100`, which equals
//! `fair_prob * (offered_decimal - 1) - (1 - fair_prob)` when the fair
//! probability comes from the de-vigged reference prices.
//!
//! Selections with a missing or invalid counterpart are skipped and counted
//! as gaps, never zero-filled. Rows whose |EV| exceeds the sanity limit are
//! dropped as stale-line artifacts and counted the same way.

use crate::config::EvConfig;
use crate::odds::{american_to_decimal, no_vig_prices};
use crate::types::{
    CalculationGap, EvRow, GapReason, MarketKind, MatchCandidate, Orientation, Selection,
};
use rustc_hash::FxHashMap;
use tracing::{debug, info, warn};

/// Rows plus the gaps that explain every skipped selection.
#[derive(Clone, Debug, Default)]
pub struct EvOutcome {
    pub rows: Vec<EvRow>,
    pub gaps: Vec<CalculationGap>,
}

/// Join key for one market group (the outcomes that de-vig together).
/// Lines are keyed in quarter-point units; spread lines are folded to the
/// home team's perspective so both sides of a handicap share a group, and
/// `0`/`+0`/`-0` all key as pick'em.
type GroupKey = (MarketKind, Option<i64>);

fn quarter_units(line: f64) -> i64 {
    let q = (line * 4.0).round() as i64;
    // -0.0 folds to 0 on cast, but keep the intent explicit for ±0 inputs.
    if q == 0 {
        0
    } else {
        q
    }
}

fn group_key(kind: MarketKind, selection: Selection, line: Option<f64>) -> GroupKey {
    let key = match (kind, selection) {
        (MarketKind::Moneyline, _) => None,
        (MarketKind::Spread, Selection::Away) => line.map(|l| quarter_units(-l)),
        _ => line.map(quarter_units),
    };
    (kind, key)
}

pub struct EvCalculator {
    config: EvConfig,
}

impl EvCalculator {
    pub fn new(config: EvConfig) -> Self {
        Self { config }
    }

    /// Compute EV rows for all matched pairs, sorted by EV descending.
    pub fn calculate(&self, matched: &[MatchCandidate]) -> EvOutcome {
        let mut outcome = EvOutcome::default();
        for pair in matched {
            self.calculate_pair(pair, &mut outcome);
        }
        outcome
            .rows
            .sort_by(|a, b| b.ev_percent.total_cmp(&a.ev_percent));
        info!(
            pairs = matched.len(),
            rows = outcome.rows.len(),
            gaps = outcome.gaps.len(),
            "ev calculation complete"
        );
        outcome
    }

    fn calculate_pair(&self, pair: &MatchCandidate, outcome: &mut EvOutcome) {
        let reference = &pair.reference;
        let candidate = &pair.candidate;

        // Group the reference markets and de-vig each group that has at
        // least two priced outcomes. fair: (group, selection) -> (fair
        // decimal, reference American price).
        let mut groups: FxHashMap<GroupKey, Vec<(Selection, i32, f64)>> = FxHashMap::default();
        for market in &reference.markets {
            let Some(decimal) = american_to_decimal(market.price) else {
                debug!(
                    event = %reference.matchup(),
                    market = %market.kind,
                    selection = %market.selection,
                    price = market.price,
                    "skipping reference market with invalid price"
                );
                continue;
            };
            groups
                .entry(group_key(market.kind, market.selection, market.line))
                .or_default()
                .push((market.selection, market.price, decimal));
        }

        let mut fair: FxHashMap<(GroupKey, Selection), (f64, i32)> = FxHashMap::default();
        for (key, entries) in &groups {
            if entries.len() < 2 {
                continue;
            }
            // Duplicate listings of the same outcome would corrupt the
            // de-vig; require distinct selections.
            let mut seen: Vec<Selection> = Vec::with_capacity(entries.len());
            if entries.iter().any(|(s, _, _)| {
                if seen.contains(s) {
                    true
                } else {
                    seen.push(*s);
                    false
                }
            }) {
                continue;
            }
            let decimals: Vec<f64> = entries.iter().map(|(_, _, d)| *d).collect();
            let Some(fair_prices) = no_vig_prices(&decimals) else {
                continue;
            };
            for ((selection, price, _), fair_price) in entries.iter().zip(fair_prices) {
                fair.insert((*key, *selection), (fair_price, *price));
            }
        }

        // Walk the offered side. A flipped orientation swaps home and away
        // before joining; lines travel with their selection.
        let matchup = reference.matchup();
        let league = if reference.league.is_empty() {
            candidate.league.clone()
        } else {
            reference.league.clone()
        };
        for market in &candidate.markets {
            let selection = match pair.orientation {
                Orientation::Direct => market.selection,
                Orientation::Flipped => market.selection.flipped(),
            };
            let Some(offered_decimal) = american_to_decimal(market.price) else {
                outcome.gaps.push(CalculationGap {
                    event_id: reference.event_id.clone(),
                    market: market.kind,
                    selection,
                    line: market.line,
                    reason: GapReason::InvalidPrice,
                });
                continue;
            };
            let key = group_key(market.kind, selection, market.line);
            let Some(&(fair_price, reference_price)) = fair.get(&(key, selection)) else {
                debug!(
                    event = %matchup,
                    market = %market.kind,
                    selection = %selection,
                    line = ?market.line,
                    "no de-viggable reference counterpart"
                );
                outcome.gaps.push(CalculationGap {
                    event_id: reference.event_id.clone(),
                    market: market.kind,
                    selection,
                    line: market.line,
                    reason: GapReason::MissingReferencePrice,
                });
                continue;
            };

            let ev_percent = round2((offered_decimal / fair_price - 1.0) * 100.0);
            if ev_percent.abs() > self.config.ev_sanity_limit {
                warn!(
                    event = %matchup,
                    market = %market.kind,
                    selection = %selection,
                    ev_percent,
                    "dropping implausible EV, likely stale or mismapped line"
                );
                outcome.gaps.push(CalculationGap {
                    event_id: reference.event_id.clone(),
                    market: market.kind,
                    selection,
                    line: market.line,
                    reason: GapReason::ImplausibleEv { ev_percent },
                });
                continue;
            }

            outcome.rows.push(EvRow {
                matchup: matchup.clone(),
                league: league.clone(),
                market: market.kind,
                selection,
                line: market.line,
                reference_price,
                offered_price: market.price,
                fair_price,
                ev_percent,
                start_time: reference.start_time.or(candidate.start_time),
            });
        }
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
