//! Pipeline orchestration.
//!
//! Sequences fetch -> match -> calculate for one run. The two event sources
//! are fetched concurrently and joined before the CPU stages start. Every
//! step is independently recorded: a failing step lands in the run's step
//! errors and the pipeline carries on with whatever data it has, so partial
//! results always come back instead of an all-or-nothing failure. The only
//! hard stop is both inputs coming back empty.

use crate::config::PipelineConfig;
use crate::ev::EvCalculator;
use crate::matching::Matcher;
use crate::types::{PipelineRun, PipelineStep, RawEvent, StepError};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

/// Pipeline-level failures. Per-item conditions (unmatched events,
/// calculation gaps, ambiguous orientations) are diagnostics, not errors.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{source_name} did not supply events: {message}")]
    InputUnavailable {
        source_name: String,
        message: String,
    },
    #[error("no input events from either source")]
    NoInput,
}

/// A collaborator that supplies raw events: an odds-feed API client, a
/// scraper bridge, or an in-memory fixture in tests.
#[async_trait]
pub trait EventSource: Send + Sync {
    fn name(&self) -> &str;
    async fn fetch_events(&self) -> anyhow::Result<Vec<RawEvent>>;
}

/// Runs the fetch -> match -> calculate sequence and aggregates one
/// `PipelineRun` per invocation.
pub struct PipelineRunner {
    reference: Arc<dyn EventSource>,
    candidates: Arc<dyn EventSource>,
    config: PipelineConfig,
}

impl PipelineRunner {
    pub fn new(
        reference: Arc<dyn EventSource>,
        candidates: Arc<dyn EventSource>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            reference,
            candidates,
            config,
        }
    }

    pub async fn run(&self) -> PipelineRun {
        let mut run = PipelineRun::new();
        info!(run_id = %run.id, "pipeline run starting");

        let (reference_result, candidate_result) = tokio::join!(
            self.reference.fetch_events(),
            self.candidates.fetch_events()
        );

        let reference = self.record_fetch(
            &mut run,
            PipelineStep::FetchReference,
            self.reference.name(),
            reference_result,
        );
        run.steps.fetched = !run
            .diagnostics
            .step_errors
            .iter()
            .any(|e| e.step == PipelineStep::FetchReference);

        let candidates = self.record_fetch(
            &mut run,
            PipelineStep::FetchCandidates,
            self.candidates.name(),
            candidate_result,
        );
        run.steps.scraped = !run
            .diagnostics
            .step_errors
            .iter()
            .any(|e| e.step == PipelineStep::FetchCandidates);

        run.reference_in = reference.len();
        run.candidates_in = candidates.len();
        info!(
            reference_in = run.reference_in,
            candidates_in = run.candidates_in,
            "fetch complete"
        );

        if reference.is_empty() && candidates.is_empty() {
            error!(run_id = %run.id, "nothing to do");
            run.diagnostics.step_errors.push(StepError {
                step: PipelineStep::Match,
                message: PipelineError::NoInput.to_string(),
            });
            return run;
        }

        let matcher = Matcher::new(self.config.matching.clone());
        let matched = matcher.match_events(&reference, &candidates);
        run.matched = matched.matches.len();
        run.steps.matched = true;
        run.diagnostics.unmatched_reference = matched.unmatched_reference;
        run.diagnostics.excluded = matched.excluded;
        run.diagnostics.ambiguous = matched.ambiguous;
        info!(
            candidates_in = run.candidates_in,
            matched_out = run.matched,
            "match step complete"
        );

        let calculator = EvCalculator::new(self.config.ev.clone());
        let ev = calculator.calculate(&matched.matches);
        run.steps.calculated = true;
        info!(
            matched_in = run.matched,
            rows_out = ev.rows.len(),
            gaps = ev.gaps.len(),
            "calculate step complete"
        );
        run.rows = ev.rows;
        run.diagnostics.calculation_gaps = ev.gaps;

        info!(
            run_id = %run.id,
            fetched = run.reference_in + run.candidates_in,
            matched = run.matched,
            rows = run.rows.len(),
            unmatched = run.diagnostics.unmatched_reference.len(),
            ambiguous = run.diagnostics.ambiguous,
            errors = run.diagnostics.step_errors.len(),
            "pipeline run complete"
        );
        run
    }

    fn record_fetch(
        &self,
        run: &mut PipelineRun,
        step: PipelineStep,
        source_name: &str,
        result: anyhow::Result<Vec<RawEvent>>,
    ) -> Vec<RawEvent> {
        match result {
            Ok(events) => {
                info!(step = %step, source = source_name, count = events.len(), "fetched events");
                events
            }
            Err(err) => {
                let pipeline_err = PipelineError::InputUnavailable {
                    source_name: source_name.to_string(),
                    message: err.to_string(),
                };
                error!(step = %step, source = source_name, error = %pipeline_err, "fetch failed");
                run.diagnostics.step_errors.push(StepError {
                    step,
                    message: pipeline_err.to_string(),
                });
                Vec::new()
            }
        }
    }
}
