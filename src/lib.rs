//! OddsEdge - sportsbook event matching and expected-value calculation.
//!
//! This crate provides:
//! - Team-name normalization (league suffixes, club prefixes, alias mapping)
//! - Fuzzy cross-book event matching with orientation detection
//! - No-vig fair pricing and EV calculation per market group
//! - Pipeline orchestration with per-step error isolation
//! - Batch scoring parallelized via rayon
//! - HTTP JSON feed clients for event sources

pub mod clients;
pub mod config;
pub mod ev;
pub mod matching;
pub mod normalize;
pub mod odds;
pub mod pipeline;
pub mod types;

pub use clients::JsonFeedClient;
pub use config::{EvConfig, MatchConfig, PipelineConfig};
pub use ev::{EvCalculator, EvOutcome};
pub use matching::{token_set_ratio, MatchOutcome, Matcher};
pub use normalize::Normalizer;
pub use pipeline::{EventSource, PipelineError, PipelineRunner};
pub use types::*;
