//! RegimeLab Agent — workflow orchestration over the analysis engines.
//!
//! This crate owns the run state, the collaborator seams (language model,
//! market data source), pipeline configuration and the state machine that
//! sequences collection → feature derivation → the four analysis engines →
//! insight and report generation, with a short-circuit path for quick
//! queries.

pub mod collab;
pub mod config;
pub mod snapshot;
pub mod state;
pub mod workflow;

pub use collab::{CollabError, CsvSource, LanguageModel, MarketDataSource};
pub use config::{ConfigError, PipelineConfig};
pub use snapshot::KeyStats;
pub use state::{RunState, Stage, StageLog, TaskKind};
pub use workflow::Pipeline;
