//! Run state: the single mutable record threaded through one pipeline
//! invocation.
//!
//! Created once per run with every slot empty, mutated only by the active
//! stage, never shared across concurrent runs. The log is append-only; the
//! four analysis slots are independently nullable so a failed stage
//! degrades the run instead of aborting it.

use serde::{Deserialize, Serialize};

use regimelab_core::capital::CapitalResult;
use regimelab_core::regime::RegimeFit;
use regimelab_core::sentiment::SentimentResult;
use regimelab_core::table::MarketTable;
use regimelab_core::volatility::VolatilityResult;

/// What the caller asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskKind {
    FullAnalysis,
    QuickQuery,
    GenerateReport,
}

impl TaskKind {
    pub fn name(&self) -> &'static str {
        match self {
            TaskKind::FullAnalysis => "full_analysis",
            TaskKind::QuickQuery => "quick_query",
            TaskKind::GenerateReport => "generate_report",
        }
    }
}

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    RouteTask,
    QuickResponse,
    CollectData,
    ProcessData,
    AnalyzeRegime,
    AnalyzeVolatility,
    AnalyzeSentiment,
    AnalyzeCapital,
    GenerateInsights,
    GenerateReport,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::RouteTask => "route_task",
            Stage::QuickResponse => "quick_response",
            Stage::CollectData => "collect_data",
            Stage::ProcessData => "process_data",
            Stage::AnalyzeRegime => "analyze_regime",
            Stage::AnalyzeVolatility => "analyze_volatility",
            Stage::AnalyzeSentiment => "analyze_sentiment",
            Stage::AnalyzeCapital => "analyze_capital",
            Stage::GenerateInsights => "generate_insights",
            Stage::GenerateReport => "generate_report",
        }
    }
}

/// One appended log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageLog {
    pub stage: Stage,
    pub message: String,
    pub error: bool,
}

/// Augmented table plus result for one analysis stage.
#[derive(Debug, Clone)]
pub struct VolatilityOutcome {
    pub table: MarketTable,
    pub result: VolatilityResult,
}

#[derive(Debug, Clone)]
pub struct SentimentOutcome {
    pub table: MarketTable,
    pub result: SentimentResult,
}

#[derive(Debug, Clone)]
pub struct CapitalOutcome {
    pub table: MarketTable,
    pub result: CapitalResult,
}

/// The run state record.
#[derive(Debug, Default)]
pub struct RunState {
    pub task_kind: Option<TaskKind>,
    /// Raw collected table.
    pub market: Option<MarketTable>,
    /// Feature-bearing table, the fallback for every analysis stage.
    pub processed: Option<MarketTable>,
    pub regime: Option<RegimeFit>,
    pub volatility: Option<VolatilityOutcome>,
    pub sentiment: Option<SentimentOutcome>,
    pub capital: Option<CapitalOutcome>,
    pub insights: Option<String>,
    pub report: Option<String>,
    pub response: Option<String>,
    pub log: Vec<StageLog>,
    pub error: Option<String>,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a normal log entry.
    pub fn log(&mut self, stage: Stage, message: impl Into<String>) {
        let message = message.into();
        tracing::info!(stage = stage.name(), %message);
        self.log.push(StageLog {
            stage,
            message,
            error: false,
        });
    }

    /// Append an error-tagged log entry.
    pub fn log_error(&mut self, stage: Stage, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(stage = stage.name(), %message);
        self.log.push(StageLog {
            stage,
            message,
            error: true,
        });
    }

    /// The most enriched table produced so far. Downstream stages fall back
    /// along this chain when an upstream slot is null.
    pub fn latest_table(&self) -> Option<&MarketTable> {
        self.capital
            .as_ref()
            .map(|o| &o.table)
            .or_else(|| self.sentiment.as_ref().map(|o| &o.table))
            .or_else(|| self.volatility.as_ref().map(|o| &o.table))
            .or_else(|| self.regime.as_ref().map(|f| &f.table))
            .or(self.processed.as_ref())
            .or(self.market.as_ref())
    }

    /// Stage log entries for one stage.
    pub fn entries_for(&self, stage: Stage) -> Vec<&StageLog> {
        self.log.iter().filter(|e| e.stage == stage).collect()
    }
}
