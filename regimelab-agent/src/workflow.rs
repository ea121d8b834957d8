//! The analysis pipeline state machine.
//!
//! RouteTask → {QuickResponse | CollectData → ProcessData → AnalyzeRegime →
//! fan-out {AnalyzeVolatility, AnalyzeSentiment, AnalyzeCapital} →
//! GenerateInsights → GenerateReport} → terminal.
//!
//! Regime runs before the fan-out because its labels condition the other
//! engines' segment statistics; the three remaining engines depend only on
//! ProcessData's output and run as parallel tasks joined with per-task
//! failure tolerance.
//!
//! Every stage is wrapped in a failure boundary: an engine error nulls that
//! stage's slot, appends an error-tagged log entry and the run continues.
//! `run` always returns a `RunState`; a populated `error` field plus a
//! missing report is the signal of partial failure.

use regimelab_core::features::derive_features;
use regimelab_core::regime::RegimeClassifier;
use regimelab_core::{capital, sentiment, volatility};

use crate::collab::{LanguageModel, MarketDataSource};
use crate::config::PipelineConfig;
use crate::snapshot::KeyStats;
use crate::state::{
    CapitalOutcome, RunState, SentimentOutcome, Stage, TaskKind, VolatilityOutcome,
};

const ROUTE_SYSTEM: &str = "You are a task router for a market research agent. \
Classify the user request as one of: full_analysis (complete data collection \
and analysis), quick_query (a simple question), generate_report (produce a \
report). Reply with the task type only.";

const QUICK_SYSTEM: &str =
    "You are a market analysis expert. Answer the user's question concisely.";

const INSIGHTS_SYSTEM: &str = "You are a market analyst. Given the statistics \
snapshot below, write a short interpretation of current market conditions.";

const REPORT_SYSTEM: &str = "You are a market research writer. Given the \
statistics snapshot and analyst interpretation below, write a full market \
analysis report in markdown.";

/// The pipeline: collaborators plus engine configuration.
pub struct Pipeline<'a> {
    source: &'a dyn MarketDataSource,
    model: &'a dyn LanguageModel,
    config: PipelineConfig,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        source: &'a dyn MarketDataSource,
        model: &'a dyn LanguageModel,
        config: PipelineConfig,
    ) -> Self {
        Self {
            source,
            model,
            config,
        }
    }

    /// Execute one run. Exactly one terminal transition; no stage runs
    /// twice; never panics across this boundary.
    pub fn run(&self, input: &str) -> RunState {
        let span = tracing::info_span!("pipeline_run", config = %self.config.fingerprint());
        let _guard = span.enter();

        let mut state = RunState::new();
        let kind = self.route_task(input, &mut state);
        state.task_kind = Some(kind);

        if kind == TaskKind::QuickQuery {
            self.quick_response(input, &mut state);
            return state;
        }

        self.collect_data(&mut state);
        self.process_data(&mut state);
        self.analyze_regime(&mut state);
        self.analyze_fan_out(&mut state);
        self.generate_insights(&mut state);
        self.generate_report(&mut state);
        state
    }

    /// Conversational entry point: run and return just the response text.
    pub fn chat(&self, message: &str) -> String {
        self.run(message)
            .response
            .unwrap_or_else(|| "no response".to_string())
    }

    fn route_task(&self, input: &str, state: &mut RunState) -> TaskKind {
        let kind = match self.model.complete(ROUTE_SYSTEM, input) {
            Ok(reply) => {
                let reply = reply.to_lowercase();
                if reply.contains("full") {
                    TaskKind::FullAnalysis
                } else if reply.contains("report") {
                    TaskKind::GenerateReport
                } else {
                    TaskKind::QuickQuery
                }
            }
            Err(err) => {
                state.log_error(
                    Stage::RouteTask,
                    format!("routing failed, defaulting to full_analysis: {err}"),
                );
                TaskKind::FullAnalysis
            }
        };
        state.log(Stage::RouteTask, format!("task kind: {}", kind.name()));
        kind
    }

    fn quick_response(&self, input: &str, state: &mut RunState) {
        match self.model.complete(QUICK_SYSTEM, input) {
            Ok(reply) => {
                state.log(Stage::QuickResponse, "answered");
                state.response = Some(reply);
            }
            Err(err) => {
                state.log_error(Stage::QuickResponse, format!("answer failed: {err}"));
                state.response = Some(format!("unable to answer: {err}"));
            }
        }
    }

    fn collect_data(&self, state: &mut RunState) {
        match self.source.collect() {
            Ok(table) => {
                state.log(
                    Stage::CollectData,
                    format!("collected {} rows", table.len()),
                );
                state.market = Some(table);
            }
            Err(err) => {
                state.log_error(Stage::CollectData, format!("collection failed: {err}"));
                state.error = Some(format!("data collection failed: {err}"));
            }
        }
    }

    fn process_data(&self, state: &mut RunState) {
        let Some(market) = state.market.as_ref() else {
            state.log_error(Stage::ProcessData, "skipped: no market data");
            return;
        };
        match derive_features(market) {
            Ok(processed) => {
                state.log(
                    Stage::ProcessData,
                    format!("derived {} columns", processed.column_count()),
                );
                state.processed = Some(processed);
            }
            Err(err) => {
                state.log_error(Stage::ProcessData, format!("feature derivation failed: {err}"));
                state.error = Some(format!("data processing failed: {err}"));
            }
        }
    }

    fn analyze_regime(&self, state: &mut RunState) {
        let Some(processed) = state.processed.as_ref() else {
            state.log_error(Stage::AnalyzeRegime, "skipped: no processed data");
            return;
        };
        let mut classifier = RegimeClassifier::new(self.config.regime.clone());
        match classifier.fit(processed) {
            Ok(fit) => {
                state.log(
                    Stage::AnalyzeRegime,
                    format!("mapped {} clusters", fit.mapping.len()),
                );
                state.regime = Some(fit);
            }
            Err(err) => {
                state.log_error(Stage::AnalyzeRegime, format!("classification failed: {err}"));
            }
        }
    }

    /// Fan the three regime-independent engines out and join, tolerating
    /// per-task failure. Each receives the regime-labeled table when the
    /// classifier succeeded, the processed table otherwise.
    fn analyze_fan_out(&self, state: &mut RunState) {
        let base = match (state.regime.as_ref(), state.processed.as_ref()) {
            (Some(fit), _) => &fit.table,
            (None, Some(processed)) => processed,
            (None, None) => {
                state.log_error(Stage::AnalyzeVolatility, "skipped: no processed data");
                state.log_error(Stage::AnalyzeSentiment, "skipped: no processed data");
                state.log_error(Stage::AnalyzeCapital, "skipped: no processed data");
                return;
            }
        };

        let (vol, (sent, cap)) = rayon::join(
            || volatility::process(base, &self.config.volatility),
            || {
                rayon::join(
                    || sentiment::process(base, &self.config.sentiment),
                    || capital::process(base, &self.config.capital),
                )
            },
        );

        // Join complete; append outcomes in fixed stage order so the log is
        // deterministic regardless of scheduling.
        match vol {
            Ok((table, result)) => {
                state.log(Stage::AnalyzeVolatility, "volatility analysis complete");
                state.volatility = Some(VolatilityOutcome { table, result });
            }
            Err(err) => {
                state.log_error(
                    Stage::AnalyzeVolatility,
                    format!("volatility analysis failed: {err}"),
                );
            }
        }
        match sent {
            Ok((table, result)) => {
                state.log(Stage::AnalyzeSentiment, "sentiment analysis complete");
                state.sentiment = Some(SentimentOutcome { table, result });
            }
            Err(err) => {
                state.log_error(
                    Stage::AnalyzeSentiment,
                    format!("sentiment analysis failed: {err}"),
                );
            }
        }
        match cap {
            Ok((table, result)) => {
                state.log(Stage::AnalyzeCapital, "capital-flow analysis complete");
                state.capital = Some(CapitalOutcome { table, result });
            }
            Err(err) => {
                state.log_error(
                    Stage::AnalyzeCapital,
                    format!("capital-flow analysis failed: {err}"),
                );
            }
        }
    }

    /// Merge the fan-out's derived columns into one table for the
    /// downstream consumers. Falls back along the enrichment chain when a
    /// slot is null.
    fn merged_table(&self, state: &RunState) -> Option<regimelab_core::MarketTable> {
        let mut merged = state
            .regime
            .as_ref()
            .map(|f| f.table.clone())
            .or_else(|| state.processed.clone())?;
        for table in [
            state.volatility.as_ref().map(|o| &o.table),
            state.sentiment.as_ref().map(|o| &o.table),
            state.capital.as_ref().map(|o| &o.table),
        ]
        .into_iter()
        .flatten()
        {
            for name in table.column_names() {
                if merged.has_column(name) {
                    continue;
                }
                match table.column(name) {
                    Some(regimelab_core::Column::Float(values)) => {
                        let _ = merged.set_float(name.to_string(), values.clone());
                    }
                    Some(regimelab_core::Column::Category(values)) => {
                        let _ = merged.set_category(name.to_string(), values.clone());
                    }
                    None => {}
                }
            }
        }
        Some(merged)
    }

    fn generate_insights(&self, state: &mut RunState) {
        let Some(table) = self.merged_table(state) else {
            state.log_error(Stage::GenerateInsights, "skipped: no analysis table");
            return;
        };
        let Some(stats) = KeyStats::from_table(&table) else {
            state.log_error(Stage::GenerateInsights, "skipped: empty analysis table");
            return;
        };
        match self.model.complete(INSIGHTS_SYSTEM, &stats.render()) {
            Ok(text) => {
                state.log(Stage::GenerateInsights, "insights generated");
                state.insights = Some(text);
            }
            Err(err) => {
                state.log_error(
                    Stage::GenerateInsights,
                    format!("insight generation failed: {err}"),
                );
            }
        }
    }

    fn generate_report(&self, state: &mut RunState) {
        let Some(table) = self.merged_table(state) else {
            state.log_error(Stage::GenerateReport, "skipped: no analysis table");
            state.response = Some("report unavailable: no analysis data".into());
            return;
        };
        let Some(stats) = KeyStats::from_table(&table) else {
            state.log_error(Stage::GenerateReport, "skipped: empty analysis table");
            state.response = Some("report unavailable: empty analysis data".into());
            return;
        };
        let mut prompt = stats.render();
        if let Some(insights) = &state.insights {
            prompt.push_str("\n\nAnalyst interpretation:\n");
            prompt.push_str(insights);
        }
        match self.model.complete(REPORT_SYSTEM, &prompt) {
            Ok(report) => {
                state.log(Stage::GenerateReport, "report generated");
                let preview: String = report.chars().take(500).collect();
                state.response = Some(format!("report generated\n\n{preview}"));
                state.report = Some(report);
            }
            Err(err) => {
                state.log_error(Stage::GenerateReport, format!("report failed: {err}"));
                state.response = Some(format!("report generation failed: {err}"));
            }
        }
    }
}
