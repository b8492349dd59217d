//! Batch pipeline driver.
//!
//! logs → (normalize) → expand → aggregate → fit → batch score
//!
//! Two variants decide which rows and which impression list feed the
//! impression expansion:
//! - **Raw**: only impress rows, full impression lists.
//! - **Visible**: every row (each request implies impressions), with the
//!   visible override applied when trustworthy.
//!
//! Click rows feed the click expansion in both variants, resolved against
//! the same impression list the variant uses.

use std::fmt;

use ctr_common::{AggregatedItem, EventType, ItemEvent, ItemId, LogRecord, Result, RunId, ScoredItem};
use ctr_config::{PipelineConfig, VariantSelection};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span};

use crate::aggregate::EventCounts;
use crate::estimator::NaiveCtr;
use crate::expand::{expand_clicks, expand_impressions};
use crate::normalize::NormalizedLog;

/// Concrete impression handling for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineVariant {
    Raw,
    Visible,
}

impl PipelineVariant {
    /// Resolve a config selection against a log batch. `Auto` picks the
    /// visible variant iff some row carries an override.
    pub fn resolve(selection: VariantSelection, logs: &[LogRecord]) -> Self {
        match selection {
            VariantSelection::Raw => PipelineVariant::Raw,
            VariantSelection::Visible => PipelineVariant::Visible,
            VariantSelection::Auto => {
                if logs.iter().any(|r| r.impressions_visible.is_some()) {
                    PipelineVariant::Visible
                } else {
                    PipelineVariant::Raw
                }
            }
        }
    }

    /// Resolve a config selection for a table whose schema may carry a
    /// visible-impressions column. `Auto` picks the visible variant iff the
    /// column exists, even when every value in it is null.
    pub fn for_column(selection: VariantSelection, has_visible_column: bool) -> Self {
        match selection {
            VariantSelection::Raw => PipelineVariant::Raw,
            VariantSelection::Visible => PipelineVariant::Visible,
            VariantSelection::Auto if has_visible_column => PipelineVariant::Visible,
            VariantSelection::Auto => PipelineVariant::Raw,
        }
    }

    /// View for the impression pass. Logs a rejected override.
    fn view(self, record: &LogRecord) -> NormalizedLog<'_> {
        match self {
            PipelineVariant::Raw => NormalizedLog::raw(record),
            PipelineVariant::Visible => NormalizedLog::visible(record),
        }
    }

    /// View for the click pass. The impression pass already logged.
    fn click_view(self, record: &LogRecord) -> NormalizedLog<'_> {
        match self {
            PipelineVariant::Raw => NormalizedLog::raw(record),
            PipelineVariant::Visible => NormalizedLog::select_visible(record),
        }
    }

    fn expands_impressions(self, row: &NormalizedLog<'_>) -> bool {
        match self {
            PipelineVariant::Raw => row.event_type == EventType::Impress,
            PipelineVariant::Visible => true,
        }
    }
}

impl fmt::Display for PipelineVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineVariant::Raw => write!(f, "raw"),
            PipelineVariant::Visible => write!(f, "visible"),
        }
    }
}

/// Item events of a batch: the impression block followed by the click
/// block. Lazy.
pub fn item_events(
    logs: &[LogRecord],
    variant: PipelineVariant,
) -> impl Iterator<Item = ItemEvent> + '_ {
    let impress_rows = logs
        .iter()
        .map(move |r| variant.view(r))
        .filter(move |row| variant.expands_impressions(row));
    let click_rows = logs.iter().map(move |r| variant.click_view(r));

    expand_impressions(impress_rows).chain(expand_clicks(click_rows))
}

/// Counters for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSummary {
    pub run_id: RunId,
    pub variant: PipelineVariant,
    pub log_rows: usize,
    pub impression_events: u64,
    pub click_events: u64,
    /// Click events whose position resolved to -1.
    pub unresolved_clicks: u64,
    pub items: usize,
    pub scored: usize,
}

/// Everything a full run produces.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub aggregated: Vec<AggregatedItem>,
    pub model: NaiveCtr,
    pub scored: Vec<ScoredItem>,
    pub summary: PipelineSummary,
}

/// Config-driven pipeline.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn variant_for(&self, logs: &[LogRecord]) -> PipelineVariant {
        PipelineVariant::resolve(self.config.variant, logs)
    }

    /// Materialized item-event table.
    pub fn build_events(&self, logs: &[LogRecord]) -> Vec<ItemEvent> {
        item_events(logs, self.variant_for(logs)).collect()
    }

    /// Per-item counts, without materializing the event table.
    pub fn aggregate(&self, logs: &[LogRecord]) -> Vec<AggregatedItem> {
        let mut counts = EventCounts::new();
        counts.extend(item_events(logs, self.variant_for(logs)));
        counts.into_rows()
    }

    /// Fit an estimator on a log batch.
    pub fn fit(&self, logs: &[LogRecord]) -> NaiveCtr {
        let mut model = NaiveCtr::with_config(&self.config);
        model.fit_aggregated(&self.aggregate(logs));
        model
    }

    /// Full run: aggregate, fit, and score `item_ids`.
    pub fn run(&self, logs: &[LogRecord], item_ids: &[ItemId]) -> Result<PipelineOutput> {
        self.run_variant(logs, item_ids, self.variant_for(logs))
    }

    /// Full run with the variant already resolved, e.g. from a table schema.
    pub fn run_variant(
        &self,
        logs: &[LogRecord],
        item_ids: &[ItemId],
        variant: PipelineVariant,
    ) -> Result<PipelineOutput> {
        let run_id = RunId::new();
        let span = info_span!("pipeline_run", run_id = %run_id, variant = %variant);
        let _guard = span.enter();

        info!(log_rows = logs.len(), "starting pipeline run");

        let mut impression_events = 0u64;
        let mut click_events = 0u64;
        let mut unresolved_clicks = 0u64;
        let mut counts = EventCounts::new();
        for event in item_events(logs, variant) {
            match event.event_type {
                EventType::Impress => impression_events += 1,
                EventType::Click => {
                    click_events += 1;
                    if !event.position.is_resolved() {
                        unresolved_clicks += 1;
                    }
                }
            }
            counts.record(&event);
        }
        debug!(impression_events, click_events, unresolved_clicks, "expanded item events");

        let aggregated = counts.into_rows();
        let mut model = NaiveCtr::with_config(&self.config);
        model.fit_aggregated(&aggregated);
        let scored = model.batch_predict(item_ids)?;

        let summary = PipelineSummary {
            run_id,
            variant,
            log_rows: logs.len(),
            impression_events,
            click_events,
            unresolved_clicks,
            items: aggregated.len(),
            scored: scored.len(),
        };
        info!(
            items = summary.items,
            scored = summary.scored,
            unresolved_clicks,
            "pipeline run complete"
        );

        Ok(PipelineOutput {
            aggregated,
            model,
            scored,
            summary,
        })
    }
}
