use crate::generator::injection::{build_search, SyntheticSearch};
use crate::workflow::config::WorkflowConfig;
use anyhow::Context;
use chirpcore::interface::{DataSegment, FilterInput, InspiralEvent};
use chirpcore::telemetry::{MetricsRecorder, MetricsSnapshot};
use chirpcore::{FilterParams, FilterResult};
use log::{info, warn};
use rayon::prelude::*;

#[derive(Debug)]
pub struct WorkflowResult {
    /// Events of every filtered segment, ordered by segment then event id.
    pub events: Vec<InspiralEvent>,
    pub skipped_segments: Vec<u32>,
    pub metrics: MetricsSnapshot,
}

enum SegmentOutcome {
    Filtered(Vec<InspiralEvent>),
    Skipped(u32),
}

/// Per-thread filter workspace and the input it reuses across segments.
struct Worker<'a> {
    params: FilterResult<FilterParams>,
    input: Option<FilterInput<'a>>,
}

#[derive(Clone)]
pub struct Runner {
    config: WorkflowConfig,
}

impl Runner {
    pub fn new(config: WorkflowConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> anyhow::Result<WorkflowResult> {
        let search = build_search(&self.config.generator)
            .context("generating synthetic segments")?
            .with_chisq_bins(self.config.num_chisq_bins)?;
        self.filter_search(&search)
    }

    /// Filters every segment of `search` on a pool of `workers` threads,
    /// each owning one filter workspace.
    pub fn filter_search(&self, search: &SyntheticSearch) -> anyhow::Result<WorkflowResult> {
        let init = self.config.to_init_params();
        let filter_config = self.config.to_filter_config();
        filter_config.validate().context("validating filter config")?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.workers)
            .build()
            .context("building filter worker pool")?;
        let metrics = MetricsRecorder::new();

        let outcomes = pool.install(|| {
            search
                .segments
                .par_iter()
                .map_init(
                    || Worker {
                        params: FilterParams::new(&init, filter_config.clone()),
                        input: None,
                    },
                    |worker, segment| filter_one(worker, search, segment, &metrics),
                )
                .collect::<anyhow::Result<Vec<_>>>()
        })?;

        let mut events = Vec::new();
        let mut skipped_segments = Vec::new();
        for outcome in outcomes {
            match outcome {
                SegmentOutcome::Filtered(found) => events.extend(found),
                SegmentOutcome::Skipped(number) => skipped_segments.push(number),
            }
        }
        events.sort_by_key(|event| (event.segment_number, event.id));

        let metrics = metrics.snapshot();
        info!(
            "filtered {} segments ({} skipped) -> {} events",
            metrics.segments_filtered, metrics.segments_skipped, metrics.events
        );
        Ok(WorkflowResult {
            events,
            skipped_segments,
            metrics,
        })
    }
}

fn filter_one<'a>(
    worker: &mut Worker<'a>,
    search: &'a SyntheticSearch,
    segment: &'a DataSegment,
    metrics: &MetricsRecorder,
) -> anyhow::Result<SegmentOutcome> {
    let params = match &mut worker.params {
        Ok(params) => params,
        Err(err) => return Err(err.clone()).context("creating filter workspace"),
    };
    let input = worker
        .input
        .get_or_insert_with(|| FilterInput::new(search.tmplt.clone(), search.fc_tmplt.clone(), segment));
    input.segment = segment;

    match params.filter_segment(input) {
        Ok(events) => {
            metrics.record_segment(events.len(), params.chisq_computed());
            Ok(SegmentOutcome::Filtered(events))
        }
        Err(err) if err.is_segment_local() => {
            warn!("skipping segment {}: {}", segment.number, err);
            metrics.record_skipped();
            Ok(SegmentOutcome::Skipped(segment.number))
        }
        Err(err) => Err(err).with_context(|| format!("filtering segment {}", segment.number)),
    }
}
