//! Batch Coordinator
//!
//! Fans representative tasks out to a pool of worker threads over crossbeam
//! channels, logs outcomes as they complete, and merges every task's
//! subgraph into the output graph in submission order.

pub mod processor;

pub use processor::{SegmentProcessor, TaskOutcome, TaskStatus, UNRESOLVED_TIMESTAMP};

use crossbeam_channel::unbounded;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use tracing::{debug, error, info};

use crate::annotation::{AnnotationGraph, Subgraph};
use crate::capture::FrameSource;
use crate::config::AnnotatorConfig;
use crate::storage::{InputSet, Representative};
use crate::vision::OcrEngine;

/// Per-run options
#[derive(Debug, Clone, Default)]
pub struct AnnotateOptions {
    /// Segment label allow-list; empty processes all
    pub tf_label: Vec<String>,
    /// Worker threads, at least one
    pub workers: usize,
}

impl AnnotateOptions {
    pub fn from_config(config: &AnnotatorConfig) -> Self {
        Self {
            tf_label: config.batch.tf_label.clone(),
            workers: config.batch.effective_workers(),
        }
    }
}

/// Counters for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub segments: usize,
    pub skipped_segments: usize,
    pub tasks: usize,
    pub annotated: usize,
    pub empty: usize,
    pub unresolved: usize,
    pub failed: usize,
    pub tokens: usize,
    pub dropped_words: usize,
    pub fallbacks: usize,
    pub skipped_units: usize,
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} segments ({} skipped), {} tasks: {} annotated, {} empty, {} unresolved, {} failed; \
             {} tokens, {} words dropped, {} offset fallbacks, {} regions skipped",
            self.segments,
            self.skipped_segments,
            self.tasks,
            self.annotated,
            self.empty,
            self.unresolved,
            self.failed,
            self.tokens,
            self.dropped_words,
            self.fallbacks,
            self.skipped_units
        )
    }
}

/// Result of [`Annotator::annotate`]
#[derive(Debug, Clone)]
pub struct AnnotationRun {
    pub graph: AnnotationGraph,
    /// One per task, in submission order
    pub outcomes: Vec<TaskOutcome>,
    pub summary: RunSummary,
}

/// Batch entry point
pub struct Annotator {
    processor: SegmentProcessor,
}

impl Annotator {
    pub fn new(frames: Arc<dyn FrameSource>, ocr: Arc<dyn OcrEngine>, config: &AnnotatorConfig) -> Self {
        Self {
            processor: SegmentProcessor::new(frames, ocr, config.annotation.clone()),
        }
    }

    /// Annotate every matching segment of `input` into a new view.
    ///
    /// Always completes; failures surface through outcomes and logs.
    pub fn annotate(&self, input: &InputSet, options: &AnnotateOptions) -> AnnotationRun {
        let mut summary = RunSummary::default();
        let mut tasks = Vec::new();
        let index = input.index();

        for segment in input.segments() {
            summary.segments += 1;
            if !segment.matches_labels(&options.tf_label) {
                debug!("Skipping segment {} with label {:?}", segment.id, segment.label);
                summary.skipped_segments += 1;
                continue;
            }
            tasks.extend(index.representatives(&segment));
        }
        summary.tasks = tasks.len();

        let workers = options.workers.clamp(1, tasks.len().max(1));
        info!("Annotating {} representatives with {} workers", tasks.len(), workers);
        let results = self.run_tasks(&tasks, workers);

        let mut graph = AnnotationGraph::new(format!("{}_ocr", input.view_id));
        let mut outcomes = Vec::with_capacity(results.len());
        for (outcome, subgraph) in results {
            summary.record(&outcome);
            graph.merge(subgraph);
            outcomes.push(outcome);
        }

        AnnotationRun {
            graph,
            outcomes,
            summary,
        }
    }

    /// Run all tasks, returning results in submission order
    fn run_tasks(&self, tasks: &[Representative], workers: usize) -> Vec<(TaskOutcome, Subgraph)> {
        let (job_tx, job_rx) = unbounded::<usize>();
        let (result_tx, result_rx) = unbounded::<(usize, TaskOutcome, Subgraph)>();
        for index in 0..tasks.len() {
            let _ = job_tx.send(index);
        }
        drop(job_tx);

        let mut slots: Vec<Option<(TaskOutcome, Subgraph)>> = vec![None; tasks.len()];

        thread::scope(|scope| {
            for worker in 0..workers {
                let job_rx = job_rx.clone();
                let result_tx = result_tx.clone();
                scope.spawn(move || {
                    for index in job_rx.iter() {
                        let (outcome, subgraph) = self.run_isolated(&tasks[index]);
                        if result_tx.send((index, outcome, subgraph)).is_err() {
                            break;
                        }
                    }
                    debug!("Worker {} finished", worker);
                });
            }
            drop(result_tx);

            for (index, outcome, subgraph) in result_rx.iter() {
                log_outcome(&outcome);
                slots[index] = Some((outcome, subgraph));
            }
        });

        slots
            .into_iter()
            .zip(tasks)
            .map(|(slot, rep)| {
                slot.unwrap_or_else(|| {
                    error!("No result for representative {}", rep.label());
                    (TaskOutcome::failed(rep, UNRESOLVED_TIMESTAMP), Subgraph::new())
                })
            })
            .collect()
    }

    fn run_isolated(&self, representative: &Representative) -> (TaskOutcome, Subgraph) {
        match catch_unwind(AssertUnwindSafe(|| self.processor.process(representative))) {
            Ok(result) => result,
            Err(_) => {
                error!("Task for representative {} panicked", representative.label());
                (
                    TaskOutcome::failed(representative, UNRESOLVED_TIMESTAMP),
                    Subgraph::new(),
                )
            }
        }
    }
}

impl RunSummary {
    fn record(&mut self, outcome: &TaskOutcome) {
        match outcome.status {
            TaskStatus::Annotated => self.annotated += 1,
            TaskStatus::Empty => self.empty += 1,
            TaskStatus::Unresolved => self.unresolved += 1,
            TaskStatus::Failed => self.failed += 1,
        }
        self.tokens += outcome.build.tokens;
        self.dropped_words += outcome.build.dropped_words;
        self.fallbacks += outcome.build.fallbacks;
        self.skipped_units += outcome.build.skipped_units;
    }
}

fn log_outcome(outcome: &TaskOutcome) {
    let text = match &outcome.text {
        Some(text) => serde_json::to_string(text).unwrap_or_else(|_| format!("{:?}", text)),
        None => "none".to_string(),
    };
    info!(
        "Processed timepoint: {}, recognized text: {}",
        outcome.timestamp_ms, text
    );
}
