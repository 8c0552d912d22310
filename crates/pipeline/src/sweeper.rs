//! Background reconciliation of in-flight video tasks.
//!
//! Every tick, each non-terminal video candidate with a task handle is
//! polled once through the [`TaskTracker`]. Tasks past the polling guard
//! are failed by the tracker itself, so nothing stays in flight forever.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use storyreel_core::candidate::CandidateStatus;
use tokio_util::sync::CancellationToken;

use crate::error::WorkflowError;
use crate::store::WorkflowStore;
use crate::tracker::TaskTracker;

/// Counts from one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub polled: usize,
    pub completed: usize,
    pub failed: usize,
    pub errors: usize,
}

pub struct TaskSweeper {
    store: Arc<dyn WorkflowStore>,
    tracker: Arc<TaskTracker>,
    interval: Duration,
}

impl TaskSweeper {
    /// Sweep at the tracker's poll interval.
    pub fn new(store: Arc<dyn WorkflowStore>, tracker: Arc<TaskTracker>) -> Self {
        let interval = tracker.policy().interval;
        Self {
            store,
            tracker,
            interval,
        }
    }

    /// Run the sweep loop until the cancellation token is triggered.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        tracing::info!(
            interval_ms = self.interval.as_millis() as u64,
            "Task sweeper started",
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Task sweeper shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    match self.sweep_once().await {
                        Ok(report) if report.polled > 0 => {
                            tracing::info!(
                                polled = report.polled,
                                completed = report.completed,
                                failed = report.failed,
                                errors = report.errors,
                                "Sweep finished",
                            );
                        }
                        Ok(_) => tracing::debug!("Sweep found no in-flight tasks"),
                        Err(e) => tracing::error!(error = %e, "Sweep cycle failed"),
                    }
                }
            }
        }
    }

    /// Poll every in-flight video task once.
    ///
    /// A failure on one task is counted and logged; the sweep moves on.
    pub async fn sweep_once(&self) -> Result<SweepReport, WorkflowError> {
        let in_flight = self.store.list_in_flight_videos().await?;
        let mut report = SweepReport::default();

        for candidate in in_flight {
            let Some(handle) = candidate.task_handle.as_deref() else {
                continue;
            };
            report.polled += 1;
            match self.tracker.poll(handle).await {
                Ok(outcome) => {
                    if outcome.upstream_error.is_some() {
                        report.errors += 1;
                    }
                    match outcome.candidate.status {
                        CandidateStatus::Completed => report.completed += 1,
                        CandidateStatus::Failed => report.failed += 1,
                        _ => {}
                    }
                }
                Err(e) => {
                    report.errors += 1;
                    tracing::error!(
                        candidate_id = candidate.id,
                        task_handle = handle,
                        error = %e,
                        "Failed to reconcile video task",
                    );
                }
            }
        }

        Ok(report)
    }
}
