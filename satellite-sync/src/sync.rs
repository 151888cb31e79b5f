use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use satellite_common::retry::{RetryError, RetryPolicy};
use satellite_common::store::SatelliteStore;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument};

use crate::error::{PersistenceError, PipelineError, SyncError};
use crate::inflight::InFlight;
use crate::outcome::{Outcome, OutcomeCounters, SyncSummary};
use crate::planner::{FetchPlan, DEFAULT_MAX_FETCH_SIZE, DEFAULT_MAX_PAGE_SIZE};
use crate::reconciler::Reconciler;
use crate::source::RecordSource;

/// Bounds on how much work a sync may have going at once.
#[derive(Debug, Clone, Copy)]
pub struct SyncLimits {
    /// Largest page the catalogue will serve, and the upper bound for a caller's chunk size.
    pub max_page_size: u32,
    /// Most satellites a single sync may request.
    pub max_fetch_size: u32,
    /// Maximum number of catalogue pages being fetched at the same time.
    pub max_concurrent_fetches: usize,
    /// Maximum number of records being reconciled at the same time.
    pub max_concurrent_reconciliations: usize,
}

impl Default for SyncLimits {
    fn default() -> Self {
        Self {
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            max_fetch_size: DEFAULT_MAX_FETCH_SIZE,
            max_concurrent_fetches: 4,
            max_concurrent_reconciliations: 32,
        }
    }
}

/// Pulls satellites from the catalogue and reconciles them into the local store.
pub struct SatelliteSync {
    /// Where catalogue pages are fetched from.
    source: Arc<dyn RecordSource + Send + Sync>,
    /// Where reconciled satellites are written to.
    store: Arc<dyn SatelliteStore + Send + Sync>,
    limits: SyncLimits,
    /// Governs retries of a whole sync attempt.
    retry_policy: RetryPolicy,
}

type Reconciliation = Result<Outcome, PersistenceError>;

impl SatelliteSync {
    pub fn new(
        source: Arc<dyn RecordSource + Send + Sync>,
        store: Arc<dyn SatelliteStore + Send + Sync>,
        limits: SyncLimits,
        retry_policy: RetryPolicy,
    ) -> Self {
        Self {
            source,
            store,
            limits,
            retry_policy,
        }
    }

    /// Fetch `total` satellites from the catalogue in pages of `chunk_size`, and create or
    /// update each of them locally.
    ///
    /// Any failure while fetching or writing aborts the attempt and the whole sync is
    /// retried according to the retry policy. Writes made by failed attempts stay in place;
    /// the returned counts are those of the attempt that succeeded.
    #[instrument(skip(self))]
    pub async fn fetch_and_reconcile(
        &self,
        total: u32,
        chunk_size: Option<u32>,
    ) -> Result<SyncSummary, SyncError> {
        let plan = FetchPlan::new(
            total,
            chunk_size,
            self.limits.max_page_size,
            self.limits.max_fetch_size,
        )?;

        info!(
            pages = plan.pages().len(),
            page_size = plan.page_size(),
            "starting satellite sync"
        );
        let started = Instant::now();

        let result = self
            .retry_policy
            .run(|attempt| self.run_attempt(&plan, attempt))
            .await;

        metrics::histogram!("satellite_sync_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        match result {
            Ok(summary) => {
                info!(
                    new_count = summary.new_count,
                    updated_count = summary.updated_count,
                    "satellite sync completed"
                );
                Ok(summary)
            }
            Err(RetryError::Exhausted {
                attempts,
                last_error,
            }) => {
                error!(attempts, "satellite sync retries exhausted: {}", last_error);
                metrics::counter!("satellite_sync_failures_total", "reason" => "exhausted")
                    .increment(1);
                Err(SyncError::ExternalSourceExhausted { attempts })
            }
            Err(RetryError::Permanent(error)) => {
                error!("satellite sync failed: {}", error);
                metrics::counter!("satellite_sync_failures_total", "reason" => "internal")
                    .increment(1);
                Err(SyncError::ExternalSourceError(error.to_string()))
            }
        }
    }

    /// Run a single attempt with its own counters and in-flight registry.
    async fn run_attempt(&self, plan: &FetchPlan, attempt: u32) -> Result<SyncSummary, PipelineError> {
        debug!(attempt, "starting sync attempt");
        if attempt > 1 {
            metrics::counter!("satellite_sync_retries_total").increment(1);
        }

        let counters = Arc::new(OutcomeCounters::default());
        let reconciler = Arc::new(Reconciler::new(self.store.clone(), counters.clone()));
        let in_flight: Arc<InFlight<i32, Reconciliation>> = Arc::new(InFlight::new());
        let workers = Arc::new(Semaphore::new(
            self.limits.max_concurrent_reconciliations.max(1),
        ));
        // Dropping the set on an early return aborts whatever is still running.
        let mut tasks: JoinSet<Reconciliation> = JoinSet::new();

        let mut pages = stream::iter(plan.pages().iter().copied())
            .map(|request| {
                let source = self.source.clone();
                async move { source.fetch_page(request.page, request.size).await }
            })
            .buffer_unordered(self.limits.max_concurrent_fetches.max(1));

        // Finished reconciliations are checked before the next page, so one failed record
        // stops the attempt without walking the rest of the plan.
        loop {
            tokio::select! {
                biased;

                Some(joined) = tasks.join_next() => {
                    joined.map_err(|error| PipelineError::WorkerFailed(error.to_string()))??;
                }
                page = pages.next() => {
                    let Some(page) = page else { break };
                    let page = page?;
                    debug!(
                        attempt,
                        records = page.member.len(),
                        total_items = page.total_items,
                        "received catalogue page"
                    );

                    for record in page.member {
                        let permit = workers
                            .clone()
                            .acquire_owned()
                            .await
                            .map_err(|error| PipelineError::WorkerFailed(error.to_string()))?;
                        let reconciler = reconciler.clone();
                        let in_flight = in_flight.clone();

                        tasks.spawn(async move {
                            let result = in_flight
                                .admit(record.external_id, move || async move {
                                    reconciler.reconcile(&record).await
                                })
                                .await;
                            drop(permit);
                            result
                        });
                    }
                }
            }
        }

        while let Some(joined) = tasks.join_next().await {
            joined.map_err(|error| PipelineError::WorkerFailed(error.to_string()))??;
        }

        Ok(counters.summary())
    }
}
