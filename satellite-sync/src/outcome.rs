use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// What reconciling a single catalogue record did to the local store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Created,
    Updated,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Created => "created",
            Outcome::Updated => "updated",
        }
    }
}

/// Counts of reconciliation outcomes, shared by every task of one sync attempt.
#[derive(Debug, Default)]
pub struct OutcomeCounters {
    created: AtomicU64,
    updated: AtomicU64,
}

impl OutcomeCounters {
    pub fn record(&self, outcome: Outcome) {
        let counter = match outcome {
            Outcome::Created => &self.created,
            Outcome::Updated => &self.updated,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Only meaningful once every task recording into these counters has completed.
    pub fn summary(&self) -> SyncSummary {
        SyncSummary {
            new_count: self.created.load(Ordering::Relaxed),
            updated_count: self.updated.load(Ordering::Relaxed),
        }
    }
}

/// Result of a sync, as returned to callers.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSummary {
    pub new_count: u64,
    pub updated_count: u64,
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn test_counts_from_many_tasks() {
        let counters = Arc::new(OutcomeCounters::default());

        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..100 {
            let counters = counters.clone();
            tasks.spawn(async move {
                counters.record(if i % 4 == 0 {
                    Outcome::Created
                } else {
                    Outcome::Updated
                });
            });
        }
        while let Some(joined) = tasks.join_next().await {
            joined.expect("task panicked");
        }

        assert_eq!(
            counters.summary(),
            SyncSummary {
                new_count: 25,
                updated_count: 75
            }
        );
    }

    #[test]
    fn test_summary_serializes_camel_case() {
        let summary = SyncSummary {
            new_count: 2,
            updated_count: 0,
        };

        assert_eq!(
            serde_json::to_value(summary).unwrap(),
            serde_json::json!({"newCount": 2, "updatedCount": 0})
        );
    }
}
