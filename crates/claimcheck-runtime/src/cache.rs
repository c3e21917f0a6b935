//! Policy summary cache.
//!
//! Within a batch, many records share a handful of policies. The summary of a
//! policy depends only on the policy and the code book, both fixed for the
//! life of the process, so a successful summary can be reused.

use moka::future::Cache;
use std::time::Duration;

/// Successful policy summaries keyed by policy id.
#[derive(Clone)]
pub struct PolicySummaryCache {
    cache: Cache<String, String>,
}

impl PolicySummaryCache {
    pub fn new(max_entries: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();

        Self { cache }
    }

    pub async fn get(&self, policy_id: &str) -> Option<String> {
        self.cache.get(policy_id).await
    }

    pub async fn insert(&self, policy_id: impl Into<String>, summary: String) {
        self.cache.insert(policy_id.into(), summary).await;
    }
}

impl Default for PolicySummaryCache {
    fn default() -> Self {
        Self::new(1_000, Duration::from_secs(3600))
    }
}

impl std::fmt::Debug for PolicySummaryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicySummaryCache")
            .field("entries", &self.cache.entry_count())
            .finish()
    }
}
