//! Content-addressed result cache.
//!
//! Maps a content fingerprint to a previously computed consensus so that
//! byte-identical submissions inside the TTL window never re-run the
//! evaluator fan-out.
//!
//! All cache operations are fail-soft: the workflow engine treats any
//! [`CacheError`] as a miss and proceeds. A cache outage costs redundant
//! evaluator calls, never a failed or wrong analysis.

use async_trait::async_trait;
use moka::future::Cache;
use std::time::Duration;
use thiserror::Error;

use crosscheck_core::{ConsensusResult, Fingerprint};

/// Default time-to-live for cached results.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Errors from a cache backend.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Backend(String),
}

/// Content-addressed store for consensus results.
///
/// Entries expire after the store's configured TTL and may be overwritten
/// by a later write to the same fingerprint (last-write-wins). Lost
/// updates are tolerated: the key is content-derived, so a stale
/// overwrite can only cost a redundant future computation.
#[async_trait]
pub trait ResultCache: Send + Sync {
    /// Look up a cached consensus. `Ok(None)` is a miss.
    async fn get(&self, fingerprint: &Fingerprint) -> Result<Option<ConsensusResult>, CacheError>;

    /// Store a consensus under the content fingerprint.
    async fn put(
        &self,
        fingerprint: &Fingerprint,
        result: ConsensusResult,
    ) -> Result<(), CacheError>;

    /// Drop a cached consensus.
    async fn invalidate(&self, fingerprint: &Fingerprint) -> Result<(), CacheError>;
}

/// In-process result cache backed by moka.
pub struct MokaResultCache {
    cache: Cache<String, ConsensusResult>,
}

impl MokaResultCache {
    /// Create a cache holding up to `max_entries` results for `ttl`.
    pub fn new(max_entries: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();

        Self { cache }
    }

    /// Number of live entries.
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

impl Default for MokaResultCache {
    fn default() -> Self {
        Self::new(10_000, DEFAULT_TTL)
    }
}

#[async_trait]
impl ResultCache for MokaResultCache {
    async fn get(&self, fingerprint: &Fingerprint) -> Result<Option<ConsensusResult>, CacheError> {
        Ok(self.cache.get(&fingerprint.cache_key()).await)
    }

    async fn put(
        &self,
        fingerprint: &Fingerprint,
        result: ConsensusResult,
    ) -> Result<(), CacheError> {
        self.cache.insert(fingerprint.cache_key(), result).await;
        Ok(())
    }

    async fn invalidate(&self, fingerprint: &Fingerprint) -> Result<(), CacheError> {
        self.cache.invalidate(&fingerprint.cache_key()).await;
        Ok(())
    }
}
