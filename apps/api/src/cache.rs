//! Redis cache for analytics summaries.
//!
//! Keys embed a generation counter. Any write that changes quality or status
//! bumps the generation, so stale summaries are never read again and simply
//! expire. Every failure here is logged and treated as a miss.

use redis::Client as RedisClient;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

const GENERATION_KEY: &str = "referral_analytics:generation";

/// The cache generation a read observed. A summary computed after that read
/// is written back under the same generation, so an invalidation that lands
/// in between leaves it unreachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSlot {
    generation: i64,
}

impl CacheSlot {
    fn key(&self, scope: &str, days: i64) -> String {
        format!("referral_analytics:g{}:{scope}:{days}d", self.generation)
    }
}

/// Outcome of a cache read. `slot` is `None` when Redis could not be reached,
/// in which case nothing should be written back.
#[derive(Debug)]
pub struct CacheLookup<T> {
    pub value: Option<T>,
    pub slot: Option<CacheSlot>,
}

#[derive(Clone)]
pub struct AnalyticsCache {
    client: RedisClient,
    ttl_secs: u64,
}

impl AnalyticsCache {
    pub fn new(client: RedisClient, ttl_secs: u64) -> Self {
        Self { client, ttl_secs }
    }

    pub async fn get<T: DeserializeOwned>(&self, scope: &str, days: i64) -> CacheLookup<T> {
        let (slot, raw) = match self.try_get(scope, days).await {
            Ok(found) => found,
            Err(e) => {
                warn!("Analytics cache read failed: {e}");
                return CacheLookup {
                    value: None,
                    slot: None,
                };
            }
        };
        let value = raw.and_then(|raw| match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Discarding undecodable analytics cache entry: {e}");
                None
            }
        });
        CacheLookup {
            value,
            slot: Some(slot),
        }
    }

    pub async fn put<T: Serialize>(&self, slot: CacheSlot, scope: &str, days: i64, value: &T) {
        if let Err(e) = self.try_put(slot, scope, days, value).await {
            warn!("Analytics cache write failed: {e}");
        }
    }

    /// Makes every previously cached summary unreachable.
    pub async fn invalidate(&self) {
        let result: redis::RedisResult<i64> = async {
            let mut conn = self.client.get_multiplexed_async_connection().await?;
            redis::cmd("INCR")
                .arg(GENERATION_KEY)
                .query_async(&mut conn)
                .await
        }
        .await;
        match result {
            Ok(generation) => debug!("Analytics cache generation is now {generation}"),
            Err(e) => warn!("Analytics cache invalidation failed: {e}"),
        }
    }

    async fn try_get(
        &self,
        scope: &str,
        days: i64,
    ) -> anyhow::Result<(CacheSlot, Option<String>)> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let generation: Option<i64> = redis::cmd("GET")
            .arg(GENERATION_KEY)
            .query_async(&mut conn)
            .await?;
        let slot = CacheSlot {
            generation: generation.unwrap_or(0),
        };
        let key = slot.key(scope, days);
        let raw: Option<String> = redis::cmd("GET").arg(&key).query_async(&mut conn).await?;
        if raw.is_some() {
            debug!("Analytics cache hit: {key}");
        }
        Ok((slot, raw))
    }

    async fn try_put<T: Serialize>(
        &self,
        slot: CacheSlot,
        scope: &str,
        days: i64,
        value: &T,
    ) -> anyhow::Result<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload = serde_json::to_string(value)?;
        redis::cmd("SET")
            .arg(slot.key(scope, days))
            .arg(payload)
            .arg("EX")
            .arg(self.ttl_secs)
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }
}
