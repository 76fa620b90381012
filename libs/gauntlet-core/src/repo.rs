//! Cache-aside repository over the store.
//!
//! Every read path that is allowed to be served stale goes through
//! here; every write path that mutates a cached entity invalidates
//! through here. Centralizing both sides in one type is what prevents
//! a new write path from forgetting the invalidation.

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::cache::{self, Cache};
use crate::error::GameError;
use crate::store::GameStore;
use crate::types::{Level, TestCase};

#[derive(Clone)]
pub struct Repository {
    store: Arc<dyn GameStore>,
    cache: Arc<dyn Cache>,
}

impl Repository {
    pub fn new(store: Arc<dyn GameStore>, cache: Arc<dyn Cache>) -> Self {
        Self { store, cache }
    }

    pub fn store(&self) -> &dyn GameStore {
        self.store.as_ref()
    }

    pub fn cache(&self) -> &dyn Cache {
        self.cache.as_ref()
    }

    /// Level lookup by number, cache-aside. Gameplay only ever routes
    /// levels by number, so that is the only key a level lives under.
    pub async fn level_by_number(&self, level_number: u32) -> Result<Option<Level>, GameError> {
        let key = cache::level_number_key(level_number);
        if let Some(level) = cache::get_json::<Level>(self.cache.as_ref(), &key).await {
            debug!(level_number, "Level served from cache");
            return Ok(Some(level));
        }

        let Some(level) = self.store.level_by_number(level_number).await? else {
            return Ok(None);
        };
        cache::set_json(self.cache.as_ref(), &key, &level, cache::TTL_LEVEL).await;
        Ok(Some(level))
    }

    pub async fn test_cases(&self, level_id: Uuid) -> Result<Vec<TestCase>, GameError> {
        let key = cache::test_cases_key(level_id);
        if let Some(cases) = cache::get_json::<Vec<TestCase>>(self.cache.as_ref(), &key).await {
            debug!(%level_id, count = cases.len(), "Test cases served from cache");
            return Ok(cases);
        }

        let cases = self.store.test_cases_for_level(level_id).await?;
        cache::set_json(self.cache.as_ref(), &key, &cases, cache::TTL_TESTCASES).await;
        Ok(cases)
    }

    pub async fn level_count(&self) -> Result<u64, GameError> {
        let key = cache::level_count_key();
        if let Some(count) = cache::get_json::<u64>(self.cache.as_ref(), &key).await {
            return Ok(count);
        }

        let count = self.store.level_count().await?;
        cache::set_json(self.cache.as_ref(), &key, &count, cache::TTL_LEVEL_COUNT).await;
        Ok(count)
    }

    /// Drop a team's cache entry and, because rank derives from every
    /// team's score, every cached leaderboard page with it.
    pub async fn invalidate_team(&self, team_id: Uuid) {
        let cache = self.cache.as_ref();
        cache.del(&cache::team_key(team_id)).await;
        cache
            .del_prefix(&format!("{}:", cache::LEADERBOARD_PREFIX))
            .await;
    }

    pub async fn invalidate_level(&self, level: &Level) {
        let cache = self.cache.as_ref();
        cache.del(&cache::level_number_key(level.level_number)).await;
        cache.del(&cache::test_cases_key(level.id)).await;
        cache.del(&cache::level_count_key()).await;
    }
}
