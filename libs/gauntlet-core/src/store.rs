//! Document store contract and the in-memory implementation.
//!
//! The persistence engine itself is a collaborator: the orchestrator
//! only needs lookups by id or indexed field, a single-document
//! upsert, and one conditional update (`complete_level`) that closes
//! the double-award race at the storage boundary instead of in
//! application logic.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::GameError;
use crate::types::{Level, LevelProgress, Team, TestCase};

#[async_trait]
pub trait GameStore: Send + Sync {
    async fn team_by_id(&self, id: Uuid) -> Result<Option<Team>, GameError>;
    async fn team_by_name(&self, team_id: &str) -> Result<Option<Team>, GameError>;
    async fn level_by_id(&self, id: Uuid) -> Result<Option<Level>, GameError>;
    async fn level_by_number(&self, level_number: u32) -> Result<Option<Level>, GameError>;
    /// Test cases for a level, in the level's declared order.
    async fn test_cases_for_level(&self, level_id: Uuid) -> Result<Vec<TestCase>, GameError>;
    async fn level_count(&self) -> Result<u64, GameError>;
    async fn progress(
        &self,
        team_id: Uuid,
        level_id: Uuid,
    ) -> Result<Option<LevelProgress>, GameError>;
    async fn upsert_progress(&self, progress: &LevelProgress) -> Result<(), GameError>;
    /// Conditional score award: raise `level_completed` to
    /// `level_number` and add `points` only if the current value is
    /// strictly lower. Returns whether the update applied, so repeated
    /// or concurrent fully-passing submissions award at most once.
    async fn complete_level(
        &self,
        team_id: Uuid,
        level_number: u32,
        points: u32,
    ) -> Result<bool, GameError>;
    /// Apply a score penalty (hints), floored at zero. Returns the new
    /// score.
    async fn deduct_score(&self, team_id: Uuid, penalty: u32) -> Result<u32, GameError>;
    /// All teams ordered by score descending, team name ascending.
    async fn teams_ranked(&self) -> Result<Vec<Team>, GameError>;
}

#[derive(Default)]
struct MemoryInner {
    teams: HashMap<Uuid, Team>,
    levels: HashMap<Uuid, Level>,
    test_cases: HashMap<Uuid, TestCase>,
    progress: HashMap<(Uuid, Uuid), LevelProgress>,
}

/// `GameStore` over in-process hash maps behind a single `RwLock`.
/// Every mutation holds the write lock for its whole read-modify-write
/// cycle, which is what makes `complete_level` an atomic
/// compare-and-set here.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_team(&self, team: Team) {
        self.inner.write().await.teams.insert(team.id, team);
    }

    /// Insert a level together with its test cases. The level's
    /// `test_cases` id list is rewritten to match the given cases.
    pub async fn insert_level(&self, mut level: Level, cases: Vec<TestCase>) {
        let mut inner = self.inner.write().await;
        level.test_cases = cases.iter().map(|c| c.id).collect();
        for mut case in cases {
            case.level_id = level.id;
            inner.test_cases.insert(case.id, case);
        }
        inner.levels.insert(level.id, level);
    }

    pub async fn insert_progress(&self, progress: LevelProgress) {
        self.inner
            .write()
            .await
            .progress
            .insert((progress.team_id, progress.level_id), progress);
    }
}

#[async_trait]
impl GameStore for MemoryStore {
    async fn team_by_id(&self, id: Uuid) -> Result<Option<Team>, GameError> {
        Ok(self.inner.read().await.teams.get(&id).cloned())
    }

    async fn team_by_name(&self, team_id: &str) -> Result<Option<Team>, GameError> {
        let inner = self.inner.read().await;
        Ok(inner.teams.values().find(|t| t.team_id == team_id).cloned())
    }

    async fn level_by_id(&self, id: Uuid) -> Result<Option<Level>, GameError> {
        Ok(self.inner.read().await.levels.get(&id).cloned())
    }

    async fn level_by_number(&self, level_number: u32) -> Result<Option<Level>, GameError> {
        let inner = self.inner.read().await;
        Ok(inner
            .levels
            .values()
            .find(|l| l.level_number == level_number)
            .cloned())
    }

    async fn test_cases_for_level(&self, level_id: Uuid) -> Result<Vec<TestCase>, GameError> {
        let inner = self.inner.read().await;
        let level = inner
            .levels
            .get(&level_id)
            .ok_or(GameError::NotFound("level"))?;
        let cases = level
            .test_cases
            .iter()
            .filter_map(|id| inner.test_cases.get(id).cloned())
            .collect();
        Ok(cases)
    }

    async fn level_count(&self) -> Result<u64, GameError> {
        Ok(self.inner.read().await.levels.len() as u64)
    }

    async fn progress(
        &self,
        team_id: Uuid,
        level_id: Uuid,
    ) -> Result<Option<LevelProgress>, GameError> {
        let inner = self.inner.read().await;
        Ok(inner.progress.get(&(team_id, level_id)).cloned())
    }

    async fn upsert_progress(&self, progress: &LevelProgress) -> Result<(), GameError> {
        self.inner
            .write()
            .await
            .progress
            .insert((progress.team_id, progress.level_id), progress.clone());
        Ok(())
    }

    async fn complete_level(
        &self,
        team_id: Uuid,
        level_number: u32,
        points: u32,
    ) -> Result<bool, GameError> {
        let mut inner = self.inner.write().await;
        let team = inner
            .teams
            .get_mut(&team_id)
            .ok_or(GameError::NotFound("team"))?;
        if team.level_completed >= level_number {
            return Ok(false);
        }
        team.level_completed = level_number;
        team.score += points;
        Ok(true)
    }

    async fn deduct_score(&self, team_id: Uuid, penalty: u32) -> Result<u32, GameError> {
        let mut inner = self.inner.write().await;
        let team = inner
            .teams
            .get_mut(&team_id)
            .ok_or(GameError::NotFound("team"))?;
        team.score = team.score.saturating_sub(penalty);
        Ok(team.score)
    }

    async fn teams_ranked(&self) -> Result<Vec<Team>, GameError> {
        let inner = self.inner.read().await;
        let mut teams: Vec<Team> = inner.teams.values().cloned().collect();
        teams.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| a.team_id.cmp(&b.team_id))
        });
        Ok(teams)
    }
}
