//! Submission Orchestrator - the use-case controller.
//!
//! Owns the only write path for `Team.score`/`Team.level_completed`
//! and `LevelProgress.completed_at`. Team state is always read fresh
//! from the store here; serving it from cache on a mutation path could
//! double-award or mis-route the submission to a stale level.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::GameError;
use crate::harness::{run_test_cases, CaseResult};
use crate::judge::Judge;
use crate::repo::Repository;
use crate::types::{Level, LevelProgress};

#[derive(Debug, Serialize)]
pub struct SubmissionOutcome {
    pub all_passed: bool,
    pub passed_test_cases: usize,
    pub total_test_cases: usize,
    pub test_results: Vec<CaseResult>,
    pub attempts: u32,
    pub is_completed: bool,
}

/// What the team should be playing now, plus progress through the
/// level list. `level` is `None` once every level is completed.
#[derive(Debug, Serialize)]
pub struct CurrentLevel {
    pub level: Option<Level>,
    pub total_levels: u64,
    pub more_levels: bool,
}

#[derive(Clone)]
pub struct SubmissionService {
    repo: Repository,
    judge: Arc<dyn Judge>,
    hint_penalty: u32,
}

impl SubmissionService {
    pub fn new(repo: Repository, judge: Arc<dyn Judge>, hint_penalty: u32) -> Self {
        Self {
            repo,
            judge,
            hint_penalty,
        }
    }

    /// Resolve the level a team is currently playing:
    /// `level_completed + 1`, cache-aside by number. `Ok(None)` means
    /// the team has finished every level there is; a missing level
    /// below the count is a data error and stays `NotFound`.
    async fn current_level(&self, level_completed: u32) -> Result<Option<Level>, GameError> {
        if let Some(level) = self.repo.level_by_number(level_completed + 1).await? {
            return Ok(Some(level));
        }
        let total = self.repo.level_count().await?;
        if u64::from(level_completed) >= total {
            Ok(None)
        } else {
            Err(GameError::NotFound("level"))
        }
    }

    /// `current_level`, but a finished team is a conflict: there is
    /// nothing left to submit against or take hints for.
    async fn playing_level(&self, level_completed: u32) -> Result<Level, GameError> {
        self.current_level(level_completed).await?.ok_or_else(|| {
            GameError::StateConflict("all levels completed".to_string())
        })
    }

    /// Evaluate a submission and apply the resulting state transition.
    #[instrument(skip(self, code), fields(team = %team_id))]
    pub async fn submit(
        &self,
        team_id: Uuid,
        code: &str,
    ) -> Result<SubmissionOutcome, GameError> {
        if code.trim().is_empty() {
            return Err(GameError::Validation("code must not be empty".to_string()));
        }

        // Fresh team state; never the cache on a mutation path.
        let team = self
            .repo
            .store()
            .team_by_id(team_id)
            .await?
            .ok_or(GameError::NotFound("team"))?;

        let level = self.playing_level(team.level_completed).await?;
        let cases = self.repo.test_cases(level.id).await?;

        // The progress row is created when the team opens the level;
        // submitting without one means the level was never issued.
        let mut progress = self
            .repo
            .store()
            .progress(team_id, level.id)
            .await?
            .ok_or_else(|| {
                GameError::StateConflict(
                    "level progress not found, open the level before submitting".to_string(),
                )
            })?;

        let report = run_test_cases(self.judge.as_ref(), code, level.language_id, &cases).await;

        progress.attempts += 1;
        progress.code_submitted = Some(code.to_string());
        progress.character_count_in_code = code.len() as u64;
        progress.test_cases_passed = cases
            .iter()
            .zip(&report.results)
            .filter(|(_, r)| r.passed)
            .map(|(c, _)| c.id)
            .collect();

        if report.all_passed {
            progress.is_completed = true;
        }

        // completed_at is stamped at most once; later fully-passing
        // runs keep the first completion time and award nothing.
        if report.all_passed && progress.completed_at.is_none() {
            let completed_at = Utc::now();
            progress.completed_at = Some(completed_at);
            progress.time_taken_ms =
                Some((completed_at - progress.start_at).num_milliseconds());

            let awarded = self
                .repo
                .store()
                .complete_level(team_id, level.level_number, level.difficulty_score)
                .await?;
            if awarded {
                info!(
                    team = %team_id,
                    level = level.level_number,
                    points = level.difficulty_score,
                    "Level completed, score awarded"
                );
                self.repo.invalidate_team(team_id).await;
            } else {
                warn!(
                    team = %team_id,
                    level = level.level_number,
                    "Completion recorded but score already awarded"
                );
            }
        }

        self.repo.store().upsert_progress(&progress).await?;

        info!(
            team = %team_id,
            level = level.level_number,
            attempts = progress.attempts,
            passed = report.passed_count,
            total = report.total_count,
            all_passed = report.all_passed,
            "Submission evaluated"
        );

        Ok(SubmissionOutcome {
            all_passed: report.all_passed,
            passed_test_cases: report.passed_count,
            total_test_cases: report.total_count,
            test_results: report.results,
            attempts: progress.attempts,
            is_completed: progress.is_completed,
        })
    }

    /// Fetch the team's current level, creating the progress row on
    /// first access. That row is what later entitles the team to
    /// submit against the level. A team past the last level gets a
    /// completed board, not an error.
    #[instrument(skip(self), fields(team = %team_id))]
    pub async fn open_level(&self, team_id: Uuid) -> Result<CurrentLevel, GameError> {
        let team = self
            .repo
            .store()
            .team_by_id(team_id)
            .await?
            .ok_or(GameError::NotFound("team"))?;

        let total_levels = self.repo.level_count().await?;
        let Some(level) = self.current_level(team.level_completed).await? else {
            info!(team = %team_id, total_levels, "All levels completed");
            return Ok(CurrentLevel {
                level: None,
                total_levels,
                more_levels: false,
            });
        };

        if self
            .repo
            .store()
            .progress(team_id, level.id)
            .await?
            .is_none()
        {
            let progress = LevelProgress::open(team_id, &level, Utc::now());
            self.repo.store().upsert_progress(&progress).await?;
            info!(team = %team_id, level = level.level_number, "Level opened");
        }

        Ok(CurrentLevel {
            more_levels: u64::from(level.level_number) < total_levels,
            level: Some(level),
            total_levels,
        })
    }

    /// Hints for the current level. Taking them costs a fixed penalty,
    /// floored at zero; a level without hints costs nothing.
    #[instrument(skip(self), fields(team = %team_id))]
    pub async fn take_hints(&self, team_id: Uuid) -> Result<Vec<String>, GameError> {
        let team = self
            .repo
            .store()
            .team_by_id(team_id)
            .await?
            .ok_or(GameError::NotFound("team"))?;

        let level = self.playing_level(team.level_completed).await?;
        if level.hints.is_empty() {
            return Ok(Vec::new());
        }

        let new_score = self
            .repo
            .store()
            .deduct_score(team_id, self.hint_penalty)
            .await?;
        self.repo.invalidate_team(team_id).await;
        info!(team = %team_id, new_score, penalty = self.hint_penalty, "Hints taken");

        Ok(level.hints)
    }
}
