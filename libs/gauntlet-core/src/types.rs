use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered team. `level_completed` is the highest level number the
/// team has fully passed; the level it is currently playing is always
/// `level_completed + 1`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub id: Uuid,
    /// Public team identifier (login name), unique.
    pub team_id: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub score: u32,
    pub level_completed: u32,
    pub is_active: bool,
    pub login_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// A game level. Immutable after creation; test cases are referenced
/// by id and stored separately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Level {
    pub id: Uuid,
    /// 1-based, unique, dense.
    pub level_number: u32,
    pub title: String,
    pub description: String,
    /// Remote judge language id (e.g. 71 = Python 3).
    pub language_id: u32,
    pub language: String,
    #[serde(default)]
    pub code_template: String,
    pub test_cases: Vec<Uuid>,
    #[serde(default)]
    pub hints: Vec<String>,
    pub difficulty: Difficulty,
    /// Points awarded once, on first completion.
    pub difficulty_score: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    pub id: Uuid,
    pub level_id: Uuid,
    /// Serialized test input, typically JSON-encoded.
    pub input: String,
    /// Expected stdout, compared after trimming.
    pub output: String,
    #[serde(default)]
    pub description: String,
}

/// Per-(team, level) attempt ledger. Created when the team first opens
/// the level; a submission without one is rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelProgress {
    pub id: Uuid,
    pub team_id: Uuid,
    pub level_number: u32,
    pub level_id: Uuid,
    pub start_at: DateTime<Utc>,
    /// Set exactly once, on the first fully-passing run.
    pub completed_at: Option<DateTime<Utc>>,
    pub code_submitted: Option<String>,
    pub character_count_in_code: u64,
    /// Milliseconds from `start_at` to `completed_at`.
    pub time_taken_ms: Option<i64>,
    pub attempts: u32,
    /// Test case ids satisfied by the *last* run.
    pub test_cases_passed: Vec<Uuid>,
    pub is_completed: bool,
}

impl LevelProgress {
    pub fn open(team_id: Uuid, level: &Level, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            team_id,
            level_number: level.level_number,
            level_id: level.id,
            start_at: now,
            completed_at: None,
            code_submitted: None,
            character_count_in_code: 0,
            time_taken_ms: None,
            attempts: 0,
            test_cases_passed: Vec::new(),
            is_completed: false,
        }
    }
}
