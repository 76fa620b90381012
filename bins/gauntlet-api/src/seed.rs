// Seed file loading for the in-memory store.
// Mirrors the shape an operator would provision: teams plus levels
// with their test cases inline.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use gauntlet_core::store::MemoryStore;
use gauntlet_core::types::{Difficulty, Level, Team, TestCase};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
struct SeedFile {
    #[serde(default)]
    teams: Vec<SeedTeam>,
    #[serde(default)]
    levels: Vec<SeedLevel>,
}

#[derive(Debug, Deserialize)]
struct SeedTeam {
    team_id: String,
    password_hash: String,
    #[serde(default)]
    score: u32,
    #[serde(default)]
    level_completed: u32,
}

#[derive(Debug, Deserialize)]
struct SeedLevel {
    level_number: u32,
    title: String,
    #[serde(default)]
    description: String,
    language_id: u32,
    language: String,
    #[serde(default)]
    code_template: String,
    #[serde(default)]
    hints: Vec<String>,
    difficulty: Difficulty,
    difficulty_score: u32,
    test_cases: Vec<SeedTestCase>,
}

#[derive(Debug, Deserialize)]
struct SeedTestCase {
    input: String,
    output: String,
    #[serde(default)]
    description: String,
}

/// Load teams and levels from a JSON seed file into the store.
/// Returns (teams, levels) loaded.
pub async fn load(path: &Path, store: &MemoryStore) -> Result<(usize, usize)> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read seed file {}", path.display()))?;
    let seed: SeedFile = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse seed file {}", path.display()))?;

    let team_count = seed.teams.len();
    let level_count = seed.levels.len();

    for team in seed.teams {
        store
            .insert_team(Team {
                id: Uuid::new_v4(),
                team_id: team.team_id,
                password_hash: team.password_hash,
                score: team.score,
                level_completed: team.level_completed,
                is_active: false,
                login_at: Utc::now(),
            })
            .await;
    }

    for level in seed.levels {
        let level_id = Uuid::new_v4();
        let cases = level
            .test_cases
            .into_iter()
            .map(|c| TestCase {
                id: Uuid::new_v4(),
                level_id,
                input: c.input,
                output: c.output,
                description: c.description,
            })
            .collect();
        store
            .insert_level(
                Level {
                    id: level_id,
                    level_number: level.level_number,
                    title: level.title,
                    description: level.description,
                    language_id: level.language_id,
                    language: level.language,
                    code_template: level.code_template,
                    test_cases: Vec::new(),
                    hints: level.hints,
                    difficulty: level.difficulty,
                    difficulty_score: level.difficulty_score,
                },
                cases,
            )
            .await;
    }

    Ok((team_count, level_count))
}
