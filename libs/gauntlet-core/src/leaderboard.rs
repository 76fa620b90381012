//! Leaderboard: rank every team by score, paginate, report the
//! requesting team's own standing.
//!
//! Ranked pages are cached for a short TTL; the requester's own
//! rank/score is computed from the same ranking pass so one stale
//! page never shows two different orderings. Any score mutation
//! invalidates all pages (see `Repository::invalidate_team`).

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::cache;
use crate::error::GameError;
use crate::repo::Repository;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LeaderboardEntry {
    pub id: Uuid,
    pub team_id: String,
    pub score: u32,
    pub level_completed: u32,
    /// Stable 1-based rank over the full ordering.
    pub rank: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedBoard {
    pub entries: Vec<LeaderboardEntry>,
    pub total: u64,
}

#[derive(Debug, Serialize)]
pub struct LeaderboardPage {
    pub entries: Vec<LeaderboardEntry>,
    pub total: u64,
    pub page: u32,
    pub pages: u32,
    pub your_rank: u32,
    pub your_score: u32,
    pub your_level_completed: u32,
}

/// Rank all teams (score descending, team name ascending) and return
/// the requested page plus the requesting team's standing.
pub async fn leaderboard(
    repo: &Repository,
    requesting_team: Uuid,
    page: u32,
    limit: u32,
) -> Result<LeaderboardPage, GameError> {
    let page = page.max(1);
    let limit = limit.clamp(1, 100);

    let team = repo
        .store()
        .team_by_id(requesting_team)
        .await?
        .ok_or(GameError::NotFound("team"))?;

    let board = match cached_board(repo, page, limit).await {
        Some(board) => board,
        None => {
            let board = rank_page(repo, page, limit).await?;
            cache::set_json(
                repo.cache(),
                &cache::leaderboard_key(page, limit),
                &board,
                cache::TTL_LEADERBOARD,
            )
            .await;
            board
        }
    };

    // Own rank comes from a full ranking pass, not the cached page:
    // the requester may not be on it.
    let ranked = repo.store().teams_ranked().await?;
    let your_rank = ranked
        .iter()
        .position(|t| t.id == requesting_team)
        .map(|idx| idx as u32 + 1)
        .unwrap_or(0);

    let pages = (board.total as u32).div_ceil(limit);

    Ok(LeaderboardPage {
        entries: board.entries,
        total: board.total,
        page,
        pages,
        your_rank,
        your_score: team.score,
        your_level_completed: team.level_completed,
    })
}

async fn cached_board(repo: &Repository, page: u32, limit: u32) -> Option<RankedBoard> {
    let board =
        cache::get_json::<RankedBoard>(repo.cache(), &cache::leaderboard_key(page, limit)).await?;
    debug!(page, limit, "Leaderboard page served from cache");
    Some(board)
}

async fn rank_page(repo: &Repository, page: u32, limit: u32) -> Result<RankedBoard, GameError> {
    let ranked = repo.store().teams_ranked().await?;
    let total = ranked.len() as u64;

    // Widen before multiplying: `page` is caller-controlled and may
    // be anything up to u32::MAX. Pages past the end are empty.
    let start = ((page as u64 - 1) * limit as u64).min(total) as usize;
    let entries = ranked
        .into_iter()
        .enumerate()
        .skip(start)
        .take(limit as usize)
        .map(|(idx, team)| LeaderboardEntry {
            id: team.id,
            team_id: team.team_id,
            score: team.score,
            level_completed: team.level_completed,
            rank: idx as u32 + 1,
        })
        .collect();

    Ok(RankedBoard { entries, total })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::store::MemoryStore;
    use crate::types::Team;
    use chrono::Utc;
    use std::sync::Arc;

    async fn seed(store: &MemoryStore, name: &str, score: u32) -> Uuid {
        let team = Team {
            id: Uuid::new_v4(),
            team_id: name.to_string(),
            password_hash: String::new(),
            score,
            level_completed: score / 10,
            is_active: true,
            login_at: Utc::now(),
        };
        let id = team.id;
        store.insert_team(team).await;
        id
    }

    #[tokio::test]
    async fn test_ranking_and_own_standing() {
        let store = Arc::new(MemoryStore::new());
        let alpha = seed(&store, "alpha", 30).await;
        seed(&store, "bravo", 90).await;
        seed(&store, "charlie", 30).await;
        let repo = Repository::new(store, Arc::new(MemoryCache::new()));

        let page = leaderboard(&repo, alpha, 1, 10).await.unwrap();

        assert_eq!(page.total, 3);
        assert_eq!(page.pages, 1);
        let names: Vec<&str> = page.entries.iter().map(|e| e.team_id.as_str()).collect();
        // Ties broken by team name ascending.
        assert_eq!(names, vec!["bravo", "alpha", "charlie"]);
        assert_eq!(page.entries[0].rank, 1);
        assert_eq!(page.entries[1].rank, 2);
        assert_eq!(page.entries[2].rank, 3);
        assert_eq!(page.your_rank, 2);
        assert_eq!(page.your_score, 30);
    }

    #[tokio::test]
    async fn test_pagination_keeps_global_ranks() {
        let store = Arc::new(MemoryStore::new());
        let mut first = None;
        for (i, name) in ["a", "b", "c", "d", "e"].iter().enumerate() {
            let id = seed(&store, name, 100 - i as u32 * 10).await;
            first.get_or_insert(id);
        }
        let repo = Repository::new(store, Arc::new(MemoryCache::new()));

        let page = leaderboard(&repo, first.unwrap(), 2, 2).await.unwrap();
        assert_eq!(page.pages, 3);
        let ranks: Vec<u32> = page.entries.iter().map(|e| e.rank).collect();
        assert_eq!(ranks, vec![3, 4]);
    }

    #[tokio::test]
    async fn test_out_of_range_page_is_empty_not_a_crash() {
        let store = Arc::new(MemoryStore::new());
        let alpha = seed(&store, "alpha", 10).await;
        let repo = Repository::new(store, Arc::new(MemoryCache::new()));

        let page = leaderboard(&repo, alpha, u32::MAX, 100).await.unwrap();

        assert!(page.entries.is_empty());
        assert_eq!(page.total, 1);
        // Own standing is still reported even off the end.
        assert_eq!(page.your_rank, 1);
    }

    #[tokio::test]
    async fn test_page_comes_from_cache_when_present() {
        let store = Arc::new(MemoryStore::new());
        let alpha = seed(&store, "alpha", 10).await;
        let cache_backend = Arc::new(MemoryCache::new());
        let repo = Repository::new(store.clone(), cache_backend.clone());

        // Warm the page, then change the store underneath it.
        leaderboard(&repo, alpha, 1, 10).await.unwrap();
        seed(&store, "zulu", 999).await;

        let page = leaderboard(&repo, alpha, 1, 10).await.unwrap();
        // Cached page still shows the old board.
        assert_eq!(page.total, 1);

        // After invalidation the new team appears.
        repo.invalidate_team(alpha).await;
        let page = leaderboard(&repo, alpha, 1, 10).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.entries[0].team_id, "zulu");
    }

    #[tokio::test]
    async fn test_unknown_requester_rejected() {
        let store = Arc::new(MemoryStore::new());
        let repo = Repository::new(store, Arc::new(MemoryCache::new()));
        let err = leaderboard(&repo, Uuid::new_v4(), 1, 10).await.unwrap_err();
        assert!(matches!(err, GameError::NotFound("team")));
    }
}
