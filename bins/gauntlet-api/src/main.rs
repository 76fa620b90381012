mod config;
mod handlers;
mod routes;
mod seed;

use std::path::Path;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tracing::{info, warn};

use gauntlet_core::cache::{Cache, MemoryCache, RedisCache};
use gauntlet_core::judge::HttpJudge;
use gauntlet_core::repo::Repository;
use gauntlet_core::store::MemoryStore;
use gauntlet_core::submit::SubmissionService;

use config::ApiConfig;

pub struct AppState {
    pub service: SubmissionService,
    pub repo: Repository,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    info!("Gauntlet API booting...");
    let cfg = ApiConfig::from_env();

    let cache: Arc<dyn Cache> = match &cfg.redis_url {
        Some(url) => {
            let cache = RedisCache::connect(url).await?;
            info!("Connected to Redis: {}", url);
            Arc::new(cache)
        }
        None => {
            warn!("REDIS_URL not set, using in-process cache");
            Arc::new(MemoryCache::new())
        }
    };

    let store = Arc::new(MemoryStore::new());
    let seed_path = Path::new(&cfg.seed_file);
    if seed_path.exists() {
        let (teams, levels) = seed::load(seed_path, &store).await?;
        info!(teams, levels, "Seed data loaded from {}", cfg.seed_file);
    } else {
        warn!("Seed file {} not found, starting empty", cfg.seed_file);
    }

    let judge = Arc::new(HttpJudge::new(cfg.judge_url.clone(), cfg.judge_api_key.clone()));
    info!("Judge endpoint: {}", cfg.judge_url);

    let repo = Repository::new(store, cache);
    let service = SubmissionService::new(repo.clone(), judge, cfg.hint_penalty);

    let state = Arc::new(AppState { service, repo });

    // Build router
    let app = Router::new().merge(routes::routes()).with_state(state);

    let listener = TcpListener::bind(&cfg.bind_addr).await?;
    info!("HTTP server listening on {}", cfg.bind_addr);
    info!("Ready to accept submissions");

    axum::serve(listener, app).await?;
    Ok(())
}
