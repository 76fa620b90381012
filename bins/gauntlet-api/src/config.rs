// Environment-driven configuration for the API binary.

pub struct ApiConfig {
    pub bind_addr: String,
    /// When unset the service runs with an in-process cache.
    pub redis_url: Option<String>,
    pub judge_url: String,
    pub judge_api_key: Option<String>,
    pub hint_penalty: u32,
    pub seed_file: String,
}

impl ApiConfig {
    pub fn from_env() -> Self {
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            redis_url: std::env::var("REDIS_URL").ok(),
            judge_url: std::env::var("JUDGE_URL")
                .unwrap_or_else(|_| "https://ce.judge0.com".to_string()),
            judge_api_key: std::env::var("JUDGE_API_KEY").ok(),
            hint_penalty: std::env::var("HINT_PENALTY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
            seed_file: std::env::var("SEED_FILE").unwrap_or_else(|_| "config/seed.json".to_string()),
        }
    }
}
