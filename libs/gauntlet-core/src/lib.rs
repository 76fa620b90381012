pub mod cache;
pub mod error;
pub mod harness;
pub mod judge;
pub mod leaderboard;
pub mod repo;
pub mod store;
pub mod submit;
pub mod transform;
pub mod types;
