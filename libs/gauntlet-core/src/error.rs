use thiserror::Error;

/// Failure taxonomy for the evaluation pipeline.
///
/// Judge transport/timeout failures are deliberately absent: they are
/// absorbed into per-test-case results by the harness and never
/// propagate as errors (see `harness`). Everything here aborts the
/// operation it occurs in.
#[derive(Debug, Error)]
pub enum GameError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("invalid request: {0}")]
    Validation(String),

    /// Submission attempted against a level the team never opened.
    #[error("{0}")]
    StateConflict(String),

    #[error("store error: {0}")]
    Store(String),
}

impl GameError {
    pub fn store(err: impl std::fmt::Display) -> Self {
        GameError::Store(err.to_string())
    }
}
