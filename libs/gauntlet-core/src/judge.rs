//! Remote judge client: submit a program, poll for its verdict.
//!
//! The remote service is judge0-shaped: `POST /submissions` returns a
//! token, `GET /submissions/{token}` returns the evaluation state.
//! Status ids at or below 2 mean queued/running; anything above 2 is
//! terminal, with 3 being "accepted". Polling is a fixed-interval loop
//! with a hard ceiling; exhausting it is a `PollTimeout`, a different
//! failure from a judge-reported time-limit verdict.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub const STATUS_IN_QUEUE: i32 = 1;
pub const STATUS_PROCESSING: i32 = 2;
pub const STATUS_ACCEPTED: i32 = 3;

pub const POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const MAX_POLL_ATTEMPTS: u32 = 10;

#[derive(Debug, Error)]
pub enum JudgeError {
    /// Request-level failure talking to the judge (submit or poll).
    #[error("judge transport error: {0}")]
    Transport(String),

    /// The judge answered but refused the submission.
    #[error("judge rejected submission: {0}")]
    Rejected(String),

    /// No terminal verdict within the polling ceiling.
    #[error("no verdict after {0} polls")]
    PollTimeout(u32),
}

impl From<reqwest::Error> for JudgeError {
    fn from(err: reqwest::Error) -> Self {
        JudgeError::Transport(err.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VerdictStatus {
    pub id: i32,
    pub description: String,
}

impl VerdictStatus {
    pub fn is_terminal(&self) -> bool {
        self.id > STATUS_PROCESSING
    }

    pub fn is_accepted(&self) -> bool {
        self.id == STATUS_ACCEPTED
    }
}

/// Terminal result of one remote evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub compile_output: Option<String>,
    pub message: Option<String>,
    /// Execution time in seconds, as the judge reports it.
    pub time: Option<String>,
    /// Peak memory in kilobytes.
    pub memory: Option<f64>,
    pub status: VerdictStatus,
}

/// Optional resource limits forwarded verbatim to the judge.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResourceLimits {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_time_limit: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wall_time_limit: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_limit: Option<u32>,
}

/// One remote round-trip: program in, terminal verdict out. The HTTP
/// implementation composes submit + poll; tests script verdicts.
#[async_trait]
pub trait Judge: Send + Sync {
    async fn evaluate(
        &self,
        source_code: &str,
        language_id: u32,
        stdin: &str,
        expected_output: &str,
    ) -> Result<Verdict, JudgeError>;
}

#[derive(Debug, Serialize)]
struct SubmitBody<'a> {
    source_code: &'a str,
    language_id: u32,
    stdin: &'a str,
    expected_output: &'a str,
    #[serde(flatten)]
    limits: &'a ResourceLimits,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    token: String,
}

pub struct HttpJudge {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    limits: ResourceLimits,
    poll_interval: Duration,
    max_poll_attempts: u32,
}

impl HttpJudge {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key,
            limits: ResourceLimits::default(),
            poll_interval: POLL_INTERVAL,
            max_poll_attempts: MAX_POLL_ATTEMPTS,
        }
    }

    pub fn with_limits(mut self, limits: ResourceLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_polling(mut self, interval: Duration, max_attempts: u32) -> Self {
        self.poll_interval = interval;
        self.max_poll_attempts = max_attempts;
        self
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.header("X-RapidAPI-Key", key),
            None => builder,
        }
    }

    /// One outbound submission. No retry at this layer: transport and
    /// remote-rejection failures surface to the caller as-is.
    pub async fn submit(
        &self,
        source_code: &str,
        language_id: u32,
        stdin: &str,
        expected_output: &str,
    ) -> Result<String, JudgeError> {
        let url = format!("{}/submissions?wait=false", self.base_url);
        let body = SubmitBody {
            source_code,
            language_id,
            stdin,
            expected_output,
            limits: &self.limits,
        };

        let response = self.request(self.http.post(&url)).json(&body).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(JudgeError::Rejected(format!("{}: {}", status, detail)));
        }

        let parsed: SubmitResponse = response.json().await?;
        debug!(token = %parsed.token, language_id, "Submission accepted by judge");
        Ok(parsed.token)
    }

    /// One status request for a previously submitted token.
    pub async fn poll(&self, token: &str) -> Result<Verdict, JudgeError> {
        let url = format!("{}/submissions/{}", self.base_url, token);
        let response = self.request(self.http.get(&url)).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(JudgeError::Rejected(format!("{}: {}", status, detail)));
        }
        Ok(response.json().await?)
    }

    /// Submit once, then poll at a fixed interval until the first
    /// terminal status or the attempt ceiling.
    pub async fn submit_and_await(
        &self,
        source_code: &str,
        language_id: u32,
        stdin: &str,
        expected_output: &str,
    ) -> Result<Verdict, JudgeError> {
        let token = self
            .submit(source_code, language_id, stdin, expected_output)
            .await?;

        for attempt in 1..=self.max_poll_attempts {
            tokio::time::sleep(self.poll_interval).await;

            let verdict = self.poll(&token).await?;
            if verdict.status.is_terminal() {
                debug!(
                    token = %token,
                    attempt,
                    status = verdict.status.id,
                    "Terminal verdict received"
                );
                return Ok(verdict);
            }
            debug!(token = %token, attempt, status = verdict.status.id, "Still pending");
        }

        warn!(token = %token, attempts = self.max_poll_attempts, "Polling ceiling exhausted");
        Err(JudgeError::PollTimeout(self.max_poll_attempts))
    }
}

#[async_trait]
impl Judge for HttpJudge {
    async fn evaluate(
        &self,
        source_code: &str,
        language_id: u32,
        stdin: &str,
        expected_output: &str,
    ) -> Result<Verdict, JudgeError> {
        self.submit_and_await(source_code, language_id, stdin, expected_output)
            .await
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_terminality() {
        let queued = VerdictStatus {
            id: STATUS_IN_QUEUE,
            description: "In Queue".to_string(),
        };
        let running = VerdictStatus {
            id: STATUS_PROCESSING,
            description: "Processing".to_string(),
        };
        let accepted = VerdictStatus {
            id: STATUS_ACCEPTED,
            description: "Accepted".to_string(),
        };
        let wrong = VerdictStatus {
            id: 4,
            description: "Wrong Answer".to_string(),
        };

        assert!(!queued.is_terminal());
        assert!(!running.is_terminal());
        assert!(accepted.is_terminal());
        assert!(wrong.is_terminal());
        assert!(accepted.is_accepted());
        assert!(!wrong.is_accepted());
    }

    #[test]
    fn test_submit_body_shape() {
        let limits = ResourceLimits {
            cpu_time_limit: Some(2.0),
            wall_time_limit: None,
            memory_limit: Some(128000),
        };
        let body = SubmitBody {
            source_code: "print(5)",
            language_id: 71,
            stdin: "[2,3]",
            expected_output: "5",
            limits: &limits,
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["language_id"], 71);
        assert_eq!(json["cpu_time_limit"], 2.0);
        assert_eq!(json["memory_limit"], 128000);
        // Unset limits are omitted, not null.
        assert!(json.get("wall_time_limit").is_none());
    }

    #[test]
    fn test_verdict_decodes_judge_payload() {
        let payload = r#"{
            "stdout": "5\n",
            "stderr": null,
            "compile_output": null,
            "message": null,
            "time": "0.002",
            "memory": 3212.0,
            "status": {"id": 3, "description": "Accepted"}
        }"#;

        let verdict: Verdict = serde_json::from_str(payload).unwrap();
        assert_eq!(verdict.stdout.as_deref(), Some("5\n"));
        assert!(verdict.status.is_accepted());
    }
}
