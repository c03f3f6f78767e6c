//! Backend bridge
//!
//! Outbound HTTP client for the task-execution service admitted requests
//! are handed to. The bridge speaks plain JSON: `GET /health`,
//! `GET /agents`, `POST /execute` with `{agent_id, task}`. Downstream
//! failures carry the backend's own message upward.

use std::time::Duration;

use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

/// Errors from backend calls
#[derive(Error, Debug)]
pub enum BackendError {
    /// Transport-level failure (connect, timeout, DNS)
    #[error("Backend unreachable: {0}")]
    Unreachable(String),

    /// Backend answered with a non-success status
    #[error("Backend returned status {status}: {message}")]
    Status { status: u16, message: String },

    /// Backend answered success but the body was not JSON
    #[error("Invalid backend response: {0}")]
    InvalidResponse(String),

    /// The HTTP client itself could not be constructed
    #[error("Backend client initialization failed: {0}")]
    Client(String),
}

/// HTTP bridge to the task-execution backend
pub struct BackendBridge {
    endpoint: String,
    client: reqwest::Client,
}

impl BackendBridge {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Client(e.to_string()))?;

        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Probe the backend's liveness endpoint
    pub async fn health(&self) -> Result<(), BackendError> {
        let url = format!("{}/health", self.endpoint);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| BackendError::Unreachable(e.to_string()))?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(BackendError::Status {
                status: resp.status().as_u16(),
                message: "health check failed".into(),
            })
        }
    }

    /// List the agents the backend knows about
    pub async fn list_agents(&self) -> Result<Value, BackendError> {
        let url = format!("{}/agents", self.endpoint);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| BackendError::Unreachable(e.to_string()))?;

        Self::read_json(resp).await
    }

    /// Execute a task as `agent_id`
    pub async fn execute(&self, agent_id: &str, task: Value) -> Result<Value, BackendError> {
        let url = format!("{}/execute", self.endpoint);
        debug!(agent_id = %agent_id, "Forwarding task to backend");

        let resp = self
            .client
            .post(&url)
            .json(&json!({ "agent_id": agent_id, "task": task }))
            .send()
            .await
            .map_err(|e| BackendError::Unreachable(e.to_string()))?;

        Self::read_json(resp).await
    }

    async fn read_json(resp: reqwest::Response) -> Result<Value, BackendError> {
        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                message,
            });
        }

        resp.json()
            .await
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_trailing_slash_normalized() {
        let bridge =
            BackendBridge::new("http://localhost:5000/", Duration::from_secs(1)).unwrap();
        assert_eq!(bridge.endpoint, "http://localhost:5000");
    }

    #[tokio::test]
    async fn test_unreachable_backend_reports_transport_error() {
        // Reserved TEST-NET address; nothing listens there
        let bridge =
            BackendBridge::new("http://192.0.2.1:9", Duration::from_millis(200)).unwrap();

        let result = bridge.health().await;
        assert!(matches!(result, Err(BackendError::Unreachable(_))));
    }
}
