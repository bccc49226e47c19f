use crate::domain::ports::StatusGateway;
use crate::domain::status::{StatusError, StatusResult};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

/// Gateway double that replays a fixed sequence of results.
///
/// Results are returned in order; the final entry repeats once the script
/// runs out, so a short script can stand in for a gateway that keeps
/// reporting the same state. An optional latency simulates the network
/// round-trip.
pub struct ScriptedGateway {
    script: Mutex<VecDeque<StatusResult>>,
    calls: AtomicUsize,
    latency: Option<Duration>,
}

impl ScriptedGateway {
    pub fn new(script: Vec<StatusResult>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
            latency: None,
        }
    }

    /// Simulated round-trip time applied to every query.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Number of queries issued so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatusGateway for ScriptedGateway {
    async fn query_status(&self, _target_id: &str) -> StatusResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let mut script = self.script.lock().await;
        let result = if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        };
        result.unwrap_or_else(|| Err(StatusError::transient("scripted gateway has no results")))
    }
}
