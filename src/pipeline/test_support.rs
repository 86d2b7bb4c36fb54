//! In-memory collaborators for pipeline tests

use super::graph::{FetchError, SwapSource};
use super::notifier::{NotificationSink, NotifyError};
use super::types::SwapEvent;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Replays queued fetch results, then returns empty pages forever
#[derive(Default)]
pub struct ScriptedSource {
    pub responses: Mutex<VecDeque<Result<Vec<SwapEvent>, FetchError>>>,
    pub calls: Mutex<Vec<u64>>,
}

impl ScriptedSource {
    pub fn push(&self, response: Result<Vec<SwapEvent>, FetchError>) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn calls(&self) -> Vec<u64> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SwapSource for ScriptedSource {
    async fn fetch_new_swaps(&self, since_block: u64) -> Result<Vec<SwapEvent>, FetchError> {
        self.calls.lock().unwrap().push(since_block);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// Records messages; fails any message containing `reject`
#[derive(Default)]
pub struct RecordingSink {
    pub sent: Mutex<Vec<String>>,
    pub reject: Option<String>,
}

impl RecordingSink {
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn notify(&self, message: &str) -> Result<usize, NotifyError> {
        if let Some(reject) = &self.reject {
            if message.contains(reject.as_str()) {
                return Err(NotifyError::AllTargetsFailed(1));
            }
        }
        self.sent.lock().unwrap().push(message.to_string());
        Ok(1)
    }
}
