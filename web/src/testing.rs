use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use gemini_chat_core::{ChatError, ChatResult, LlmTransport, RawResponse};
use serde_json::{json, Value};

/// Replays scripted responses and records every body it was given
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<RawResponse>>,
    sent: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn push(&self, status: u16, reason: &str, body: impl Into<String>) {
        self.responses.lock().unwrap().push_back(RawResponse {
            status,
            reason: reason.to_string(),
            body: body.into(),
        });
    }

    pub fn push_reply(&self, text: &str) {
        let body = json!({
            "candidates": [{"content": {"role": "model", "parts": [{"text": text}]}}]
        });
        self.push(200, "OK", body.to_string());
    }

    pub fn sent(&self) -> Vec<Value> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|body| serde_json::from_str(body).unwrap())
            .collect()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmTransport for ScriptedTransport {
    async fn send(&self, body: String) -> ChatResult<RawResponse> {
        self.sent.lock().unwrap().push(body);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ChatError::Transport("no scripted response".to_string()))
    }
}
