use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::client::LlmTransport;
use crate::config::FALLBACK_SYSTEM_ROLE;
use crate::errors::{ChatError, ChatResult};
use crate::types::{Content, ConversationDocument, GenerateContentResponse, TurnResult};

/// Owns the request document of exactly one conversation and mediates each turn.
///
/// The stored document only ever holds confirmed turns: a user question is
/// committed together with the model reply that answered it. A rejected or
/// unreadable round trip leaves the stored document as it was.
///
/// Not meant for concurrent use; callers serialize turns on one conversation.
pub struct ConversationStateManager<T: LlmTransport + ?Sized> {
    transport: Arc<T>,
    system_role: String,
    document: Option<ConversationDocument>,
}

impl<T: LlmTransport + ?Sized> ConversationStateManager<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self {
            transport,
            system_role: FALLBACK_SYSTEM_ROLE.to_string(),
            document: None,
        }
    }

    /// Sets the system instruction used when the next conversation is created.
    /// Has no effect on a conversation that has already started.
    pub fn configure_system_role(&mut self, role: impl Into<String>) {
        let role = role.into();
        if self.document.is_some() && role != self.system_role {
            debug!("Conversation already started, new system role applies after reset");
        }
        self.system_role = role;
    }

    pub fn system_role(&self) -> &str {
        &self.system_role
    }

    /// The confirmed conversation so far, if any turn has completed
    pub fn document(&self) -> Option<&ConversationDocument> {
        self.document.as_ref()
    }

    pub fn has_started(&self) -> bool {
        self.document.is_some()
    }

    /// Number of completed question/reply round trips
    pub fn turn_count(&self) -> usize {
        self.document
            .as_ref()
            .map_or(0, |doc| doc.contents().len() / 2)
    }

    /// Discards the conversation; the configured role is kept.
    pub fn reset(&mut self) {
        self.document = None;
    }

    /// Sends `question` with the whole history and returns the model's reply.
    pub async fn send_turn(&mut self, question: &str) -> ChatResult<TurnResult> {
        let pending = match &self.document {
            None => ConversationDocument::start(self.system_role.clone(), question),
            Some(doc) => doc.clone().append_turn(Content::user(question))?,
        };

        let body = pending.to_wire()?;
        let request_json = pending.to_pretty()?;

        info!(
            turn = pending.contents().len() / 2 + 1,
            "Sending conversation turn"
        );
        let response = self.transport.send(body).await?;

        if !response.is_success() {
            warn!(
                status = response.status,
                reason = %response.reason,
                "Request rejected by the model endpoint"
            );
            return Err(ChatError::RequestRejected {
                status: response.status,
                reason: response.reason,
                request_snapshot: request_json,
            });
        }

        let reply_turn = extract_reply_turn(&response.body)?;
        let reply = reply_turn
            .first_text()
            .ok_or_else(|| ChatError::MalformedResponse("No text in first part".to_string()))?
            .to_string();

        let confirmed = pending
            .append_turn(reply_turn)
            .map_err(|e| ChatError::MalformedResponse(format!("Unexpected reply turn: {}", e)))?;
        self.document = Some(confirmed);

        Ok(TurnResult::new(request_json, response.body, reply))
    }
}

/// Pulls `candidates[0].content` out of a response body
fn extract_reply_turn(body: &str) -> ChatResult<Content> {
    let response: GenerateContentResponse = serde_json::from_str(body)
        .map_err(|e| ChatError::MalformedResponse(format!("Failed to parse response: {}", e)))?;

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| ChatError::MalformedResponse("No candidates in response".to_string()))?;

    let content = candidate
        .content
        .ok_or_else(|| ChatError::MalformedResponse("No content in candidate".to_string()))?;

    if content.parts.is_empty() {
        return Err(ChatError::MalformedResponse(
            "No parts in content".to_string(),
        ));
    }

    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::RawResponse;
    use crate::types::Role;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays scripted responses and records every body it was given
    #[derive(Default)]
    struct ScriptedTransport {
        responses: Mutex<VecDeque<RawResponse>>,
        sent: Mutex<Vec<String>>,
    }

    impl ScriptedTransport {
        fn push(&self, status: u16, reason: &str, body: impl Into<String>) {
            self.responses.lock().unwrap().push_back(RawResponse {
                status,
                reason: reason.to_string(),
                body: body.into(),
            });
        }

        fn push_reply(&self, text: &str) {
            self.push(200, "OK", reply_body(text));
        }

        fn sent(&self) -> Vec<Value> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .map(|body| serde_json::from_str(body).unwrap())
                .collect()
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

    fn reply_body(text: &str) -> String {
        json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": text}]},
                "finishReason": "STOP"
            }]
        })
        .to_string()
    }

    fn new_manager() -> (Arc<ScriptedTransport>, ConversationStateManager<ScriptedTransport>) {
        let transport = Arc::new(ScriptedTransport::default());
        let manager = ConversationStateManager::new(transport.clone());
        (transport, manager)
    }

    #[tokio::test]
    async fn test_translator_scenario() {
        let (transport, mut manager) = new_manager();
        manager.configure_system_role("Translator");

        transport.push_reply("Hi");
        let first = manager.send_turn("Hello").await.unwrap();
        assert_eq!(first.reply(), "Hi");

        transport.push_reply("Salut");
        manager.send_turn("Bonjour").await.unwrap();

        let sent = transport.sent();
        assert_eq!(sent[0]["contents"].as_array().unwrap().len(), 1);
        assert_eq!(sent[1]["contents"].as_array().unwrap().len(), 3);
        assert_eq!(sent[1]["contents"][1]["parts"][0]["text"], "Hi");
        assert_eq!(
            sent[1]["system_instruction"]["parts"][0]["text"],
            "Translator"
        );
        assert_eq!(manager.document().unwrap().contents().len(), 4);
    }

    #[tokio::test]
    async fn test_contents_alternate_over_many_turns() {
        let (transport, mut manager) = new_manager();
        let questions: Vec<String> = (0..5).map(|i| format!("question {}", i)).collect();

        for (i, question) in questions.iter().enumerate() {
            transport.push_reply(&format!("answer {}", i));
            manager.send_turn(question).await.unwrap();
        }

        let contents = manager.document().unwrap().contents();
        assert_eq!(contents.len(), 2 * questions.len());
        for (i, turn) in contents.iter().enumerate() {
            let expected = if i % 2 == 0 { Role::User } else { Role::Model };
            assert_eq!(turn.role, expected);
        }
        for (k, question) in questions.iter().enumerate() {
            assert_eq!(contents[2 * k].first_text(), Some(question.as_str()));
        }
        assert_eq!(manager.turn_count(), 5);
    }

    #[tokio::test]
    async fn test_last_configured_role_wins() {
        let (transport, mut manager) = new_manager();
        manager.configure_system_role("first");
        manager.configure_system_role("second");

        transport.push_reply("ok");
        manager.send_turn("q").await.unwrap();

        assert_eq!(manager.document().unwrap().system_role(), Some("second"));
    }

    #[tokio::test]
    async fn test_role_change_after_start_is_ignored() {
        let (transport, mut manager) = new_manager();
        manager.configure_system_role("before");
        transport.push_reply("a1");
        manager.send_turn("q1").await.unwrap();

        manager.configure_system_role("after");
        transport.push_reply("a2");
        manager.send_turn("q2").await.unwrap();

        assert_eq!(transport.sent()[1]["system_instruction"]["parts"][0]["text"], "before");
    }

    #[tokio::test]
    async fn test_reply_turn_stored_verbatim() {
        let (transport, mut manager) = new_manager();
        let body = json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{"text": "Paris", "thoughtSignature": "sig"}]
                }
            }]
        });
        transport.push(200, "OK", body.to_string());

        let result = manager.send_turn("Capitale de la France ?").await.unwrap();

        assert_eq!(result.reply(), "Paris");
        assert_eq!(result.response_json(), body.to_string());
        let last = manager.document().unwrap().contents().last().unwrap();
        assert_eq!(
            serde_json::to_value(last).unwrap(),
            body["candidates"][0]["content"]
        );
    }

    #[tokio::test]
    async fn test_request_json_is_pretty_copy_of_sent_body() {
        let (transport, mut manager) = new_manager();
        transport.push_reply("a");

        let result = manager.send_turn("q").await.unwrap();

        let pretty: Value = serde_json::from_str(result.request_json()).unwrap();
        assert!(result.request_json().contains('\n'));
        assert_eq!(pretty, transport.sent()[0]);
    }

    #[tokio::test]
    async fn test_rejected_turn_keeps_stored_document() {
        for status in [429u16, 500] {
            let (transport, mut manager) = new_manager();
            transport.push_reply("a1");
            manager.send_turn("q1").await.unwrap();
            let before = manager.document().cloned();

            transport.push(status, "Rejected", r#"{"error":{"code":1}}"#);
            let err = manager.send_turn("q2").await.unwrap_err();

            match err {
                ChatError::RequestRejected {
                    status: got,
                    request_snapshot,
                    ..
                } => {
                    assert_eq!(got, status);
                    let snapshot: Value = serde_json::from_str(&request_snapshot).unwrap();
                    assert_eq!(snapshot["contents"][2]["parts"][0]["text"], "q2");
                }
                other => panic!("unexpected error: {:?}", other),
            }
            assert_eq!(manager.document().cloned(), before);
            assert_eq!(manager.turn_count(), 1);
        }
    }

    #[tokio::test]
    async fn test_rejected_first_turn_leaves_conversation_unstarted() {
        let (transport, mut manager) = new_manager();
        transport.push(503, "Service Unavailable", "overloaded");

        let err = manager.send_turn("q").await.unwrap_err();

        assert_eq!(err.status(), Some(503));
        assert!(!manager.has_started());
    }

    #[tokio::test]
    async fn test_invalid_json_is_malformed() {
        let (transport, mut manager) = new_manager();
        transport.push(200, "OK", "{not json");

        let err = manager.send_turn("q").await.unwrap_err();

        assert!(matches!(err, ChatError::MalformedResponse(_)));
        assert!(manager.document().is_none());
    }

    #[tokio::test]
    async fn test_missing_fields_are_malformed() {
        let bodies = [
            json!({}),
            json!({"candidates": []}),
            json!({"candidates": [{}]}),
            json!({"candidates": [{"content": {"role": "model", "parts": []}}]}),
            json!({"candidates": [{"content": {"role": "model", "parts": [{"inlineData": {}}]}}]}),
            json!({"candidates": [{"content": {"role": "user", "parts": [{"text": "echo"}]}}]}),
        ];

        for body in bodies {
            let (transport, mut manager) = new_manager();
            transport.push(200, "OK", body.to_string());

            let err = manager.send_turn("q").await.unwrap_err();
            assert!(
                matches!(err, ChatError::MalformedResponse(_)),
                "body {} gave {:?}",
                body,
                err
            );
            assert!(!manager.has_started());
        }
    }

    #[tokio::test]
    async fn test_reset_starts_new_conversation_with_same_role() {
        let (transport, mut manager) = new_manager();
        manager.configure_system_role("guide");
        transport.push_reply("a1");
        manager.send_turn("q1").await.unwrap();

        manager.reset();
        transport.push_reply("a2");
        manager.send_turn("q2").await.unwrap();

        let sent = transport.sent();
        assert_eq!(sent[1]["contents"].as_array().unwrap().len(), 1);
        assert_eq!(sent[1]["system_instruction"]["parts"][0]["text"], "guide");
    }
}
