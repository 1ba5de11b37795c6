use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::errors::{ChatError, ChatResult};

/// Author of a turn in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Part structure for a piece of content
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Fields the API attaches to a part that we do not interpret, kept so a
    /// model turn is replayed exactly as it was received.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            extra: Map::new(),
        }
    }
}

/// One turn of the conversation: a role-tagged sequence of parts
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Content {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part::text(text)],
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            parts: vec![Part::text(text)],
        }
    }

    /// Text of the first part, if the turn has one
    pub fn first_text(&self) -> Option<&str> {
        self.parts.first().and_then(|part| part.text.as_deref())
    }
}

/// Persona directive sent once at the start of a conversation
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SystemInstruction {
    pub parts: Vec<Part>,
}

/// The full request payload replayed to the API on every turn.
///
/// `contents` only ever grows, and always alternates user/model starting
/// with a user turn. [`ConversationDocument::append_turn`] is the only way
/// to extend it.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ConversationDocument {
    system_instruction: SystemInstruction,
    contents: Vec<Content>,
}

impl ConversationDocument {
    /// Builds the first-turn document from the system role and opening question
    pub fn start(system_role: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            system_instruction: SystemInstruction {
                parts: vec![Part::text(system_role)],
            },
            contents: vec![Content::user(question)],
        }
    }

    /// Returns a new document with `turn` appended at the end of `contents`.
    pub fn append_turn(mut self, turn: Content) -> ChatResult<Self> {
        let expected = self.next_role();
        if turn.role != expected {
            return Err(ChatError::TurnOrder {
                expected,
                found: turn.role,
            });
        }
        self.contents.push(turn);
        Ok(self)
    }

    /// Role the next appended turn must have
    pub fn next_role(&self) -> Role {
        match self.contents.last() {
            Some(last) if last.role == Role::User => Role::Model,
            _ => Role::User,
        }
    }

    pub fn contents(&self) -> &[Content] {
        &self.contents
    }

    pub fn system_instruction(&self) -> &SystemInstruction {
        &self.system_instruction
    }

    /// Text of the system role the conversation was started with
    pub fn system_role(&self) -> Option<&str> {
        self.system_instruction
            .parts
            .first()
            .and_then(|part| part.text.as_deref())
    }

    /// Compact JSON, as sent on the wire
    pub fn to_wire(&self) -> ChatResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Indented JSON, for display and diagnostics
    pub fn to_pretty(&self) -> ChatResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Response from the generateContent endpoint
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct GenerateContentResponse {
    pub candidates: Vec<Candidate>,
}

/// Candidate in the response
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Candidate {
    pub content: Option<Content>,
}

/// Outcome of one successful round trip
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TurnResult {
    request_json: String,
    response_json: String,
    reply: String,
}

impl TurnResult {
    pub fn new(request_json: String, response_json: String, reply: String) -> Self {
        Self {
            request_json,
            response_json,
            reply,
        }
    }

    /// Pretty-printed request document that was sent
    pub fn request_json(&self) -> &str {
        &self.request_json
    }

    /// Raw response body as received
    pub fn response_json(&self) -> &str {
        &self.response_json
    }

    /// Plain text of the model's reply
    pub fn reply(&self) -> &str {
        &self.reply
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_start_document_wire_shape() {
        let doc = ConversationDocument::start("helpful assistant", "Capitale de la France ?");
        let value: Value = serde_json::from_str(&doc.to_wire().unwrap()).unwrap();

        assert_eq!(
            value,
            json!({
                "system_instruction": {"parts": [{"text": "helpful assistant"}]},
                "contents": [
                    {"role": "user", "parts": [{"text": "Capitale de la France ?"}]}
                ]
            })
        );
    }

    #[test]
    fn test_append_turn_alternates() {
        let doc = ConversationDocument::start("role", "q1")
            .append_turn(Content::model("a1"))
            .unwrap()
            .append_turn(Content::user("q2"))
            .unwrap();

        let roles: Vec<Role> = doc.contents().iter().map(|c| c.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Model, Role::User]);
        assert_eq!(doc.next_role(), Role::Model);
    }

    #[test]
    fn test_append_turn_rejects_same_role_twice() {
        let doc = ConversationDocument::start("role", "q1");
        let err = doc.append_turn(Content::user("q2")).unwrap_err();

        assert!(matches!(
            err,
            ChatError::TurnOrder {
                expected: Role::Model,
                found: Role::User
            }
        ));
    }

    #[test]
    fn test_pretty_output_reparses_to_equal_document() {
        let doc = ConversationDocument::start("Translator", "Hello")
            .append_turn(Content::model("Bonjour"))
            .unwrap();

        let pretty = doc.to_pretty().unwrap();
        assert!(pretty.contains('\n'));

        let reparsed: ConversationDocument = serde_json::from_str(&pretty).unwrap();
        assert_eq!(reparsed, doc);
    }

    #[test]
    fn test_part_keeps_unknown_fields() {
        let raw = json!({
            "role": "model",
            "parts": [{"text": "Hi", "thoughtSignature": "abc"}]
        });
        let content: Content = serde_json::from_value(raw.clone()).unwrap();

        assert_eq!(content.first_text(), Some("Hi"));
        assert_eq!(serde_json::to_value(&content).unwrap(), raw);
    }

    #[test]
    fn test_response_ignores_extra_fields() {
        let body = r#"{
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Paris"}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"totalTokenCount": 12}
        }"#;
        let response: GenerateContentResponse = serde_json::from_str(body).unwrap();

        let content = response.candidates[0].content.as_ref().unwrap();
        assert_eq!(content.role, Role::Model);
        assert_eq!(content.first_text(), Some("Paris"));
    }
}
