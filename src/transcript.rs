//! Per-widget conversation transcripts.
//!
//! A transcript only ever grows. Each user message opens a turn that is
//! closed by exactly one assistant message; a new user message is refused
//! while a turn is still open.

use crate::ResponseTable;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Upper bound on messages kept in one transcript.
pub const MAX_TRANSCRIPT_MESSAGES: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "web", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "web", derive(utoipa::ToSchema))]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// Unix seconds.
    pub sent_at: u64,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            sent_at: now_ts(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnError {
    EmptyInput,
    AwaitingReply,
    NoPendingTurn,
    TranscriptFull,
}

impl fmt::Display for TurnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnError::EmptyInput => write!(f, "message must not be empty"),
            TurnError::AwaitingReply => write!(f, "a reply is still pending"),
            TurnError::NoPendingTurn => write!(f, "no message is awaiting a reply"),
            TurnError::TranscriptFull => write!(
                f,
                "transcript reached {MAX_TRANSCRIPT_MESSAGES} messages"
            ),
        }
    }
}

impl std::error::Error for TurnError {}

#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<Message>,
    awaiting_reply: bool,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a user message and opens a turn.
    pub fn submit(&mut self, input: &str) -> Result<&Message, TurnError> {
        if input.trim().is_empty() {
            return Err(TurnError::EmptyInput);
        }
        if self.awaiting_reply {
            return Err(TurnError::AwaitingReply);
        }
        // Room for the user message and its reply.
        if self.messages.len() + 2 > MAX_TRANSCRIPT_MESSAGES {
            return Err(TurnError::TranscriptFull);
        }
        self.awaiting_reply = true;
        Ok(self.push(Message::new(Role::User, input)))
    }

    /// Closes the open turn with the assistant's reply.
    pub fn resolve(&mut self, reply: impl Into<String>) -> Result<&Message, TurnError> {
        if !self.awaiting_reply {
            return Err(TurnError::NoPendingTurn);
        }
        self.awaiting_reply = false;
        Ok(self.push(Message::new(Role::Assistant, reply)))
    }

    /// Submits `input` and answers it from `table` straight away.
    pub fn exchange(&mut self, input: &str, table: &ResponseTable) -> Result<&Message, TurnError> {
        self.submit(input)?;
        let reply = table.respond(input).to_string();
        self.resolve(reply)
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn is_awaiting_reply(&self) -> bool {
        self.awaiting_reply
    }

    /// Text of the user message of the open turn, if any.
    pub fn pending_input(&self) -> Option<&str> {
        if !self.awaiting_reply {
            return None;
        }
        self.messages
            .last()
            .filter(|message| message.role == Role::User)
            .map(|message| message.content.as_str())
    }

    fn push(&mut self, message: Message) -> &Message {
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }
}

pub(crate) fn now_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_then_resolve_alternates_roles() {
        let mut transcript = Transcript::new();
        transcript.submit("Do I need a vest?").unwrap();
        assert!(transcript.is_awaiting_reply());
        assert_eq!(transcript.pending_input(), Some("Do I need a vest?"));
        transcript.resolve("Yes.").unwrap();
        assert!(!transcript.is_awaiting_reply());
        let roles: Vec<_> = transcript.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, [Role::User, Role::Assistant]);
    }

    #[test]
    fn blank_input_is_never_appended() {
        let mut transcript = Transcript::new();
        assert_eq!(transcript.submit("").unwrap_err(), TurnError::EmptyInput);
        assert_eq!(transcript.submit(" \t ").unwrap_err(), TurnError::EmptyInput);
        assert!(transcript.is_empty());
        assert!(!transcript.is_awaiting_reply());
    }

    #[test]
    fn second_submit_waits_for_reply() {
        let mut transcript = Transcript::new();
        transcript.submit("first").unwrap();
        assert_eq!(
            transcript.submit("second").unwrap_err(),
            TurnError::AwaitingReply
        );
        assert_eq!(transcript.len(), 1);
    }

    #[test]
    fn resolve_without_turn_is_rejected() {
        let mut transcript = Transcript::new();
        assert_eq!(
            transcript.resolve("orphan").unwrap_err(),
            TurnError::NoPendingTurn
        );
        assert!(transcript.is_empty());
    }

    #[test]
    fn exchange_answers_from_table() {
        let mut transcript = Transcript::new();
        let reply = transcript
            .exchange("tell me about dinosaurs", ResponseTable::canonical())
            .unwrap()
            .content
            .clone();
        assert_eq!(reply, ResponseTable::canonical().fallback());
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.messages()[0].content, "tell me about dinosaurs");
    }

    #[test]
    fn full_transcript_refuses_new_turns() {
        let mut transcript = Transcript::new();
        for _ in 0..MAX_TRANSCRIPT_MESSAGES / 2 {
            transcript.exchange("ladder", ResponseTable::canonical()).unwrap();
        }
        assert_eq!(transcript.len(), MAX_TRANSCRIPT_MESSAGES);
        assert_eq!(
            transcript.submit("one more").unwrap_err(),
            TurnError::TranscriptFull
        );
        assert_eq!(transcript.len(), MAX_TRANSCRIPT_MESSAGES);
    }

    #[test]
    fn role_serializes_lowercase() {
        let message = Message::new(Role::Assistant, "hi");
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["role"], "assistant");
        assert!(json["sent_at"].as_u64().unwrap() > 0);
    }
}
