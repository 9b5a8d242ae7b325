use crate::transcript::{Message, Transcript, TurnError, now_ts};
use parking_lot::RwLock;
use rand::{Rng, distributions::Alphanumeric, thread_rng};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

const MAX_CONVERSATIONS: usize = 4096;
const CONVERSATION_IDLE_SECS: u64 = 1800;
const MAX_INQUIRY_RECORDS: usize = 250;
const CONVERSATION_ID_LEN: usize = 24;

pub type ConversationId = String;

/// Live widget transcripts and simulated contact-form submissions.
///
/// Everything lives in memory for the lifetime of the process. Clones share
/// the same registry.
#[derive(Clone, Default)]
pub struct Conversations {
    shared: Arc<RwLock<RegistryData>>,
}

impl Conversations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens an empty transcript for a newly mounted widget.
    pub fn open(&self) -> ConversationId {
        let id = generate_conversation_id();
        let mut guard = self.shared.write();
        guard.open(id.clone(), now_ts());
        id
    }

    pub fn submit(&self, id: &str, input: &str) -> Result<Message, ConversationError> {
        let mut guard = self.shared.write();
        guard.with_transcript(id, now_ts(), |transcript| {
            transcript.submit(input).cloned()
        })
    }

    pub fn resolve(&self, id: &str, reply: &str) -> Result<Message, ConversationError> {
        let mut guard = self.shared.write();
        guard.with_transcript(id, now_ts(), |transcript| {
            transcript.resolve(reply).cloned()
        })
    }

    pub fn transcript(&self, id: &str) -> Option<Vec<Message>> {
        let guard = self.shared.read();
        guard
            .conversations
            .get(id)
            .map(|state| state.transcript.messages().to_vec())
    }

    pub fn len_of(&self, id: &str) -> Option<usize> {
        let guard = self.shared.read();
        guard
            .conversations
            .get(id)
            .map(|state| state.transcript.len())
    }

    /// Drops a transcript whose widget went away.
    pub fn close(&self, id: &str) -> bool {
        let mut guard = self.shared.write();
        guard.conversations.remove(id).is_some()
    }

    pub fn record_inquiry(&self, request: InquiryRequest) -> Result<Inquiry, InquiryError> {
        let request = request.validated()?;
        let mut guard = self.shared.write();
        let inquiry = guard.record_inquiry(request, now_ts());
        info!(inquiry_id = inquiry.id, "contact inquiry received");
        Ok(inquiry)
    }

    /// Newest first.
    pub fn recent_inquiries(&self, limit: usize) -> Vec<Inquiry> {
        let guard = self.shared.read();
        guard.inquiries.iter().rev().take(limit).cloned().collect()
    }

    pub fn stats(&self) -> RegistryStats {
        let guard = self.shared.read();
        RegistryStats {
            live_conversations: guard.conversations.len(),
            pending_replies: guard
                .conversations
                .values()
                .filter(|state| state.transcript.is_awaiting_reply())
                .count(),
            inquiries_received: guard.next_inquiry_id,
        }
    }
}

#[derive(Default)]
struct RegistryData {
    conversations: HashMap<ConversationId, ConversationState>,
    inquiries: VecDeque<Inquiry>,
    next_inquiry_id: u64,
}

struct ConversationState {
    transcript: Transcript,
    last_active_ts: u64,
}

impl RegistryData {
    fn open(&mut self, id: ConversationId, now: u64) {
        self.prune_idle(now);
        if self.conversations.len() >= MAX_CONVERSATIONS {
            if let Some(oldest) = least_recent_key(&self.conversations) {
                debug!(conversation = %oldest, "evicting least recently active conversation");
                self.conversations.remove(&oldest);
            }
        }
        self.conversations.insert(
            id,
            ConversationState {
                transcript: Transcript::new(),
                last_active_ts: now,
            },
        );
    }

    fn prune_idle(&mut self, now: u64) {
        let before = self.conversations.len();
        self.conversations.retain(|_, state| {
            state.transcript.is_awaiting_reply()
                || now.saturating_sub(state.last_active_ts) <= CONVERSATION_IDLE_SECS
        });
        let pruned = before - self.conversations.len();
        if pruned > 0 {
            debug!(pruned, "pruned idle conversations");
        }
    }

    fn with_transcript<F>(
        &mut self,
        id: &str,
        now: u64,
        apply: F,
    ) -> Result<Message, ConversationError>
    where
        F: FnOnce(&mut Transcript) -> Result<Message, TurnError>,
    {
        let state = self
            .conversations
            .get_mut(id)
            .ok_or(ConversationError::UnknownConversation)?;
        state.last_active_ts = now;
        apply(&mut state.transcript).map_err(ConversationError::Turn)
    }

    fn record_inquiry(&mut self, request: InquiryRequest, now: u64) -> Inquiry {
        let id = self.next_inquiry_id;
        self.next_inquiry_id = self.next_inquiry_id.saturating_add(1);
        let inquiry = Inquiry {
            id,
            name: request.name,
            email: request.email,
            message: request.message,
            received_at: now,
        };
        self.inquiries.push_back(inquiry.clone());
        while self.inquiries.len() > MAX_INQUIRY_RECORDS {
            self.inquiries.pop_front();
        }
        inquiry
    }
}

/// Idle conversations go first; a pending one is only picked when nothing
/// else is left.
fn least_recent_key(conversations: &HashMap<ConversationId, ConversationState>) -> Option<String> {
    conversations
        .iter()
        .min_by_key(|(_, state)| (state.transcript.is_awaiting_reply(), state.last_active_ts))
        .map(|(key, _)| key.clone())
}

pub fn generate_conversation_id() -> ConversationId {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(CONVERSATION_ID_LEN)
        .map(char::from)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationError {
    UnknownConversation,
    Turn(TurnError),
}

impl fmt::Display for ConversationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversationError::UnknownConversation => write!(f, "unknown conversation"),
            ConversationError::Turn(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ConversationError {}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "web", derive(utoipa::ToSchema))]
pub struct InquiryRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub message: String,
}

impl InquiryRequest {
    /// Trimmed copy, or the first problem found.
    pub fn validated(self) -> Result<Self, InquiryError> {
        let name = self.name.trim().to_string();
        let email = self.email.trim().to_string();
        let message = self.message.trim().to_string();
        if name.is_empty() {
            return Err(InquiryError::MissingField("name"));
        }
        if email.is_empty() {
            return Err(InquiryError::MissingField("email"));
        }
        if message.is_empty() {
            return Err(InquiryError::MissingField("message"));
        }
        if !looks_like_email(&email) {
            return Err(InquiryError::InvalidEmail);
        }
        Ok(Self {
            name,
            email,
            message,
        })
    }
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InquiryError {
    MissingField(&'static str),
    InvalidEmail,
}

impl fmt::Display for InquiryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InquiryError::MissingField(field) => write!(f, "The {field} field is required."),
            InquiryError::InvalidEmail => write!(f, "Please enter a valid email address."),
        }
    }
}

impl std::error::Error for InquiryError {}

#[derive(Debug, Clone, Serialize)]
pub struct Inquiry {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub message: String,
    pub received_at: u64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct RegistryStats {
    pub live_conversations: usize,
    pub pending_replies: usize,
    pub inquiries_received: u64,
}
