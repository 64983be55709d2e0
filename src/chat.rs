use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::api_connection::endpoints::Recipe;

pub const LOADING_TEXT: &str = "Finding recipes...";

#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub id: Uuid,
    pub text: String,
    pub is_user: bool,
    pub timestamp: DateTime<Utc>,
    pub recipes: Option<Vec<Recipe>>,
    pub is_loading: bool,
}

impl ChatMessage {
    fn new(text: impl Into<String>, is_user: bool, recipes: Option<Vec<Recipe>>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            is_user,
            timestamp: Utc::now(),
            recipes,
            is_loading: false,
        }
    }

    fn loading() -> Self {
        Self {
            is_loading: true,
            ..Self::new(LOADING_TEXT, false, None)
        }
    }
}

/// Ordered chat history for one session.
#[derive(Debug, Default)]
pub struct ChatTranscript {
    messages: Vec<ChatMessage>,
}

impl ChatTranscript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_user(&mut self, text: impl Into<String>) -> &ChatMessage {
        self.push(ChatMessage::new(text, true, None))
    }

    pub fn push_reply(&mut self, text: impl Into<String>, recipes: Option<Vec<Recipe>>) -> &ChatMessage {
        self.push(ChatMessage::new(text, false, recipes))
    }

    /// Appends a loading placeholder. The returned guard swaps it for the
    /// real reply in one step, and removes it if dropped unsettled.
    pub fn begin_reply(&mut self) -> PendingReply<'_> {
        let placeholder = ChatMessage::loading();
        let id = placeholder.id;
        self.messages.push(placeholder);
        PendingReply {
            transcript: self,
            placeholder: id,
            settled: false,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    /// Most recent message carrying recipes.
    pub fn latest_recipes(&self) -> Option<&[Recipe]> {
        self.messages
            .iter()
            .rev()
            .find_map(|m| m.recipes.as_deref())
    }

    pub fn has_pending(&self) -> bool {
        self.messages.iter().any(|m| m.is_loading)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    fn push(&mut self, message: ChatMessage) -> &ChatMessage {
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }

    fn remove_message(&mut self, id: Uuid) {
        self.messages.retain(|m| m.id != id);
    }
}

#[must_use = "an unsettled reply is removed from the transcript when dropped"]
pub struct PendingReply<'a> {
    transcript: &'a mut ChatTranscript,
    placeholder: Uuid,
    settled: bool,
}

impl PendingReply<'_> {
    pub fn placeholder_id(&self) -> Uuid {
        self.placeholder
    }

    /// Replaces the placeholder with the final reply.
    pub fn settle(mut self, text: impl Into<String>, recipes: Option<Vec<Recipe>>) {
        self.transcript.remove_message(self.placeholder);
        self.transcript.push_reply(text, recipes);
        self.settled = true;
    }
}

impl Drop for PendingReply<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.transcript.remove_message(self.placeholder);
        }
    }
}
