use advisor_wire::{HistoryEntry, HistoryRole};

use super::ids::{MessageId, SessionId};
use super::message::{Message, Role};

/// Snapshot of one conversation as the UI sees it.
///
/// While `is_running` is true the last message is the in-progress assistant reply.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationState {
    pub messages: Vec<Message>,
    pub is_running: bool,
    pub session_id: SessionId,
}

impl ConversationState {
    pub fn new(session_id: SessionId) -> Self {
        Self {
            messages: Vec::new(),
            is_running: false,
            session_id,
        }
    }

    pub fn in_progress(&self) -> Option<&Message> {
        if !self.is_running {
            return None;
        }
        self.messages
            .last()
            .filter(|message| message.role == Role::Assistant)
    }

    pub(crate) fn message_mut(&mut self, id: MessageId) -> Option<&mut Message> {
        self.messages.iter_mut().find(|message| message.id == id)
    }

    pub fn history(&self) -> Vec<HistoryEntry> {
        self.messages
            .iter()
            .filter_map(|message| {
                let text = message.content.text();
                if text.trim().is_empty() {
                    return None;
                }
                let role = match message.role {
                    Role::User => HistoryRole::User,
                    Role::Assistant => HistoryRole::Assistant,
                };
                Some(HistoryEntry::new(role, text))
            })
            .collect()
    }
}
