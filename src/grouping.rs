//! Partitioning of a conversation into sender-contiguous runs.
//!
//! The message view shows an avatar and a sender label once per run, so
//! consecutive messages from the same sender are rendered as one group.

use crate::conversation::Message;
use serde::Serialize;

/// A non-empty, time-ordered run of consecutive messages from one sender
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageGroup {
    /// Raw sender name shared by every message in the run
    pub sender_name: String,
    pub messages: Vec<Message>,
}

impl MessageGroup {
    pub fn first(&self) -> &Message {
        &self.messages[0]
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Sort a copy of `messages` by timestamp and split it wherever the sender changes.
///
/// The sort is stable, so messages with equal timestamps keep their part order.
pub fn group_messages(messages: &[Message]) -> Vec<MessageGroup> {
    let mut sorted = messages.to_vec();
    sorted.sort_by_key(|m| m.timestamp_ms);

    let mut groups: Vec<MessageGroup> = Vec::new();
    for message in sorted {
        match groups.last_mut() {
            Some(group) if group.sender_name == message.sender_name => {
                group.messages.push(message);
            }
            _ => groups.push(MessageGroup {
                sender_name: message.sender_name.clone(),
                messages: vec![message],
            }),
        }
    }

    groups
}
