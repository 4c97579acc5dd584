//! Conversation types and the process-wide conversation cache.
//!
//! This module defines the merged conversation format that all consumers
//! (chat list, message view, info panel) read from.

use crate::error::Result;
use crate::reactions::{group_actors_by_reaction, ReactionGroup};
use crate::text::normalize;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

/// A chat member or a user mentioned by a subscribe/unsubscribe event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub name: String,
}

impl Participant {
    pub fn display_name(&self) -> String {
        normalize(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    pub reaction: String,
    pub actor: String,
}

impl Reaction {
    pub fn display_actor(&self) -> String {
        normalize(&self.actor)
    }
}

/// Message kind as written by the export. Unknown kinds map to `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageType {
    Generic,
    Unsubscribe,
    Subscribe,
    Call,
    Share,
    #[serde(other)]
    Other,
}

/// Photo, video, audio, gif or file attachment. `uri` is relative to the archive root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaAttachment {
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sticker {
    pub uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Share {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share_text: Option<String>,
}

/// A single message as stored in a conversation part
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub sender_name: String,
    /// Milliseconds since the Unix epoch
    pub timestamp_ms: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub message_type: Option<MessageType>,
    #[serde(default)]
    pub is_unsent: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub users: Vec<Participant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_duration: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share: Option<Share>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sticker: Option<Sticker>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photos: Option<Vec<MediaAttachment>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub videos: Option<Vec<MediaAttachment>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_files: Option<Vec<MediaAttachment>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gifs: Option<Vec<MediaAttachment>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<MediaAttachment>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reactions: Option<Vec<Reaction>>,
}

impl Message {
    pub fn display_sender(&self) -> String {
        normalize(&self.sender_name)
    }

    /// Actors grouped by reaction symbol, or `None` when the message has no reactions
    pub fn grouped_reactions(&self) -> Option<Vec<ReactionGroup>> {
        self.reactions.as_deref().map(group_actors_by_reaction)
    }
}

/// Merged result of all JSON parts of one conversation folder.
///
/// `messages` is in part-concatenation order, not time order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub messages: Vec<Message>,
    #[serde(default)]
    pub participants: Vec<Participant>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub is_still_participant: bool,
    #[serde(default)]
    pub thread_type: String,
    #[serde(default)]
    pub thread_path: String,
}

impl ConversationRecord {
    pub fn display_title(&self) -> String {
        normalize(&self.title)
    }
}

/// Lightweight per-conversation projection used by the chat list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSummary {
    /// Normalized name of the first participant
    pub name: String,
    /// Folder identifier, also the cache key
    pub dir_name: String,
    /// Earliest message timestamp (ms). Despite the name this is the minimum.
    pub last_sent: i64,
    /// Normalized conversation title
    pub title: String,
}

/// Process-wide store of merged conversations, keyed by folder name.
///
/// Created once when an archive is opened and never cleared. Each folder is
/// written once per catalog build; every read deserializes a fresh copy of the
/// stored snapshot, so callers can't mutate what the cache holds.
pub struct ConversationCache {
    /// Folder name -> serialized ConversationRecord
    records: DashMap<String, String>,
}

impl ConversationCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            records: DashMap::new(),
        })
    }

    /// Store a snapshot of `record`. Overwrites any previous entry for the folder.
    pub fn put(&self, dir_name: &str, record: &ConversationRecord) -> Result<()> {
        let snapshot = serde_json::to_string(record)?;
        self.records.insert(dir_name.to_string(), snapshot);
        Ok(())
    }

    /// Get a fresh copy of the record stored for a folder
    pub fn get(&self, dir_name: &str) -> Option<ConversationRecord> {
        let entry = self.records.get(dir_name)?;
        match serde_json::from_str(entry.value()) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Corrupt cache entry for {}: {}", dir_name, e);
                None
            }
        }
    }

    pub fn contains(&self, dir_name: &str) -> bool {
        self.records.contains_key(dir_name)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
