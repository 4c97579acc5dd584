//! Per-conversation statistics for the info panel.

use crate::conversation::Message;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationStats {
    /// Messages per raw (undecoded) sender name
    pub count_info: HashMap<String, usize>,
    /// Earliest message timestamp (ms), used as the conversation creation time
    pub created_at: i64,
}

impl ConversationStats {
    /// Compute counts and creation time. `None` for an empty conversation.
    pub fn compute(messages: &[Message]) -> Option<Self> {
        let created_at = messages.iter().map(|m| m.timestamp_ms).min()?;

        let mut count_info: HashMap<String, usize> = HashMap::new();
        for message in messages {
            *count_info.entry(message.sender_name.clone()).or_insert(0) += 1;
        }

        Some(Self {
            count_info,
            created_at,
        })
    }

    /// Senders ordered by message count, highest first. Ties sort by name.
    pub fn ranked(&self) -> Vec<(&str, usize)> {
        let mut ranked: Vec<(&str, usize)> = self
            .count_info
            .iter()
            .map(|(name, count)| (name.as_str(), *count))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked
    }

    pub fn total(&self) -> usize {
        self.count_info.values().sum()
    }

    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.created_at)
    }
}
