//! Conversation loader - merges a folder's numbered parts into one record.
//!
//! For each conversation folder:
//! 1. Read every `message_N.json` part in ascending part order
//! 2. Parse each part and merge: record-level fields from part 1, messages
//!    concatenated in part order
//! 3. Derive the chat summary, then store the merged record in the cache
//!
//! Any failure is contained to the folder: the caller gets a `Skipped` outcome
//! and the cache is left untouched for that folder.

use crate::conversation::{ChatSummary, ConversationCache, ConversationRecord};
use crate::error::{ArchiveError, Result};
use crate::source::{ArchiveSource, FolderHandle};
use crate::text::normalize;
use tracing::debug;

/// Result of loading one conversation folder
#[derive(Debug)]
pub enum LoadOutcome {
    Loaded(ChatSummary),
    Skipped { dir_name: String, reason: ArchiveError },
}

/// Merge raw part texts into one conversation record.
///
/// Title, participants and flags come from the first part; messages from all
/// parts are concatenated in part order.
pub fn merge_parts(dir_name: &str, parts: &[String]) -> Result<ConversationRecord> {
    let mut records = parts.iter().enumerate().map(|(index, text)| {
        serde_json::from_str::<ConversationRecord>(text).map_err(|e| {
            ArchiveError::malformed(dir_name, format!("part {}: {}", index + 1, e))
        })
    });

    let mut merged = match records.next() {
        Some(first) => first?,
        None => return Err(ArchiveError::EmptyConversation(dir_name.to_string())),
    };
    for part in records {
        merged.messages.extend(part?.messages);
    }

    Ok(merged)
}

/// Project a merged record into its chat list entry.
///
/// `last_sent` is the earliest message timestamp.
pub fn summarize(dir_name: &str, record: &ConversationRecord) -> Result<ChatSummary> {
    let first = record
        .participants
        .first()
        .ok_or_else(|| ArchiveError::malformed(dir_name, "conversation has no participants"))?;

    let last_sent = record
        .messages
        .iter()
        .map(|m| m.timestamp_ms)
        .min()
        .ok_or_else(|| ArchiveError::EmptyConversation(dir_name.to_string()))?;

    Ok(ChatSummary {
        name: first.display_name(),
        dir_name: dir_name.to_string(),
        last_sent,
        title: record.display_title(),
    })
}

async fn try_load(
    source: &dyn ArchiveSource,
    cache: &ConversationCache,
    folder: &FolderHandle,
) -> Result<ChatSummary> {
    let parts = source.read_conversation_parts(folder).await?;
    if parts.is_empty() {
        return Err(ArchiveError::EmptyConversation(folder.name.clone()));
    }

    let record = merge_parts(&folder.name, &parts)?;
    let summary = summarize(&folder.name, &record)?;

    // Only cache folders that produced a summary
    cache.put(&folder.name, &record)?;

    debug!(
        "Loaded {} ({} parts, {} messages)",
        folder.name,
        parts.len(),
        record.messages.len()
    );
    Ok(summary)
}

/// Load one conversation folder, caching its merged record on success
pub async fn load_conversation(
    source: &dyn ArchiveSource,
    cache: &ConversationCache,
    folder: &FolderHandle,
) -> LoadOutcome {
    match try_load(source, cache, folder).await {
        Ok(summary) => LoadOutcome::Loaded(summary),
        Err(reason) => {
            debug!("Skipping conversation {}: {}", folder.name, reason);
            LoadOutcome::Skipped {
                dir_name: folder.name.clone(),
                reason,
            }
        }
    }
}

/// Name of the archive owner, from the autofill profile file.
///
/// `None` if the file or the name is missing.
pub async fn load_owner_name(source: &dyn ArchiveSource) -> Result<Option<String>> {
    let Some(text) = source.read_profile_info().await? else {
        return Ok(None);
    };

    let profile: serde_json::Value = serde_json::from_str(&text)
        .map_err(|e| ArchiveError::malformed("autofill_information", e.to_string()))?;

    Ok(profile
        .get("autofill_information_v2")
        .and_then(|v| v.get("FULL_NAME"))
        .and_then(|v| v.get(0))
        .and_then(|v| v.as_str())
        .map(normalize))
}
