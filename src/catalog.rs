//! Archive catalog - loads every conversation folder under the inbox.
//!
//! Building the catalog and filling the conversation cache are the same step:
//! each folder's summary and merged record are produced together, so picking a
//! chat later never re-reads its files. Build the catalog before asking the
//! cache for a conversation.
//!
//! ## Concurrency
//! Folders are loaded concurrently on the calling task, at most
//! [`ArchiveSource::max_concurrent_loads`] at a time, so inboxes with thousands
//! of folders stay within the open file limit. Folder completion order is
//! irrelevant; callers order the list with [`sort_and_filter`].

use crate::conversation::{ChatSummary, ConversationCache, ConversationRecord};
use crate::error::{ArchiveError, Result};
use crate::loader::{load_conversation, load_owner_name, LoadOutcome};
use crate::source::{ArchiveSource, FolderHandle};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Loaded summaries plus the folders that were dropped and why
#[derive(Debug, Default)]
pub struct CatalogReport {
    pub summaries: Vec<ChatSummary>,
    pub skipped: Vec<(String, ArchiveError)>,
}

/// Load every conversation folder under `inbox`, keeping the per-folder outcomes
pub async fn build_catalog_report(
    source: &dyn ArchiveSource,
    cache: &ConversationCache,
    inbox: Option<&FolderHandle>,
) -> Result<CatalogReport> {
    let Some(inbox) = inbox else {
        return Ok(CatalogReport::default());
    };

    let folders = source.list_subfolders(inbox).await?;
    let outcomes: Vec<LoadOutcome> = stream::iter(
        folders
            .iter()
            .map(|folder| load_conversation(source, cache, folder)),
    )
    .buffered(source.max_concurrent_loads().max(1))
    .collect()
    .await;

    let mut report = CatalogReport::default();
    for outcome in outcomes {
        match outcome {
            LoadOutcome::Loaded(summary) => report.summaries.push(summary),
            LoadOutcome::Skipped { dir_name, reason } if reason.is_skippable() => {
                if !matches!(reason, ArchiveError::EmptyConversation(_)) {
                    warn!("Dropping conversation {}: {}", dir_name, reason);
                }
                report.skipped.push((dir_name, reason));
            }
            LoadOutcome::Skipped { dir_name, reason } => {
                error!("Catalog build failed at {}: {}", dir_name, reason);
                return Err(reason);
            }
        }
    }

    info!(
        "Catalog built: {} conversations loaded, {} skipped",
        report.summaries.len(),
        report.skipped.len()
    );
    Ok(report)
}

/// Chat summaries for every valid conversation under `inbox`.
///
/// An absent inbox yields an empty list. Folders failing with a skippable
/// error (malformed, empty, unreadable) are dropped.
pub async fn build_catalog(
    source: &dyn ArchiveSource,
    cache: &ConversationCache,
    inbox: Option<&FolderHandle>,
) -> Result<Vec<ChatSummary>> {
    Ok(build_catalog_report(source, cache, inbox).await?.summaries)
}

/// Order chats by `last_sent` descending, then keep those whose title or folder
/// name contains `query`. Matching is a case-sensitive substring test.
pub fn sort_and_filter(chats: &[ChatSummary], query: &str) -> Vec<ChatSummary> {
    let mut sorted = chats.to_vec();
    sorted.sort_by(|a, b| b.last_sent.cmp(&a.last_sent));
    sorted
        .into_iter()
        .filter(|c| c.title.contains(query) || c.dir_name.contains(query))
        .collect()
}

/// One opened archive: its source, located inbox and conversation cache.
///
/// Lives for the whole session. The cache is never cleared; reopen the archive
/// to pick up changes on disk.
pub struct ArchiveBrowser<S: ArchiveSource> {
    source: S,
    inbox: FolderHandle,
    cache: Arc<ConversationCache>,
}

impl<S: ArchiveSource> ArchiveBrowser<S> {
    /// Locate the inbox. Fails with `MissingInbox` if `source` isn't an export.
    pub async fn open(source: S) -> Result<Self> {
        let Some(inbox) = source.find_inbox_folder().await else {
            return Err(ArchiveError::MissingInbox(source.root_path().to_path_buf()));
        };
        info!("Opened archive inbox {}", inbox.path.display());
        Ok(Self {
            source,
            inbox,
            cache: ConversationCache::new(),
        })
    }

    pub fn inbox(&self) -> &FolderHandle {
        &self.inbox
    }

    pub fn cache(&self) -> &Arc<ConversationCache> {
        &self.cache
    }

    /// Load all conversations, filling the cache as a side effect
    pub async fn catalog(&self) -> Result<Vec<ChatSummary>> {
        build_catalog(&self.source, &self.cache, Some(&self.inbox)).await
    }

    pub async fn catalog_report(&self) -> Result<CatalogReport> {
        build_catalog_report(&self.source, &self.cache, Some(&self.inbox)).await
    }

    /// Full record of a conversation loaded by a previous catalog build
    pub fn conversation(&self, dir_name: &str) -> Option<ConversationRecord> {
        self.cache.get(dir_name)
    }

    pub async fn owner_name(&self) -> Result<Option<String>> {
        load_owner_name(&self.source).await
    }

    /// Bytes of an attachment, by the URI stored in the message
    pub async fn media(&self, uri: &str) -> Result<Vec<u8>> {
        self.source.read_media(uri).await
    }
}
