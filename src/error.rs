//! Error types for archive ingestion.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArchiveError {
    /// The picked root does not contain a recognizable conversations directory
    #[error("Not a valid Messenger archive folder: {}", .0.display())]
    MissingInbox(PathBuf),

    /// A conversation folder's parts don't parse or lack required fields
    #[error("Malformed conversation {folder}: {reason}")]
    MalformedArchive { folder: String, reason: String },

    /// A conversation folder yielded no parts or no messages
    #[error("Conversation {0} has no messages")]
    EmptyConversation(String),

    #[error("Invalid media path: {0}")]
    InvalidMediaPath(String),

    #[error("Media not found: {0}")]
    MediaNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ArchiveError {
    pub fn malformed(folder: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedArchive {
            folder: folder.into(),
            reason: reason.into(),
        }
    }

    /// Whether a conversation folder failing with this error is dropped from
    /// the catalog instead of failing the build.
    ///
    /// `Io` from reading one folder's parts is contained to that folder. The
    /// same error from listing the inbox never reaches this check and fails
    /// the build.
    pub fn is_skippable(&self) -> bool {
        matches!(
            self,
            Self::MalformedArchive { .. } | Self::EmptyConversation(_) | Self::Io(_) | Self::Json(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ArchiveError>;
