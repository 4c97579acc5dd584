//! # messenger-archive
//!
//! Client-side browsing of an exported Messenger archive.
//!
//! This crate provides:
//! - Discovery of conversation folders under the archive inbox
//! - Merging of multi-part `message_N.json` exports into one conversation
//! - Repair of the byte-per-char text encoding used by the export
//! - Chat list summaries, message grouping, statistics and reaction groups
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌─────────────────┐
//! │  Front end  │────▶│ ArchiveBrowser────▶│  messages/inbox │
//! │ (chat list) │     │  (catalog)   │     │  (JSON parts)   │
//! └─────────────┘     └──────────────┘     └─────────────────┘
//!       │                   │
//!       │ select chat       │ fills
//!       ▼                   ▼
//! ┌─────────────┐     ┌──────────────┐
//! │ group/stats │◀────│ Conversation │
//! │ /reactions  │     │    Cache     │
//! └─────────────┘     └──────────────┘
//! ```
//!
//! The catalog build is what fills the cache: call
//! [`ArchiveBrowser::catalog`] before [`ArchiveBrowser::conversation`].

pub mod catalog;
pub mod conversation;
pub mod error;
pub mod grouping;
pub mod loader;
pub mod reactions;
pub mod source;
pub mod stats;
pub mod text;

pub use catalog::{build_catalog, build_catalog_report, sort_and_filter, ArchiveBrowser, CatalogReport};
pub use conversation::{
    ChatSummary, ConversationCache, ConversationRecord, MediaAttachment, Message, MessageType,
    Participant, Reaction, Share, Sticker,
};
pub use error::{ArchiveError, Result};
pub use grouping::{group_messages, MessageGroup};
pub use loader::{load_conversation, load_owner_name, merge_parts, LoadOutcome};
pub use reactions::{group_actors_by_reaction, ReactionGroup};
pub use source::{ArchiveConfig, ArchiveSource, FolderHandle, FsArchive, MemoryArchive};
pub use stats::ConversationStats;
pub use text::normalize;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install a `fmt` subscriber filtered by `RUST_LOG` (default `messenger_archive=info`).
///
/// Meant to be called once by the host application. Later calls are no-ops.
pub fn init_tracing() {
    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "messenger_archive=info".parse() {
        filter = filter.add_directive(directive);
    }

    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .try_init();
}
