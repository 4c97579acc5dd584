//! Read access to an exported Messenger archive.
//!
//! An export looks like:
//! ```text
//! <root>/messages/inbox/<chat>_<id>/message_1.json
//! <root>/messages/inbox/<chat>_<id>/message_2.json
//! <root>/messages/inbox/<chat>_<id>/photos/...
//! <root>/messages/autofill_information.json
//! ```
//!
//! Large conversations are split into numbered parts. Media URIs inside the
//! parts are relative to `<root>`.

use crate::error::{ArchiveError, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Conversation folders loaded at once during a catalog build.
/// Each load holds a directory handle and part files open.
pub const DEFAULT_MAX_CONCURRENT_LOADS: usize = 32;

/// Archive layout knobs
#[derive(Debug, Clone)]
pub struct ArchiveConfig {
    /// Candidate locations of the conversations root, relative to the picked folder
    pub inbox_dirs: Vec<PathBuf>,
    /// Part files are named `{part_prefix}{N}.{part_extension}`
    pub part_prefix: String,
    pub part_extension: String,
    /// Profile file holding the archive owner's name, relative to the picked folder
    pub autofill_file: PathBuf,
    /// Upper bound on folders loaded concurrently by the catalog builder
    pub max_concurrent_loads: usize,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            inbox_dirs: vec![PathBuf::from("messages").join("inbox"), PathBuf::from("inbox")],
            part_prefix: "message_".to_string(),
            part_extension: "json".to_string(),
            autofill_file: PathBuf::from("messages").join("autofill_information.json"),
            max_concurrent_loads: DEFAULT_MAX_CONCURRENT_LOADS,
        }
    }
}

impl ArchiveConfig {
    /// Defaults, overridden by `MESSENGER_INBOX_DIR`, `MESSENGER_AUTOFILL_FILE`
    /// and `MESSENGER_MAX_CONCURRENT_LOADS`
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(dir) = std::env::var("MESSENGER_INBOX_DIR") {
            config.inbox_dirs.insert(0, PathBuf::from(dir));
        }
        if let Ok(file) = std::env::var("MESSENGER_AUTOFILL_FILE") {
            config.autofill_file = PathBuf::from(file);
        }
        if let Some(n) = std::env::var("MESSENGER_MAX_CONCURRENT_LOADS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|n| *n > 0)
        {
            config.max_concurrent_loads = n;
        }
        config
    }

    /// Part number of a conversation part file
    /// "message_12.json" -> Some(12), "photos" -> None
    pub fn part_number(&self, filename: &str) -> Option<u32> {
        let stem = filename
            .strip_prefix(self.part_prefix.as_str())?
            .strip_suffix(self.part_extension.as_str())?
            .strip_suffix('.')?;
        stem.parse().ok()
    }
}

/// A conversation folder (or the inbox itself)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderHandle {
    /// Folder name, used as the conversation identifier
    pub name: String,
    pub path: PathBuf,
}

/// Filesystem collaborator consumed by the loader and catalog builder
#[async_trait]
pub trait ArchiveSource: Send + Sync {
    /// Folder the user picked
    fn root_path(&self) -> &Path;

    /// Upper bound on conversation folders loaded at once
    fn max_concurrent_loads(&self) -> usize {
        DEFAULT_MAX_CONCURRENT_LOADS
    }

    /// Locate the conversations root. `None` if the tree doesn't look like an export.
    async fn find_inbox_folder(&self) -> Option<FolderHandle>;

    /// Conversation folders directly under `root`
    async fn list_subfolders(&self, root: &FolderHandle) -> Result<Vec<FolderHandle>>;

    /// Raw text of each numbered part in ascending part order. Empty if there are none.
    async fn read_conversation_parts(&self, folder: &FolderHandle) -> Result<Vec<String>>;

    /// Raw text of the autofill/profile file, if present
    async fn read_profile_info(&self) -> Result<Option<String>>;

    /// Raw bytes of a media file, by path relative to the archive root
    async fn read_media(&self, relative_path: &str) -> Result<Vec<u8>>;
}

/// Reject absolute paths and parent traversal in media URIs
fn checked_media_path(relative_path: &str) -> Result<PathBuf> {
    let path = Path::new(relative_path);
    let safe = !relative_path.is_empty()
        && path.components().all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if safe {
        Ok(path.to_path_buf())
    } else {
        Err(ArchiveError::InvalidMediaPath(relative_path.to_string()))
    }
}

/// Archive on the local filesystem
pub struct FsArchive {
    root: PathBuf,
    config: ArchiveConfig,
}

impl FsArchive {
    pub fn new(root: impl Into<PathBuf>, config: ArchiveConfig) -> Self {
        Self {
            root: root.into(),
            config,
        }
    }
}

/// Follows symlinks, unlike `DirEntry::file_type`
async fn is_dir(path: &Path) -> bool {
    fs::metadata(path).await.map(|m| m.is_dir()).unwrap_or(false)
}

async fn is_file(path: &Path) -> bool {
    fs::metadata(path).await.map(|m| m.is_file()).unwrap_or(false)
}

/// File text with invalid UTF-8 replaced by U+FFFD
async fn read_text_lossy(path: &Path) -> std::io::Result<String> {
    let bytes = fs::read(path).await?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[async_trait]
impl ArchiveSource for FsArchive {
    fn root_path(&self) -> &Path {
        &self.root
    }

    fn max_concurrent_loads(&self) -> usize {
        self.config.max_concurrent_loads.max(1)
    }

    async fn find_inbox_folder(&self) -> Option<FolderHandle> {
        for candidate in &self.config.inbox_dirs {
            let path = self.root.join(candidate);
            if is_dir(&path).await {
                debug!("Found inbox at {}", path.display());
                return Some(FolderHandle {
                    name: "inbox".to_string(),
                    path,
                });
            }
        }

        // The user may have picked the inbox itself
        let root_name = self.root.file_name().and_then(|n| n.to_str())?;
        if root_name == "inbox" && is_dir(&self.root).await {
            return Some(FolderHandle {
                name: root_name.to_string(),
                path: self.root.clone(),
            });
        }

        None
    }

    async fn list_subfolders(&self, root: &FolderHandle) -> Result<Vec<FolderHandle>> {
        let mut folders = Vec::new();
        let mut entries = fs::read_dir(&root.path).await?;

        while let Some(entry) = entries.next_entry().await? {
            // Symlinked conversation folders count too
            if !is_dir(&entry.path()).await {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(|s| s.to_string()) else {
                debug!("Skipping non UTF-8 folder name: {:?}", entry.file_name());
                continue;
            };
            folders.push(FolderHandle {
                name,
                path: entry.path(),
            });
        }

        folders.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(folders)
    }

    async fn read_conversation_parts(&self, folder: &FolderHandle) -> Result<Vec<String>> {
        let mut numbered: Vec<(u32, PathBuf)> = Vec::new();
        let mut entries = fs::read_dir(&folder.path).await?;

        while let Some(entry) = entries.next_entry().await? {
            let filename = entry.file_name();
            let Some(number) = filename.to_str().and_then(|n| self.config.part_number(n)) else {
                continue;
            };
            let path = entry.path();
            if is_file(&path).await {
                numbered.push((number, path));
            }
        }

        // message_10.json must follow message_2.json
        numbered.sort_by_key(|(n, _)| *n);

        let mut parts = Vec::with_capacity(numbered.len());
        for (_, path) in numbered {
            parts.push(read_text_lossy(&path).await?);
        }
        Ok(parts)
    }

    async fn read_profile_info(&self) -> Result<Option<String>> {
        let path = self.root.join(&self.config.autofill_file);
        match read_text_lossy(&path).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn read_media(&self, relative_path: &str) -> Result<Vec<u8>> {
        let path = self.root.join(checked_media_path(relative_path)?);
        match fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ArchiveError::MediaNotFound(relative_path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Archive whose file contents are already in memory.
///
/// Useful for hosts that read files through their own picker API.
#[derive(Debug, Clone, Default)]
pub struct MemoryArchive {
    root: PathBuf,
    has_inbox: bool,
    /// Folder name -> part texts in part order
    conversations: BTreeMap<String, Vec<String>>,
    profile: Option<String>,
    media: HashMap<String, Vec<u8>>,
}

impl MemoryArchive {
    /// An archive with an empty inbox
    pub fn new() -> Self {
        Self {
            has_inbox: true,
            ..Self::default()
        }
    }

    /// An archive without an inbox folder
    pub fn without_inbox() -> Self {
        Self::default()
    }

    pub fn with_conversation<I, S>(mut self, dir_name: &str, parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.conversations
            .insert(dir_name.to_string(), parts.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_profile(mut self, text: impl Into<String>) -> Self {
        self.profile = Some(text.into());
        self
    }

    pub fn with_media(mut self, relative_path: &str, bytes: Vec<u8>) -> Self {
        self.media.insert(relative_path.to_string(), bytes);
        self
    }
}

#[async_trait]
impl ArchiveSource for MemoryArchive {
    fn root_path(&self) -> &Path {
        &self.root
    }

    async fn find_inbox_folder(&self) -> Option<FolderHandle> {
        self.has_inbox.then(|| FolderHandle {
            name: "inbox".to_string(),
            path: PathBuf::from("messages").join("inbox"),
        })
    }

    async fn list_subfolders(&self, root: &FolderHandle) -> Result<Vec<FolderHandle>> {
        Ok(self
            .conversations
            .keys()
            .map(|name| FolderHandle {
                name: name.clone(),
                path: root.path.join(name),
            })
            .collect())
    }

    async fn read_conversation_parts(&self, folder: &FolderHandle) -> Result<Vec<String>> {
        Ok(self.conversations.get(&folder.name).cloned().unwrap_or_default())
    }

    async fn read_profile_info(&self) -> Result<Option<String>> {
        Ok(self.profile.clone())
    }

    async fn read_media(&self, relative_path: &str) -> Result<Vec<u8>> {
        checked_media_path(relative_path)?;
        self.media
            .get(relative_path)
            .cloned()
            .ok_or_else(|| ArchiveError::MediaNotFound(relative_path.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs as std_fs;
    use tempfile::TempDir;

    fn export_tree() -> TempDir {
        let temp = TempDir::new().unwrap();
        let inbox = temp.path().join("messages").join("inbox");
        let chat = inbox.join("alice_1");
        std_fs::create_dir_all(chat.join("photos")).unwrap();
        std_fs::write(chat.join("message_1.json"), "one").unwrap();
        std_fs::write(chat.join("message_2.json"), "two").unwrap();
        std_fs::write(chat.join("message_10.json"), "ten").unwrap();
        std_fs::write(chat.join("notes.txt"), "ignored").unwrap();
        std_fs::write(chat.join("photos").join("1.jpg"), [0xffu8, 0xd8]).unwrap();
        std_fs::create_dir_all(inbox.join("bob_2")).unwrap();
        std_fs::write(inbox.join("stray.json"), "{}").unwrap();
        std_fs::write(
            temp.path().join("messages").join("autofill_information.json"),
            r#"{"autofill_information_v2": {"FULL_NAME": ["Me"]}}"#,
        )
        .unwrap();
        temp
    }

    #[test]
    fn test_part_number() {
        let config = ArchiveConfig::default();
        assert_eq!(config.part_number("message_1.json"), Some(1));
        assert_eq!(config.part_number("message_12.json"), Some(12));
        assert_eq!(config.part_number("message_.json"), None);
        assert_eq!(config.part_number("message_1json"), None);
        assert_eq!(config.part_number("photos"), None);
        assert_eq!(config.part_number("autofill_information.json"), None);
    }

    #[test]
    fn test_config_from_env() {
        std::env::set_var("MESSENGER_INBOX_DIR", "export/conversations");
        std::env::set_var("MESSENGER_AUTOFILL_FILE", "export/profile.json");
        std::env::set_var("MESSENGER_MAX_CONCURRENT_LOADS", "4");
        let config = ArchiveConfig::from_env();
        std::env::remove_var("MESSENGER_INBOX_DIR");
        std::env::remove_var("MESSENGER_AUTOFILL_FILE");
        std::env::remove_var("MESSENGER_MAX_CONCURRENT_LOADS");

        let defaults = ArchiveConfig::default();
        assert_eq!(config.inbox_dirs[0], PathBuf::from("export/conversations"));
        assert_eq!(config.inbox_dirs[1..], defaults.inbox_dirs[..]);
        assert_eq!(config.autofill_file, PathBuf::from("export/profile.json"));
        assert_eq!(config.max_concurrent_loads, 4);
        assert_eq!(config.part_prefix, defaults.part_prefix);
    }

    #[tokio::test]
    async fn test_config_overrides_reach_fs_archive() {
        let temp = TempDir::new().unwrap();
        let inbox = temp.path().join("export").join("conversations");
        std_fs::create_dir_all(inbox.join("alice_1")).unwrap();
        std_fs::write(temp.path().join("profile.json"), "{}").unwrap();

        let config = ArchiveConfig {
            inbox_dirs: vec![PathBuf::from("export").join("conversations")],
            autofill_file: PathBuf::from("profile.json"),
            max_concurrent_loads: 0,
            ..ArchiveConfig::default()
        };
        let archive = FsArchive::new(temp.path(), config);
        assert_eq!(archive.find_inbox_folder().await.unwrap().path, inbox);
        assert_eq!(archive.read_profile_info().await.unwrap().as_deref(), Some("{}"));
        // A zero limit would stall the catalog build
        assert_eq!(archive.max_concurrent_loads(), 1);
    }

    #[test]
    fn test_checked_media_path() {
        assert!(checked_media_path("messages/inbox/alice_1/photos/1.jpg").is_ok());
        assert!(checked_media_path("../secret").is_err());
        assert!(checked_media_path("messages/../../secret").is_err());
        assert!(checked_media_path("/etc/passwd").is_err());
        assert!(checked_media_path("").is_err());
    }

    #[tokio::test]
    async fn test_fs_archive_layout() {
        let temp = export_tree();
        let archive = FsArchive::new(temp.path(), ArchiveConfig::default());

        let inbox = archive.find_inbox_folder().await.unwrap();
        let folders = archive.list_subfolders(&inbox).await.unwrap();
        let names: Vec<_> = folders.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["alice_1", "bob_2"]);

        let parts = archive.read_conversation_parts(&folders[0]).await.unwrap();
        assert_eq!(parts, vec!["one", "two", "ten"]);
        assert!(archive.read_conversation_parts(&folders[1]).await.unwrap().is_empty());

        let profile = archive.read_profile_info().await.unwrap().unwrap();
        assert!(profile.contains("FULL_NAME"));
    }

    #[tokio::test]
    async fn test_fs_archive_invalid_utf8_part() {
        let temp = TempDir::new().unwrap();
        let chat = temp.path().join("messages").join("inbox").join("alice_1");
        std_fs::create_dir_all(&chat).unwrap();
        let mut bytes = br#"{"title": "Al"#.to_vec();
        bytes.push(0xff);
        bytes.extend_from_slice(br#"ice"}"#);
        std_fs::write(chat.join("message_1.json"), bytes).unwrap();

        let archive = FsArchive::new(temp.path(), ArchiveConfig::default());
        let inbox = archive.find_inbox_folder().await.unwrap();
        let folders = archive.list_subfolders(&inbox).await.unwrap();
        let parts = archive.read_conversation_parts(&folders[0]).await.unwrap();
        assert_eq!(parts, vec!["{\"title\": \"Al\u{fffd}ice\"}"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_fs_archive_follows_symlinked_folders() {
        let temp = export_tree();
        let elsewhere = temp.path().join("elsewhere").join("carol_3");
        std_fs::create_dir_all(&elsewhere).unwrap();
        std_fs::write(elsewhere.join("message_1.json"), "carol").unwrap();
        std_fs::write(elsewhere.join("real_2.json"), "two").unwrap();
        std::os::unix::fs::symlink(elsewhere.join("real_2.json"), elsewhere.join("message_2.json"))
            .unwrap();
        let inbox_path = temp.path().join("messages").join("inbox");
        std::os::unix::fs::symlink(&elsewhere, inbox_path.join("carol_3")).unwrap();

        let archive = FsArchive::new(temp.path(), ArchiveConfig::default());
        let inbox = archive.find_inbox_folder().await.unwrap();
        let folders = archive.list_subfolders(&inbox).await.unwrap();
        let names: Vec<_> = folders.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["alice_1", "bob_2", "carol_3"]);

        let parts = archive.read_conversation_parts(&folders[2]).await.unwrap();
        assert_eq!(parts, vec!["carol", "two"]);
    }

    #[tokio::test]
    async fn test_fs_archive_inbox_picked_directly() {
        let temp = export_tree();
        let inbox_path = temp.path().join("messages").join("inbox");
        let archive = FsArchive::new(&inbox_path, ArchiveConfig::default());
        let inbox = archive.find_inbox_folder().await.unwrap();
        assert_eq!(inbox.path, inbox_path);
    }

    #[tokio::test]
    async fn test_fs_archive_missing_inbox() {
        let temp = TempDir::new().unwrap();
        let archive = FsArchive::new(temp.path(), ArchiveConfig::default());
        assert!(archive.find_inbox_folder().await.is_none());
        assert!(archive.read_profile_info().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fs_archive_media() {
        let temp = export_tree();
        let archive = FsArchive::new(temp.path(), ArchiveConfig::default());

        let bytes = archive
            .read_media("messages/inbox/alice_1/photos/1.jpg")
            .await
            .unwrap();
        assert_eq!(bytes, vec![0xff, 0xd8]);

        assert!(matches!(
            archive.read_media("messages/inbox/alice_1/photos/2.jpg").await,
            Err(ArchiveError::MediaNotFound(_))
        ));
        assert!(matches!(
            archive.read_media("../outside.jpg").await,
            Err(ArchiveError::InvalidMediaPath(_))
        ));
    }

    #[tokio::test]
    async fn test_memory_archive() {
        let archive = MemoryArchive::new()
            .with_conversation("b_2", ["x"])
            .with_conversation("a_1", ["p1", "p2"])
            .with_media("messages/inbox/a_1/photos/1.png", vec![1, 2, 3]);

        let inbox = archive.find_inbox_folder().await.unwrap();
        let folders = archive.list_subfolders(&inbox).await.unwrap();
        assert_eq!(folders[0].name, "a_1");
        assert_eq!(
            archive.read_conversation_parts(&folders[0]).await.unwrap(),
            vec!["p1", "p2"]
        );
        assert_eq!(
            archive.read_media("messages/inbox/a_1/photos/1.png").await.unwrap(),
            vec![1, 2, 3]
        );
        assert!(archive.read_profile_info().await.unwrap().is_none());
        assert!(MemoryArchive::without_inbox().find_inbox_folder().await.is_none());
    }
}
