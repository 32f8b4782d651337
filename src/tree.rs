//! Mutable view of an extracted archive.
//!
//! A [`WorkingTree`] is an arena of [`ArchiveEntry`] values addressed by a
//! stable [`EntryId`]. Paths live only in the arena and its indexes: a rename
//! rewrites one entry and two index keys, while file content stays in a blob
//! named after the entry id inside the invocation's temporary directory.
//! Nothing on disk moves when entries are renamed.
//!
//! The temporary directory is owned by the tree and removed when the tree is
//! closed or dropped.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tokio::fs;

use crate::error::{CoreError, Result};
use crate::zip::DosDateTime;

/// Subdirectory of the working area holding entry content blobs
const CONTENT_DIR: &str = "entries";

/// Rejection reason for names that normalize to the archive root
pub const EMPTY_PATH: &str = "empty path";

/// Stable identity of an entry within one [`WorkingTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryId(usize);

/// Relative entry path as a sequence of non-empty segments
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryPath(Vec<String>);

impl EntryPath {
    /// Normalise an archive entry name.
    ///
    /// Backslashes count as separators, trailing and repeated separators and
    /// `.` segments are dropped. Absolute names and `..` segments are refused.
    /// A name with no segments left (`./`, `/`, empty) fails with
    /// [`EMPTY_PATH`].
    pub fn from_archive_name(name: &str) -> std::result::Result<Self, &'static str> {
        let name = name.replace('\\', "/");

        let mut segments = Vec::new();
        for segment in name.split('/') {
            match segment {
                "" | "." => continue,
                ".." => return Err("parent directory segment"),
                s if s.contains('\0') => return Err("NUL byte in name"),
                s => segments.push(s.to_string()),
            }
        }

        if segments.is_empty() {
            return Err(EMPTY_PATH);
        }
        if name.starts_with('/') {
            return Err("absolute path");
        }
        Ok(Self(segments))
    }

    /// Build a path from segments that were already validated
    pub(crate) fn from_segments(segments: Vec<String>) -> Self {
        debug_assert!(!segments.is_empty());
        Self(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Final path segment
    pub fn base_name(&self) -> &str {
        // Paths always hold at least one segment
        self.0.last().map(String::as_str).unwrap_or_default()
    }

    /// Sibling path with the final segment replaced
    pub fn with_base_name(&self, name: &str) -> Self {
        let mut segments = self.0.clone();
        if let Some(last) = segments.last_mut() {
            *last = name.to_string();
        }
        Self(segments)
    }

    /// Sort key of a top-down walk that visits a directory's files before
    /// descending into its subdirectories, each in byte-wise name order.
    fn walk_key(&self) -> Vec<(bool, &str)> {
        let last = self.0.len() - 1;
        self.0
            .iter()
            .enumerate()
            .map(|(i, s)| (i < last, s.as_str()))
            .collect()
    }
}

impl fmt::Display for EntryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// One file or directory of the working tree
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    pub path: EntryPath,
    pub kind: EntryKind,
    pub modified: DosDateTime,
}

impl ArchiveEntry {
    pub fn is_directory(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// Extracted archive owned by a single invocation
pub struct WorkingTree {
    dir: TempDir,
    entries: Vec<ArchiveEntry>,
    /// Joined path to entry, ordered so implicit directories can be found by prefix
    paths: BTreeMap<String, EntryId>,
    /// File base name to the files currently carrying it
    by_name: HashMap<String, Vec<EntryId>>,
}

impl WorkingTree {
    /// Create an empty tree backed by a fresh temporary directory, inside
    /// `base` when given, otherwise in the system temporary directory.
    pub async fn create(base: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("ziprename-");
        let dir = match base {
            Some(base) => builder.tempdir_in(base)?,
            None => builder.tempdir()?,
        };
        fs::create_dir(dir.path().join(CONTENT_DIR)).await?;
        log::debug!("created working area {}", dir.path().display());

        Ok(Self {
            dir,
            entries: Vec::new(),
            paths: BTreeMap::new(),
            by_name: HashMap::new(),
        })
    }

    /// Root of the working area on disk
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: EntryId) -> &ArchiveEntry {
        &self.entries[id.0]
    }

    /// Entries in insertion order
    pub fn entries(&self) -> impl Iterator<Item = (EntryId, &ArchiveEntry)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (EntryId(i), entry))
    }

    /// Location of an entry's content blob
    pub fn content_path(&self, id: EntryId) -> PathBuf {
        self.dir
            .path()
            .join(CONTENT_DIR)
            .join(id.0.to_string())
    }

    /// Register an entry, returning its id.
    ///
    /// Inserting a path that already exists with the same kind returns the
    /// existing id, so a later duplicate replaces the earlier one. A file and
    /// a directory claiming the same path, or a path nested below a file, is
    /// a corrupt archive.
    pub fn insert(
        &mut self,
        path: EntryPath,
        kind: EntryKind,
        modified: DosDateTime,
    ) -> Result<EntryId> {
        let key = path.to_string();

        for depth in 1..path.segments().len() {
            let ancestor = path.segments()[..depth].join("/");
            if let Some(&id) = self.paths.get(&ancestor) {
                if !self.get(id).is_directory() {
                    return Err(CoreError::CorruptArchive(format!(
                        "'{}' is nested below the file '{}'",
                        key, ancestor
                    )));
                }
            }
        }

        if let Some(&id) = self.paths.get(&key) {
            if self.get(id).kind != kind {
                return Err(CoreError::CorruptArchive(format!(
                    "'{}' is both a file and a directory",
                    key
                )));
            }
            self.entries[id.0].modified = modified;
            return Ok(id);
        }

        if kind == EntryKind::File && self.has_descendants(&key) {
            return Err(CoreError::CorruptArchive(format!(
                "'{}' is both a file and a directory",
                key
            )));
        }

        let id = EntryId(self.entries.len());
        if kind == EntryKind::File {
            self.by_name
                .entry(path.base_name().to_string())
                .or_default()
                .push(id);
        }
        self.paths.insert(key, id);
        self.entries.push(ArchiveEntry {
            path,
            kind,
            modified,
        });

        Ok(id)
    }

    /// Insert a file entry and store its content
    pub async fn add_file(
        &mut self,
        path: EntryPath,
        modified: DosDateTime,
        data: &[u8],
    ) -> Result<EntryId> {
        let id = self.insert(path, EntryKind::File, modified)?;
        fs::write(self.content_path(id), data).await?;
        Ok(id)
    }

    /// Read an entry's content back from the working area
    pub async fn read_content(&self, id: EntryId) -> io::Result<Vec<u8>> {
        fs::read(self.content_path(id)).await
    }

    /// Whether `path` names an entry or an implicit directory holding entries
    pub fn is_occupied(&self, path: &EntryPath) -> bool {
        let key = path.to_string();
        self.paths.contains_key(&key) || self.has_descendants(&key)
    }

    fn has_descendants(&self, key: &str) -> bool {
        let prefix = format!("{}/", key);
        self.paths
            .range(prefix.clone()..)
            .next()
            .is_some_and(|(k, _)| k.starts_with(&prefix))
    }

    /// File entry at exactly `path`
    pub fn find_file(&self, path: &EntryPath) -> Option<EntryId> {
        self.paths
            .get(&path.to_string())
            .copied()
            .filter(|&id| !self.get(id).is_directory())
    }

    /// File entries whose base name is `name`, in walk order
    pub fn files_named(&self, name: &str) -> Vec<EntryId> {
        let mut ids = self.by_name.get(name).cloned().unwrap_or_default();
        ids.sort_by(|a, b| self.get(*a).path.walk_key().cmp(&self.get(*b).path.walk_key()));
        ids
    }

    /// Move a file entry to `new_path` unless that path is occupied.
    ///
    /// Returns `false` and leaves the tree untouched on collision.
    pub fn try_rename(&mut self, id: EntryId, new_path: EntryPath) -> bool {
        if self.is_occupied(&new_path) {
            return false;
        }

        let old_path = std::mem::replace(&mut self.entries[id.0].path, new_path.clone());
        self.paths.remove(&old_path.to_string());
        self.paths.insert(new_path.to_string(), id);

        if let Some(ids) = self.by_name.get_mut(old_path.base_name()) {
            ids.retain(|&other| other != id);
            if ids.is_empty() {
                self.by_name.remove(old_path.base_name());
            }
        }
        self.by_name
            .entry(new_path.base_name().to_string())
            .or_default()
            .push(id);

        log::debug!("renamed {} -> {}", old_path, new_path);
        true
    }

    /// Remove the working area, reporting any failure
    pub fn close(self) -> Result<()> {
        let root = self.dir.path().to_path_buf();
        self.dir.close()?;
        log::debug!("released working area {}", root.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(raw: &str) -> EntryPath {
        EntryPath::from_archive_name(raw).unwrap()
    }

    async fn tree_with(files: &[&str]) -> WorkingTree {
        let mut tree = WorkingTree::create(None).await.unwrap();
        for file in files {
            tree.add_file(path(file), DosDateTime::EPOCH, file.as_bytes())
                .await
                .unwrap();
        }
        tree
    }

    #[test]
    fn normalises_archive_names() {
        assert_eq!(path("docs/").to_string(), "docs");
        assert_eq!(path("./a//b/c.txt").to_string(), "a/b/c.txt");
        assert_eq!(path("win\\dir\\x.txt").to_string(), "win/dir/x.txt");
        assert!(EntryPath::from_archive_name("/etc/passwd").is_err());
        assert!(EntryPath::from_archive_name("a/../../x").is_err());
        assert_eq!(EntryPath::from_archive_name("./"), Err(EMPTY_PATH));
        assert_eq!(EntryPath::from_archive_name("/"), Err(EMPTY_PATH));
        assert_eq!(EntryPath::from_archive_name(""), Err(EMPTY_PATH));
    }

    #[tokio::test]
    async fn walk_order_prefers_shallow_files() {
        let tree = tree_with(&["a/z/x.txt", "b/x.txt", "a/x.txt", "x.txt", "a/y/x.txt"]).await;
        let order: Vec<String> = tree
            .files_named("x.txt")
            .into_iter()
            .map(|id| tree.get(id).path.to_string())
            .collect();
        assert_eq!(order, ["x.txt", "a/x.txt", "a/y/x.txt", "a/z/x.txt", "b/x.txt"]);
    }

    #[tokio::test]
    async fn implicit_directories_are_occupied() {
        let tree = tree_with(&["docs/report.txt"]).await;
        assert!(tree.is_occupied(&path("docs")));
        assert!(tree.is_occupied(&path("docs/report.txt")));
        assert!(!tree.is_occupied(&path("doc")));
        assert!(!tree.is_occupied(&path("docs/other.txt")));
    }

    #[tokio::test]
    async fn rename_updates_indexes_not_content() {
        let mut tree = tree_with(&["a.txt", "b.txt"]).await;
        let id = tree.find_file(&path("a.txt")).unwrap();

        assert!(!tree.try_rename(id, path("b.txt")));
        assert!(tree.try_rename(id, path("c.txt")));

        assert!(tree.find_file(&path("a.txt")).is_none());
        assert_eq!(tree.find_file(&path("c.txt")), Some(id));
        assert!(tree.files_named("a.txt").is_empty());
        assert_eq!(tree.files_named("c.txt"), [id]);
        assert_eq!(tree.read_content(id).await.unwrap(), b"a.txt");
    }

    #[tokio::test]
    async fn conflicting_kinds_are_corrupt() {
        let mut tree = tree_with(&["a"]).await;
        let err = tree
            .insert(path("a/b.txt"), EntryKind::File, DosDateTime::EPOCH)
            .unwrap_err();
        assert!(matches!(err, CoreError::CorruptArchive(_)));

        let err = tree
            .insert(path("a"), EntryKind::Directory, DosDateTime::EPOCH)
            .unwrap_err();
        assert!(matches!(err, CoreError::CorruptArchive(_)));
    }

    #[tokio::test]
    async fn duplicate_file_reuses_entry() {
        let mut tree = tree_with(&["a.txt"]).await;
        let first = tree.find_file(&path("a.txt")).unwrap();
        let second = tree
            .add_file(path("a.txt"), DosDateTime::EPOCH, b"later")
            .await
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.read_content(first).await.unwrap(), b"later");
    }

    #[tokio::test]
    async fn close_removes_working_area() {
        let base = tempfile::tempdir().unwrap();
        let tree = WorkingTree::create(Some(base.path())).await.unwrap();
        let root = tree.root().to_path_buf();
        assert!(root.starts_with(base.path()));
        tree.close().unwrap();
        assert!(!root.exists());
    }
}
