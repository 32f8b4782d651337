//! Archive extraction into a [`WorkingTree`].

use std::path::Path;
use std::sync::Arc;

use crate::error::{CoreError, Result};
use crate::io::{MemoryReader, ReadAt};
use crate::tree::{EMPTY_PATH, EntryKind, EntryPath, WorkingTree};
use crate::zip::ZipExtractor;

/// Extract archive bytes into a fresh working tree.
///
/// The whole archive is validated while extracting: structural damage,
/// unsupported entries and CRC mismatches fail with
/// [`CoreError::CorruptArchive`], and the partially filled working area is
/// released before returning.
pub async fn unpack(archive: Vec<u8>, work_dir: Option<&Path>) -> Result<WorkingTree> {
    unpack_from(Arc::new(MemoryReader::new(archive)), work_dir).await
}

/// Extract from any random-access source
pub async fn unpack_from<R: ReadAt>(reader: Arc<R>, work_dir: Option<&Path>) -> Result<WorkingTree> {
    let extractor = ZipExtractor::new(reader);
    let entries = extractor.list_files().await.map_err(CoreError::corrupt)?;

    let mut tree = WorkingTree::create(work_dir).await?;
    for entry in &entries {
        let path = match EntryPath::from_archive_name(&entry.file_name) {
            Ok(path) => path,
            Err(EMPTY_PATH) if entry.is_directory => {
                log::debug!("skipping root directory entry '{}'", entry.file_name);
                continue;
            }
            Err(reason) => {
                return Err(CoreError::CorruptArchive(format!(
                    "unsafe entry name '{}': {}",
                    entry.file_name, reason
                )));
            }
        };

        if entry.is_directory {
            tree.insert(path, EntryKind::Directory, entry.modified)?;
            continue;
        }

        let replaced = tree.find_file(&path).is_some();
        let id = tree.insert(path, EntryKind::File, entry.modified)?;
        if replaced {
            log::warn!(
                "archive lists '{}' more than once; keeping the last copy",
                entry.file_name
            );
        }

        extractor
            .extract_to_file(entry, &tree.content_path(id))
            .await
            .map_err(CoreError::corrupt)?;
        log::debug!(
            "extracted {} ({} bytes)",
            entry.file_name,
            entry.uncompressed_size
        );
    }

    log::info!(
        "extracted {} entries into {}",
        tree.len(),
        tree.root().display()
    );
    Ok(tree)
}
