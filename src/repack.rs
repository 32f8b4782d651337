//! Repackaging of a working tree into a new archive.

use crate::error::{CoreError, Result};
use crate::tree::WorkingTree;
use crate::zip::{Compression, ZipWriter};

/// Serialise every entry of `tree` at its current path.
///
/// Entries keep their archive order and modification times. Entries whose
/// path equals one of `exclude` are left out.
pub async fn repack(
    tree: &WorkingTree,
    exclude: &[String],
    compression: Compression,
) -> Result<Vec<u8>> {
    let mut writer = ZipWriter::new(compression);

    for (id, entry) in tree.entries() {
        let name = entry.path.to_string();
        if exclude.contains(&name) {
            log::debug!("excluding {} from output", name);
            continue;
        }

        let written = if entry.is_directory() {
            writer.add_directory(&name, entry.modified)
        } else {
            let data = tree
                .read_content(id)
                .await
                .map_err(|source| CoreError::RepackIo {
                    path: name.clone().into(),
                    source,
                })?;
            writer.add_file(&name, &data, entry.modified)
        };
        written.map_err(|e| repack_error(&name, e))?;
    }

    let count = writer.len();
    let bytes = writer.finish().map_err(|e| repack_error("central directory", e))?;
    log::info!("repacked {} entries into {} bytes", count, bytes.len());
    Ok(bytes)
}

fn repack_error(name: &str, err: anyhow::Error) -> CoreError {
    CoreError::RepackIo {
        path: name.into(),
        source: std::io::Error::other(format!("{err:#}")),
    }
}
