use log::{debug, warn};
use std::path::Path;
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::types::{SourceAsset, ORPHAN_FOLDER};

/// Discover accepted source files under `root`, sorted by path
pub fn discover_sources(root: &Path, config: &Config) -> Result<Vec<SourceAsset>> {
    if !root.is_dir() {
        return Err(Error::SourceMissing(root.to_path_buf()));
    }

    let mut assets = Vec::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                // Log error but continue with other files
                warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                continue;
            }
        };

        if !entry.file_type().is_file() || !config.accepts(entry.path()) {
            continue;
        }

        let path = entry.path();
        assets.push(SourceAsset {
            path: path.to_path_buf(),
            folder: folder_label(root, path),
        });
    }

    debug!("Discovered {} source files in {}", assets.len(), root.display());
    Ok(assets)
}

/// Name of the parent folder, or `orphan` for files directly in `root`
pub fn folder_label(root: &Path, path: &Path) -> String {
    match path.parent() {
        Some(parent) if parent != root => parent
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| ORPHAN_FOLDER.to_string()),
        _ => ORPHAN_FOLDER.to_string(),
    }
}

// -- Tests --
