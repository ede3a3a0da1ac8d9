use log::warn;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::types::ImageKind;

/// Discover source images in the provided directories.
///
/// Each directory's files are sorted by path; directories keep the order
/// they were given in. `max_depth` of `None` walks the whole tree.
pub fn discover_sources<P: AsRef<Path>>(
    directories: &[P],
    max_depth: Option<usize>,
) -> Result<Vec<PathBuf>> {
    let mut sources = Vec::new();
    for dir in directories {
        sources.extend(discover_in_directory(dir.as_ref(), max_depth)?);
    }
    Ok(sources)
}

/// Discover source images in a single directory
fn discover_in_directory(directory: &Path, max_depth: Option<usize>) -> Result<Vec<PathBuf>> {
    if !directory.is_dir() {
        return Err(Error::FileNotFound(directory.to_path_buf()));
    }

    let max_depth = max_depth.unwrap_or(usize::MAX);

    let mut files: Vec<PathBuf> = WalkDir::new(directory)
        .max_depth(max_depth)
        .into_iter()
        .filter_map(|e| match e {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!("Skipping unreadable entry under {}: {}", directory.display(), err);
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| is_image_path(p))
        .collect();

    files.sort();
    Ok(files)
}

/// Returns if the given path has a supported image extension
pub fn is_image_path(path: &Path) -> bool {
    ImageKind::from_path(path).is_some()
}
