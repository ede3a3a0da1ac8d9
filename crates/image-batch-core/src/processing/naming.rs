use std::path::{Path, PathBuf};

use crate::config::NamingConfig;

/// Base output name for a sequence number: `{prefix}_{seq:04}` or `{seq:04}`
pub fn base_name(naming: Option<&NamingConfig>, seq: u32) -> String {
    match naming {
        Some(naming) if !naming.prefix.is_empty() => format!("{}_{:04}", naming.prefix, seq),
        _ => format!("{:04}", seq),
    }
}

/// First of `{base}{ext}`, `{base}_1{ext}`, `{base}_2{ext}`, ... not present in `dir`.
///
/// `ext` carries its leading dot.
pub fn next_available_name(dir: &Path, base: &str, ext: &str) -> PathBuf {
    let candidate = dir.join(format!("{}{}", base, ext));
    if !candidate.exists() {
        return candidate;
    }

    let mut counter = 1u64;
    loop {
        let candidate = dir.join(format!("{}_{}{}", base, counter, ext));
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}

/// Collision-free destination for moving `source` into `dir`, keeping its file name
pub fn backup_destination(dir: &Path, source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string());
    let ext = source
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    next_available_name(dir, &stem, &ext)
}
