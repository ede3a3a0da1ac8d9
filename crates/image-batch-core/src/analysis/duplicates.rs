use log::{info, warn};
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::analysis::cryptographic::compute_cryptographic;
use crate::analysis::perceptual::{phash_from_file, PHash};
use crate::error::Result;

/// Default Hamming distance under which two images count as near duplicates
pub const DEFAULT_SIMILARITY_THRESHOLD: u32 = 5;

/// How a duplicate matched its group's original
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    /// Byte-identical content
    Exact,
    /// Perceptual hashes within the threshold
    Near,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateMember {
    pub path: PathBuf,
    pub kind: MatchKind,

    /// Hamming distance to the original's perceptual hash
    pub distance: u32,
}

/// One original and everything that duplicates it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup {
    pub original: PathBuf,
    pub duplicates: Vec<DuplicateMember>,
}

struct HashedFile {
    path: PathBuf,
    content: blake3::Hash,
    phash: PHash,
}

fn hash_file(path: &Path) -> Result<HashedFile> {
    Ok(HashedFile {
        path: path.to_path_buf(),
        content: compute_cryptographic(path)?,
        phash: phash_from_file(path)?,
    })
}

/// Group exact and near duplicates among `paths`.
///
/// Hashing runs in parallel. Files that cannot be read or decoded are
/// logged and left out. Groups follow the input order of their original,
/// which is always the earliest member.
pub fn find_duplicates<P: AsRef<Path> + Sync>(paths: &[P], threshold: u32) -> Vec<DuplicateGroup> {
    let hashed: Vec<HashedFile> = paths
        .par_iter()
        .map(|p| {
            let path = p.as_ref();
            hash_file(path).map_err(|e| {
                warn!("Skipping {} for duplicate detection: {}", path.display(), e);
                e
            })
        })
        .collect::<Vec<_>>()
        .into_iter()
        .filter_map(|r| r.ok())
        .collect();

    let mut assigned = vec![false; hashed.len()];
    let mut groups = Vec::new();

    for i in 0..hashed.len() {
        if assigned[i] {
            continue;
        }

        let original = &hashed[i];
        let mut duplicates = Vec::new();

        for j in (i + 1)..hashed.len() {
            if assigned[j] {
                continue;
            }
            let candidate = &hashed[j];
            let distance = original.phash.distance(&candidate.phash);

            let kind = if original.content == candidate.content {
                MatchKind::Exact
            } else if distance <= threshold {
                MatchKind::Near
            } else {
                continue;
            };

            assigned[j] = true;
            duplicates.push(DuplicateMember {
                path: candidate.path.clone(),
                kind,
                distance,
            });
        }

        if !duplicates.is_empty() {
            assigned[i] = true;
            groups.push(DuplicateGroup {
                original: original.path.clone(),
                duplicates,
            });
        }
    }

    info!(
        "Found {} duplicate group(s) among {} image(s)",
        groups.len(),
        hashed.len()
    );
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tempfile::tempdir;

    fn gradient(path: &Path, width: u32, height: u32, invert: bool) {
        RgbImage::from_fn(width, height, |x, _| {
            let v = ((x * 255) / width.max(1)) as u8;
            let v = if invert { 255 - v } else { v };
            Rgb([v, 40, v])
        })
        .save(path)
        .unwrap();
    }

    #[test]
    fn test_exact_and_near_groups() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.png");
        let b = dir.path().join("b.png");
        let c = dir.path().join("c.png");
        let d = dir.path().join("d.png");
        let broken = dir.path().join("broken.png");

        gradient(&a, 64, 64, false);
        std::fs::copy(&a, &b).unwrap();
        gradient(&c, 128, 128, false);
        gradient(&d, 64, 64, true);
        std::fs::write(&broken, b"nope").unwrap();

        let groups = find_duplicates(&[&a, &broken, &b, &c, &d], DEFAULT_SIMILARITY_THRESHOLD);

        assert_eq!(groups.len(), 1);
        let group = &groups[0];
        assert_eq!(group.original, a);
        assert_eq!(group.duplicates.len(), 2);
        assert_eq!(group.duplicates[0].path, b);
        assert_eq!(group.duplicates[0].kind, MatchKind::Exact);
        assert_eq!(group.duplicates[1].path, c);
        assert_eq!(group.duplicates[1].kind, MatchKind::Near);
    }

    #[test]
    fn test_no_duplicates() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.png");
        let d = dir.path().join("d.png");
        gradient(&a, 32, 32, false);
        gradient(&d, 32, 32, true);
        assert!(find_duplicates(&[a, d], 0).is_empty());
    }
}
