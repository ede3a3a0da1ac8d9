//! Average hash over an 8x8 grayscale thumbnail.
//!
//! Hamming distance between two hashes:
//!
//! - 0-3: nearly identical (re-encoded, resized, lightly edited)
//! - 4-10: similar
//! - above 10: different images

use image::{DynamicImage, GenericImageView};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::error::Result;

/// A perceptual hash represented as a 64-bit value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PHash(pub u64);

impl PHash {
    /// Calculate the Hamming distance between two perceptual hashes
    pub fn distance(&self, other: &PHash) -> u32 {
        (self.0 ^ other.0).count_ones()
    }

    /// Check if two images are perceptually similar based on a threshold
    pub fn is_similar(&self, other: &PHash, threshold: u32) -> bool {
        self.distance(other) <= threshold
    }
}

impl fmt::Display for PHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Calculate a 64-bit perceptual hash for an image
pub fn calculate_phash(img: &DynamicImage) -> PHash {
    let small = img.resize_exact(8, 8, image::imageops::FilterType::Triangle);

    // 0.299*R + 0.587*G + 0.114*B
    let mut pixels = [0.0f32; 64];
    for (x, y, pixel) in small.pixels() {
        pixels[(y as usize) * 8 + (x as usize)] =
            0.299 * pixel[0] as f32 + 0.587 * pixel[1] as f32 + 0.114 * pixel[2] as f32;
    }

    let mean = pixels.iter().sum::<f32>() / 64.0;

    let mut hash: u64 = 0;
    for (bit, &p) in pixels.iter().enumerate() {
        if p > mean {
            hash |= 1u64 << bit;
        }
    }

    PHash(hash)
}

/// Calculate a perceptual hash from an image file
pub fn phash_from_file<P: AsRef<Path>>(path: P) -> Result<PHash> {
    let img = image::open(path)?;
    Ok(calculate_phash(&img))
}
