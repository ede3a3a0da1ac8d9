use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::processing::encode::read_exif;
use crate::processing::validation::{decode_source, read_source};
use crate::types::ImageKind;

/// What a single image file looks like
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageInfo {
    pub path: PathBuf,

    /// Container format detected from the bytes
    pub format: Option<ImageKind>,

    pub width: u32,
    pub height: u32,

    /// Decoded colour type, e.g. `Rgb8`
    pub color_type: String,

    pub file_size: u64,
    pub has_exif: bool,

    /// More than one frame or page
    pub animated: bool,

    /// Most common colour, quantised to 16 levels per channel
    pub dominant_color: [u8; 3],
}

/// Inspect an image file
pub fn inspect(path: &Path) -> Result<ImageInfo> {
    if !path.is_file() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }

    let bytes = read_source(path)?;
    let file_size = bytes.len() as u64;
    let has_exif = read_exif(&bytes).is_some();
    let source = decode_source(bytes)?;
    let (width, height) = source.image.dimensions();

    Ok(ImageInfo {
        path: path.to_path_buf(),
        format: source.container,
        width,
        height,
        color_type: format!("{:?}", source.image.color()),
        file_size,
        has_exif,
        animated: source.animated,
        dominant_color: dominant_color(&source.image),
    })
}

/// Average of the most populated colour bucket of a 64x64 thumbnail.
///
/// Fully transparent pixels are ignored.
pub fn dominant_color(img: &DynamicImage) -> [u8; 3] {
    let thumb = img.resize(64, 64, FilterType::Triangle).to_rgba8();

    let mut buckets: HashMap<u16, (u32, [u32; 3])> = HashMap::new();
    for pixel in thumb.pixels() {
        if pixel[3] == 0 {
            continue;
        }
        let key = ((pixel[0] as u16 >> 4) << 8) | ((pixel[1] as u16 >> 4) << 4) | (pixel[2] as u16 >> 4);
        let entry = buckets.entry(key).or_insert((0, [0; 3]));
        entry.0 += 1;
        for c in 0..3 {
            entry.1[c] += pixel[c] as u32;
        }
    }

    // Ties go to the lower bucket so the result is deterministic
    buckets
        .into_iter()
        .max_by(|a, b| a.1 .0.cmp(&b.1 .0).then(b.0.cmp(&a.0)))
        .map(|(_, (count, sums))| {
            [
                (sums[0] / count) as u8,
                (sums[1] / count) as u8,
                (sums[2] / count) as u8,
            ]
        })
        .unwrap_or([0, 0, 0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};
    use tempfile::tempdir;

    #[test]
    fn test_inspect_png() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sample.png");
        RgbImage::from_fn(40, 20, |x, _| {
            if x < 30 {
                Rgb([200, 10, 10])
            } else {
                Rgb([0, 0, 255])
            }
        })
        .save(&path)
        .unwrap();

        let info = inspect(&path).unwrap();
        assert_eq!(info.format, Some(ImageKind::Png));
        assert_eq!((info.width, info.height), (40, 20));
        assert_eq!(info.color_type, "Rgb8");
        assert!(!info.has_exif);
        assert!(!info.animated);
        assert_eq!(info.file_size, std::fs::metadata(&path).unwrap().len());

        let [r, g, b] = info.dominant_color;
        assert!(r > 180 && g < 40 && b < 40, "{:?}", info.dominant_color);
    }

    #[test]
    fn test_dominant_color_ignores_transparent() {
        let img = RgbaImage::from_fn(64, 64, |x, y| {
            if x < 10 && y < 10 {
                Rgba([0, 255, 0, 255])
            } else {
                Rgba([0, 0, 0, 0])
            }
        });
        let color = dominant_color(&DynamicImage::ImageRgba8(img));
        assert!(color[1] > 200 && color[0] < 20, "{:?}", color);
    }

    #[test]
    fn test_inspect_errors() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            inspect(&dir.path().join("missing.png")),
            Err(Error::FileNotFound(_))
        ));

        let junk = dir.path().join("junk.png");
        std::fs::write(&junk, b"junk").unwrap();
        assert!(inspect(&junk).is_err());
    }
}
