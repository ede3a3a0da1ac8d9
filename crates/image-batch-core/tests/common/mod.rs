//! Fixture helpers shared by the integration tests.
//!
//! Images are generated on the fly, nothing binary is checked in.
#![allow(dead_code)]

use image::codecs::gif::GifEncoder;
use image::{Delay, DynamicImage, Frame, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use img_parts::jpeg::Jpeg;
use img_parts::{Bytes, ImageEXIF};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tiff::encoder::{colortype, TiffEncoder};
use webp::{AnimEncoder, AnimFrame, WebPConfig};

/// Fonts commonly installed on CI images and desktops
const SYSTEM_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
];

/// First installed system font, if any
pub fn system_font() -> Option<PathBuf> {
    SYSTEM_FONTS
        .iter()
        .map(PathBuf::from)
        .find(|p| p.is_file())
}

/// Minimal big-endian TIFF header with an empty IFD
pub const SAMPLE_EXIF: &[u8] = b"MM\x00\x2a\x00\x00\x00\x08\x00\x00\x00\x00\x00\x00";

/// A source directory and an output directory, both removed on drop
pub struct Workspace {
    pub sources: TempDir,
    pub output: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            sources: tempfile::tempdir().unwrap(),
            output: tempfile::tempdir().unwrap(),
        }
    }

    pub fn src(&self) -> &Path {
        self.sources.path()
    }

    pub fn out(&self) -> PathBuf {
        self.output.path().to_path_buf()
    }

    /// Write a solid-colour RGB image in the format implied by `name`
    pub fn image(&self, name: &str, width: u32, height: u32) -> PathBuf {
        let path = self.src().join(name);
        let format = ImageFormat::from_path(&path).unwrap();
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([30, 120, 200])));
        let img = if format == ImageFormat::Jpeg || format == ImageFormat::Bmp {
            img
        } else {
            DynamicImage::ImageRgba8(img.to_rgba8())
        };
        img.save_with_format(&path, format).unwrap();
        path
    }

    /// Write a PNG with a transparent left half
    pub fn transparent_png(&self, name: &str, width: u32, height: u32) -> PathBuf {
        let path = self.src().join(name);
        RgbaImage::from_fn(width, height, |x, _| {
            if x < width / 2 {
                Rgba([0, 0, 0, 0])
            } else {
                Rgba([255, 0, 0, 255])
            }
        })
        .save(&path)
        .unwrap();
        path
    }

    /// Write a JPEG that carries [`SAMPLE_EXIF`]
    pub fn jpeg_with_exif(&self, name: &str) -> PathBuf {
        let path = self.src().join(name);
        let mut plain = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::from_pixel(16, 16, Rgb([90, 90, 90])))
            .write_to(&mut std::io::Cursor::new(&mut plain), ImageFormat::Jpeg)
            .unwrap();

        let mut jpeg = Jpeg::from_bytes(plain.into()).unwrap();
        jpeg.set_exif(Some(Bytes::from_static(SAMPLE_EXIF)));
        std::fs::write(&path, jpeg.encoder().bytes()).unwrap();
        path
    }

    /// Write a two-frame GIF
    pub fn animated_gif(&self, name: &str) -> PathBuf {
        let path = self.src().join(name);
        let file = std::fs::File::create(&path).unwrap();
        let mut encoder = GifEncoder::new(file);
        for color in [[255, 0, 0, 255], [0, 255, 0, 255]] {
            encoder
                .encode_frame(Frame::from_parts(
                    RgbaImage::from_pixel(12, 12, Rgba(color)),
                    0,
                    0,
                    Delay::from_numer_denom_ms(50, 1),
                ))
                .unwrap();
        }
        path
    }

    /// Write a two-page TIFF, red page first
    pub fn multi_page_tiff(&self, name: &str) -> PathBuf {
        let path = self.src().join(name);
        let file = std::fs::File::create(&path).unwrap();
        let mut encoder = TiffEncoder::new(file).unwrap();
        for color in [[255u8, 0, 0], [0, 0, 255]] {
            let data: Vec<u8> = color.iter().copied().cycle().take(10 * 8 * 3).collect();
            encoder
                .write_image::<colortype::RGB8>(10, 8, &data)
                .unwrap();
        }
        path
    }

    /// Write a two-frame animated WebP, red frame first
    pub fn animated_webp(&self, name: &str) -> PathBuf {
        let path = self.src().join(name);
        let mut config = WebPConfig::new().unwrap();
        config.lossless = 1;

        let red: Vec<u8> = [255, 0, 0, 255].iter().copied().cycle().take(12 * 12 * 4).collect();
        let green: Vec<u8> = [0, 255, 0, 255].iter().copied().cycle().take(12 * 12 * 4).collect();

        let mut encoder = AnimEncoder::new(12, 12, &config);
        encoder.add_frame(AnimFrame::from_rgba(&red, 12, 12, 0));
        encoder.add_frame(AnimFrame::from_rgba(&green, 12, 12, 100));
        std::fs::write(&path, &*encoder.encode()).unwrap();
        path
    }

    /// Write bytes that no decoder accepts
    pub fn corrupt(&self, name: &str) -> PathBuf {
        let path = self.src().join(name);
        std::fs::write(&path, b"\xff\xd8\xff garbage, not really a jpeg").unwrap();
        path
    }

    /// Names of the regular files in the output directory, sorted
    pub fn output_names(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.output.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

/// Records every progress report
#[derive(Default)]
pub struct RecordingSink {
    pub reports: Vec<(u8, String)>,
}

impl image_batch_core::ProgressSink for RecordingSink {
    fn report(&mut self, percent: u8, current: &str) {
        self.reports.push((percent, current.to_string()));
    }
}

impl RecordingSink {
    pub fn percents(&self) -> Vec<u8> {
        self.reports.iter().map(|(p, _)| *p).collect()
    }
}
