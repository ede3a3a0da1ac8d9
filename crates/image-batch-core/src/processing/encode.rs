use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::DynamicImage;
use img_parts::jpeg::Jpeg;
use img_parts::png::Png;
use img_parts::webp::WebP;
use img_parts::{Bytes, DynImage, ImageEXIF};
use std::io::Cursor;

use crate::error::{Error, Result};
use crate::types::ImageKind;

/// JPEG quality used when no override is given
pub const DEFAULT_JPEG_QUALITY: u8 = 75;

/// zlib-style PNG level for a 0-100 quality: 100 maps to 0, 0 maps to 9
pub fn png_compression_level(quality: u8) -> u8 {
    (9 - quality as i32 / 11).clamp(0, 9) as u8
}

/// Encoder preset for a PNG level
pub fn png_compression_type(level: u8) -> CompressionType {
    match level {
        0..=2 => CompressionType::Fast,
        3..=6 => CompressionType::Default,
        _ => CompressionType::Best,
    }
}

/// Lossy quality clamped to 1..=100
pub fn clamp_quality(quality: u8) -> u8 {
    quality.clamp(1, 100)
}

/// Encode an image already in the colour mode `kind` needs
pub fn encode_image(img: &DynamicImage, kind: ImageKind, quality: Option<u8>) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let lossy_quality = quality.filter(|_| kind.has_quality()).map(clamp_quality);

    match kind {
        ImageKind::Jpg => {
            let q = lossy_quality.unwrap_or(DEFAULT_JPEG_QUALITY);
            let encoder = JpegEncoder::new_with_quality(&mut buffer, q);
            img.write_with_encoder(encoder)?;
        }
        ImageKind::Png => {
            let compression = quality
                .map(|q| png_compression_type(png_compression_level(q)))
                .unwrap_or(CompressionType::Default);
            let encoder = PngEncoder::new_with_quality(&mut buffer, compression, PngFilter::Adaptive);
            img.write_with_encoder(encoder)?;
        }
        ImageKind::Webp => match lossy_quality {
            Some(q) => {
                let rgba = img.to_rgba8();
                let encoder = webp::Encoder::from_rgba(&rgba, rgba.width(), rgba.height());
                let encoded = encoder
                    .encode_simple(false, q as f32)
                    .map_err(|e| {
                        Error::UnsupportedFormat(format!(
                            "webp encoder rejected {}x{} image: {:?}",
                            rgba.width(),
                            rgba.height(),
                            e
                        ))
                    })?;
                buffer.extend_from_slice(&encoded);
            }
            None => {
                let encoder = WebPEncoder::new_lossless(&mut buffer);
                img.write_with_encoder(encoder)?;
            }
        },
        ImageKind::Bmp | ImageKind::Gif | ImageKind::Tiff => {
            img.write_to(&mut Cursor::new(&mut buffer), kind.image_format())?;
        }
    }

    Ok(buffer)
}

/// EXIF blob embedded in an encoded JPEG, PNG or WebP
pub fn read_exif(bytes: &[u8]) -> Option<Bytes> {
    match DynImage::from_bytes(Bytes::copy_from_slice(bytes)) {
        Ok(Some(image)) => image.exif(),
        _ => None,
    }
}

/// Insert `exif` into encoded output.
///
/// Containers that cannot carry EXIF are returned unchanged.
pub fn embed_exif(encoded: &[u8], kind: ImageKind, exif: Bytes) -> Result<Vec<u8>> {
    let encoded = Bytes::copy_from_slice(encoded);
    let bytes = match kind {
        ImageKind::Jpg => {
            let mut jpeg = Jpeg::from_bytes(encoded)?;
            jpeg.set_exif(Some(exif));
            jpeg.encoder().bytes()
        }
        ImageKind::Png => {
            let mut png = Png::from_bytes(encoded)?;
            png.set_exif(Some(exif));
            png.encoder().bytes()
        }
        ImageKind::Webp => {
            let mut webp = WebP::from_bytes(encoded)?;
            webp.set_exif(Some(exif));
            webp.encoder().bytes()
        }
        ImageKind::Bmp | ImageKind::Gif | ImageKind::Tiff => encoded,
    };

    Ok(bytes.to_vec())
}
