use image::codecs::gif::GifDecoder;
use image::codecs::webp::WebPDecoder;
use image::{AnimationDecoder, DynamicImage, ImageFormat, ImageReader};
use log::debug;
use std::io::Cursor;
use std::path::Path;

use crate::error::Result;
use crate::types::ImageKind;

/// A source file read into memory and decoded once
pub struct SourceImage {
    /// First frame of the source
    pub image: DynamicImage,

    /// Container format sniffed from the bytes
    pub container: Option<ImageKind>,

    /// The source holds more than one frame or page
    pub animated: bool,

    /// Raw file contents, kept for metadata extraction
    pub bytes: Vec<u8>,
}

/// Read the whole file
pub fn read_source(path: &Path) -> Result<Vec<u8>> {
    Ok(std::fs::read(path)?)
}

/// Decode bytes previously read with [`read_source`]
pub fn decode_source(bytes: Vec<u8>) -> Result<SourceImage> {
    let reader = ImageReader::new(Cursor::new(bytes.as_slice())).with_guessed_format()?;
    let format = reader.format();
    let image = reader.decode()?;

    let animated = format.map(|f| is_multi_frame(&bytes, f)).unwrap_or(false);

    Ok(SourceImage {
        image,
        container: format.and_then(ImageKind::from_image_format),
        animated,
        bytes,
    })
}

/// Whether an encoded image has more than one frame (GIF, WebP) or page (TIFF)
pub fn is_multi_frame(bytes: &[u8], format: ImageFormat) -> bool {
    let result = match format {
        ImageFormat::Gif => gif_frame_count(bytes).map(|n| n > 1),
        ImageFormat::WebP => WebPDecoder::new(Cursor::new(bytes))
            .map(|d| d.has_animation())
            .map_err(Into::into),
        ImageFormat::Tiff => tiff_has_more_pages(bytes),
        _ => Ok(false),
    };

    result.unwrap_or_else(|e| {
        debug!("Frame count probe failed for {:?}: {}", format, e);
        false
    })
}

fn gif_frame_count(bytes: &[u8]) -> Result<usize> {
    let decoder = GifDecoder::new(Cursor::new(bytes))?;
    Ok(decoder
        .into_frames()
        .take(2)
        .filter(|frame| frame.is_ok())
        .count())
}

fn tiff_has_more_pages(bytes: &[u8]) -> Result<bool> {
    let decoder = tiff::decoder::Decoder::new(Cursor::new(bytes))?;
    Ok(decoder.more_images())
}
