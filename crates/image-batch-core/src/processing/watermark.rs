use ab_glyph::{FontVec, PxScale};
use image::{imageops, DynamicImage, GenericImageView, Rgba, RgbaImage};
use imageproc::drawing::{draw_text_mut, text_size};
use log::debug;
use std::path::Path;

use crate::config::{WatermarkConfig, WatermarkPosition};
use crate::error::{Error, Result};

/// Distance kept between the text and the image border
pub const WATERMARK_MARGIN: i64 = 10;

/// Fonts tried when the watermark does not name one
const FALLBACK_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Load the watermark font, falling back to well-known system fonts
pub fn load_font(path: Option<&Path>) -> Result<FontVec> {
    if let Some(path) = path {
        return read_font(path);
    }

    for candidate in FALLBACK_FONTS {
        match read_font(Path::new(candidate)) {
            Ok(font) => {
                debug!("Using watermark font {}", candidate);
                return Ok(font);
            }
            Err(e) => debug!("Font candidate {} unusable: {}", candidate, e),
        }
    }

    Err(Error::Font(
        "no font given and no system font found".to_string(),
    ))
}

fn read_font(path: &Path) -> Result<FontVec> {
    let data = std::fs::read(path)
        .map_err(|e| Error::Font(format!("cannot read {}: {}", path.display(), e)))?;
    FontVec::try_from_vec(data)
        .map_err(|e| Error::Font(format!("invalid font {}: {}", path.display(), e)))
}

/// Top-left corner of a `text`-sized box anchored at `position` on `canvas`.
///
/// Corners keep [`WATERMARK_MARGIN`] from the edges; nothing is placed at
/// negative coordinates.
pub fn watermark_origin(
    canvas: (u32, u32),
    text: (u32, u32),
    position: WatermarkPosition,
) -> (i64, i64) {
    let (cw, ch) = (canvas.0 as i64, canvas.1 as i64);
    let (tw, th) = (text.0 as i64, text.1 as i64);
    let right = cw - tw - WATERMARK_MARGIN;
    let bottom = ch - th - WATERMARK_MARGIN;

    let (x, y) = match position {
        WatermarkPosition::TopLeft => (WATERMARK_MARGIN, WATERMARK_MARGIN),
        WatermarkPosition::TopRight => (right, WATERMARK_MARGIN),
        WatermarkPosition::BottomLeft => (WATERMARK_MARGIN, bottom),
        WatermarkPosition::BottomRight => (right, bottom),
        WatermarkPosition::Center => ((cw - tw) / 2, (ch - th) / 2),
    };

    (x.max(0), y.max(0))
}

/// Composite the watermark text over the image
pub fn apply_text_watermark(
    img: DynamicImage,
    config: &WatermarkConfig,
    font: &FontVec,
) -> DynamicImage {
    if config.text.is_empty() {
        return img;
    }

    let scale = PxScale::from(config.size.max(1) as f32);
    let (text_w, text_h) = text_size(scale, font, &config.text);
    if text_w == 0 || text_h == 0 {
        return img;
    }

    // Render coverage into the alpha channel of a solid-colour layer
    let [r, g, b, a] = config.color;
    let mut layer = RgbaImage::from_pixel(text_w, text_h, Rgba([r, g, b, 0]));
    draw_text_mut(&mut layer, Rgba([r, g, b, 255]), 0, 0, scale, font, &config.text);
    for pixel in layer.pixels_mut() {
        pixel[3] = ((pixel[3] as u32 * a as u32 + 127) / 255) as u8;
    }

    let has_alpha = img.color().has_alpha();
    let mut base = img.to_rgba8();
    let (x, y) = watermark_origin(img.dimensions(), (text_w, text_h), config.position);
    imageops::overlay(&mut base, &layer, x, y);

    if has_alpha {
        DynamicImage::ImageRgba8(base)
    } else {
        DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(base).to_rgb8())
    }
}
