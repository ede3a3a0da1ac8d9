use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, Rgba, RgbaImage, RgbImage};
use imageproc::geometric_transformations::{rotate_about_center, Interpolation};

use crate::config::{CropRect, ResizeConfig, ResizeMode};
use crate::error::{Error, Result};
use crate::types::ImageKind;

pub const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);
pub const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

const RESAMPLE: FilterType = FilterType::Lanczos3;

/// Convert to 8-bit RGB, or RGBA when the source carries alpha
pub fn normalize_mode(img: DynamicImage) -> DynamicImage {
    match img {
        DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => img,
        other if other.color().has_alpha() => DynamicImage::ImageRgba8(other.to_rgba8()),
        other => DynamicImage::ImageRgb8(other.to_rgb8()),
    }
}

/// Crop to an absolute rectangle, clamped to the image bounds
pub fn crop(img: &DynamicImage, rect: &CropRect) -> Result<DynamicImage> {
    let cropped = img.crop_imm(rect.x, rect.y, rect.w, rect.h);
    if cropped.width() == 0 || cropped.height() == 0 {
        return Err(Error::Configuration(format!(
            "Crop area {}x{}+{}+{} is outside the {}x{} image",
            rect.w,
            rect.h,
            rect.x,
            rect.y,
            img.width(),
            img.height()
        )));
    }
    Ok(cropped)
}

/// Rotate counter-clockwise by `degrees`, expanding the canvas to fit.
///
/// Multiples of 90 are exact pixel moves; other angles are resampled
/// bilinearly onto a transparent canvas.
pub fn rotate(img: DynamicImage, degrees: i32) -> DynamicImage {
    match degrees.rem_euclid(360) {
        0 => img,
        90 => img.rotate270(),
        180 => img.rotate180(),
        270 => img.rotate90(),
        angle => rotate_expanded(&img, angle as f32),
    }
}

fn rotate_expanded(img: &DynamicImage, degrees: f32) -> DynamicImage {
    let (width, height) = img.dimensions();
    let (new_width, new_height) = rotated_bounds(width, height, degrees);

    // Centre the source on the final canvas, then turn it in place
    let mut canvas = RgbaImage::from_pixel(new_width, new_height, TRANSPARENT);
    let x = (new_width as i64 - width as i64) / 2;
    let y = (new_height as i64 - height as i64) / 2;
    imageops::overlay(&mut canvas, &img.to_rgba8(), x, y);

    // imageproc turns clockwise for positive theta
    let theta = -degrees.to_radians();
    let rotated = rotate_about_center(&canvas, theta, Interpolation::Bilinear, TRANSPARENT);
    DynamicImage::ImageRgba8(rotated)
}

/// Size of the box that holds a `width`x`height` image rotated by `degrees`
pub fn rotated_bounds(width: u32, height: u32, degrees: f32) -> (u32, u32) {
    let radians = (degrees as f64).to_radians();
    let (sin, cos) = (radians.sin().abs(), radians.cos().abs());
    let w = width as f64;
    let h = height as f64;

    let bound = |v: f64| ((v - 1e-6).ceil().max(1.0)) as u32;
    (bound(w * cos + h * sin), bound(w * sin + h * cos))
}

/// Resize per the configured mode.
///
/// With `only_shrink`, an image already inside the target box is returned
/// unchanged. `background` fills the padding of `pad` and `crop`.
pub fn resize(img: DynamicImage, config: &ResizeConfig, background: Rgba<u8>) -> DynamicImage {
    let (target_w, target_h) = (config.width, config.height);
    let (width, height) = img.dimensions();

    if config.only_shrink && width <= target_w && height <= target_h {
        return img;
    }

    match config.mode {
        ResizeMode::Fit => img.resize(target_w, target_h, RESAMPLE),
        ResizeMode::Fill => img.resize_to_fill(target_w, target_h, RESAMPLE),
        ResizeMode::Pad => {
            let fitted = img.resize(target_w, target_h, RESAMPLE);
            centre_on_canvas(&fitted, target_w, target_h, background)
        }
        ResizeMode::Crop => centre_on_canvas(&img, target_w, target_h, background),
    }
}

/// Place `img` centred on a `width`x`height` canvas, cropping any overflow
pub fn centre_on_canvas(img: &DynamicImage, width: u32, height: u32, background: Rgba<u8>) -> DynamicImage {
    let mut canvas = RgbaImage::from_pixel(width, height, background);
    let x = (width as i64 - img.width() as i64) / 2;
    let y = (height as i64 - img.height() as i64) / 2;
    imageops::overlay(&mut canvas, &img.to_rgba8(), x, y);
    DynamicImage::ImageRgba8(canvas)
}

/// Background used for padding when writing `kind`
pub fn background_for(kind: ImageKind) -> Rgba<u8> {
    if kind.supports_alpha() {
        TRANSPARENT
    } else {
        WHITE
    }
}

/// Composite onto opaque white
pub fn flatten_onto_white(img: &DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }

    let rgba = img.to_rgba8();
    let mut out = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let Rgba([r, g, b, a]) = *pixel;
        let blend = |c: u8| -> u8 {
            let a = a as u32;
            ((c as u32 * a + 255 * (255 - a) + 127) / 255) as u8
        };
        out.put_pixel(x, y, image::Rgb([blend(r), blend(g), blend(b)]));
    }
    out
}

/// Convert the working image to the colour mode `kind` is written in
pub fn prepare_for_output(img: DynamicImage, kind: ImageKind) -> DynamicImage {
    match kind {
        ImageKind::Jpg | ImageKind::Bmp => DynamicImage::ImageRgb8(flatten_onto_white(&img)),
        ImageKind::Gif | ImageKind::Webp => DynamicImage::ImageRgba8(img.to_rgba8()),
        ImageKind::Tiff => normalize_mode(img),
        ImageKind::Png => match img {
            DynamicImage::ImageLuma8(_)
            | DynamicImage::ImageLumaA8(_)
            | DynamicImage::ImageRgb8(_)
            | DynamicImage::ImageRgba8(_) => img,
            other => normalize_mode(other),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgb(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb([10, 20, 30])))
    }

    #[test]
    fn test_normalize_mode() {
        let gray = DynamicImage::ImageLuma8(image::GrayImage::new(2, 2));
        assert_eq!(normalize_mode(gray).color(), image::ColorType::Rgb8);

        let gray_alpha = DynamicImage::ImageLumaA8(image::GrayAlphaImage::new(2, 2));
        assert_eq!(normalize_mode(gray_alpha).color(), image::ColorType::Rgba8);

        let wide = DynamicImage::ImageRgb16(image::ImageBuffer::new(2, 2));
        assert_eq!(normalize_mode(wide).color(), image::ColorType::Rgb8);
    }

    #[test]
    fn test_crop_clamps_and_rejects_empty() {
        let img = rgb(100, 50);
        let cropped = crop(&img, &CropRect { x: 80, y: 10, w: 50, h: 20 }).unwrap();
        assert_eq!(cropped.dimensions(), (20, 20));

        assert!(crop(&img, &CropRect { x: 100, y: 0, w: 10, h: 10 }).is_err());
        assert!(crop(&img, &CropRect { x: 0, y: 0, w: 0, h: 10 }).is_err());
    }

    #[test]
    fn test_rotate_right_angles_are_exact() {
        let mut buf = RgbImage::new(3, 2);
        buf.put_pixel(2, 0, image::Rgb([255, 0, 0]));
        let img = DynamicImage::ImageRgb8(buf);

        // Counter-clockwise 90: top-right corner moves to top-left
        let ccw = rotate(img.clone(), 90);
        assert_eq!(ccw.dimensions(), (2, 3));
        assert_eq!(ccw.to_rgb8().get_pixel(0, 0), &image::Rgb([255, 0, 0]));

        let cw = rotate(img.clone(), -90);
        assert_eq!(cw.dimensions(), (2, 3));
        assert_eq!(cw.to_rgb8().get_pixel(1, 2), &image::Rgb([255, 0, 0]));

        assert_eq!(rotate(img.clone(), 360).dimensions(), (3, 2));
        assert_eq!(rotate(img, 540).dimensions(), (3, 2));
    }

    #[test]
    fn test_rotate_arbitrary_angle_expands() {
        let rotated = rotate(rgb(100, 100), 45);
        let (w, h) = rotated.dimensions();
        assert!((141..=142).contains(&w), "width {}", w);
        assert_eq!(w, h);
        assert!(rotated.color().has_alpha());
        // Corners of the expanded canvas stay transparent
        assert_eq!(rotated.to_rgba8().get_pixel(0, 0)[3], 0);
    }

    #[test]
    fn test_rotated_bounds() {
        assert_eq!(rotated_bounds(100, 50, 0.0), (100, 50));
        assert_eq!(rotated_bounds(100, 50, 90.0), (50, 100));
        assert_eq!(rotated_bounds(100, 100, 45.0), (142, 142));
    }

    #[test]
    fn test_resize_fit_and_only_shrink() {
        let config = ResizeConfig::new(100, 100, ResizeMode::Fit);
        assert_eq!(resize(rgb(400, 200), &config, WHITE).dimensions(), (100, 50));

        // Already inside the box
        assert_eq!(resize(rgb(40, 20), &config, WHITE).dimensions(), (40, 20));

        let mut upscale = config.clone();
        upscale.only_shrink = false;
        assert_eq!(resize(rgb(40, 20), &upscale, WHITE).dimensions(), (100, 50));
    }

    #[test]
    fn test_resize_fill() {
        let config = ResizeConfig::new(100, 100, ResizeMode::Fill);
        assert_eq!(resize(rgb(400, 200), &config, WHITE).dimensions(), (100, 100));
    }

    #[test]
    fn test_resize_pad_centres_content() {
        let config = ResizeConfig::new(100, 100, ResizeMode::Pad);
        let padded = resize(rgb(50, 200), &config, TRANSPARENT).to_rgba8();
        assert_eq!(padded.dimensions(), (100, 100));

        // 25x100 content starting at x=37
        assert_eq!(padded.get_pixel(36, 50)[3], 0);
        assert_eq!(padded.get_pixel(37, 50)[3], 255);
        assert_eq!(padded.get_pixel(61, 50)[3], 255);
        assert_eq!(padded.get_pixel(62, 50)[3], 0);
    }

    #[test]
    fn test_resize_crop_mode() {
        let config = ResizeConfig::new(100, 100, ResizeMode::Crop);
        let cropped = resize(rgb(300, 80), &config, WHITE).to_rgba8();
        assert_eq!(cropped.dimensions(), (100, 100));
        // Source is shorter than the box: white rows above and below
        assert_eq!(cropped.get_pixel(50, 0), &WHITE);
        let inside = cropped.get_pixel(50, 50);
        assert_eq!(inside[3], 255);
        assert!(inside[0].abs_diff(10) <= 1 && inside[2].abs_diff(30) <= 1);
    }

    #[test]
    fn test_flatten_onto_white() {
        let mut buf = RgbaImage::new(2, 1);
        buf.put_pixel(0, 0, Rgba([0, 0, 0, 0]));
        buf.put_pixel(1, 0, Rgba([0, 0, 0, 255]));
        let flat = flatten_onto_white(&DynamicImage::ImageRgba8(buf));
        assert_eq!(flat.get_pixel(0, 0), &image::Rgb([255, 255, 255]));
        assert_eq!(flat.get_pixel(1, 0), &image::Rgb([0, 0, 0]));
    }

    #[test]
    fn test_prepare_for_output_modes() {
        let rgba = DynamicImage::ImageRgba8(RgbaImage::new(2, 2));
        assert_eq!(
            prepare_for_output(rgba.clone(), ImageKind::Jpg).color(),
            image::ColorType::Rgb8
        );
        assert_eq!(
            prepare_for_output(rgba.clone(), ImageKind::Png).color(),
            image::ColorType::Rgba8
        );
        assert_eq!(
            prepare_for_output(rgb(2, 2), ImageKind::Gif).color(),
            image::ColorType::Rgba8
        );
        assert_eq!(
            prepare_for_output(rgba, ImageKind::Bmp).color(),
            image::ColorType::Rgb8
        );
    }
}
