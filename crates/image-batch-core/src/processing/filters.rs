use image::{DynamicImage, Rgba, RgbaImage};

use crate::config::FilterKind;

/// Gaussian sigma used by the blur filter
const BLUR_SIGMA: f32 = 2.0;

/// A 3x3 convolution kernel with its divisor and bias
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Kernel3x3 {
    pub weights: [i32; 9],
    pub scale: i32,
    pub offset: i32,
}

impl Kernel3x3 {
    pub const SHARPEN: Kernel3x3 = Kernel3x3 {
        weights: [-2, -2, -2, -2, 32, -2, -2, -2, -2],
        scale: 16,
        offset: 0,
    };

    pub const CONTOUR: Kernel3x3 = Kernel3x3 {
        weights: [-1, -1, -1, -1, 8, -1, -1, -1, -1],
        scale: 1,
        offset: 255,
    };

    pub const EMBOSS: Kernel3x3 = Kernel3x3 {
        weights: [-1, 0, 0, 0, 1, 0, 0, 0, 0],
        scale: 1,
        offset: 128,
    };

    pub const FIND_EDGES: Kernel3x3 = Kernel3x3 {
        weights: [-1, -1, -1, -1, 8, -1, -1, -1, -1],
        scale: 1,
        offset: 0,
    };

    pub const EDGE_ENHANCE: Kernel3x3 = Kernel3x3 {
        weights: [-1, -1, -1, -1, 10, -1, -1, -1, -1],
        scale: 2,
        offset: 0,
    };
}

/// Apply one named filter, keeping the alpha-ness of the input
pub fn apply_filter(img: DynamicImage, kind: FilterKind) -> DynamicImage {
    let kernel = match kind {
        FilterKind::Grayscale => return img.grayscale(),
        FilterKind::Blur => return img.blur(BLUR_SIGMA),
        FilterKind::Sharpen => Kernel3x3::SHARPEN,
        FilterKind::Contour => Kernel3x3::CONTOUR,
        FilterKind::Emboss => Kernel3x3::EMBOSS,
        FilterKind::Edge => Kernel3x3::FIND_EDGES,
        FilterKind::Enhance => Kernel3x3::EDGE_ENHANCE,
    };

    let has_alpha = img.color().has_alpha();
    let filtered = DynamicImage::ImageRgba8(convolve3x3(&img.to_rgba8(), &kernel));

    if has_alpha {
        filtered
    } else {
        DynamicImage::ImageRgb8(filtered.to_rgb8())
    }
}

/// Convolve the colour channels with a 3x3 kernel; alpha is copied through.
///
/// Pixels outside the image are clamped to the nearest edge.
pub fn convolve3x3(src: &RgbaImage, kernel: &Kernel3x3) -> RgbaImage {
    let (width, height) = src.dimensions();
    let mut out = RgbaImage::new(width, height);
    let scale = kernel.scale.max(1) as f32;

    for y in 0..height {
        for x in 0..width {
            let mut sums = [0i32; 3];

            for ky in 0..3u32 {
                for kx in 0..3u32 {
                    let nx = (x as i64 + kx as i64 - 1).clamp(0, width as i64 - 1) as u32;
                    let ny = (y as i64 + ky as i64 - 1).clamp(0, height as i64 - 1) as u32;
                    let weight = kernel.weights[(ky * 3 + kx) as usize];
                    let pixel = src.get_pixel(nx, ny);

                    for (c, sum) in sums.iter_mut().enumerate() {
                        *sum += pixel[c] as i32 * weight;
                    }
                }
            }

            let channel = |sum: i32| -> u8 {
                (sum as f32 / scale + kernel.offset as f32)
                    .round()
                    .clamp(0.0, 255.0) as u8
            };

            let alpha = src.get_pixel(x, y)[3];
            out.put_pixel(
                x,
                y,
                Rgba([channel(sums[0]), channel(sums[1]), channel(sums[2]), alpha]),
            );
        }
    }

    out
}
