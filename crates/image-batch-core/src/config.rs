use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::types::ImageKind;

/// Output file naming: `{prefix}_{seq:04}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamingConfig {
    pub prefix: String,

    /// First sequence number (must be positive)
    #[serde(default = "default_start_number")]
    pub start_number: u32,
}

fn default_start_number() -> u32 {
    1
}

/// How the image is fitted to the target box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeMode {
    /// Scale to fit inside the box, keeping aspect ratio
    #[default]
    Fit,

    /// Scale to cover the box, then centre-crop the overflow
    Fill,

    /// Fit, then centre on a canvas of exactly the box size
    Pad,

    /// No scaling, centre-crop (or pad) to the box
    Crop,
}

impl FromStr for ResizeMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "fit" => Ok(Self::Fit),
            "fill" => Ok(Self::Fill),
            "pad" => Ok(Self::Pad),
            "crop" => Ok(Self::Crop),
            other => Err(Error::Configuration(format!("Unknown resize mode: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResizeConfig {
    /// Target width; 0 means missing and makes every file skip
    #[serde(default)]
    pub width: u32,

    /// Target height; 0 means missing and makes every file skip
    #[serde(default)]
    pub height: u32,

    #[serde(default)]
    pub mode: ResizeMode,

    /// Never upscale an image that already fits the target box
    #[serde(default = "default_true")]
    pub only_shrink: bool,
}

impl ResizeConfig {
    pub fn new(width: u32, height: u32, mode: ResizeMode) -> Self {
        Self {
            width,
            height,
            mode,
            only_shrink: true,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// Absolute crop rectangle in source pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl FromStr for CropRect {
    type Err = Error;

    /// Parse `x,y,w,h`
    fn from_str(s: &str) -> Result<Self> {
        let parts = s
            .split(',')
            .map(|p| p.trim().parse::<u32>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::Configuration(format!("Invalid crop rectangle '{}': {}", s, e)))?;

        match parts.as_slice() {
            [x, y, w, h] => Ok(Self {
                x: *x,
                y: *y,
                w: *w,
                h: *h,
            }),
            _ => Err(Error::Configuration(format!(
                "Crop rectangle must be x,y,w,h, got '{}'",
                s
            ))),
        }
    }
}

/// Convolution-style filters applied after resizing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    Grayscale,
    Sharpen,
    Blur,
    Contour,
    Emboss,
    Edge,
    Enhance,
}

impl FromStr for FilterKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "grayscale" => Ok(Self::Grayscale),
            "sharpen" => Ok(Self::Sharpen),
            "blur" => Ok(Self::Blur),
            "contour" => Ok(Self::Contour),
            "emboss" => Ok(Self::Emboss),
            "edge" => Ok(Self::Edge),
            "enhance" => Ok(Self::Enhance),
            other => Err(Error::Configuration(format!("Unknown filter: {}", other))),
        }
    }
}

/// Watermark anchor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WatermarkPosition {
    #[default]
    BottomRight,
    BottomLeft,
    TopRight,
    TopLeft,
    Center,
}

impl FromStr for WatermarkPosition {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "bottom-right" => Ok(Self::BottomRight),
            "bottom-left" => Ok(Self::BottomLeft),
            "top-right" => Ok(Self::TopRight),
            "top-left" => Ok(Self::TopLeft),
            "center" => Ok(Self::Center),
            other => Err(Error::Configuration(format!(
                "Unknown watermark position: {}",
                other
            ))),
        }
    }
}

/// Text watermark, composited after every other transform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatermarkConfig {
    pub text: String,

    /// Font size in pixels
    #[serde(default = "default_watermark_size")]
    pub size: u32,

    #[serde(default)]
    pub position: WatermarkPosition,

    /// RGBA text colour
    #[serde(default = "default_watermark_color")]
    pub color: [u8; 4],

    /// TrueType/OpenType font file; well-known system fonts are tried when absent
    #[serde(default)]
    pub font: Option<PathBuf>,
}

impl WatermarkConfig {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            size: default_watermark_size(),
            position: WatermarkPosition::default(),
            color: default_watermark_color(),
            font: None,
        }
    }
}

fn default_watermark_size() -> u32 {
    32
}

fn default_watermark_color() -> [u8; 4] {
    [255, 255, 255, 128]
}

/// What happens to a source file once its output has been placed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OriginalAction {
    #[default]
    Keep,
    Delete,
    MoveToBackup,
}

impl FromStr for OriginalAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "keep" => Ok(Self::Keep),
            "delete" => Ok(Self::Delete),
            "move-to-backup" => Ok(Self::MoveToBackup),
            other => Err(Error::Configuration(format!(
                "Unknown original file action: {}",
                other
            ))),
        }
    }
}

/// Name of the backup directory created inside the output directory
pub const BACKUP_DIR_NAME: &str = "original_files_backup";

fn default_true() -> bool {
    true
}

/// Formats resolved from a request before any file is touched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedFormats {
    pub type_filter: Option<ImageKind>,
    pub target: Option<ImageKind>,
}

/// Everything one batch run needs, apart from the progress sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformRequest {
    /// Source image files, processed in this order
    pub sources: Vec<PathBuf>,

    /// Destination directory (created if missing)
    pub output_dir: PathBuf,

    /// Prefix and start number; bare sequence numbers when absent
    pub naming: Option<NamingConfig>,

    /// Only process sources with this extension
    pub type_filter: Option<String>,

    /// Convert to this format; keep each file's format when absent
    pub target_format: Option<String>,

    /// JPEG/WebP quality or PNG compression hint
    pub quality: Option<u8>,

    /// Copy the source EXIF blob into the output
    pub preserve_metadata: bool,

    pub resize: Option<ResizeConfig>,

    /// Applied before resize
    pub crop: Option<CropRect>,

    /// Degrees counter-clockwise; 0 is a no-op
    pub rotate: i32,

    pub filter: Option<FilterKind>,

    pub watermark: Option<WatermarkConfig>,

    pub original_action: OriginalAction,
}

impl Default for TransformRequest {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            output_dir: PathBuf::from("output"),
            naming: None,
            type_filter: None,
            target_format: None,
            quality: None,
            preserve_metadata: true,
            resize: None,
            crop: None,
            rotate: 0,
            filter: None,
            watermark: None,
            original_action: OriginalAction::Keep,
        }
    }
}

impl TransformRequest {
    /// Load a request from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .map_err(|e| Error::Configuration(format!("Failed to open config file: {}", e)))?;

        let request: TransformRequest = serde_json::from_reader(file)
            .map_err(|e| Error::Configuration(format!("Failed to parse config file: {}", e)))?;

        Ok(request)
    }

    /// Save the request to a JSON file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)
            .map_err(|e| Error::Configuration(format!("Failed to create config file: {}", e)))?;

        serde_json::to_writer_pretty(file, self)
            .map_err(|e| Error::Configuration(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Resolve the type filter and target format against the supported set
    pub fn resolve_formats(&self) -> Result<ResolvedFormats> {
        let resolve = |raw: &Option<String>, what: &str| -> Result<Option<ImageKind>> {
            match raw {
                None => Ok(None),
                Some(ext) => ImageKind::from_extension(ext).map(Some).ok_or_else(|| {
                    Error::UnsupportedFormat(format!("{} '{}' is not a supported format", what, ext))
                }),
            }
        };

        Ok(ResolvedFormats {
            type_filter: resolve(&self.type_filter, "type filter")?,
            target: resolve(&self.target_format, "target format")?,
        })
    }

    /// Validate the request-level settings
    pub fn validate(&self) -> Result<ResolvedFormats> {
        let formats = self.resolve_formats()?;

        if let Some(naming) = &self.naming {
            if naming.start_number == 0 {
                return Err(Error::Configuration(
                    "Start number must be a positive integer".to_string(),
                ));
            }
        }

        Ok(formats)
    }

    /// Whether any pixel-level operation is requested.
    ///
    /// A same-format request is only skipped as a no-op when this is false.
    pub fn has_pixel_operations(&self) -> bool {
        self.resize.is_some()
            || self.crop.is_some()
            || self.rotate % 360 != 0
            || self.filter.is_some()
            || self.watermark.is_some()
    }
}
