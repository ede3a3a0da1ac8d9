use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Canonicalise a file extension: lowercase, dot-prefixed, with `.jpeg`
/// folded into `.jpg` and `.tif` into `.tiff`.
///
/// Total over all strings and idempotent. The empty string maps to `"."`.
pub fn normalize_extension(ext: &str) -> String {
    let lower = ext.to_lowercase();
    let dotted = if lower.starts_with('.') {
        lower
    } else {
        format!(".{}", lower)
    };

    match dotted.as_str() {
        ".jpeg" => ".jpg".to_string(),
        ".tif" => ".tiff".to_string(),
        _ => dotted,
    }
}

/// Normalised extension of a path, `"."` when it has none
pub fn extension_of(path: &Path) -> String {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_default();
    normalize_extension(&ext)
}

/// Image formats the pipeline reads and writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Jpg,
    Png,
    Bmp,
    Gif,
    Tiff,
    Webp,
}

impl ImageKind {
    pub const ALL: [ImageKind; 6] = [
        ImageKind::Jpg,
        ImageKind::Png,
        ImageKind::Bmp,
        ImageKind::Gif,
        ImageKind::Tiff,
        ImageKind::Webp,
    ];

    /// Determine the kind from any spelling of an extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match normalize_extension(ext).as_str() {
            ".jpg" => Some(Self::Jpg),
            ".png" => Some(Self::Png),
            ".bmp" => Some(Self::Bmp),
            ".gif" => Some(Self::Gif),
            ".tiff" => Some(Self::Tiff),
            ".webp" => Some(Self::Webp),
            _ => None,
        }
    }

    /// Determine the kind from a path's extension
    pub fn from_path(path: &Path) -> Option<Self> {
        Self::from_extension(&extension_of(path))
    }

    /// Map a container format detected by the decoder
    pub fn from_image_format(format: image::ImageFormat) -> Option<Self> {
        match format {
            image::ImageFormat::Jpeg => Some(Self::Jpg),
            image::ImageFormat::Png => Some(Self::Png),
            image::ImageFormat::Bmp => Some(Self::Bmp),
            image::ImageFormat::Gif => Some(Self::Gif),
            image::ImageFormat::Tiff => Some(Self::Tiff),
            image::ImageFormat::WebP => Some(Self::Webp),
            _ => None,
        }
    }

    /// The normalised extension, dot included
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpg => ".jpg",
            Self::Png => ".png",
            Self::Bmp => ".bmp",
            Self::Gif => ".gif",
            Self::Tiff => ".tiff",
            Self::Webp => ".webp",
        }
    }

    pub fn image_format(&self) -> image::ImageFormat {
        match self {
            Self::Jpg => image::ImageFormat::Jpeg,
            Self::Png => image::ImageFormat::Png,
            Self::Bmp => image::ImageFormat::Bmp,
            Self::Gif => image::ImageFormat::Gif,
            Self::Tiff => image::ImageFormat::Tiff,
            Self::Webp => image::ImageFormat::WebP,
        }
    }

    /// Whether output written in this format keeps an alpha channel
    pub fn supports_alpha(&self) -> bool {
        !matches!(self, Self::Jpg | Self::Bmp)
    }

    /// Whether the format has a lossy quality knob
    pub fn has_quality(&self) -> bool {
        matches!(self, Self::Jpg | Self::Webp)
    }

    /// Whether an EXIF blob can be embedded in the output container
    pub fn carries_exif(&self) -> bool {
        matches!(self, Self::Jpg | Self::Png | Self::Webp)
    }
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Severity tag of a batch log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryLevel {
    Ok,
    Warn,
    Error,
    Skip,
}

impl EntryLevel {
    fn label(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
            Self::Skip => "SKIP",
        }
    }
}

/// One human-readable line of the batch log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: EntryLevel,

    /// File name of the source the entry is about (empty for batch-level entries)
    pub file: String,

    pub message: String,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.file.is_empty() {
            write!(f, "[{}] {}", self.level.label(), self.message)
        } else {
            write!(f, "[{}] {}: {}", self.level.label(), self.file, self.message)
        }
    }
}

/// Ordered per-run log, returned with the result.
///
/// Every entry is mirrored to the `log` facade so file logging sees the same
/// trail the caller gets back.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchLog {
    entries: Vec<LogEntry>,
}

impl BatchLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, level: EntryLevel, file: &str, message: impl Into<String>) {
        let entry = LogEntry {
            level,
            file: file.to_string(),
            message: message.into(),
        };

        match level {
            EntryLevel::Ok | EntryLevel::Skip => log::info!("{}", entry),
            EntryLevel::Warn => log::warn!("{}", entry),
            EntryLevel::Error => log::error!("{}", entry),
        }

        self.entries.push(entry);
    }

    pub fn ok(&mut self, file: &str, message: impl Into<String>) {
        self.push(EntryLevel::Ok, file, message);
    }

    pub fn warn(&mut self, file: &str, message: impl Into<String>) {
        self.push(EntryLevel::Warn, file, message);
    }

    pub fn error(&mut self, file: &str, message: impl Into<String>) {
        self.push(EntryLevel::Error, file, message);
    }

    pub fn skip(&mut self, file: &str, message: impl Into<String>) {
        self.push(EntryLevel::Skip, file, message);
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries with the given tag
    pub fn count(&self, level: EntryLevel) -> usize {
        self.entries.iter().filter(|e| e.level == level).count()
    }

    /// Entries about one source file
    pub fn for_file<'a>(&'a self, file: &'a str) -> impl Iterator<Item = &'a LogEntry> + 'a {
        self.entries.iter().filter(move |e| e.file == file)
    }

    /// Render the whole log, one entry per line
    pub fn to_text(&self) -> String {
        self.entries
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Outcome of one batch run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransformResult {
    pub succeeded_count: usize,
    pub total_count: usize,

    /// Files actually written, in processing order
    pub output_paths: Vec<PathBuf>,

    pub log: BatchLog,
}

impl TransformResult {
    pub fn failed_count(&self) -> usize {
        self.total_count - self.succeeded_count
    }

    pub fn is_complete_success(&self) -> bool {
        self.succeeded_count == self.total_count
    }
}
