//! The batch transform pipeline.
//!
//! Sources are handled one at a time in input order. Per-file problems end
//! up in the returned [`BatchLog`]; only request-level problems stop the
//! batch before the first file.

use ab_glyph::FontVec;
use image::DynamicImage;
use log::{debug, info, warn};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::{NamedTempFile, TempDir};

use crate::config::{OriginalAction, ResolvedFormats, TransformRequest, BACKUP_DIR_NAME};
use crate::error::{Error, Result};
use crate::logging::{log_file_error, log_fs_modification};
use crate::processing::encode::{embed_exif, encode_image, read_exif};
use crate::processing::filters::apply_filter;
use crate::processing::naming::{backup_destination, base_name, next_available_name};
use crate::processing::progress::{progress_percent, ProgressSink};
use crate::processing::transform::{
    background_for, crop, normalize_mode, prepare_for_output, resize, rotate,
};
use crate::processing::validation::{decode_source, read_source, SourceImage};
use crate::processing::watermark::{apply_text_watermark, load_font};
use crate::types::{extension_of, BatchLog, ImageKind, TransformResult};

/// Prefix of the per-run staging directory created inside the output directory
pub const STAGING_PREFIX: &str = ".imgbatch_";

/// Run one batch.
///
/// Progress is reported at 0 before the first file, after every file, and
/// exactly once at 100.
pub fn process(request: &TransformRequest, progress: &mut dyn ProgressSink) -> TransformResult {
    progress.report(0, "");

    let formats = match request.validate() {
        Ok(formats) => formats,
        Err(e) => return structural_failure(e, progress),
    };

    if let Err(e) = fs::create_dir_all(&request.output_dir) {
        log_file_error(&request.output_dir, "create_output_dir", &e);
        return structural_failure(
            Error::Configuration(format!(
                "cannot create output directory {}: {}",
                request.output_dir.display(),
                e
            )),
            progress,
        );
    }

    let staging = match tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .tempdir_in(&request.output_dir)
    {
        Ok(dir) => dir,
        Err(e) => {
            log_file_error(&request.output_dir, "create_staging_dir", &e);
            return structural_failure(
                Error::Configuration(format!("cannot create temporary directory: {}", e)),
                progress,
            );
        }
    };

    let total = request.sources.len();
    info!(
        "Processing {} file(s) into {}",
        total,
        request.output_dir.display()
    );

    let mut run = BatchRun::new(request, formats, staging);
    for (index, source) in request.sources.iter().enumerate() {
        run.process_file(source);
        progress.report(progress_percent(index + 1, total), &display_name(source));
    }

    if total == 0 {
        progress.report(100, "");
    }

    run.finish()
}

fn structural_failure(error: Error, progress: &mut dyn ProgressSink) -> TransformResult {
    let mut log = BatchLog::new();
    log.error("", error.to_string());
    progress.report(100, "");

    TransformResult {
        succeeded_count: 0,
        total_count: 0,
        output_paths: Vec::new(),
        log,
    }
}

/// File name shown in log entries and progress reports
fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// State of one batch in flight
struct BatchRun<'a> {
    request: &'a TransformRequest,
    formats: ResolvedFormats,
    staging: TempDir,
    font: Option<Result<FontVec>>,
    next_seq: u32,
    succeeded: usize,
    outputs: Vec<PathBuf>,
    log: BatchLog,
}

impl<'a> BatchRun<'a> {
    fn new(request: &'a TransformRequest, formats: ResolvedFormats, staging: TempDir) -> Self {
        let font = request
            .watermark
            .as_ref()
            .filter(|wm| !wm.text.is_empty())
            .map(|wm| load_font(wm.font.as_deref()));

        let next_seq = request
            .naming
            .as_ref()
            .map(|n| n.start_number)
            .unwrap_or(1);

        Self {
            request,
            formats,
            staging,
            font,
            next_seq,
            succeeded: 0,
            outputs: Vec::new(),
            log: BatchLog::new(),
        }
    }

    fn finish(self) -> TransformResult {
        let staging_path = self.staging.path().to_path_buf();
        if let Err(e) = self.staging.close() {
            log_file_error(&staging_path, "remove_staging_dir", &e);
        }

        info!(
            "Batch finished: {}/{} succeeded",
            self.succeeded,
            self.request.sources.len()
        );

        TransformResult {
            succeeded_count: self.succeeded,
            total_count: self.request.sources.len(),
            output_paths: self.outputs,
            log: self.log,
        }
    }

    fn process_file(&mut self, source: &Path) {
        let name = display_name(source);
        let file_ext = extension_of(source);

        if let Some(filter) = self.formats.type_filter {
            if file_ext != filter.extension() {
                self.log.skip(
                    &name,
                    format!("extension {} does not match filter {}", file_ext, filter),
                );
                return;
            }
        }

        let bytes = match read_source(source) {
            Ok(bytes) => bytes,
            Err(e) => {
                log_file_error(source, "read", &e);
                self.log.error(&name, format!("cannot read file: {}", e));
                return;
            }
        };

        let decoded = match decode_source(bytes) {
            Ok(decoded) => decoded,
            Err(e) => {
                self.log.skip(&name, format!("not a valid image: {}", e));
                return;
            }
        };

        let Some(source_kind) = ImageKind::from_extension(&file_ext).or(decoded.container) else {
            self.log.skip(&name, format!("unsupported format {}", file_ext));
            return;
        };

        if decoded.animated {
            self.log.warn(
                &name,
                "multi-frame image, only the first frame is processed",
            );
        }

        if let Some(resize) = &self.request.resize {
            if !resize.is_valid() {
                self.log.skip(
                    &name,
                    format!(
                        "resize needs both width and height, got {}x{}",
                        resize.width, resize.height
                    ),
                );
                return;
            }
        }

        let target_is_source = self
            .formats
            .target
            .map(|t| t.extension() == file_ext)
            .unwrap_or(false);
        if target_is_source && self.request.quality.is_none() && !self.request.has_pixel_operations()
        {
            self.log.skip(
                &name,
                format!("already {}, nothing to convert", file_ext),
            );
            return;
        }

        let target = self.formats.target.unwrap_or(source_kind);
        let seq = self.next_seq;
        self.next_seq = self.next_seq.saturating_add(1);

        match self.write_output(&name, decoded, target, seq) {
            Ok(dest) => {
                self.succeeded += 1;
                self.log
                    .ok(&name, format!("saved as {}", display_name(&dest)));
                self.outputs.push(dest);
                self.apply_original_action(source, &name);
            }
            Err(e) => self.log.error(&name, e.to_string()),
        }
    }

    fn write_output(
        &mut self,
        name: &str,
        source: SourceImage,
        target: ImageKind,
        seq: u32,
    ) -> Result<PathBuf> {
        let base = base_name(self.request.naming.as_ref(), seq);
        let dest = next_available_name(&self.request.output_dir, &base, target.extension());

        let img = self.transform(name, source.image, target)?;
        let img = prepare_for_output(img, target);
        let mut encoded = encode_image(&img, target, self.request.quality)?;

        if self.request.preserve_metadata && target.carries_exif() {
            if let Some(exif) = read_exif(&source.bytes) {
                match embed_exif(&encoded, target, exif) {
                    Ok(tagged) => encoded = tagged,
                    Err(e) => self
                        .log
                        .warn(name, format!("metadata not preserved: {}", e)),
                }
            }
        }

        place_output(self.staging.path(), &encoded, &dest)?;
        log_fs_modification("write", &dest, Some(&format!("{} bytes", encoded.len())));
        Ok(dest)
    }

    /// Crop, rotate, resize, filter, then watermark
    fn transform(&mut self, name: &str, img: DynamicImage, target: ImageKind) -> Result<DynamicImage> {
        let request = self.request;
        let mut img = normalize_mode(img);

        if let Some(rect) = &request.crop {
            img = crop(&img, rect)?;
        }

        if request.rotate % 360 != 0 {
            img = rotate(img, request.rotate);
        }

        if let Some(config) = &request.resize {
            img = resize(img, config, background_for(target));
        }

        if let Some(filter) = request.filter {
            img = apply_filter(img, filter);
        }

        if let Some(watermark) = &request.watermark {
            match &self.font {
                Some(Ok(font)) => img = apply_text_watermark(img, watermark, font),
                Some(Err(e)) => self
                    .log
                    .warn(name, format!("watermark skipped: {}", e)),
                None => debug!("Empty watermark text, nothing to draw"),
            }
        }

        Ok(img)
    }

    fn apply_original_action(&mut self, source: &Path, name: &str) {
        let outcome = match self.request.original_action {
            OriginalAction::Keep => return,
            OriginalAction::Delete => fs::remove_file(source)
                .map(|_| log_fs_modification("delete", source, None))
                .map_err(Error::from),
            OriginalAction::MoveToBackup => {
                let backup_dir = self.request.output_dir.join(BACKUP_DIR_NAME);
                move_to_backup(source, &backup_dir)
            }
        };

        if let Err(e) = outcome {
            log_file_error(source, "original_action", &e);
            self.log
                .warn(name, format!("original file left in place: {}", e));
        }
    }
}

/// Stage `bytes` in `staging`, then link them to `dest` without clobbering
fn place_output(staging: &Path, bytes: &[u8], dest: &Path) -> Result<()> {
    let mut staged = NamedTempFile::new_in(staging)?;
    staged.write_all(bytes)?;
    staged.as_file().sync_all()?;

    staged
        .persist_noclobber(dest)
        .map_err(|e| Error::Io(e.error))?;
    Ok(())
}

fn move_to_backup(source: &Path, backup_dir: &Path) -> Result<()> {
    fs::create_dir_all(backup_dir)?;
    let dest = backup_destination(backup_dir, source);

    if let Err(e) = fs::rename(source, &dest) {
        // Different filesystem: copy then remove
        warn!(
            "Rename of {} failed ({}), copying instead",
            source.display(),
            e
        );
        fs::copy(source, &dest)?;
        fs::remove_file(source)?;
    }

    log_fs_modification("backup", source, Some(&dest.display().to_string()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NamingConfig;
    use crate::processing::progress::NoProgress;
    use image::{Rgb, RgbImage};
    use tempfile::tempdir;

    fn write_png(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        RgbImage::from_pixel(8, 8, Rgb([0, 128, 255]))
            .save(&path)
            .unwrap();
        path
    }

    #[test]
    fn test_place_output_never_clobbers() {
        let dir = tempdir().unwrap();
        let staging = tempdir().unwrap();
        let dest = dir.path().join("out.bin");

        place_output(staging.path(), b"first", &dest).unwrap();
        assert!(place_output(staging.path(), b"second", &dest).is_err());
        assert_eq!(fs::read(&dest).unwrap(), b"first");
    }

    #[test]
    fn test_structural_failure_shape() {
        let mut reports = Vec::new();
        let request = TransformRequest {
            sources: vec![PathBuf::from("a.jpg")],
            target_format: Some("heic".to_string()),
            ..Default::default()
        };
        let result = process(&request, &mut |p: u8, _: &str| reports.push(p));

        assert_eq!(result.total_count, 0);
        assert_eq!(result.succeeded_count, 0);
        assert!(result.output_paths.is_empty());
        assert_eq!(result.log.len(), 1);
        assert_eq!(reports, vec![0, 100]);
    }

    #[test]
    fn test_staging_dir_removed_after_run() {
        let src = tempdir().unwrap();
        let out = tempdir().unwrap();
        let request = TransformRequest {
            sources: vec![write_png(src.path(), "a.png")],
            output_dir: out.path().to_path_buf(),
            naming: Some(NamingConfig {
                prefix: "x".to_string(),
                start_number: 1,
            }),
            ..Default::default()
        };

        let result = process(&request, &mut NoProgress);
        assert_eq!(result.succeeded_count, 1);

        let leftovers: Vec<_> = fs::read_dir(out.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(STAGING_PREFIX))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_move_to_backup_keeps_both_copies_named() {
        let src = tempdir().unwrap();
        let backup = src.path().join("backup");
        let first = write_png(src.path(), "a.png");
        move_to_backup(&first, &backup).unwrap();

        let second = write_png(src.path(), "a.png");
        move_to_backup(&second, &backup).unwrap();

        assert!(!second.exists());
        assert!(backup.join("a.png").exists());
        assert!(backup.join("a_1.png").exists());
    }
}
