use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use image_batch_core::analysis::duplicates::DEFAULT_SIMILARITY_THRESHOLD;
use image_batch_core::analysis::{find_duplicates, inspect};
use image_batch_core::discovery::discover_sources;
use image_batch_core::{
    logging, ConsoleProgress, CropRect, FilterKind, ImageBatch, NamingConfig, OriginalAction,
    ResizeConfig, ResizeMode, TransformRequest, WatermarkConfig, WatermarkPosition,
};
use log::{info, warn, LevelFilter};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "image-batch")]
#[command(about = "Rename, convert, resize and watermark images in bulk")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Transform a batch of images
    Process {
        /// Image files or directories to process
        paths: Vec<PathBuf>,

        /// Destination directory
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Path to a JSON request file; flags override its values
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output name prefix
        #[arg(long)]
        prefix: Option<String>,

        /// First sequence number
        #[arg(long)]
        start: Option<u32>,

        /// Only process files with this extension
        #[arg(long)]
        type_filter: Option<String>,

        /// Convert to this format (jpg, png, bmp, gif, tiff, webp)
        #[arg(short, long)]
        format: Option<String>,

        /// Quality 1-100 for jpg/webp, compression hint for png
        #[arg(short, long)]
        quality: Option<u8>,

        /// Do not copy EXIF metadata into the outputs
        #[arg(long)]
        no_metadata: bool,

        /// Target box as WIDTHxHEIGHT
        #[arg(long, value_parser = parse_dimensions)]
        resize: Option<(u32, u32)>,

        /// fit, fill, pad or crop
        #[arg(long, default_value = "fit")]
        resize_mode: ResizeMode,

        /// Also enlarge images smaller than the target box
        #[arg(long)]
        allow_upscale: bool,

        /// Crop rectangle as X,Y,W,H
        #[arg(long)]
        crop: Option<CropRect>,

        /// Degrees counter-clockwise
        #[arg(long, allow_hyphen_values = true)]
        rotate: Option<i32>,

        /// grayscale, sharpen, blur, contour, emboss, edge or enhance
        #[arg(long)]
        filter: Option<FilterKind>,

        /// Watermark text
        #[arg(long)]
        watermark: Option<String>,

        #[arg(long, default_value = "bottom-right")]
        watermark_position: WatermarkPosition,

        /// Watermark font size in pixels
        #[arg(long, default_value_t = 32)]
        watermark_size: u32,

        /// TrueType font for the watermark
        #[arg(long)]
        font: Option<PathBuf>,

        /// keep, delete or move-to-backup
        #[arg(long)]
        original_action: Option<OriginalAction>,

        /// How deep to descend into directories
        #[arg(long)]
        max_depth: Option<usize>,

        /// Write a rotating log file in this directory
        #[arg(long)]
        log_dir: Option<PathBuf>,

        /// Hide the progress bar
        #[arg(long)]
        quiet: bool,

        /// Verbosity level
        #[arg(short, long, action = clap::ArgAction::Count)]
        verbose: u8,
    },

    /// Find exact and near-duplicate images
    Dupes {
        /// Image files or directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Maximum perceptual hash distance for near duplicates
        #[arg(short, long, default_value_t = DEFAULT_SIMILARITY_THRESHOLD)]
        threshold: u32,
    },

    /// Print format, size, colour and metadata facts about an image
    Info {
        file: PathBuf,
    },

    /// Generate default configuration file
    GenerateConfig {
        /// Path to save configuration file
        #[arg(default_value = "image-batch.json")]
        path: PathBuf,
    },
}

fn parse_dimensions(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{}'", s))?;
    let w = w.trim().parse::<u32>().map_err(|e| format!("bad width: {}", e))?;
    let h = h.trim().parse::<u32>().map_err(|e| format!("bad height: {}", e))?;
    Ok((w, h))
}

fn init_console_logger(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Process {
            paths,
            output,
            config,
            prefix,
            start,
            type_filter,
            format,
            quality,
            no_metadata,
            resize,
            resize_mode,
            allow_upscale,
            crop,
            rotate,
            filter,
            watermark,
            watermark_position,
            watermark_size,
            font,
            original_action,
            max_depth,
            log_dir,
            quiet,
            verbose,
        } => {
            match &log_dir {
                Some(dir) => {
                    let file = logging::init_logger(dir)?;
                    eprintln!("Logging to {}", file.display());
                }
                None => init_console_logger(verbose),
            }

            let mut request = match config {
                Some(path) => TransformRequest::from_file(&path)?,
                None => TransformRequest::default(),
            };

            // Override the request with command line arguments
            if let Some(output) = output {
                request.output_dir = output;
            }
            if prefix.is_some() || start.is_some() {
                let current = request.naming.take();
                request.naming = Some(NamingConfig {
                    prefix: prefix
                        .or_else(|| current.as_ref().map(|n| n.prefix.clone()))
                        .unwrap_or_default(),
                    start_number: start
                        .or_else(|| current.as_ref().map(|n| n.start_number))
                        .unwrap_or(1),
                });
            }
            if type_filter.is_some() {
                request.type_filter = type_filter;
            }
            if format.is_some() {
                request.target_format = format;
            }
            if quality.is_some() {
                request.quality = quality;
            }
            if no_metadata {
                request.preserve_metadata = false;
            }
            if let Some((width, height)) = resize {
                request.resize = Some(ResizeConfig {
                    width,
                    height,
                    mode: resize_mode,
                    only_shrink: !allow_upscale,
                });
            }
            if crop.is_some() {
                request.crop = crop;
            }
            if let Some(rotate) = rotate {
                request.rotate = rotate;
            }
            if filter.is_some() {
                request.filter = filter;
            }
            if let Some(text) = watermark {
                request.watermark = Some(WatermarkConfig {
                    position: watermark_position,
                    size: watermark_size,
                    font,
                    ..WatermarkConfig::new(text)
                });
            }
            if let Some(action) = original_action {
                request.original_action = action;
            }

            let mut batch = ImageBatch::new(request);
            batch
                .add_sources(&paths, max_depth)
                .context("Failed to collect source images")?;

            if batch.request().sources.is_empty() {
                bail!("No source images given");
            }

            info!(
                "Starting batch of {} image(s)...",
                batch.request().sources.len()
            );
            let mut progress = if quiet {
                ConsoleProgress::hidden()
            } else {
                ConsoleProgress::new()
            };
            let result = batch.run(&mut progress);

            println!("{}", result.log.to_text());
            println!(
                "Processed {}/{} file(s) into {}",
                result.succeeded_count,
                result.total_count,
                batch.request().output_dir.display()
            );
            if !result.is_complete_success() {
                warn!("{} file(s) were not processed", result.failed_count());
            }
            Ok(())
        }

        Commands::Dupes { paths, threshold } => {
            env_logger::init();

            let mut files = Vec::new();
            for path in paths {
                if path.is_dir() {
                    files.extend(discover_sources(&[&path], None)?);
                } else {
                    files.push(path);
                }
            }

            let groups = find_duplicates(&files, threshold);
            if groups.is_empty() {
                println!("No duplicates among {} image(s)", files.len());
            }
            for group in &groups {
                println!("{}", group.original.display());
                for dup in &group.duplicates {
                    println!(
                        "  {:?} (distance {}): {}",
                        dup.kind,
                        dup.distance,
                        dup.path.display()
                    );
                }
            }
            Ok(())
        }

        Commands::Info { file } => {
            env_logger::init();
            let info = inspect(&file)?;
            println!("{}", serde_json::to_string_pretty(&info)?);
            Ok(())
        }

        Commands::GenerateConfig { path } => {
            let request = TransformRequest::default();
            request.save_to_file(&path)?;
            println!("Configuration file generated at: {}", path.display());
            Ok(())
        }
    }
}
