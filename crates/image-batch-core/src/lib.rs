//! Core functionality for batch image transformation.
//!
//! This library provides:
//! - A batch pipeline that renames, converts, recompresses, crops, rotates,
//!   resizes, filters and watermarks a list of images
//! - Source discovery over directory trees
//! - Duplicate detection and single-image inspection
//! - File logging setup

use log::info;
use std::path::PathBuf;

// -- Internal Modules --
mod error;

// -- Public Re-exports --
pub use config::*;
pub use error::{Error, Result};
pub use types::*;

// -- Public Modules --
pub mod analysis;
pub mod config;
pub mod discovery;
pub mod logging;
pub mod processing;
pub mod types;

pub use processing::{ConsoleProgress, NoProgress, ProgressSink};

/// Main entry point for a batch run
pub struct ImageBatch {
    request: TransformRequest,
}

impl ImageBatch {
    /// Create a batch from a request
    pub fn new(request: TransformRequest) -> Self {
        Self { request }
    }

    pub fn request(&self) -> &TransformRequest {
        &self.request
    }

    /// Add files and the supported images found under directories to the sources
    pub fn add_sources(&mut self, paths: &[PathBuf], max_depth: Option<usize>) -> Result<usize> {
        let before = self.request.sources.len();

        for path in paths {
            if path.is_dir() {
                let found = discovery::discover_sources(&[path], max_depth)?;
                info!("Found {} image(s) under {}", found.len(), path.display());
                self.request.sources.extend(found);
            } else {
                self.request.sources.push(path.clone());
            }
        }

        Ok(self.request.sources.len() - before)
    }

    /// Run the pipeline over the current sources
    pub fn run(&self, progress: &mut dyn ProgressSink) -> TransformResult {
        processing::process(&self.request, progress)
    }
}
