//! Batch transform pipeline and the steps it is built from

pub mod encode;
pub mod filters;
pub mod naming;
pub mod pipeline;
pub mod progress;
pub mod transform;
pub mod validation;
pub mod watermark;

pub use pipeline::process;
pub use progress::{progress_percent, ConsoleProgress, NoProgress, ProgressSink};
