use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Receives batch progress as `(percent, current file name)`.
///
/// Percent is monotonically non-decreasing and reaches 100 exactly once.
pub trait ProgressSink {
    fn report(&mut self, percent: u8, current: &str);
}

impl<F> ProgressSink for F
where
    F: FnMut(u8, &str),
{
    fn report(&mut self, percent: u8, current: &str) {
        self(percent, current)
    }
}

/// Sink that ignores every report
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&mut self, _percent: u8, _current: &str) {}
}

/// Percent done after `processed` of `total` files.
///
/// Rounded to nearest, but held at 99 until the last file so 100 is only
/// ever reported on completion.
pub fn progress_percent(processed: usize, total: usize) -> u8 {
    if total == 0 || processed >= total {
        return 100;
    }
    let rounded = (200 * processed + total) / (2 * total);
    rounded.min(99) as u8
}

/// Console progress bar for batch runs
pub struct ConsoleProgress {
    bar: ProgressBar,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new(100);
        let style = ProgressStyle::default_bar()
            .template("{wide_bar} {pos}% | {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░ ");
        bar.set_style(style);
        bar.set_message("Starting...");
        Self { bar }
    }

    /// A bar that never draws, for non-interactive output
    pub fn hidden() -> Self {
        let progress = Self::new();
        progress.bar.set_draw_target(ProgressDrawTarget::hidden());
        progress
    }
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for ConsoleProgress {
    fn report(&mut self, percent: u8, current: &str) {
        self.bar.set_position(percent as u64);
        if percent >= 100 {
            self.bar.finish_with_message("Done");
        } else {
            self.bar.set_message(current.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_percent() {
        assert_eq!(progress_percent(0, 4), 0);
        assert_eq!(progress_percent(1, 4), 25);
        assert_eq!(progress_percent(1, 3), 33);
        assert_eq!(progress_percent(2, 3), 67);
        assert_eq!(progress_percent(3, 3), 100);
        assert_eq!(progress_percent(0, 0), 100);
    }

    #[test]
    fn test_progress_held_below_100_until_done() {
        assert_eq!(progress_percent(199, 200), 99);
        assert_eq!(progress_percent(999, 1000), 99);
        assert_eq!(progress_percent(1000, 1000), 100);
    }

    #[test]
    fn test_closure_is_a_sink() {
        let mut seen = Vec::new();
        {
            let mut sink = |p: u8, f: &str| seen.push((p, f.to_string()));
            let sink: &mut dyn ProgressSink = &mut sink;
            sink.report(0, "");
            sink.report(100, "a.jpg");
        }
        assert_eq!(seen, vec![(0, String::new()), (100, "a.jpg".to_string())]);
    }

    #[test]
    fn test_hidden_console_progress() {
        let mut progress = ConsoleProgress::hidden();
        progress.report(40, "a.png");
        assert_eq!(progress.bar.position(), 40);
        progress.report(100, "a.png");
        assert_eq!(progress.bar.position(), 100);
    }
}
