//! CLI progress and summary formatting.
//!
//! Each display concern has a pure `format_*` function (unit-testable, no
//! I/O) and a thin `print_*` wrapper. Progress is a single line redrawn in
//! place with a carriage return, matching the feel of the upstream tool:
//!
//! ```text
//! Processing... 12/37 (saved 4.2MB, 31%)
//! ```

use crate::pipeline::ProgressEvent;
use std::io::Write;
use std::path::Path;

/// Running size accounting over progress events.
///
/// Tracks bytes read from recode candidates and bytes saved by recoding.
/// Pass-through candidates (animated) contribute to neither.
#[derive(Debug, Default, Clone, Copy)]
pub struct SizeTally {
    read: usize,
    saved: usize,
}

impl SizeTally {
    pub fn record(&mut self, event: &ProgressEvent) {
        if let Some(output_len) = event.output_len {
            self.read += event.input_len;
            self.saved += event.input_len.saturating_sub(output_len);
        }
    }

    pub fn saved(&self) -> usize {
        self.saved
    }

    /// Output size as a percentage of input size, rounded. 100 when
    /// nothing has been recoded yet.
    pub fn remaining_percent(&self) -> u32 {
        if self.read == 0 {
            return 100;
        }
        (100.0 - self.saved as f64 / self.read as f64 * 100.0).round() as u32
    }
}

/// Human-readable byte size: `512B`, `34KB`, `1.2MB`, `3.4GB`.
pub fn humanize_size(size: usize) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    let size_f = size as f64;
    if size_f < KB {
        format!("{size}B")
    } else if size_f < MB {
        format!("{:.0}KB", size_f / KB)
    } else if size_f < GB {
        format!("{:.1}MB", size_f / MB)
    } else {
        format!("{:.1}GB", size_f / GB)
    }
}

/// One progress line for the latest completed candidate.
pub fn format_progress(event: &ProgressEvent, tally: &SizeTally) -> String {
    format!(
        "Processing... {}/{} (saved {}, {}%)",
        event.completed,
        event.total,
        humanize_size(tally.saved()),
        tally.remaining_percent(),
    )
}

/// Final summary after the output archive is written.
pub fn format_summary(input_len: usize, output_len: usize, output_path: &Path) -> String {
    format!(
        "Done: {} ({} -> {})",
        output_path.display(),
        humanize_size(input_len),
        humanize_size(output_len),
    )
}

/// Redraw the progress line in place.
pub fn print_progress(event: &ProgressEvent, tally: &SizeTally) {
    print!("\r{} ", format_progress(event, tally));
    let _ = std::io::stdout().flush();
}

/// Terminate the redrawn progress line before normal output resumes.
pub fn finish_progress() {
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(completed: usize, total: usize, input_len: usize, output_len: Option<usize>) -> ProgressEvent {
        ProgressEvent {
            name: "asset.png".to_string(),
            completed,
            total,
            input_len,
            output_len,
        }
    }

    #[test]
    fn humanize_boundaries() {
        assert_eq!(humanize_size(0), "0B");
        assert_eq!(humanize_size(1023), "1023B");
        assert_eq!(humanize_size(1024), "1KB");
        assert_eq!(humanize_size(10 * 1024), "10KB");
        assert_eq!(humanize_size(1024 * 1024), "1.0MB");
        assert_eq!(humanize_size(3 * 1024 * 1024 / 2), "1.5MB");
        assert_eq!(humanize_size(2 * 1024 * 1024 * 1024), "2.0GB");
    }

    #[test]
    fn tally_counts_recoded_candidates() {
        let mut tally = SizeTally::default();
        tally.record(&event(1, 2, 1000, Some(400)));
        tally.record(&event(2, 2, 500, Some(300)));
        assert_eq!(tally.saved(), 800);
        assert_eq!(tally.remaining_percent(), 47);
    }

    #[test]
    fn tally_ignores_pass_through() {
        let mut tally = SizeTally::default();
        tally.record(&event(1, 1, 9999, None));
        assert_eq!(tally.saved(), 0);
        assert_eq!(tally.remaining_percent(), 100);
    }

    #[test]
    fn tally_never_counts_negative_savings() {
        let mut tally = SizeTally::default();
        // recode can grow a file; savings clamp at zero per asset
        tally.record(&event(1, 1, 100, Some(150)));
        assert_eq!(tally.saved(), 0);
    }

    #[test]
    fn progress_line_shape() {
        let mut tally = SizeTally::default();
        let e = event(3, 7, 2048, Some(1024));
        tally.record(&e);
        assert_eq!(format_progress(&e, &tally), "Processing... 3/7 (saved 1KB, 50%)");
    }

    #[test]
    fn summary_line_shape() {
        let line = format_summary(2048, 1024, Path::new("room_compressed.zip"));
        assert_eq!(line, "Done: room_compressed.zip (2KB -> 1KB)");
    }
}
