//! CLI output formatting.
//!
//! Each item leads with its 1-based position in the batch and its path
//! relative to the input directory; the written file and any failure reason
//! follow as context.
//!
//! # Output Format
//!
//! ## Batch
//!
//! ```text
//! Processing 3 images
//! 001 shoes/red.jpg → out/shoes/red.png (33%)
//! 002 shoes/torn.jpg (67%)
//!     Failed: Failed to decode image shoes/torn.jpg: ...
//! 003 hat.webp → out/hat.png (100%)
//!
//! Processed 3 images: 2 succeeded, 1 failed
//! Failures
//!     shoes/torn.jpg: Failed to decode image shoes/torn.jpg: ...
//! ```
//!
//! ## Single image
//!
//! ```text
//! shoe.jpg → shoe.png
//! ```
//!
//! # Architecture
//!
//! Each `format_*` function returns `Vec<String>` for testability, and a
//! `print_*` wrapper writes to stdout. Format functions are pure: no I/O, no
//! side effects.

use crate::batch::{BatchEvent, BatchResult, ItemStatus};
use std::path::Path;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

fn percent(fraction: f32) -> String {
    format!("{:.0}%", fraction * 100.0)
}

/// Format a single batch progress event as display lines.
pub fn format_batch_event(event: &BatchEvent) -> Vec<String> {
    match event {
        BatchEvent::Started { total: 0 } => vec![],
        BatchEvent::Started { total } => {
            let noun = if *total == 1 { "image" } else { "images" };
            vec![format!("Processing {} {}", total, noun)]
        }
        BatchEvent::Finished {
            index,
            source,
            output,
            outcome,
            ..
        } => {
            let position = format_index(index + 1);
            let progress = percent(event.progress());
            match outcome {
                ItemStatus::Failed(reason) => vec![
                    format!("{} {} ({})", position, source.display(), progress),
                    format!("    Failed: {}", reason),
                ],
                ItemStatus::Succeeded | ItemStatus::Pending => vec![format!(
                    "{} {} → {} ({})",
                    position,
                    source.display(),
                    output.display(),
                    progress
                )],
            }
        }
    }
}

/// Format the end-of-batch summary: counts, then one line per failure.
pub fn format_summary(result: &BatchResult) -> Vec<String> {
    if result.is_empty() {
        return vec!["No supported images found, nothing to do".to_string()];
    }
    let mut lines = vec![format!(
        "Processed {} images: {} succeeded, {} failed",
        result.total,
        result.succeeded,
        result.failed()
    )];
    if !result.failures.is_empty() {
        lines.push("Failures".to_string());
        for (path, reason) in &result.failures {
            lines.push(format!("    {}: {}", path.display(), reason));
        }
    }
    lines
}

/// Format the outcome of a single-image run.
pub fn format_single(input: &Path, output: &Path) -> String {
    format!("{} → {}", input.display(), output.display())
}

pub fn print_batch_event(event: &BatchEvent) {
    for line in format_batch_event(event) {
        println!("{}", line);
    }
}

pub fn print_summary(result: &BatchResult) {
    for line in format_summary(result) {
        println!("{}", line);
    }
}
