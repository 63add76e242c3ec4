//! Batch processing of a directory tree.
//!
//! Walks `input_dir` recursively, runs the [`Pipeline`] on every supported
//! image and writes results under `output_dir`, mirroring the relative layout:
//!
//! ```text
//! input/                      output/
//! ├── shoes/                  ├── shoes/
//! │   ├── red.jpg      →      │   ├── red.png
//! │   └── blue.webp    →      │   └── blue.png
//! ├── hat.PNG          →      ├── hat.png
//! └── notes.txt               (ignored)
//! ```
//!
//! Items are processed one at a time in lexicographic order (per directory).
//! A failure on one item is recorded and the loop moves on; only a missing
//! input directory or an uncreatable output directory fails the whole batch.
//!
//! Inputs that differ only by extension (`a.jpg`, `a.png`) map to the same
//! output file. The first in traversal order is processed; each later one is
//! recorded as a failure instead of overwriting it.
//!
//! Progress is reported through an optional channel of [`BatchEvent`]s so the
//! CLI can print as items finish.

use crate::pipeline::{Pipeline, PipelineConfig};
use crate::services::{BackgroundRemover, CaptionService};
use crate::source::{ImageSource, has_supported_extension};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{info, warn};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Input directory not found: {0}")]
    InvalidInput(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemStatus {
    Pending,
    Succeeded,
    Failed(String),
}

/// One input file and where its result goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchItem {
    /// Absolute-or-as-given path of the input file.
    pub source: PathBuf,
    /// Path of the input relative to the batch input directory.
    pub relative: PathBuf,
    pub output: PathBuf,
    pub status: ItemStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResult {
    pub total: usize,
    pub succeeded: usize,
    /// `(relative input path, reason)` in processing order.
    pub failures: Vec<(PathBuf, String)>,
    pub items: Vec<BatchItem>,
}

impl BatchResult {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// True when the input tree had no supported images.
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

/// Progress reported while a batch runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchEvent {
    /// Enumeration finished; `total` items will be processed.
    Started { total: usize },
    /// Item `index` (0-based) finished, successfully or not.
    Finished {
        index: usize,
        total: usize,
        source: PathBuf,
        output: PathBuf,
        outcome: ItemStatus,
    },
}

impl BatchEvent {
    /// Fraction of the batch done after this event, in `0.0..=1.0`.
    pub fn progress(&self) -> f32 {
        match self {
            BatchEvent::Started { .. } => 0.0,
            BatchEvent::Finished { index, total, .. } => (*index + 1) as f32 / *total as f32,
        }
    }
}

/// Output path for `relative` under `output_dir`, with the format's extension.
pub fn output_path_for(relative: &Path, output_dir: &Path, config: &PipelineConfig) -> PathBuf {
    output_dir
        .join(relative)
        .with_extension(config.format.extension())
}

/// Enumerate every supported image under `input_dir`, sorted per directory.
///
/// Entries under `skip_dir` (when it lives inside the input tree) are left out
/// so that re-running into a nested output directory never picks up results.
/// Unreadable entries are logged and skipped.
pub fn discover(input_dir: &Path, skip_dir: Option<&Path>) -> Vec<PathBuf> {
    let skip = skip_dir.and_then(|dir| fs::canonicalize(dir).ok());
    WalkDir::new(input_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            let is_skipped_dir = entry.depth() > 0
                && entry.file_type().is_dir()
                && skip.is_some()
                && fs::canonicalize(entry.path()).ok() == skip;
            !is_skipped_dir
        })
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "skipping unreadable entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && has_supported_extension(entry.path()))
        .map(|entry| entry.into_path())
        .collect()
}

/// Run the pipeline over every supported image under `input_dir`.
pub fn run_batch<R: BackgroundRemover, C: CaptionService>(
    pipeline: &Pipeline<R, C>,
    input_dir: &Path,
    output_dir: &Path,
    config: &PipelineConfig,
    progress: Option<Sender<BatchEvent>>,
) -> Result<BatchResult, BatchError> {
    if !input_dir.is_dir() {
        return Err(BatchError::InvalidInput(input_dir.to_path_buf()));
    }
    fs::create_dir_all(output_dir)?;

    let mut claimed: HashMap<PathBuf, PathBuf> = HashMap::new();
    let mut items: Vec<BatchItem> = discover(input_dir, Some(output_dir))
        .into_iter()
        .map(|source| {
            let relative = source
                .strip_prefix(input_dir)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| source.clone());
            let output = output_path_for(&relative, output_dir, config);
            let status = match claimed.get(&output) {
                Some(first) => ItemStatus::Failed(format!(
                    "output path {} collides with {}",
                    output.display(),
                    first.display()
                )),
                None => {
                    claimed.insert(output.clone(), relative.clone());
                    ItemStatus::Pending
                }
            };
            BatchItem {
                source,
                relative,
                output,
                status,
            }
        })
        .collect();

    let total = items.len();
    info!(total, input = %input_dir.display(), "starting batch");
    if let Some(tx) = &progress {
        tx.send(BatchEvent::Started { total }).ok();
    }

    let mut result = BatchResult {
        total,
        ..Default::default()
    };

    for (index, item) in items.iter_mut().enumerate() {
        let outcome = match &item.status {
            ItemStatus::Failed(reason) => Err(reason.clone()),
            _ => pipeline
                .process_to_file(ImageSource::Path(&item.source), config, &item.output)
                .map_err(|e| e.to_string()),
        };
        item.status = match outcome {
            Ok(()) => {
                info!(source = %item.relative.display(), output = %item.output.display(), "processed");
                result.succeeded += 1;
                ItemStatus::Succeeded
            }
            Err(reason) => {
                warn!(source = %item.relative.display(), %reason, "item failed");
                result.failures.push((item.relative.clone(), reason.clone()));
                ItemStatus::Failed(reason)
            }
        };

        if let Some(tx) = &progress {
            tx.send(BatchEvent::Finished {
                index,
                total,
                source: item.relative.clone(),
                output: item.output.clone(),
                outcome: item.status.clone(),
            })
            .ok();
        }
    }

    result.items = items;
    Ok(result)
}
