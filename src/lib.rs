//! # prodshot
//!
//! Turns raw product photos into publish-ready assets. One image or a whole
//! directory tree goes through the same fixed sequence of stages, each switched
//! on or off per run:
//!
//! ```text
//! load → [remove background] → [flatten for opaque formats]
//!      → [AI caption overlay] → [resize] → [enhance] → encode
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`source`] | Decodes a file path or in-memory bytes into a raster |
//! | [`format`] | Output formats: alpha support, extensions, label parsing |
//! | [`imaging`] | Pure raster stages: flatten, resize, enhance, caption layout and drawing, encoding |
//! | [`services`] | External services behind traits: background removal (rembg) and caption text (Gemini) |
//! | [`pipeline`] | Runs the stages for one image, caption overlay best-effort |
//! | [`batch`] | Walks a directory tree, mirrors it into an output tree, isolates per-file failures |
//! | [`config`] | `prodshot.toml` loading, validation, and the default caption credential |
//! | [`output`] | CLI rendering of batch progress and summaries |
//!
//! # Design Decisions
//!
//! ## Stages Are Value Transformations
//!
//! Every stage takes a `&DynamicImage` and returns a new one. The pipeline
//! owns exactly one current raster, which makes "keep the last good raster"
//! for the caption stage a matter of not reassigning on error.
//!
//! ## Services Behind Traits
//!
//! [`services::BackgroundRemover`] and [`services::CaptionService`] are the
//! only seams that touch the network. [`pipeline::Pipeline`] is generic over
//! both, so the full pipeline (and batch runs) are tested against mocks with no
//! network access.
//!
//! ## Best-Effort Captions
//!
//! Captions are decoration. A missing credential, an HTTP failure, or a reply
//! that sanitizes to nothing is logged as a warning and the image is produced
//! without text. Background removal, on the other hand, changes what the image
//! *is*, so its failure fails the image.
//!
//! ## Explicit Credentials
//!
//! The caption API key is resolved once at startup (config file, then the
//! `GEMINI_API_KEY` environment variable) and passed to the pipeline as a
//! value. A per-run key overrides it. Nothing reads the environment mid-run.
//!
//! ## Deterministic Batches
//!
//! Directory traversal is sorted by file name, so the processing order, the
//! progress output, and the failure list are the same on every filesystem.

pub mod batch;
pub mod config;
pub mod format;
pub mod imaging;
pub mod output;
pub mod pipeline;
pub mod services;
pub mod source;

#[cfg(test)]
pub(crate) mod test_helpers;
