//! Artifact storage for rendered posters, GIFs and artwork.
//!
//! This crate provides:
//! - File upload to an S3-compatible bucket (Cloudflare R2)
//! - Public URL resolution for uploaded artifacts

pub mod client;
pub mod error;

pub use client::{R2Client, R2Config};
pub use error::{StorageError, StorageResult};
