//! Output module for mapping, writing and reporting the static tree
//!
//! This module handles:
//! - Mapping logical routes onto file paths and detecting collisions
//! - Producing the SPA fallback document
//! - Writing files and copying pre-built assets
//! - Accumulating the build manifest and deciding success
//! - Console and markdown build reports

mod fallback;
mod manifest;
mod mapper;
mod markdown;
mod report;
mod writer;

pub use fallback::{build_fallback, load_shell_template, FallbackError, DEFAULT_SHELL};
pub use manifest::{
    finalize, BuildError, BuildManifest, BuildOutcome, BuildWarning, RedirectRecord, RouteReport,
    WrittenFile,
};
pub use mapper::{
    check_collisions, CollisionError, CollisionKind, OutputMapper, OutputRegistry,
};
pub use markdown::{format_markdown_report, write_markdown_report};
pub use report::{format_outcome, print_outcome};
pub use writer::{collect_assets, prepare_output_dir, write_entry};

use crate::route::RoutePath;
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;

/// Who produced an output file
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OutputOwner {
    /// A prerendered route
    Route(RoutePath),

    /// The SPA fallback document
    Fallback,

    /// A file copied from the assets directory (relative path)
    Asset(String),
}

impl fmt::Display for OutputOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputOwner::Route(route) => write!(f, "route {}", route),
            OutputOwner::Fallback => write!(f, "fallback"),
            OutputOwner::Asset(path) => write!(f, "asset {}", path),
        }
    }
}

/// One destination file and its payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputEntry {
    /// Who produced the file
    pub owner: OutputOwner,

    /// Destination relative to the output directory, '/'-separated
    pub path: String,

    /// File content
    pub bytes: Vec<u8>,

    /// Hex SHA-256 of `bytes`
    pub digest: String,
}

impl OutputEntry {
    pub fn new(owner: OutputOwner, path: impl Into<String>, bytes: Vec<u8>) -> Self {
        let digest = content_digest(&bytes);
        Self {
            owner,
            path: path.into(),
            bytes,
            digest,
        }
    }
}

/// Hex SHA-256 of a payload
pub fn content_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Errors raised while producing the output tree
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Collision(#[from] CollisionError),

    #[error("Failed to write {path}: {reason}")]
    Write { path: String, reason: String },

    #[error("Failed to read assets: {0}")]
    Assets(String),

    #[error("Unsafe output path: {0}")]
    UnsafePath(String),
}
