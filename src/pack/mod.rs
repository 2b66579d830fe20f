//! Packing engine interface.
//!
//! The sheet builder hands every sheet's images to a [`PackingEngine`] and
//! gets back one encoded atlas plus the rectangle of each source image,
//! keyed by its full path. [`ImageEngine`] is the built-in engine; callers
//! may plug in their own.

mod engine;
mod layout;

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::PackOptions;
use crate::error::Result;

pub use engine::ImageEngine;
pub use layout::{layout, Layout};

/// Position and size of one source image within its sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coordinate {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Work handed to a packing engine for one sheet.
#[derive(Debug, Clone)]
pub struct PackRequest {
    /// Sheet being packed, for error reporting.
    pub sheet: String,
    /// Source images, in discovery order.
    pub images: Vec<PathBuf>,
    pub options: PackOptions,
}

/// A packed sheet as returned by an engine.
#[derive(Debug, Clone)]
pub struct PackOutput {
    /// Encoded sheet image, in the requested format.
    pub image: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Rectangles keyed by full source path.
    pub coordinates: BTreeMap<PathBuf, Coordinate>,
}

/// Packs images into a single atlas.
///
/// Engines run on the blocking thread pool; the builder enforces the
/// request's `timeout_ms` around the call.
pub trait PackingEngine: Send + Sync {
    fn pack(&self, request: &PackRequest) -> Result<PackOutput>;
}
