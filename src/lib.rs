//! sheetsmith - Sprite sheet generation for stylesheet pipelines
//!
//! Discovers sprite images under a project root, packs them into one sheet
//! per configured rule, and exposes the resulting coordinates to a
//! stylesheet compiler. A [`Coordinator`] makes sure the expensive
//! generation pass runs once, however many stylesheets ask for it.

pub mod bridge;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod discovery;
pub mod error;
pub mod output;
pub mod pack;
pub mod sheet;

pub use bridge::{
    CallSite, FunctionTable, ImageProperty, MetadataBridge, SheetProperty, StyleEnvironment,
    StyleFunction, StyleValue,
};
pub use config::{Algorithm, Manifest, OutputFormat, PackOptions, SheetRegistry, SheetRule, SpriteConfig};
pub use coordinator::{Coordinator, GenerationState, GenerationStats, Outcome};
pub use discovery::{discover, discover_project, DiscoveredSet, Pruning};
pub use error::{Result, SpriteError};
pub use pack::{layout, Coordinate, ImageEngine, Layout, PackOutput, PackRequest, PackingEngine};
pub use sheet::{build_sheet, ResultsTable, SheetProperties, SheetResult};
