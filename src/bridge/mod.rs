//! Read-only lookups over a completed results table.
//!
//! The bridge is what a stylesheet compiler sees of the sprite pipeline:
//! sheet URLs and sizes, image rectangles, and a few configuration echoes.
//! Lookups never guess; an unknown sheet or image is an error.

mod env;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::config::SpriteConfig;
use crate::error::{Result, SpriteError};
use crate::sheet::{basename, ResultsTable, SheetResult};

pub use env::{CallSite, FunctionTable, StyleEnvironment, StyleFunction, StyleValue, MIXINS, MIXINS_PATH};

/// A sheet-level numeric property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetProperty {
    Width,
    Height,
}

/// An image-level numeric property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageProperty {
    X,
    Y,
    Width,
    Height,
}

impl FromStr for SheetProperty {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "width" => Ok(SheetProperty::Width),
            "height" => Ok(SheetProperty::Height),
            _ => Err(format!("Unknown sheet property '{}' (expected width or height)", s)),
        }
    }
}

impl FromStr for ImageProperty {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "x" => Ok(ImageProperty::X),
            "y" => Ok(ImageProperty::Y),
            "width" => Ok(ImageProperty::Width),
            "height" => Ok(ImageProperty::Height),
            _ => Err(format!(
                "Unknown image property '{}' (expected x, y, width or height)",
                s
            )),
        }
    }
}

impl fmt::Display for SheetProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetProperty::Width => write!(f, "width"),
            SheetProperty::Height => write!(f, "height"),
        }
    }
}

impl fmt::Display for ImageProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageProperty::X => write!(f, "x"),
            ImageProperty::Y => write!(f, "y"),
            ImageProperty::Width => write!(f, "width"),
            ImageProperty::Height => write!(f, "height"),
        }
    }
}

/// Query API over the results of a completed generation pass.
#[derive(Debug, Clone)]
pub struct MetadataBridge {
    results: Arc<ResultsTable>,
    default_sheet: String,
    include_mixins: bool,
    use_extend_directive: bool,
}

impl MetadataBridge {
    pub fn new(results: Arc<ResultsTable>, config: &SpriteConfig) -> Self {
        Self {
            results,
            default_sheet: config.default_sheet.clone(),
            include_mixins: config.include_mixins,
            use_extend_directive: config.use_extend_directive,
        }
    }

    /// URL of a sheet image.
    pub fn sheet_url(&self, sheet: Option<&str>) -> Result<&str> {
        Ok(&self.sheet(sheet)?.url)
    }

    pub fn sheet_property(&self, property: SheetProperty, sheet: Option<&str>) -> Result<u32> {
        let result = self.sheet(sheet)?;
        Ok(match property {
            SheetProperty::Width => result.properties.width,
            SheetProperty::Height => result.properties.height,
        })
    }

    /// Rectangle property of an image; `image` is reduced to its file name.
    pub fn image_property(&self, property: ImageProperty, image: &str, sheet: Option<&str>) -> Result<u32> {
        let result = self.sheet(sheet)?;
        let key = basename(std::path::Path::new(image)).unwrap_or_else(|| image.to_string());
        let coordinate = result.image(&key).ok_or_else(|| SpriteError::UnknownImage {
            image: key.clone(),
            sheet: result.name.clone(),
            at: None,
        })?;

        Ok(match property {
            ImageProperty::X => coordinate.x,
            ImageProperty::Y => coordinate.y,
            ImageProperty::Width => coordinate.width,
            ImageProperty::Height => coordinate.height,
        })
    }

    /// Resolve a sheet by name; `None` or an empty name means the default sheet.
    pub fn sheet(&self, sheet: Option<&str>) -> Result<&SheetResult> {
        let name = self.resolve(sheet);
        self.results.get(name).ok_or_else(|| SpriteError::UnknownSheet {
            sheet: name.to_string(),
            at: None,
        })
    }

    fn resolve<'a>(&'a self, sheet: Option<&'a str>) -> &'a str {
        match sheet {
            Some(name) if !name.is_empty() => name,
            _ => &self.default_sheet,
        }
    }

    /// Names of every built sheet.
    pub fn sheet_names(&self) -> Vec<&str> {
        self.results.names().collect()
    }

    pub fn default_sheet(&self) -> &str {
        &self.default_sheet
    }

    /// Whether sprites reference their sheet with `@extend`.
    pub fn use_extend_directive(&self) -> bool {
        self.use_extend_directive
    }

    pub fn include_mixins(&self) -> bool {
        self.include_mixins
    }

    pub fn results(&self) -> &Arc<ResultsTable> {
        &self.results
    }
}
