//! Stylesheet compiler plugin interface.
//!
//! A compiler exposes its evaluation environment through
//! [`StyleEnvironment`]; [`MetadataBridge::register`] defines the sprite
//! variables and functions in it before a stylesheet is rendered. Functions
//! receive the call site so lookup failures point at the offending line.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::error::{Result, SpriteError};

use super::{ImageProperty, MetadataBridge, SheetProperty};

/// Virtual path the bundled mixins are included under.
pub const MIXINS_PATH: &str = "sheetsmith/sprites.styl";

/// Bundled sprite mixins and placeholder selectors.
pub const MIXINS: &str = include_str!("sprites.styl");

/// A value crossing the compiler boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum StyleValue {
    Null,
    Bool(bool),
    String(String),
    /// A length in pixels.
    Px(u32),
    List(Vec<StyleValue>),
}

impl StyleValue {
    /// Null, `false` and the empty string are falsy.
    pub fn is_falsy(&self) -> bool {
        match self {
            StyleValue::Null => true,
            StyleValue::Bool(b) => !b,
            StyleValue::String(s) => s.is_empty(),
            StyleValue::Px(_) | StyleValue::List(_) => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            StyleValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl From<&str> for StyleValue {
    fn from(s: &str) -> Self {
        StyleValue::String(s.to_string())
    }
}

impl fmt::Display for StyleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StyleValue::Null => write!(f, "null"),
            StyleValue::Bool(b) => write!(f, "{}", b),
            StyleValue::String(s) => write!(f, "{}", s),
            StyleValue::Px(n) => write!(f, "{}px", n),
            StyleValue::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                Ok(())
            }
        }
    }
}

/// Location in a stylesheet that invoked a function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    pub file: PathBuf,
    pub line: u32,
    pub column: u32,
}

impl CallSite {
    pub fn new(file: impl Into<PathBuf>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file.display(), self.line, self.column)
    }
}

/// A function callable from stylesheets.
pub type StyleFunction = Box<dyn Fn(&CallSite, &[StyleValue]) -> Result<StyleValue> + Send + Sync>;

/// The evaluation environment of a stylesheet compiler.
pub trait StyleEnvironment {
    fn define_variable(&mut self, name: &str, value: StyleValue);

    fn define_function(&mut self, name: &str, function: StyleFunction);

    /// Make stylesheet source available to the file being rendered.
    fn include_source(&mut self, path: &str, source: &str);
}

impl MetadataBridge {
    /// Define the sprite variables and functions in a compiler environment.
    pub fn register(&self, env: &mut dyn StyleEnvironment) {
        if self.include_mixins() {
            env.include_source(MIXINS_PATH, MIXINS);
        }

        let sheets = self
            .sheet_names()
            .into_iter()
            .map(StyleValue::from)
            .collect();
        env.define_variable("sprite-sheets", StyleValue::List(sheets));
        env.define_variable("default-sprite-sheet", StyleValue::from(self.default_sheet()));
        env.define_variable("extend-sprite-sheets", StyleValue::Bool(self.use_extend_directive()));

        let bridge = self.clone();
        env.define_function(
            "sprite-sheet-path",
            Box::new(move |site: &CallSite, args: &[StyleValue]| {
                let sheet = sheet_arg(args, 0).map_err(|e| e.at(site))?;
                let url = bridge.sheet_url(sheet).map_err(|e| e.at(site))?;
                Ok(StyleValue::from(url))
            }),
        );

        for (name, property) in [
            ("sprite-sheet-width", SheetProperty::Width),
            ("sprite-sheet-height", SheetProperty::Height),
        ] {
            let bridge = self.clone();
            env.define_function(
                name,
                Box::new(move |site: &CallSite, args: &[StyleValue]| {
                    let sheet = sheet_arg(args, 0).map_err(|e| e.at(site))?;
                    let value = bridge.sheet_property(property, sheet).map_err(|e| e.at(site))?;
                    Ok(StyleValue::Px(value))
                }),
            );
        }

        for (name, property) in [
            ("sprite-image-width", ImageProperty::Width),
            ("sprite-image-height", ImageProperty::Height),
            ("sprite-image-x", ImageProperty::X),
            ("sprite-image-y", ImageProperty::Y),
        ] {
            let bridge = self.clone();
            env.define_function(
                name,
                Box::new(move |site: &CallSite, args: &[StyleValue]| {
                    let image = image_arg(args, 0).map_err(|e| e.at(site))?;
                    let sheet = sheet_arg(args, 1).map_err(|e| e.at(site))?;
                    let value = bridge
                        .image_property(property, image, sheet)
                        .map_err(|e| e.at(site))?;
                    Ok(StyleValue::Px(value))
                }),
            );
        }
    }
}

/// Optional sheet argument; missing or falsy means the default sheet.
fn sheet_arg(args: &[StyleValue], index: usize) -> Result<Option<&str>> {
    match args.get(index) {
        None => Ok(None),
        Some(value) if value.is_falsy() => Ok(None),
        Some(StyleValue::String(name)) => Ok(Some(name.as_str())),
        Some(_) => Err(SpriteError::ArgumentType {
            argument: "sheet".to_string(),
            expected: "string".to_string(),
            at: None,
        }),
    }
}

fn image_arg(args: &[StyleValue], index: usize) -> Result<&str> {
    match args.get(index) {
        Some(StyleValue::String(name)) if !name.is_empty() => Ok(name.as_str()),
        _ => Err(SpriteError::ArgumentType {
            argument: "image".to_string(),
            expected: "string".to_string(),
            at: None,
        }),
    }
}

/// An in-memory environment that records definitions and evaluates them.
#[derive(Default)]
pub struct FunctionTable {
    variables: BTreeMap<String, StyleValue>,
    functions: BTreeMap<String, StyleFunction>,
    sources: Vec<(String, String)>,
}

impl FunctionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn variable(&self, name: &str) -> Option<&StyleValue> {
        self.variables.get(name)
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Call a registered function.
    pub fn call(&self, name: &str, site: &CallSite, args: &[StyleValue]) -> Result<StyleValue> {
        let function = self.functions.get(name).ok_or_else(|| SpriteError::Config {
            message: format!("unknown function \"{}\"", name),
            help: Some(format!("Available functions: {}", self.function_names().join(", "))),
        })?;
        function(site, args)
    }

    /// Look a name up as a variable first, then call it as a function.
    pub fn evaluate(&self, name: &str, site: &CallSite, args: &[StyleValue]) -> Result<StyleValue> {
        match self.variables.get(name) {
            Some(value) if args.is_empty() => Ok(value.clone()),
            _ => self.call(name, site, args),
        }
    }

    pub fn function_names(&self) -> Vec<&str> {
        self.functions.keys().map(|s| s.as_str()).collect()
    }

    pub fn variable_names(&self) -> Vec<&str> {
        self.variables.keys().map(|s| s.as_str()).collect()
    }

    /// Included sources as `(path, source)` pairs.
    pub fn sources(&self) -> &[(String, String)] {
        &self.sources
    }
}

impl fmt::Debug for FunctionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionTable")
            .field("variables", &self.variables)
            .field("functions", &self.function_names())
            .field("sources", &self.sources.iter().map(|(p, _)| p).collect::<Vec<_>>())
            .finish()
    }
}

impl StyleEnvironment for FunctionTable {
    fn define_variable(&mut self, name: &str, value: StyleValue) {
        self.variables.insert(name.to_string(), value);
    }

    fn define_function(&mut self, name: &str, function: StyleFunction) {
        self.functions.insert(name.to_string(), function);
    }

    fn include_source(&mut self, path: &str, source: &str) {
        self.sources.push((path.to_string(), source.to_string()));
    }
}
