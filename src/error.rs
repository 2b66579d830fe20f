use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use crate::bridge::CallSite;

/// Main error type for sheetsmith operations.
///
/// Errors are `Clone` so a single failed generation pass can be handed to
/// every request that was queued behind it.
#[derive(Error, Diagnostic, Debug, Clone, PartialEq)]
pub enum SpriteError {
    #[error("Discovery failed in {root}: {message}")]
    #[diagnostic(code(sheetsmith::discovery))]
    Discovery { root: PathBuf, message: String },

    #[error("Failed to pack sprite sheet \"{sheet}\": {message}")]
    #[diagnostic(code(sheetsmith::packing))]
    Packing { sheet: String, message: String },

    #[error("Failed to write sprite sheet {path}: {message}")]
    #[diagnostic(code(sheetsmith::persistence))]
    Persistence { path: PathBuf, message: String },

    #[error("Sprite sheet \"{sheet}\" contains two images named \"{image}\" ({first} and {second})")]
    #[diagnostic(
        code(sheetsmith::duplicate_image),
        help("Image names must be unique within a sheet; rename one of the files")
    )]
    DuplicateImage {
        sheet: String,
        image: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("{}Could not find sprite sheet \"{sheet}\"", location(.at))]
    #[diagnostic(code(sheetsmith::unknown_sheet))]
    UnknownSheet { sheet: String, at: Option<CallSite> },

    #[error("{}Could not find image \"{image}\" in sprite sheet \"{sheet}\"", location(.at))]
    #[diagnostic(code(sheetsmith::unknown_image))]
    UnknownImage {
        image: String,
        sheet: String,
        at: Option<CallSite>,
    },

    #[error("{}Expected {argument} to be a {expected}", location(.at))]
    #[diagnostic(code(sheetsmith::argument))]
    ArgumentType {
        argument: String,
        expected: String,
        at: Option<CallSite>,
    },

    #[error("Configuration error: {message}")]
    #[diagnostic(code(sheetsmith::config))]
    Config {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("IO error with {path}: {message}")]
    #[diagnostic(code(sheetsmith::io))]
    Io { path: PathBuf, message: String },

    #[error("Sprite generation was interrupted: {message}")]
    #[diagnostic(code(sheetsmith::interrupted))]
    Interrupted { message: String },
}

impl SpriteError {
    /// Shorthand for a configuration error without help text.
    pub fn config(message: impl Into<String>) -> Self {
        SpriteError::Config {
            message: message.into(),
            help: None,
        }
    }

    /// Attach a stylesheet call site to a lookup error that lacks one.
    pub fn at(self, site: &CallSite) -> Self {
        match self {
            SpriteError::UnknownSheet { sheet, at: None } => SpriteError::UnknownSheet {
                sheet,
                at: Some(site.clone()),
            },
            SpriteError::UnknownImage {
                image,
                sheet,
                at: None,
            } => SpriteError::UnknownImage {
                image,
                sheet,
                at: Some(site.clone()),
            },
            SpriteError::ArgumentType {
                argument,
                expected,
                at: None,
            } => SpriteError::ArgumentType {
                argument,
                expected,
                at: Some(site.clone()),
            },
            other => other,
        }
    }

    /// Whether this error was raised by a lookup during stylesheet rendering.
    pub fn is_lookup(&self) -> bool {
        matches!(
            self,
            SpriteError::UnknownSheet { .. }
                | SpriteError::UnknownImage { .. }
                | SpriteError::ArgumentType { .. }
        )
    }
}

fn location(at: &Option<CallSite>) -> String {
    match at {
        Some(site) => format!("{}: ", site),
        None => String::new(),
    }
}

pub type Result<T> = std::result::Result<T, SpriteError>;
