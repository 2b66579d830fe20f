//! Sheet pattern registry.
//!
//! Maps each sheet name to the regular expression that selects its source
//! images. Patterns are tested against paths relative to the walk root,
//! written with `/` separators.

use regex::Regex;

use crate::error::{Result, SpriteError};

/// Pattern used when no sheets are configured.
pub const DEFAULT_PATTERN: &str = r"^app/assets/images/sprites/(.*)\.png$";

/// Name of the sheet created when no sheets are configured.
pub const DEFAULT_SHEET: &str = "default";

/// A named rule selecting the images of one sprite sheet.
#[derive(Debug, Clone)]
pub struct SheetRule {
    name: String,
    pattern: Regex,
}

impl SheetRule {
    /// Compile a rule from a sheet name and a regular expression.
    pub fn new(name: impl Into<String>, pattern: &str) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(SpriteError::config("sheet names must not be empty"));
        }

        // The name becomes part of the sheet's file name and URL.
        if name == "." || name == ".." || name.contains(['/', '\\', '\0']) {
            return Err(SpriteError::Config {
                message: format!("sheet name \"{}\" is not a valid file name", name),
                help: Some("Sheet names must not contain path separators or be \".\" or \"..\"".to_string()),
            });
        }

        let pattern = Regex::new(pattern).map_err(|e| SpriteError::Config {
            message: format!("invalid pattern for sheet \"{}\": {}", name, e),
            help: Some("Sheet patterns are regular expressions matched against paths relative to the project root".to_string()),
        })?;

        Ok(Self { name, pattern })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// Test a root-relative, `/`-separated path against this rule.
    pub fn matches(&self, relative_path: &str) -> bool {
        self.pattern.is_match(relative_path)
    }
}

/// The configured set of sheet rules.
///
/// Names are unique; rules are evaluated independently so a file may land
/// in several sheets.
#[derive(Debug, Clone)]
pub struct SheetRegistry {
    rules: Vec<SheetRule>,
}

impl SheetRegistry {
    /// Build a registry, rejecting duplicate sheet names.
    pub fn new(rules: Vec<SheetRule>) -> Result<Self> {
        for (i, rule) in rules.iter().enumerate() {
            if rules[..i].iter().any(|r| r.name == rule.name) {
                return Err(SpriteError::config(format!(
                    "sheet \"{}\" is defined more than once",
                    rule.name
                )));
            }
        }
        Ok(Self { rules })
    }

    /// Compile a registry from `(name, pattern)` pairs.
    pub fn from_patterns<'a>(
        patterns: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self> {
        let rules = patterns
            .into_iter()
            .map(|(name, pattern)| SheetRule::new(name, pattern))
            .collect::<Result<Vec<_>>>()?;
        Self::new(rules)
    }

    pub fn rules(&self) -> &[SheetRule] {
        &self.rules
    }

    pub fn get(&self, name: &str) -> Option<&SheetRule> {
        self.rules.iter().find(|r| r.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules whose pattern matches the given relative path.
    pub fn matching<'a>(&'a self, relative_path: &'a str) -> impl Iterator<Item = &'a SheetRule> {
        self.rules.iter().filter(move |r| r.matches(relative_path))
    }
}

impl Default for SheetRegistry {
    fn default() -> Self {
        let rule = SheetRule {
            name: DEFAULT_SHEET.to_string(),
            pattern: Regex::new(DEFAULT_PATTERN).expect("default sprite pattern compiles"),
        };
        Self { rules: vec![rule] }
    }
}
