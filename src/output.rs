//! Status lines for the sheetsmith CLI.
//!
//! Every line is a right-aligned verb followed by a message, written to
//! stderr. Stdout is left to `--json`, `lookup` answers and completions so
//! it can be piped.

use std::io::{self, IsTerminal, Write};
use std::path::Path;

/// Column the verbs are right-aligned to.
const VERB_COLUMN: usize = 12;

const RESET: &str = "\x1b[0m";

/// What a status line reports, which decides the colour of its verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tone {
    Progress,
    Note,
    Warning,
    Failure,
}

impl Tone {
    fn ansi(self) -> &'static str {
        match self {
            Tone::Progress => "\x1b[1;32m",
            Tone::Note => "\x1b[1;36m",
            Tone::Warning => "\x1b[1;33m",
            Tone::Failure => "\x1b[1;31m",
        }
    }
}

/// Writes status lines, coloured only when stderr is a terminal.
pub struct Printer {
    color: bool,
}

impl Printer {
    pub fn new() -> Self {
        Self {
            color: io::stderr().is_terminal(),
        }
    }

    /// A step of the pass, e.g. `Discovering app` or `Packed icons (16x32)`.
    pub fn status(&self, verb: &str, message: &str) {
        self.emit(Tone::Progress, verb, message);
    }

    /// The closing line of a command.
    pub fn success(&self, verb: &str, message: &str) {
        self.emit(Tone::Progress, verb, message);
    }

    pub fn info(&self, verb: &str, message: &str) {
        self.emit(Tone::Note, verb, message);
    }

    pub fn warning(&self, verb: &str, message: &str) {
        self.emit(Tone::Warning, verb, message);
    }

    /// A failure the command survives, such as a rebuild in watch mode.
    pub fn error(&self, verb: &str, message: &str) {
        self.emit(Tone::Failure, verb, message);
    }

    pub fn dim(&self, text: &str) -> String {
        self.paint("\x1b[2m", text)
    }

    pub fn bold(&self, text: &str) -> String {
        self.paint("\x1b[1m", text)
    }

    /// Used for output paths.
    pub fn cyan(&self, text: &str) -> String {
        self.paint("\x1b[36m", text)
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.color {
            format!("{code}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn line(&self, tone: Tone, verb: &str, message: &str) -> String {
        let verb = format!("{verb:>VERB_COLUMN$}");
        format!("{} {message}", self.paint(tone.ansi(), &verb))
    }

    fn emit(&self, tone: Tone, verb: &str, message: &str) {
        // Nothing useful can be done when stderr is gone.
        let _ = writeln!(io::stderr().lock(), "{}", self.line(tone, verb, message));
    }
}

impl Default for Printer {
    fn default() -> Self {
        Self::new()
    }
}

/// `plural(1, "sheet", "sheets")` is "1 sheet"; any other count takes the
/// plural form.
pub fn plural(n: usize, singular: &str, pluralized: &str) -> String {
    let noun = if n == 1 { singular } else { pluralized };
    format!("{n} {noun}")
}

/// A path relative to the working directory when it lies below it.
pub fn display_path(path: &Path) -> String {
    match std::env::current_dir() {
        Ok(cwd) => relative_to(&cwd, path),
        Err(_) => path.display().to_string(),
    }
}

fn relative_to(base: &Path, path: &Path) -> String {
    match path.strip_prefix(base) {
        Ok(rest) if rest.as_os_str().is_empty() => ".".to_string(),
        Ok(rest) => rest.display().to_string(),
        Err(_) => path.display().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain() -> Printer {
        Printer { color: false }
    }

    #[test]
    fn test_plural_forms() {
        assert_eq!(plural(1, "sheet", "sheets"), "1 sheet");
        assert_eq!(plural(0, "image", "images"), "0 images");
        assert_eq!(plural(5, "sprite sheet", "sprite sheets"), "5 sprite sheets");
    }

    #[test]
    fn test_verbs_are_right_aligned() {
        let printer = plain();
        assert_eq!(
            printer.line(Tone::Progress, "Packed", "icons (16x32)"),
            "      Packed icons (16x32)"
        );
        assert_eq!(
            printer.line(Tone::Note, "Discovering", "app"),
            " Discovering app"
        );
    }

    #[test]
    fn test_colour_wraps_only_the_verb() {
        let printer = Printer { color: true };
        let line = printer.line(Tone::Warning, "Empty", "icons");
        assert!(line.starts_with("\x1b[1;33m"));
        assert!(line.ends_with(&format!("{RESET} icons")));
        assert_eq!(printer.bold("ui"), "\x1b[1mui\x1b[0m");
    }

    #[test]
    fn test_plain_formatting_without_colour() {
        let printer = plain();
        assert_eq!(printer.bold("icons"), "icons");
        assert_eq!(printer.dim("(1 image)"), "(1 image)");
        assert_eq!(printer.cyan("public/a.png"), "public/a.png");
    }

    #[test]
    fn test_relative_paths() {
        let base = Path::new("/project");
        assert_eq!(relative_to(base, Path::new("/project")), ".");
        assert_eq!(relative_to(base, Path::new("/project/public/a.png")), "public/a.png");
        assert_eq!(relative_to(base, Path::new("/elsewhere/a.png")), "/elsewhere/a.png");
    }

    #[test]
    fn test_display_path_below_cwd() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(display_path(&cwd.join("public/a.png")), "public/a.png");
    }
}
