use std::error::Error;
use std::fmt::{self, Display};

use colored::Colorize;

use crate::lexer::{LexError, Location};

/// A syntax error with a source location, rendered the same way
/// [`crate::lexer::LexError`] is: a two-line source excerpt with a caret
/// under the offending column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    pub location: Location,
    source: String,
}

pub type ParseResult<T> = Result<T, ParseError>;

impl ParseError {
    pub fn new(message: impl Into<String>, location: Location, source: &str) -> Self {
        Self { message: message.into(), location, source: source.to_owned() }
    }

    pub fn from_lex(error: LexError, source: &str) -> Self {
        Self::new(error.message, error.location, source)
    }
}

impl Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Location { line, column } = self.location;
        let lines: Vec<&str> = self.source.lines().collect();
        let prev_line = if line > 1 { lines.get(line - 2).copied().unwrap_or("") } else { "" };
        let this_line = lines.get(line.saturating_sub(1)).copied().unwrap_or("");

        let margin = format!("{line}").len();
        let fill = " ".repeat(margin);
        let pad = " ".repeat(column.saturating_sub(1));
        let caret = "^".to_string().red();

        write!(
            f,
            "{fill} |{prev_line}\n{line} |{this_line}\n{fill} |{pad}{caret} {}",
            self.message
        )
    }
}

impl Error for ParseError {}
