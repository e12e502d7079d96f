use std::fmt::{self, Display};

use super::span::Location;

/// A lexical token. Every variant carries the [`Location`] of its first
/// character; numbers and strings additionally carry their raw lexical form
/// so that the parser (not the lexer) decides how to interpret them.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Identifier {
        value: String,
        location: Location,
    },
    Keyword {
        value: String,
        location: Location,
    },
    /// A run of operator characters. `spaced` records whether whitespace
    /// preceded the token, which the parser uses to distinguish `a<b` (a
    /// binary operator) from `a < b` (the opener of a generic argument list).
    Symbol {
        value: String,
        spaced: bool,
        location: Location,
    },
    /// Structural punctuation: parens, braces, comma, dot, semicolon.
    Punctuation {
        value: String,
        spaced: bool,
        location: Location,
    },
    NumberLiteral {
        value: String,
        location: Location,
    },
    StringLiteral {
        value: String,
        interpolation: bool,
        location: Location,
    },
    /// A run of one or more newlines collapsed to a single token; `indent`
    /// is the count of leading spaces on the next non-blank line.
    Newline {
        indent: usize,
        location: Location,
    },
    EndOfInput {
        location: Location,
    },
}

impl Token {
    pub fn location(&self) -> Location {
        match self {
            Token::Identifier { location, .. }
            | Token::Keyword { location, .. }
            | Token::Symbol { location, .. }
            | Token::Punctuation { location, .. }
            | Token::NumberLiteral { location, .. }
            | Token::StringLiteral { location, .. }
            | Token::Newline { location, .. }
            | Token::EndOfInput { location } => *location,
        }
    }

    /// A human-readable name used to build `unexpected token` diagnostics.
    pub fn printable_name(&self) -> String {
        match self {
            Token::Identifier { value, .. } => format!("identifier '{value}'"),
            Token::Keyword { value, .. } => format!("keyword '{value}'"),
            Token::Symbol { value, .. } => format!("operator '{value}'"),
            Token::Punctuation { value, .. } => format!("'{value}'"),
            Token::NumberLiteral { value, .. } => format!("number '{value}'"),
            Token::StringLiteral { value, .. } => format!("string \"{value}\""),
            Token::Newline { .. } => "newline".to_owned(),
            Token::EndOfInput { .. } => "end of input".to_owned(),
        }
    }

    pub fn is_punctuation(&self, value: &str) -> bool {
        matches!(self, Token::Punctuation { value: v, .. } if v == value)
    }

    pub fn is_symbol(&self, value: &str) -> bool {
        matches!(self, Token::Symbol { value: v, .. } if v == value)
    }

    pub fn is_keyword(&self, value: &str) -> bool {
        matches!(self, Token::Keyword { value: v, .. } if v == value)
    }

    pub fn is_end_of_input(&self) -> bool {
        matches!(self, Token::EndOfInput { .. })
    }

    pub fn as_identifier(&self) -> Option<&str> {
        match self {
            Token::Identifier { value, .. } => Some(value),
            _ => None,
        }
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.printable_name())
    }
}
