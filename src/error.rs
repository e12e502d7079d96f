//! The top-level error type a host sees from [`crate::module::ModuleTable`]
//! and the other public entry points — a thin union over the three layers
//! that can fail (lexing, parsing, evaluating), so a CLI or embedder can
//! match on one type instead of three.

use std::fmt::{self, Display};

use crate::lexer::LexError;
use crate::parser::ParseError;
use crate::runtime::ExceptionPacket;

#[derive(Debug, Clone)]
pub enum Error {
    Lex(LexError),
    Parse(ParseError),
    Exception(ExceptionPacket),
}

impl From<LexError> for Error {
    fn from(e: LexError) -> Self {
        Error::Lex(e)
    }
}

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Self {
        Error::Parse(e)
    }
}

impl From<ExceptionPacket> for Error {
    fn from(e: ExceptionPacket) -> Self {
        Error::Exception(e)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Lex(e) => Display::fmt(e, f),
            Error::Parse(e) => Display::fmt(e, f),
            Error::Exception(e) => Display::fmt(e, f),
        }
    }
}

impl std::error::Error for Error {}
