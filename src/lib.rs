//! Core of an interpreter for a small object-oriented, message-passing
//! language: multi-part method names, first-class blocks, structural types,
//! single inheritance with dynamic dispatch, and user-supplied dialects.
//!
//! This crate intentionally stops at the core: filesystem module probing,
//! the command-line entry point's argument handling, and building a
//! fully-featured standard library all live outside of it (see
//! [`loader`] for the narrow seam the core expects from its host).

pub mod error;
pub mod interpreter;
pub mod lexer;
pub mod loader;
pub mod module;
pub mod parser;
pub mod prelude;
pub mod runtime;

pub use error::Error;
