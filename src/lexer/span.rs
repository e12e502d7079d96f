use std::fmt::{self, Display};

/// A single point within source text, one-indexed in both axes.
///
/// Locations are attached to every token and every AST node for error
/// reporting only; they are never compared for identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, PartialOrd, Ord, Hash)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    pub fn start() -> Self {
        Self::new(1, 1)
    }
}

impl Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A half-open column range on a single line, used to underline the
/// offending text in rendered diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub location: Location,
    pub width: usize,
}

impl Span {
    pub fn new(location: Location, width: usize) -> Self {
        Self { location, width }
    }

    pub fn point(location: Location) -> Self {
        Self::new(location, 1)
    }
}
