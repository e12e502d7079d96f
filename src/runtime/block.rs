use std::rc::Rc;

use crate::interpreter::ScopeRef;
use crate::lexer::Location;
use crate::parser::ast::{Expression, Statement};

/// A first-class block: an anonymous, parameterized chunk of code closing
/// over the scope where it was written. Blocks serve two roles per
/// spec.md §4.1 — an ordinary callable (`value()`/`value(x)`/…) and a
/// pattern-match consumer, matched against by binding its parameters and
/// running its body for its result.
#[derive(Debug)]
pub struct BlockData {
    pub params: Vec<(String, Option<Rc<Expression>>)>,
    pub body: Rc<[Statement]>,
    pub captured: ScopeRef,
    pub location: Location,
}

pub type BlockRef = Rc<BlockData>;

impl BlockData {
    pub fn new(
        params: Vec<(String, Option<Rc<Expression>>)>,
        body: Rc<[Statement]>,
        captured: ScopeRef,
        location: Location,
    ) -> BlockRef {
        Rc::new(Self { params, body, captured, location })
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// The uglified name a `value(...)` request of this block's arity takes
    /// — `value` for zero parameters, `value_value_..` repeated per
    /// parameter otherwise, matching the prelude's block-calling convention
    /// (spec.md §6 "blocks respond to value, value(), value()value()…").
    pub fn call_selector(&self) -> String {
        if self.params.is_empty() {
            "value".to_owned()
        } else {
            std::iter::repeat("value").take(self.params.len()).collect::<Vec<_>>().join("_")
        }
    }
}
