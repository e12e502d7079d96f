use std::rc::Rc;

use crate::interpreter::{ScopeRef, Unwind};
use crate::lexer::Location;
use crate::parser::ast::{Expression, Statement};

use super::value::Value;

/// One formal parameter of a signature part. `pattern` is the optional
/// assertion expression written after the parameter name (a `Type`, a
/// `Block`, or any expression producing a pattern-like value) — stored
/// unevaluated, since it may reference names only resolvable in the
/// defining scope at call time (spec.md §4.2 "parameter patterns").
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: String,
    pub pattern: Option<Rc<Expression>>,
}

impl ParamSpec {
    pub fn new(name: impl Into<String>, pattern: Option<Rc<Expression>>) -> Self {
        Self { name: name.into(), pattern }
    }
}

/// How many parameters this signature binds in total, and whether any part
/// contributed no parameter list at all (a bare getter name) — used to
/// reject a signature that mixes getter-shaped and call-shaped parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamArity {
    pub total: usize,
}

/// The name-and-arity half of a signature, independent of its parameter
/// patterns — what `override` compatibility and the structural `Type`
/// machinery both compare against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartShape {
    pub uglified: String,
    pub arity: ParamArity,
}

#[derive(Clone)]
pub enum MethodBody {
    User {
        body: Rc<[Statement]>,
    },
    /// A host-provided implementation, used by the prelude's primitive
    /// operators and I/O surface. Receives the receiver and bound arguments
    /// already evaluated, plus the running interpreter for any further
    /// requests it needs to send (e.g. a block's `value()`).
    Native(NativeFn),
}

impl std::fmt::Debug for MethodBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MethodBody::User { .. } => f.write_str("MethodBody::User(..)"),
            MethodBody::Native(_) => f.write_str("MethodBody::Native(..)"),
        }
    }
}

pub type NativeFn =
    Rc<dyn Fn(&Value, &[Value], &mut crate::interpreter::Interpreter) -> Result<Value, Unwind>>;

/// A single, possibly multi-part, method definition installed on an object's
/// dispatch table.
#[derive(Debug, Clone)]
pub struct Method {
    pub uglified_name: String,
    pub pretty_name: String,
    pub params: Vec<ParamSpec>,
    pub body: MethodBody,
    /// The lexical scope the method closes over — `None` for natives. Used
    /// to resolve `outer` and any free identifiers the body references that
    /// are not parameters or slots of the receiver.
    pub closure: Option<ScopeRef>,
    pub location: Location,
    /// `true` for a method declared with a leading `_` part or explicitly
    /// marked confidential — callable only via an unqualified request from
    /// within the same object, never via a qualified request from outside
    /// (spec.md §4.1 "confidential methods").
    pub confidential: bool,
    /// The `-> pattern` written after a signature's parameter lists, if any.
    /// Asserted against the method's result right before it returns to the
    /// caller, the same way a parameter pattern is asserted against its
    /// argument (spec.md §4.4 "part joining").
    pub return_pattern: Option<Rc<Expression>>,
    /// True for the getter/setter pair a `var` declaration installs for
    /// itself — these stand in for a field, not a method body, and cannot be
    /// overridden by an ordinary `method` declaration (spec.md §4.4 "Method
    /// installation and override": "cannot override ... an `isVariable`
    /// entry").
    pub is_accessor: bool,
}

impl Method {
    pub fn shape(&self) -> PartShape {
        PartShape {
            uglified: self.uglified_name.clone(),
            arity: ParamArity { total: self.params.len() },
        }
    }

    pub fn native(
        uglified_name: impl Into<String>,
        pretty_name: impl Into<String>,
        arity: usize,
        location: Location,
        f: impl Fn(&Value, &[Value], &mut crate::interpreter::Interpreter) -> Result<Value, Unwind>
            + 'static,
    ) -> Rc<Self> {
        Rc::new(Self {
            uglified_name: uglified_name.into(),
            pretty_name: pretty_name.into(),
            params: (0..arity).map(|i| ParamSpec::new(format!("_{i}"), None)).collect(),
            body: MethodBody::Native(Rc::new(f)),
            closure: None,
            location,
            confidential: false,
            return_pattern: None,
            is_accessor: false,
        })
    }

    /// Like [`Method::native`], but marks the result as a `var`/`def` field
    /// accessor rather than an ordinary method (see [`Method::is_accessor`]).
    pub fn native_accessor(
        uglified_name: impl Into<String>,
        pretty_name: impl Into<String>,
        arity: usize,
        location: Location,
        f: impl Fn(&Value, &[Value], &mut crate::interpreter::Interpreter) -> Result<Value, Unwind>
            + 'static,
    ) -> Rc<Self> {
        let mut method = Self::native(uglified_name, pretty_name, arity, location, f);
        Rc::get_mut(&mut method).expect("freshly constructed Rc has no other owners").is_accessor = true;
        method
    }
}
