use std::fmt::{self, Display};
use std::rc::Rc;

use super::block::BlockRef;
use super::exception::ExceptionPacket;
use super::object::ObjectRef;
use super::types::{Type, TypeProxyRef};

/// Every value the interpreter can produce or hold a reference to.
///
/// There is no boxed "any" case: a host-level `Value` is either a plain
/// immutable datum (`Boolean`/`Number`/`String`/`Done`) or a handle into the
/// arena of reference-counted, interior-mutable records (`Object`/`Block`/
/// `TypeProxy`). `Type` is cheap enough (a name plus a sorted signature list)
/// to carry by value rather than behind an `Rc`.
#[derive(Debug, Clone)]
pub enum Value {
    Object(ObjectRef),
    Block(BlockRef),
    Type(Type),
    TypeProxy(TypeProxyRef),
    Boolean(bool),
    Number(f64),
    String(Rc<str>),
    Done,
    /// A raised packet, wrapped as a first-class value so that it can be
    /// passed to `on()do()` handlers and pattern-matched like anything else.
    Exception(Box<ExceptionPacket>),
}

impl Value {
    pub fn string(s: impl Into<Rc<str>>) -> Self {
        Value::String(s.into())
    }

    pub fn boolean(b: bool) -> Self {
        Value::Boolean(b)
    }

    pub fn number(n: f64) -> Self {
        Value::Number(n)
    }

    pub fn exception(packet: ExceptionPacket) -> Self {
        Value::Exception(Box::new(packet))
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_block(&self) -> Option<&BlockRef> {
        match self {
            Value::Block(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// A one-line description used in error messages and stack traces —
    /// never the user-visible `asString` result, which goes through method
    /// dispatch instead.
    pub fn describe(&self) -> String {
        match self {
            Value::Object(o) => o.borrow().describe(),
            Value::Block(_) => "a block".to_owned(),
            Value::Type(t) => format!("the type {}", t.name),
            Value::TypeProxy(_) => "a forward-declared type".to_owned(),
            Value::Boolean(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::String(s) => format!("{s:?}"),
            Value::Done => "done".to_owned(),
            Value::Exception(e) => format!("exception {}", e.kind),
        }
    }

    /// Structural type-tag used for `TypeMismatch` messages and by
    /// `Type::matches` for its built-in (non-structural) kinds.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Object(_) => "Object",
            Value::Block(_) => "Block",
            Value::Type(_) | Value::TypeProxy(_) => "Type",
            Value::Boolean(_) => "Boolean",
            Value::Number(_) => "Number",
            Value::String(_) => "String",
            Value::Done => "Done",
            Value::Exception(_) => "Exception",
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// Structural/referential equality used internally by `==` on primitives and
/// by the prelude's default `Object` identity comparison; never used for
/// pattern assertion, which goes through [`crate::interpreter::pattern`].
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Done, Value::Done) => true,
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Block(a), Value::Block(b)) => Rc::ptr_eq(a, b),
            (Value::TypeProxy(a), Value::TypeProxy(b)) => Rc::ptr_eq(a, b),
            (Value::Type(a), Value::Type(b)) => a == b,
            _ => false,
        }
    }
}
