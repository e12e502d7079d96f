use std::cell::RefCell;
use std::rc::Rc;

use super::value::Value;

/// The shape of one part of a method signature, as recorded by a type
/// literal: the part's name plus whether it carries parameters, stripped of
/// parameter type information (spec.md's structural types describe *which
/// messages* an object understands, not argument types).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SignatureShape {
    pub uglified: String,
}

impl SignatureShape {
    pub fn new(uglified: impl Into<String>) -> Self {
        Self { uglified: uglified.into() }
    }
}

/// A structural type: a name (for error messages only — types compare by
/// signature set, never by name) and the sorted, deduplicated list of
/// signatures a conforming object must respond to.
#[derive(Debug, Clone)]
pub struct Type {
    pub name: String,
    signatures: Vec<SignatureShape>,
}

impl Type {
    pub fn new(name: impl Into<String>, mut signatures: Vec<SignatureShape>) -> Self {
        signatures.sort();
        signatures.dedup();
        Self { name: name.into(), signatures }
    }

    pub fn signatures(&self) -> &[SignatureShape] {
        &self.signatures
    }

    /// Whether `value` structurally conforms: every signature named by this
    /// type must resolve on the value's object (or on the single built-in
    /// representative object for primitives, via the prelude's wrapper
    /// types). Delegated to the interpreter's method-lookup machinery by the
    /// caller, since `Type` itself has no access to the object graph's
    /// method tables; this module only defines the data the check compares.
    pub fn requires(&self, uglified_name: &str) -> bool {
        self.signatures.iter().any(|s| s.uglified == uglified_name)
    }
}

/// Two types are the same type iff they require exactly the same signatures,
/// independent of declaration order or the name used to declare them
/// (spec.md §4.1 "Types compare structurally").
impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        self.signatures == other.signatures
    }
}
impl Eq for Type {}

#[derive(Debug)]
enum TypeProxyState {
    Pending,
    Resolved(Value),
}

/// A forward declaration for a type that will be defined later in the same
/// lexical unit, so that two mutually recursive type literals can refer to
/// each other (spec.md §4.1 "Type forward references"). Created empty during
/// hoisting, assigned exactly once via [`TypeProxyData::become_value`].
#[derive(Debug)]
pub struct TypeProxyData {
    name: String,
    state: TypeProxyState,
    /// Set while this proxy's own defining expression is being evaluated, so
    /// that a type literal which references itself before `become_value` is
    /// called can be reported distinctly from an ordinary undefined name.
    pub resolving: bool,
}

pub type TypeProxyRef = Rc<RefCell<TypeProxyData>>;

impl TypeProxyData {
    pub fn new(name: impl Into<String>) -> TypeProxyRef {
        Rc::new(RefCell::new(Self {
            name: name.into(),
            state: TypeProxyState::Pending,
            resolving: false,
        }))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self.state, TypeProxyState::Resolved(_))
    }

    pub fn resolved_value(&self) -> Option<&Value> {
        match &self.state {
            TypeProxyState::Resolved(v) => Some(v),
            TypeProxyState::Pending => None,
        }
    }

    /// Single-assignment: a proxy may be resolved exactly once. A second
    /// call is a host bug, not a user-triggerable error — hoisting never
    /// installs the same `TypeProxy` for two declarations — so it panics.
    pub fn become_value(&mut self, value: Value) {
        assert!(!self.is_resolved(), "TypeProxy '{}' resolved twice", self.name);
        self.state = TypeProxyState::Resolved(value);
    }
}
