use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crate::interpreter::ScopeRef;
use crate::parser::ast::Expression;

use super::method::Method;
use super::value::Value;

pub type ObjectRef = Rc<RefCell<ObjectData>>;

/// The runtime representation of an object: a slot table (the `var`s and
/// `def`s it holds), a dispatch table of methods, and the shadowed methods an
/// override hid — the structural copy-on-inherit snapshot spec.md §5
/// describes rather than a live parent pointer, so later changes to a named
/// superclass never retroactively affect objects already built from it.
#[derive(Debug)]
pub struct ObjectData {
    /// A short label used only in error messages (`"a Point"`, `"an
    /// anonymous object"`) — never consulted for dispatch or equality.
    pub label: String,
    slots: HashMap<String, Value>,
    methods: HashMap<String, Rc<Method>>,
    /// Methods an override shadowed, keyed the same as `methods`, consulted
    /// by `super` requests (spec.md §5 "super resolves against the method
    /// this object's own definition overrode, not against a live parent").
    shadowed: HashMap<String, Rc<Method>>,
    /// A `var`'s declared pattern, alongside the scope it closed over when
    /// declared — consulted by both the unqualified `name := v` path and the
    /// qualified `name :=` setter method so a reassignment is asserted
    /// against the same pattern however it's spelled (spec.md §3 "Var
    /// declarations ... re-assert the pattern").
    field_patterns: HashMap<String, (Rc<Expression>, ScopeRef)>,
    /// True for the whole duration of the three-pass object-body
    /// interpretation that built this object; cleared once evaluation of the
    /// last top-level statement completes. Drives the `IncompleteObject`
    /// check on `self` and on slot reads that race construction order.
    pub under_construction: Cell<bool>,
}

impl ObjectData {
    pub fn new(label: impl Into<String>) -> ObjectRef {
        Rc::new(RefCell::new(Self {
            label: label.into(),
            slots: HashMap::new(),
            methods: HashMap::new(),
            shadowed: HashMap::new(),
            field_patterns: HashMap::new(),
            under_construction: Cell::new(true),
        }))
    }

    pub fn describe(&self) -> String {
        self.label.clone()
    }

    pub fn get_slot(&self, name: &str) -> Option<&Value> {
        self.slots.get(name)
    }

    pub fn set_slot(&mut self, name: impl Into<String>, value: Value) {
        self.slots.insert(name.into(), value);
    }

    pub fn has_slot(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    pub fn set_field_pattern(&mut self, name: impl Into<String>, pattern: Rc<Expression>, scope: ScopeRef) {
        self.field_patterns.insert(name.into(), (pattern, scope));
    }

    pub fn field_pattern(&self, name: &str) -> Option<(Rc<Expression>, ScopeRef)> {
        self.field_patterns.get(name).cloned()
    }

    pub fn method(&self, uglified_name: &str) -> Option<Rc<Method>> {
        self.methods.get(uglified_name).cloned()
    }

    pub fn shadowed_method(&self, uglified_name: &str) -> Option<Rc<Method>> {
        self.shadowed.get(uglified_name).cloned()
    }

    pub fn method_names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }

    /// Installs a freshly hoisted or evaluated method. If a method of the
    /// same uglified name already exists — because `inherits` copied it in
    /// from a parent object — it moves to `shadowed` first, becoming
    /// reachable only via `super`.
    pub fn install_method(&mut self, uglified_name: String, method: Rc<Method>) {
        if let Some(previous) = self.methods.remove(&uglified_name) {
            self.shadowed.insert(uglified_name.clone(), previous);
        }
        self.methods.insert(uglified_name, method);
    }

    /// Structurally copies another object's method table into this one, as
    /// `inherits` does at the moment it runs. Methods the parent itself had
    /// shadowed stay shadowed in the child, since a grandparent's method is
    /// never directly reachable once the parent overrode it.
    pub fn inherit_from(&mut self, parent: &ObjectData) {
        for (name, method) in &parent.methods {
            self.methods.insert(name.clone(), method.clone());
        }
        for (name, method) in &parent.shadowed {
            self.shadowed.entry(name.clone()).or_insert_with(|| method.clone());
        }
        for (name, value) in &parent.slots {
            self.slots.entry(name.clone()).or_insert_with(|| value.clone());
        }
        for (name, pattern) in &parent.field_patterns {
            self.field_patterns.entry(name.clone()).or_insert_with(|| pattern.clone());
        }
    }
}
