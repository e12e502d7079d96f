use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crate::runtime::{ExceptionPacket, Value};

#[derive(Debug, Clone)]
enum Slot {
    Uninitialized,
    Initialized(Value),
}

#[derive(Debug)]
struct Binding {
    mutable: bool,
    slot: Slot,
    /// True for a name hoisted by a `Def`/`Var` declaration — such a name's
    /// value lives in the owning object's slot table (`ObjectData::slots`),
    /// not in `slot` above, so an unqualified read/write here and a
    /// qualified read/write through the field's accessor methods
    /// (`Interpreter::install_field_accessors`) always see the same value.
    /// `slot` is still consulted to tell "not yet initialized" apart from
    /// "no self to read a slot from" while the object itself is empty.
    is_field: bool,
}

/// What a name search found: distinguishes "not found at all" from "found,
/// but its `def`/`var` initializer has not run yet" so callers can raise
/// `IncompleteObject` rather than `UndefinedValue` for the latter
/// (spec.md §5 "hoisting makes names visible before they are live").
pub enum Lookup {
    Value(Value),
    Uninitialized,
    Missing,
}

pub enum AssignOutcome {
    Ok,
    Uninitialized,
    Immutable,
    Missing,
}

/// One link in the scope chain — an object body, a method activation, or a
/// block activation. Frames are never mutated through `&mut`; all state
/// lives behind `RefCell`/`Cell` so a frame can be captured by value inside
/// closures (blocks, method closures) via a plain `Rc` clone, matching the
/// arena-of-frames model spec.md §9 calls out as appropriate for a
/// tree-walking host without a tracing GC.
#[derive(Debug)]
pub struct Frame {
    parent: Option<ScopeRef>,
    bindings: RefCell<HashMap<String, Binding>>,
    /// Present only on the frame a method activation introduces. Cleared to
    /// `false` when that activation returns by any means, so a `return`
    /// reaching it later (through a block that escaped) can be rejected.
    pub return_target: Option<Rc<Cell<bool>>>,
    /// The receiver `self` resolves to from this frame, set on
    /// method-activation and object-constructor frames, inherited unchanged
    /// by plain block frames. `super` dispatches by reading this object's
    /// own shadowed-method table, so no separate pointer is needed here.
    ///
    /// Mutable so a module's root frame can have its `self` replaced by a
    /// dialect object after the frame already exists (spec.md §4.4 "a
    /// dialect... becomes the outermost scope's self").
    self_value: RefCell<Option<Value>>,
    /// The value `outer` resolves to: the `self` of the lexically enclosing
    /// object constructor, set when an `ObjectConstructor` expression is
    /// evaluated inside another object's body. `None` at module top level.
    pub outer_value: Option<Value>,
    pub in_object_construction: Cell<bool>,
}

pub type ScopeRef = Rc<Frame>;

impl Frame {
    pub fn root() -> ScopeRef {
        Rc::new(Self {
            parent: None,
            bindings: RefCell::new(HashMap::new()),
            return_target: None,
            self_value: RefCell::new(None),
            outer_value: None,
            in_object_construction: Cell::new(false),
        })
    }

    /// A plain nested scope (block body, `if`/pattern-match arm) inheriting
    /// `self`/`outer` from its parent unchanged.
    pub fn child(parent: &ScopeRef) -> ScopeRef {
        Rc::new(Self {
            parent: Some(parent.clone()),
            bindings: RefCell::new(HashMap::new()),
            return_target: None,
            self_value: RefCell::new(parent.self_value()),
            outer_value: parent.outer_value.clone(),
            in_object_construction: Cell::new(parent.in_object_construction.get()),
        })
    }

    /// A fresh method-activation frame: introduces its own `return_target`,
    /// and rebinds `self` to the receiver being dispatched on.
    pub fn method_activation(closure: &ScopeRef, self_value: Value) -> (ScopeRef, Rc<Cell<bool>>) {
        let active = Rc::new(Cell::new(true));
        let frame = Rc::new(Self {
            parent: Some(closure.clone()),
            bindings: RefCell::new(HashMap::new()),
            return_target: Some(active.clone()),
            self_value: RefCell::new(Some(self_value)),
            outer_value: closure.outer_value.clone(),
            in_object_construction: Cell::new(false),
        });
        (frame, active)
    }

    /// A fresh object-constructor frame, nested lexically under `defining`
    /// (for `outer`) with `self` bound to the object under construction.
    pub fn object_construction(defining: &ScopeRef, self_value: Value) -> ScopeRef {
        Rc::new(Self {
            parent: Some(defining.clone()),
            bindings: RefCell::new(HashMap::new()),
            return_target: None,
            self_value: RefCell::new(Some(self_value.clone())),
            outer_value: Some(defining.self_value().unwrap_or(self_value)),
            in_object_construction: Cell::new(true),
        })
    }

    pub fn parent(&self) -> Option<&ScopeRef> {
        self.parent.as_ref()
    }

    pub fn self_value(&self) -> Option<Value> {
        self.self_value.borrow().clone()
    }

    /// Replaces this frame's own `self` — used only by dialect resolution
    /// on a module's root frame, before hoisting begins.
    pub fn set_self_value(&self, value: Value) {
        *self.self_value.borrow_mut() = Some(value);
    }

    /// Reserves a name during hoisting without giving it a value yet. Used
    /// only for `Def`/`Var` reservations, so the binding is always
    /// field-backed (see [`Binding::is_field`]).
    pub fn declare_uninitialized(&self, name: impl Into<String>, mutable: bool) {
        self.bindings
            .borrow_mut()
            .insert(name.into(), Binding { mutable, slot: Slot::Uninitialized, is_field: true });
    }

    /// Binds a name that has no backing object slot: an import, a type
    /// proxy, a method/block parameter.
    pub fn declare_initialized(&self, name: impl Into<String>, mutable: bool, value: Value) {
        self.bindings
            .borrow_mut()
            .insert(name.into(), Binding { mutable, slot: Slot::Initialized(value), is_field: false });
    }

    pub fn has_local(&self, name: &str) -> bool {
        self.bindings.borrow().contains_key(name)
    }

    /// Marks a previously hoisted name as now having a value — the
    /// evaluation pass of a `def`/`var` initializer.
    pub fn initialize_local(&self, name: &str, value: Value) {
        if let Some(binding) = self.bindings.borrow_mut().get_mut(name) {
            binding.slot = Slot::Initialized(value);
        }
    }

    pub fn search(self: &ScopeRef, name: &str) -> Lookup {
        let mut frame = self;
        loop {
            if let Some(binding) = frame.bindings.borrow().get(name) {
                if binding.is_field {
                    return match frame.self_value() {
                        Some(Value::Object(obj)) => match obj.borrow().get_slot(name) {
                            Some(v) => Lookup::Value(v.clone()),
                            None => Lookup::Uninitialized,
                        },
                        _ => Lookup::Uninitialized,
                    };
                }
                return match &binding.slot {
                    Slot::Initialized(v) => Lookup::Value(v.clone()),
                    Slot::Uninitialized => Lookup::Uninitialized,
                };
            }
            match &frame.parent {
                Some(p) => frame = p,
                None => return Lookup::Missing,
            }
        }
    }

    /// Reassigns a previously bound name. A field-backed binding (`Var`)
    /// writes straight through to the owning object's slot — the single
    /// store a qualified `obj.name := v` setter also writes to — so internal
    /// and external writes to the same `var` are never able to drift apart.
    pub fn assign(self: &ScopeRef, name: &str, value: Value) -> AssignOutcome {
        let mut frame = self;
        loop {
            let found = {
                let bindings = frame.bindings.borrow();
                bindings.get(name).map(|b| (b.mutable, b.is_field))
            };
            if let Some((mutable, is_field)) = found {
                if !mutable {
                    return AssignOutcome::Immutable;
                }
                if is_field {
                    return match frame.self_value() {
                        Some(Value::Object(obj)) => {
                            let has_slot = obj.borrow().has_slot(name);
                            if has_slot {
                                obj.borrow_mut().set_slot(name.to_owned(), value);
                                AssignOutcome::Ok
                            } else {
                                AssignOutcome::Uninitialized
                            }
                        }
                        _ => AssignOutcome::Uninitialized,
                    };
                }
                let mut bindings = frame.bindings.borrow_mut();
                let binding = bindings.get_mut(name).expect("checked present above");
                if matches!(binding.slot, Slot::Uninitialized) {
                    return AssignOutcome::Uninitialized;
                }
                binding.slot = Slot::Initialized(value);
                return AssignOutcome::Ok;
            }
            match &frame.parent {
                Some(p) => frame = p,
                None => return AssignOutcome::Missing,
            }
        }
    }
}

/// Turns a scope-search failure into the matching `ExceptionPacket`, shared
/// between request evaluation and assignment evaluation.
pub fn undefined_name_exception(name: &str) -> ExceptionPacket {
    ExceptionPacket::undefined_value(name)
}
