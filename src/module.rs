//! Module coordination: turns a source path into a cached [`Value`] by
//! parsing it, wrapping the result as an object constructor, and evaluating
//! it against a fresh root frame — the [`crate::interpreter::ImportResolver`]
//! the interpreter calls out to for every `import`/`dialect` declaration.
//!
//! Resolving one module can recursively resolve another (`A` imports `B`
//! imports `C`): evaluating `A`'s body holds the interpreter's
//! `import_resolver` borrowed for the whole of that evaluation, and if `B`'s
//! evaluation reused the exact same `RefCell` it would try to borrow it again
//! while the outer borrow is still live and panic. [`ModuleTable`] avoids
//! this by being a cheap handle onto a shared cache/loader pair: every nested
//! [`crate::interpreter::Interpreter`] gets handed a freshly allocated
//! `Rc<RefCell<dyn ImportResolver>>` wrapping a clone of the same handle, so
//! no two levels of recursion ever contend for one `RefCell`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::interpreter::{Frame, ImportResolver, Interpreter, Unwind};
use crate::lexer::Location;
use crate::loader::ModuleLoader;
use crate::parser::ast::{Expression, ObjectConstructor, Statement};
use crate::parser::Parser;
use crate::runtime::{ExceptionPacket, ObjectRef, Value};

struct Shared<L> {
    loader: L,
    cache: RefCell<HashMap<String, Value>>,
    prelude: Value,
    /// Cloned onto every nested `Interpreter` this table constructs — each
    /// clone is just a handful of `Rc` bumps, and keeps primitive dispatch
    /// (`Number`/`String`/...) working identically at every import depth.
    prototypes: HashMap<&'static str, ObjectRef>,
}

/// Resolves `import`/`dialect` paths by parsing and evaluating the loaded
/// source exactly once per path, caching the resulting value.
///
/// Cloning a `ModuleTable` is cheap (one `Rc` bump) and shares the cache and
/// loader with the clone — that's what makes the per-recursion-level fresh
/// wrapper trick affordable.
pub struct ModuleTable<L> {
    shared: Rc<Shared<L>>,
}

impl<L> Clone for ModuleTable<L> {
    fn clone(&self) -> Self {
        Self { shared: self.shared.clone() }
    }
}

impl<L: ModuleLoader + 'static> ModuleTable<L> {
    /// `prelude` is the value bound as `self` at the top of every module
    /// that doesn't replace it with its own `dialect` declaration; `prototypes`
    /// is installed on every interpreter this table constructs (see
    /// [`crate::prelude::prototypes`]).
    pub fn new(loader: L, prelude: Value, prototypes: HashMap<&'static str, ObjectRef>) -> Self {
        Self {
            shared: Rc::new(Shared {
                loader,
                cache: RefCell::new(HashMap::new()),
                prelude,
                prototypes,
            }),
        }
    }

    /// Resolves and caches `path`, parsing and evaluating it on first access.
    pub fn load(&self, path: &str) -> Result<Value, ExceptionPacket> {
        if let Some(cached) = self.shared.cache.borrow().get(path) {
            return Ok(cached.clone());
        }
        let source = self
            .shared
            .loader
            .load(path)
            .ok_or_else(|| ExceptionPacket::unresolved_module(path))?;
        let value = self.evaluate(path, &source)?;
        self.shared.cache.borrow_mut().insert(path.to_owned(), value.clone());
        Ok(value)
    }

    /// Evaluates source text directly under `path`'s name, bypassing the
    /// cache — the entry point for a program's own top-level module, which
    /// the host already has in hand rather than needing it loaded.
    pub fn evaluate_entry(&self, path: &str, source: &str) -> Result<Value, ExceptionPacket> {
        self.evaluate(path, source)
    }

    fn evaluate(&self, path: &str, source: &str) -> Result<Value, ExceptionPacket> {
        let mut parser =
            Parser::new(source).map_err(|e| ExceptionPacket::checker_failure(format!("{path}: {e}")))?;
        let statements = parser
            .parse_module()
            .map_err(|e| ExceptionPacket::checker_failure(format!("{path}: {e}")))?;
        let location = statements.first().map(Statement::location).unwrap_or_else(|| Location::new(1, 1));
        let wrapper = Expression::ObjectConstructor(ObjectConstructor {
            inherits: None,
            body: statements,
            location,
        });

        let mut interpreter = Interpreter::new(path.to_owned());
        interpreter.prototypes = self.shared.prototypes.clone();
        let resolver: Rc<RefCell<dyn ImportResolver>> = Rc::new(RefCell::new(self.clone()));
        interpreter.import_resolver = Some(resolver);

        let root = Frame::root();
        root.set_self_value(self.shared.prelude.clone());

        interpreter.eval_expression(&wrapper, &root).map_err(|unwind| match unwind {
            Unwind::Exception(packet) => packet,
            Unwind::Return { .. } => ExceptionPacket::invalid_return_outside_method(location),
        })
    }
}

impl<L: ModuleLoader + 'static> ImportResolver for ModuleTable<L> {
    fn resolve_import(&mut self, path: &str) -> Result<Value, ExceptionPacket> {
        self.load(path)
    }

    fn resolve_dialect(&mut self, path: &str) -> Result<Value, ExceptionPacket> {
        self.load(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::MapLoader;
    use crate::runtime::ObjectData;

    fn empty_prelude() -> Value {
        Value::Object(ObjectData::new("prelude"))
    }

    #[test]
    fn caches_repeated_imports() {
        let loader = MapLoader::new().with("a", "def x = 1");
        let table = ModuleTable::new(loader, empty_prelude(), HashMap::new());
        let first = table.load("a").unwrap();
        let second = table.load("a").unwrap();
        assert!(matches!((first, second), (Value::Object(a), Value::Object(b)) if Rc::ptr_eq(&a, &b)));
    }

    #[test]
    fn resolves_transitively_nested_imports_without_panicking() {
        // The regression this guards: resolving "a" recursively resolves "b"
        // which recursively resolves "c", all through the same
        // `import_resolver` borrow chain — a naive single shared `RefCell`
        // would double-borrow and panic here.
        let loader = MapLoader::new()
            .with("c", "def value = 3")
            .with("b", "import \"c\"\ndef value = 1")
            .with("a", "import \"b\"\ndef value = 2");
        let table = ModuleTable::new(loader, empty_prelude(), HashMap::new());
        let result = table.load("a");
        assert!(result.is_ok());
    }

    #[test]
    fn missing_module_reports_unresolved() {
        let loader = MapLoader::new();
        let table = ModuleTable::new(loader, empty_prelude(), HashMap::new());
        let err = table.load("missing").unwrap_err();
        assert_eq!(err.kind, crate::runtime::ExceptionKind::UnresolvedModule);
    }

    #[test]
    fn dialect_without_a_check_method_loads_unchecked() {
        let loader = MapLoader::new()
            .with("lenient", "def label = \"lenient\"")
            .with("mod", "dialect \"lenient\"\ndef x = 1");
        let table = ModuleTable::new(loader, empty_prelude(), HashMap::new());
        assert!(table.load("mod").is_ok());
    }

    #[test]
    fn dialect_check_runs_against_the_module_node_list() {
        let loader = MapLoader::new()
            .with("strict", "method check(nodes) { nodes.size }")
            .with("mod", "dialect \"strict\"\ndef x = 1\ndef y = 2");
        let table = ModuleTable::new(loader, empty_prelude(), HashMap::new());
        assert!(table.load("mod").is_ok());
    }

    #[test]
    fn uncaught_exception_from_dialect_check_propagates_with_a_stack_frame() {
        let loader = MapLoader::new()
            .with("strict", "method check(nodes) { nodes.bogus }")
            .with("mod", "dialect \"strict\"\ndef x = 1");
        let table = ModuleTable::new(loader, empty_prelude(), HashMap::new());
        let err = table.load("mod").unwrap_err();
        assert_eq!(err.kind, crate::runtime::ExceptionKind::NoSuchMethod);
        assert!(!err.trace.is_empty(), "expected check's own stack frame to be attached");
    }
}
