//! Tree-walking evaluation: scope chain, hoisting, inheritance composition,
//! pattern assertion, and non-local return.

mod scope;

pub mod pattern;

pub use scope::{AssignOutcome, Frame, Lookup, ScopeRef};

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::lexer::Location;
use crate::parser::ast::{
    Declaration, Expression, InheritsClause, MethodDecl, ObjectConstructor, RequestPart, Signature,
    Statement,
};
use crate::runtime::{
    pretty_name, uglify, ExceptionPacket, Method, MethodBody, ObjectData, ObjectRef, ParamSpec,
    PartName, TypeProxyData, Value,
};

/// What unwinds a `Result<Value, Unwind>` out through nested evaluation: a
/// `return` looking for its owning method activation, or a raised exception
/// still looking for a handler. Both travel the same way so every call site
/// simply propagates with `?`.
#[derive(Debug, Clone)]
pub enum Unwind {
    Return { target: Rc<std::cell::Cell<bool>>, value: Value },
    Exception(ExceptionPacket),
}

impl From<ExceptionPacket> for Unwind {
    fn from(packet: ExceptionPacket) -> Self {
        Unwind::Exception(packet)
    }
}

/// The narrow seam through which the interpreter asks its host to resolve
/// an `import`/`dialect` path to a value — implemented by the module
/// coordinator (see [`crate::module`]), never by the interpreter itself.
pub trait ImportResolver {
    fn resolve_import(&mut self, path: &str) -> Result<Value, ExceptionPacket>;
    fn resolve_dialect(&mut self, path: &str) -> Result<Value, ExceptionPacket>;
}

pub struct Interpreter {
    /// Prototype objects backing method dispatch on primitive receivers —
    /// populated by the prelude (`Number`, `String`, `Boolean`, `Block`,
    /// `Type`, `Done`), keyed by [`Value::kind_name`].
    pub prototypes: HashMap<&'static str, ObjectRef>,
    pub import_resolver: Option<Rc<RefCell<dyn ImportResolver>>>,
    pub module_path: String,
    trace: Vec<(String, String, Location)>,
}

impl Interpreter {
    pub fn new(module_path: impl Into<String>) -> Self {
        Self {
            prototypes: HashMap::new(),
            import_resolver: None,
            module_path: module_path.into(),
            trace: Vec::new(),
        }
    }

    pub fn install_prototype(&mut self, kind: &'static str, object: ObjectRef) {
        self.prototypes.insert(kind, object);
    }

    fn prototype_for(&self, value: &Value) -> Option<ObjectRef> {
        match value {
            Value::Object(o) => Some(o.clone()),
            other => self.prototypes.get(other.kind_name()).cloned(),
        }
    }

    // ---- Body interpretation (three passes) --------------------------

    /// Runs a statement list against `scope` with the full import/dialect,
    /// hoist, evaluate protocol of spec.md §4.4, returning the value of the
    /// last statement (or `Done` for an empty body).
    pub fn eval_body(&mut self, statements: &[Statement], scope: &ScopeRef) -> Result<Value, Unwind> {
        self.resolve_imports_and_dialect(statements, scope)?;
        self.hoist(statements, scope)?;
        let mut result = Value::Done;
        for statement in statements {
            if matches!(
                statement,
                Statement::Declaration(Declaration::Method(_))
                    | Statement::Declaration(Declaration::Class(_))
                    | Statement::Declaration(Declaration::TypeDecl(_))
                    | Statement::Declaration(Declaration::Dialect(_))
                    | Statement::Declaration(Declaration::Import(_))
            ) {
                continue;
            }
            result = self.eval_statement(statement, scope)?;
        }
        Ok(result)
    }

    fn resolve_imports_and_dialect(
        &mut self,
        statements: &[Statement],
        scope: &ScopeRef,
    ) -> Result<(), Unwind> {
        for statement in statements {
            if let Statement::Declaration(Declaration::Dialect(d)) = statement {
                let resolver = self
                    .import_resolver
                    .clone()
                    .ok_or_else(|| Unwind::Exception(ExceptionPacket::unresolved_module(&d.path)))?;
                let dialect = resolver.borrow_mut().resolve_dialect(&d.path)?;
                self.run_dialect_check(&dialect, statements, d.location)?;
                scope.set_self_value(dialect);
            }
        }
        for statement in statements {
            if let Statement::Declaration(Declaration::Import(d)) = statement {
                let resolver = self
                    .import_resolver
                    .clone()
                    .ok_or_else(|| Unwind::Exception(ExceptionPacket::unresolved_module(&d.path)))?;
                let module = resolver.borrow_mut().resolve_import(&d.path)?;
                if d.names.is_empty() {
                    let bound_name = d.path.rsplit('/').next().unwrap_or(&d.path);
                    scope.declare_initialized(bound_name, false, module);
                } else {
                    for name in &d.names {
                        let value = self.send(module.clone(), &name.name, Vec::new(), name.location)?;
                        scope.declare_initialized(name.name.clone(), false, value);
                    }
                }
            }
        }
        Ok(())
    }

    /// Invokes a dialect's `check` method, if it has one, with the module's
    /// own node list reified as a list value — spec.md §4.5 "A dialect's
    /// `check` method, if present, receives the module's node list as a list
    /// value and may raise `CheckerFailure`". An uncaught exception from
    /// `check` picks up its location/module frame the same way any other
    /// method call does, via [`Self::apply_method`]'s stack-trace push.
    fn run_dialect_check(&mut self, dialect: &Value, statements: &[Statement], location: Location) -> Result<(), Unwind> {
        if self.lookup(dialect, "check").is_none() {
            return Ok(());
        }
        let nodes = node_list_value(statements);
        self.send(dialect.clone(), "check", vec![nodes], location)?;
        Ok(())
    }

    /// Pass 2: install Method/Class records, TypeProxy reservations, and
    /// uninitialized Def/Var accessors, all without running initializer or
    /// method bodies (spec.md §4.4 "Hoisting").
    fn hoist(&mut self, statements: &[Statement], scope: &ScopeRef) -> Result<(), Unwind> {
        let mut declared_this_body = std::collections::HashSet::new();
        for statement in statements {
            let Statement::Declaration(decl) = statement else { continue };
            match decl {
                Declaration::Def(d) => {
                    if scope.has_local(&d.name.name) || !declared_this_body.insert(d.name.name.clone()) {
                        return Err(Unwind::Exception(ExceptionPacket::redefinition(
                            &d.name.name,
                            d.location,
                        )));
                    }
                    scope.declare_uninitialized(&d.name.name, false);
                    self.install_field_accessors(&d.name.name, false, None, scope, d.location);
                }
                Declaration::Var(d) => {
                    if scope.has_local(&d.name.name) || !declared_this_body.insert(d.name.name.clone()) {
                        return Err(Unwind::Exception(ExceptionPacket::redefinition(
                            &d.name.name,
                            d.location,
                        )));
                    }
                    scope.declare_uninitialized(&d.name.name, true);
                    self.install_field_accessors(&d.name.name, true, d.pattern.clone().map(Rc::new), scope, d.location);
                }
                Declaration::TypeDecl(d) => {
                    let proxy = TypeProxyData::new(d.name.name.clone());
                    scope.declare_initialized(&d.name.name, false, Value::TypeProxy(proxy));
                }
                Declaration::Method(m) => {
                    self.install_method_decl(m, scope, &mut declared_this_body)?;
                }
                Declaration::Class(c) => {
                    self.install_class_decl(c, scope, &mut declared_this_body)?;
                }
                Declaration::Dialect(_) | Declaration::Import(_) => {}
            }
        }
        Ok(())
    }

    fn install_method_decl(
        &mut self,
        decl: &MethodDecl,
        scope: &ScopeRef,
        declared_this_body: &mut std::collections::HashSet<String>,
    ) -> Result<(), Unwind> {
        let method = self.build_method(&decl.signature, &decl.body, decl.is_override, decl.confidential, scope);
        self.check_override_validity(&method, scope, decl.location)?;
        self.install_on_self(method, scope, declared_this_body, decl.location)
    }

    /// Enforces spec.md §4.4's override rules whenever `method` shadows an
    /// entry already installed on `self` (inherited via `inherits`, or from
    /// an earlier `var`'s accessor): a confidential method cannot shadow a
    /// public one, a `var` accessor cannot be shadowed by an ordinary
    /// method, and the two part lists must take the same number of
    /// arguments.
    fn check_override_validity(&self, method: &Rc<Method>, scope: &ScopeRef, location: Location) -> Result<(), Unwind> {
        let Some(Value::Object(self_obj)) = scope.self_value() else { return Ok(()) };
        let Some(existing) = self_obj.borrow().method(&method.uglified_name) else { return Ok(()) };
        if existing.is_accessor {
            return Err(Unwind::Exception(ExceptionPacket::override_accessor(&method.pretty_name, location)));
        }
        if method.confidential && !existing.confidential {
            return Err(Unwind::Exception(ExceptionPacket::confidential_override_of_public(
                &method.pretty_name,
                location,
            )));
        }
        if existing.params.len() != method.params.len() {
            return Err(Unwind::Exception(ExceptionPacket::override_shape_mismatch(
                &method.pretty_name,
                existing.params.len(),
                method.params.len(),
                location,
            )));
        }
        Ok(())
    }

    fn install_class_decl(
        &mut self,
        decl: &crate::parser::ast::ClassDecl,
        scope: &ScopeRef,
        declared_this_body: &mut std::collections::HashSet<String>,
    ) -> Result<(), Unwind> {
        let signature = decl.constructor_signature.clone().unwrap_or(Signature {
            parts: vec![crate::parser::ast::SignaturePart {
                name: decl.name.name.clone(),
                generics: Vec::new(),
                params: Vec::new(),
                is_operator: false,
                is_prefix: false,
                location: decl.location,
            }],
            is_assignment: false,
            return_pattern: None,
            location: decl.location,
        });
        let method = self.build_method(&signature, &decl.body, false, false, scope);
        self.install_on_self(method, scope, declared_this_body, decl.location)
    }

    fn build_method(
        &self,
        signature: &Signature,
        body: &[Statement],
        is_override: bool,
        confidential: bool,
        scope: &ScopeRef,
    ) -> Rc<Method> {
        // Shadowing an inherited name is detected structurally in
        // `check_override_validity`/`ObjectData::install_method` regardless
        // of whether the declaration spelled `override`; the keyword is
        // accepted by the grammar but doesn't change installation.
        let _ = is_override;
        let parts: Vec<PartName> = signature
            .parts
            .iter()
            .map(|p| {
                if signature.is_assignment {
                    PartName::assignment(p.name.clone())
                } else if p.is_operator {
                    PartName::operator(p.name.clone(), p.is_prefix)
                } else {
                    PartName::plain(p.name.clone(), !p.params.is_empty())
                }
            })
            .collect();
        let params: Vec<ParamSpec> = signature
            .parts
            .iter()
            .flat_map(|p| p.params.iter())
            .map(|p| ParamSpec::new(p.name.name.clone(), p.pattern.clone().map(Rc::new)))
            .collect();
        Rc::new(Method {
            uglified_name: uglify(&parts),
            pretty_name: pretty_name(&parts),
            params,
            body: MethodBody::User { body: Rc::from(body.to_vec().into_boxed_slice()) },
            closure: Some(scope.clone()),
            location: signature.location,
            confidential,
            return_pattern: signature.return_pattern.clone().map(Rc::new),
            is_accessor: false,
        })
    }

    /// Installs a method onto `self`'s method table. Redefinition is checked
    /// against names already declared earlier in this same body (tracked in
    /// `declared_this_body`, not the scope's bindings) so overriding an
    /// *inherited* method — which lives only in the object's method table,
    /// never in scope bindings — is never mistaken for a local redefinition.
    fn install_on_self(
        &mut self,
        method: Rc<Method>,
        scope: &ScopeRef,
        declared_this_body: &mut std::collections::HashSet<String>,
        location: Location,
    ) -> Result<(), Unwind> {
        if !declared_this_body.insert(method.uglified_name.clone()) {
            return Err(Unwind::Exception(ExceptionPacket::redefinition(&method.pretty_name, location)));
        }
        if let Some(Value::Object(self_obj)) = scope.self_value() {
            self_obj.borrow_mut().install_method(method.uglified_name.clone(), method);
        }
        Ok(())
    }

    /// Gives a `def`/`var` declaration a bare getter (and, for `var`, a
    /// `name :=` setter) reachable from outside the object — spec.md §4.4's
    /// "for `Var`, also install its `name :=` setter", generalized to `def`
    /// so a qualified read of either kind of field dispatches the same way
    /// an unqualified one resolves through the scope chain. A same-named
    /// `method` declared later in this body collides with these through the
    /// ordinary same-frame `Redefinition` check; overriding an *inherited*
    /// accessor from a subclass is rejected in [`Self::check_override_validity`].
    fn install_field_accessors(
        &mut self,
        name: &str,
        settable: bool,
        pattern: Option<Rc<Expression>>,
        scope: &ScopeRef,
        location: Location,
    ) {
        let Some(Value::Object(self_obj)) = scope.self_value() else { return };

        let getter_field = name.to_owned();
        let getter = Method::native_accessor(name, name, 0, location, move |receiver, _args, _| match receiver {
            Value::Object(obj) => obj
                .borrow()
                .get_slot(&getter_field)
                .cloned()
                .ok_or_else(|| ExceptionPacket::incomplete_object_for_name(&getter_field, location).into()),
            _ => unreachable!("field accessor called on non-object receiver"),
        });
        self_obj.borrow_mut().install_method(getter.uglified_name.clone(), getter);

        if settable {
            if let Some(pattern) = &pattern {
                self_obj.borrow_mut().set_field_pattern(name.to_owned(), pattern.clone(), scope.clone());
            }
            let setter_name = format!("{name} :=");
            let setter_field = name.to_owned();
            let setter =
                Method::native_accessor(setter_name.clone(), setter_name, 1, location, move |receiver, args, interp| {
                    match receiver {
                        Value::Object(obj) => {
                            let declared_pattern = obj.borrow().field_pattern(&setter_field);
                            let value = match declared_pattern {
                                Some((pattern_expr, pattern_scope)) => {
                                    let pattern_value = interp.eval_expression(&pattern_expr, &pattern_scope)?;
                                    pattern::assert(interp, args[0].clone(), &pattern_value, location)?
                                }
                                None => args[0].clone(),
                            };
                            obj.borrow_mut().set_slot(setter_field.clone(), value);
                            Ok(Value::Done)
                        }
                        _ => unreachable!("field accessor called on non-object receiver"),
                    }
                });
            self_obj.borrow_mut().install_method(setter.uglified_name.clone(), setter);
        }
    }

    // ---- Statement / expression evaluation ----------------------------

    fn eval_statement(&mut self, statement: &Statement, scope: &ScopeRef) -> Result<Value, Unwind> {
        match statement {
            Statement::Expression(e) => self.eval_expression(e, scope),
            Statement::Return(r) => {
                let value = match &r.value {
                    Some(e) => self.eval_expression(e, scope)?,
                    None => Value::Done,
                };
                self.non_local_return(scope, value, r.location)
            }
            Statement::Declaration(Declaration::Def(d)) => {
                let value = self.eval_expression(&d.value, scope)?;
                let value = match &d.pattern {
                    Some(p) => {
                        let pattern = self.eval_expression(p, scope)?;
                        pattern::assert(self, value, &pattern, d.location)?
                    }
                    None => value,
                };
                scope.initialize_local(&d.name.name, value.clone());
                if let Some(Value::Object(self_obj)) = scope.self_value() {
                    self_obj.borrow_mut().set_slot(d.name.name.clone(), value.clone());
                }
                Ok(value)
            }
            Statement::Declaration(Declaration::Var(d)) => {
                let value = match &d.value {
                    Some(e) => self.eval_expression(e, scope)?,
                    None => Value::Done,
                };
                let value = match &d.pattern {
                    Some(p) => {
                        let pattern = self.eval_expression(p, scope)?;
                        pattern::assert(self, value, &pattern, d.location)?
                    }
                    None => value,
                };
                scope.initialize_local(&d.name.name, value.clone());
                if let Some(Value::Object(self_obj)) = scope.self_value() {
                    self_obj.borrow_mut().set_slot(d.name.name.clone(), value.clone());
                }
                Ok(Value::Done)
            }
            Statement::Declaration(Declaration::TypeDecl(d)) => {
                let Lookup::Value(Value::TypeProxy(proxy)) = scope.search(&d.name.name) else {
                    return Err(Unwind::Exception(ExceptionPacket::internal(format!(
                        "type '{}' missing its hoisted proxy",
                        d.name.name
                    ))));
                };
                if proxy.borrow().resolving {
                    return Err(Unwind::Exception(ExceptionPacket::self_dependent_type(&d.name.name, d.location)));
                }
                proxy.borrow_mut().resolving = true;
                let result = self.eval_expression(&d.value, scope);
                proxy.borrow_mut().resolving = false;
                let value = result?;
                proxy.borrow_mut().become_value(value);
                Ok(Value::Done)
            }
            Statement::Declaration(Declaration::Method(_) | Declaration::Class(_) | Declaration::Dialect(_) | Declaration::Import(_)) => {
                Ok(Value::Done)
            }
        }
    }

    fn non_local_return(&mut self, scope: &ScopeRef, value: Value, location: Location) -> Result<Value, Unwind> {
        let mut frame = scope;
        loop {
            if let Some(target) = &frame.return_target {
                if !target.get() {
                    return Err(Unwind::Exception(ExceptionPacket::invalid_return_for_completed_method(location)));
                }
                return Err(Unwind::Return { target: target.clone(), value });
            }
            if frame.in_object_construction.get() {
                return Err(Unwind::Exception(ExceptionPacket::invalid_return_inside_object(location)));
            }
            match frame.parent() {
                Some(p) => frame = p,
                None => return Err(Unwind::Exception(ExceptionPacket::invalid_return_outside_method(location))),
            }
        }
    }

    pub fn eval_expression(&mut self, expression: &Expression, scope: &ScopeRef) -> Result<Value, Unwind> {
        match expression {
            Expression::NumberLiteral { value, .. } => Ok(Value::Number(*value)),
            Expression::StringLiteral { value, .. } => Ok(Value::string(value.clone())),
            Expression::BooleanLiteral { value, .. } => Ok(Value::Boolean(*value)),
            Expression::DoneLiteral(_) => Ok(Value::Done),
            Expression::SelfExpr(location) => self.eval_self(scope, *location),
            Expression::SuperExpr(location) => self.eval_self(scope, *location),
            Expression::OuterExpr(_) => {
                let mut frame = scope;
                loop {
                    if let Some(outer) = &frame.outer_value {
                        return Ok(outer.clone());
                    }
                    match frame.parent() {
                        Some(p) => frame = p,
                        None => return Err(Unwind::Exception(ExceptionPacket::undefined_value("outer"))),
                    }
                }
            }
            Expression::UnqualifiedRequest(r) => self.eval_unqualified_request(r, scope),
            Expression::QualifiedRequest(r) => self.eval_qualified_request(r, scope),
            Expression::ObjectConstructor(o) => self.eval_object_constructor(o, scope),
            Expression::Block(b) => {
                let params = b
                    .params
                    .iter()
                    .map(|p| (p.name.name.clone(), p.pattern.clone().map(Rc::new)))
                    .collect();
                Ok(Value::Block(crate::runtime::BlockData::new(
                    params,
                    Rc::from(b.body.to_vec().into_boxed_slice()),
                    scope.clone(),
                    b.location,
                )))
            }
            Expression::TypeLiteral(t) => {
                let mut seen = std::collections::HashSet::new();
                let mut sigs = Vec::new();
                for sig in &t.signatures {
                    let parts: Vec<PartName> = sig
                        .parts
                        .iter()
                        .map(|p| {
                            if sig.is_assignment {
                                PartName::assignment(p.name.clone())
                            } else if p.is_operator {
                                PartName::operator(p.name.clone(), p.is_prefix)
                            } else {
                                PartName::plain(p.name.clone(), !p.params.is_empty())
                            }
                        })
                        .collect();
                    let key = uglify(&parts);
                    if !seen.insert(key.clone()) {
                        return Err(Unwind::Exception(ExceptionPacket::duplicate_method_name(&key)));
                    }
                    sigs.push(crate::runtime::SignatureShape::new(key));
                }
                let name = t.name.clone().unwrap_or_else(|| "<anonymous type>".to_owned());
                Ok(Value::Type(crate::runtime::Type::new(name, sigs)))
            }
            Expression::Assignment(a) => self.eval_assignment(a, scope),
        }
    }

    fn eval_self(&self, scope: &ScopeRef, location: Location) -> Result<Value, Unwind> {
        if scope.in_object_construction.get() {
            return Err(Unwind::Exception(ExceptionPacket::incomplete_object_for_self(location)));
        }
        let mut frame = scope;
        loop {
            if let Some(v) = frame.self_value() {
                return Ok(v.clone());
            }
            match frame.parent() {
                Some(p) => frame = p,
                None => return Err(Unwind::Exception(ExceptionPacket::undefined_value("self"))),
            }
        }
    }

    fn eval_unqualified_request(&mut self, r: &crate::parser::ast::UnqualifiedRequest, scope: &ScopeRef) -> Result<Value, Unwind> {
        if let [part] = r.parts.as_slice() {
            if !part.has_params && part.args.is_empty() {
                return match scope.search(&part.name) {
                    Lookup::Value(v) => Ok(v),
                    Lookup::Uninitialized => {
                        Err(Unwind::Exception(ExceptionPacket::incomplete_object_for_name(&part.name, r.location)))
                    }
                    Lookup::Missing => self.dispatch_to_self(scope, &part.name, Vec::new(), &[], r.location),
                };
            }
        }
        let (uglified, args) = self.evaluate_parts(&r.parts, scope)?;
        self.dispatch_to_self(scope, &uglified, args, &r.parts, r.location)
    }

    fn dispatch_to_self(
        &mut self,
        scope: &ScopeRef,
        uglified: &str,
        args: Vec<Value>,
        parts: &[RequestPart],
        location: Location,
    ) -> Result<Value, Unwind> {
        let self_value = self.eval_self(scope, location).ok();
        let Some(self_value) = self_value else {
            return Err(Unwind::Exception(self.unresolved_name_error(uglified, parts, location)));
        };
        match self.lookup(&self_value, uglified) {
            Some(method) => self.apply_method(method, self_value, args, location),
            None => Err(Unwind::Exception(self.unresolved_name_error(uglified, parts, location))),
        }
    }

    fn unresolved_name_error(&self, uglified: &str, parts: &[RequestPart], location: Location) -> ExceptionPacket {
        if let [single] = parts {
            if !single.has_params {
                return ExceptionPacket::unresolved_request(&single.name, location);
            }
        }
        if uglified.ends_with(":=") {
            let base = uglified.trim_end_matches(" :=");
            return ExceptionPacket::unresolved_assign_to_unresolved_name(base, location);
        }
        ExceptionPacket::unresolved_request(uglified, location)
    }

    fn eval_qualified_request(&mut self, r: &crate::parser::ast::QualifiedRequest, scope: &ScopeRef) -> Result<Value, Unwind> {
        match r.receiver.as_ref() {
            Expression::SuperExpr(location) => {
                let self_value = self.eval_self(scope, *location)?;
                let (uglified, args) = self.evaluate_parts(&r.parts, scope)?;
                let Value::Object(self_obj) = &self_value else {
                    return Err(Unwind::Exception(ExceptionPacket::unresolved_super_request(&uglified, r.location)));
                };
                let method = self_obj.borrow().shadowed_method(&uglified);
                match method {
                    Some(m) => self.apply_method(m, self_value, args, r.location),
                    None => Err(Unwind::Exception(ExceptionPacket::unresolved_super_request(&uglified, r.location))),
                }
            }
            Expression::OuterExpr(_) => {
                let mut frame = scope;
                let outer_value = loop {
                    if let Some(outer) = &frame.outer_value {
                        break outer.clone();
                    }
                    match frame.parent() {
                        Some(p) => frame = p,
                        None => return Err(Unwind::Exception(ExceptionPacket::undefined_value("outer"))),
                    }
                };
                let (uglified, args) = self.evaluate_parts(&r.parts, scope)?;
                self.send_value(outer_value, &uglified, args, r.location)
            }
            _ => {
                let receiver = self.eval_expression(&r.receiver, scope)?;
                let (uglified, args) = self.evaluate_parts(&r.parts, scope)?;
                self.send_value(receiver, &uglified, args, r.location)
            }
        }
    }

    fn evaluate_parts(&mut self, parts: &[RequestPart], scope: &ScopeRef) -> Result<(String, Vec<Value>), Unwind> {
        let mut names = Vec::with_capacity(parts.len());
        let mut args = Vec::new();
        for part in parts {
            names.push(if part.is_operator {
                PartName::operator(part.name.clone(), part.is_prefix)
            } else {
                PartName::plain(part.name.clone(), part.has_params)
            });
            for generic in &part.generics {
                args.push(self.eval_expression(generic, scope)?);
            }
            for arg in &part.args {
                args.push(self.eval_expression(arg, scope)?);
            }
        }
        Ok((uglify(&names), args))
    }

    /// Looks a method up on a value's dispatch table (the object's own
    /// table, or the prototype registered for a primitive kind).
    pub fn lookup(&self, receiver: &Value, uglified: &str) -> Option<Rc<Method>> {
        let object = self.prototype_for(receiver)?;
        let method = object.borrow().method(uglified)?;
        Some(method)
    }

    /// Public entry point for sending a message — used by natives, by the
    /// pattern-assertion module, and by qualified-request evaluation.
    pub fn send(&mut self, receiver: Value, pretty_part_name: &str, args: Vec<Value>, location: Location) -> Result<Value, Unwind> {
        let parts = vec![PartName::plain(pretty_part_name.to_owned(), !args.is_empty())];
        let uglified = uglify(&parts);
        self.send_value(receiver, &uglified, args, location)
    }

    fn send_value(&mut self, receiver: Value, uglified: &str, args: Vec<Value>, location: Location) -> Result<Value, Unwind> {
        match self.lookup(&receiver, uglified) {
            Some(method) => {
                if method.confidential {
                    return Err(Unwind::Exception(ExceptionPacket::no_such_method(
                        &receiver.describe(),
                        &method.pretty_name,
                        location,
                    )));
                }
                self.apply_method(method, receiver, args, location)
            }
            None => Err(Unwind::Exception(ExceptionPacket::no_such_method(&receiver.describe(), uglified, location))),
        }
    }

    pub fn apply_method(&mut self, method: Rc<Method>, receiver: Value, args: Vec<Value>, location: Location) -> Result<Value, Unwind> {
        let pretty_name = method.pretty_name.clone();
        let receiver_description = receiver.describe();
        self.trace.push((pretty_name.clone(), receiver_description.clone(), location));
        let mut outcome = self.apply_method_inner(method, receiver, args, location);
        self.trace.pop();
        if let Err(Unwind::Exception(packet)) = &mut outcome {
            packet.push_frame(crate::runtime::StackFrame {
                method_name: pretty_name,
                receiver_description,
                module_and_location: format!("{} at {}", self.module_path, location),
            });
        }
        outcome
    }

    fn apply_method_inner(&mut self, method: Rc<Method>, receiver: Value, args: Vec<Value>, location: Location) -> Result<Value, Unwind> {
        match &method.body {
            MethodBody::Native(f) => f.clone()(&receiver, &args, self),
            MethodBody::User { body } => {
                let closure = method.closure.clone().unwrap_or_else(Frame::root);
                let (frame, active) = Frame::method_activation(&closure, receiver);
                if args.len() != method.params.len() {
                    active.set(false);
                    return Err(Unwind::Exception(ExceptionPacket::internal(format!(
                        "'{}' expects {} argument(s), got {}",
                        method.pretty_name,
                        method.params.len(),
                        args.len()
                    ))));
                }
                for (param, arg) in method.params.iter().zip(args.into_iter()) {
                    let bound = match &param.pattern {
                        Some(p) => {
                            let pattern_value = self.eval_expression(p, &frame)?;
                            pattern::assert(self, arg, &pattern_value, method.location)?
                        }
                        None => arg,
                    };
                    frame.declare_initialized(param.name.clone(), true, bound);
                }
                let body = body.clone();
                let result = self.eval_body(&body, &frame);
                active.set(false);
                let value = match result {
                    Err(Unwind::Return { target, value }) if Rc::ptr_eq(&target, &active) => value,
                    other => other?,
                };
                match &method.return_pattern {
                    Some(pattern_expr) => {
                        let pattern_value = self.eval_expression(pattern_expr, &frame)?;
                        pattern::assert(self, value, &pattern_value, method.location)
                    }
                    None => Ok(value),
                }
            }
        }
    }

    pub fn apply_block(&mut self, block: &crate::runtime::BlockRef, args: Vec<Value>, location: Location) -> Result<Value, Unwind> {
        if args.len() != block.arity() {
            return Err(Unwind::Exception(ExceptionPacket::internal(format!(
                "block expects {} argument(s), got {}",
                block.arity(),
                args.len()
            ))));
        }
        let frame = Frame::child(&block.captured);
        for ((name, pattern), arg) in block.params.iter().zip(args.into_iter()) {
            let bound = match pattern {
                Some(p) => {
                    let pattern_value = self.eval_expression(p, &frame)?;
                    pattern::assert(self, arg, &pattern_value, location)?
                }
                None => arg,
            };
            frame.declare_initialized(name.clone(), true, bound);
        }
        self.eval_body(&block.body, &frame)
    }

    /// Whether `value` structurally satisfies `ty`: every required
    /// signature must resolve, non-confidentially, on the value's
    /// dispatch table (spec.md §4.3 "Types").
    pub fn conforms_to(&self, value: &Value, ty: &crate::runtime::Type) -> bool {
        let Some(object) = self.prototype_for(value) else { return false };
        let object = object.borrow();
        ty.signatures().iter().all(|sig| {
            object
                .method(&sig.uglified)
                .map(|m| !m.confidential)
                .unwrap_or(false)
        })
    }

    // ---- Object construction and inheritance ---------------------------

    fn eval_object_constructor(&mut self, node: &ObjectConstructor, scope: &ScopeRef) -> Result<Value, Unwind> {
        let object = ObjectData::new("an object");
        let frame = Frame::object_construction(scope, Value::Object(object.clone()));

        if let Some(inherits) = &node.inherits {
            self.apply_inherits(inherits, &object, &frame)?;
        }

        let result = self.eval_body(&node.body, &frame);
        frame.in_object_construction.set(false);
        result?;
        self.ensure_default_as_string(&object);
        Ok(Value::Object(object))
    }

    fn apply_inherits(&mut self, inherits: &InheritsClause, object: &ObjectRef, frame: &ScopeRef) -> Result<(), Unwind> {
        let parent_value = self.eval_expression(&inherits.parent, frame)?;
        match parent_value {
            Value::Object(parent_obj) => {
                object.borrow_mut().inherit_from(&parent_obj.borrow());
                Ok(())
            }
            Value::Boolean(_) | Value::Done => Ok(()),
            other => Err(Unwind::Exception(ExceptionPacket::new(
                crate::runtime::ExceptionKind::InvalidMethod,
                format!("cannot inherit from {}", other.describe()),
            ))),
        }
    }

    fn ensure_default_as_string(&self, object: &ObjectRef) {
        let has_as_string = object.borrow().method("asString").is_some();
        if has_as_string {
            return;
        }
        let label = object.borrow().label.clone();
        let text: Rc<str> = Rc::from(format!("a {label}"));
        let method = Method::native("asString", "asString", 0, Location::start(), move |_recv, _args, _interp| {
            Ok(Value::string(text.clone()))
        });
        object.borrow_mut().install_method("asString".to_owned(), method);
    }

    fn eval_assignment(&mut self, a: &crate::parser::ast::AssignmentExpr, scope: &ScopeRef) -> Result<Value, Unwind> {
        let value = self.eval_expression(&a.value, scope)?;
        match a.target.as_ref() {
            Expression::UnqualifiedRequest(r) if r.parts.len() == 1 => {
                let name = &r.parts[0].name;
                let declared_pattern = match scope.self_value() {
                    Some(Value::Object(self_obj)) => self_obj.borrow().field_pattern(name),
                    _ => None,
                };
                let value = match declared_pattern {
                    Some((pattern_expr, pattern_scope)) => {
                        let pattern_value = self.eval_expression(&pattern_expr, &pattern_scope)?;
                        pattern::assert(self, value, &pattern_value, a.location)?
                    }
                    None => value,
                };
                match scope.assign(name, value.clone()) {
                    AssignOutcome::Ok => Ok(value),
                    AssignOutcome::Uninitialized => {
                        Err(Unwind::Exception(ExceptionPacket::incomplete_object_for_name(name, a.location)))
                    }
                    AssignOutcome::Immutable => {
                        Err(Unwind::Exception(ExceptionPacket::unresolved_assign_to_name(name, a.location)))
                    }
                    AssignOutcome::Missing => {
                        Err(Unwind::Exception(ExceptionPacket::unresolved_assign_to_unresolved_name(name, a.location)))
                    }
                }
            }
            Expression::QualifiedRequest(r) if r.parts.len() == 1 => {
                let receiver = self.eval_expression(&r.receiver, scope)?;
                let setter = format!("{} :=", r.parts[0].name);
                self.send(receiver, &setter, vec![value.clone()], a.location)?;
                Ok(value)
            }
            _ => Err(Unwind::Exception(ExceptionPacket::internal("invalid assignment target"))),
        }
    }
}

/// Reifies a statement list as the "list value" spec.md §4.5 hands to a
/// dialect's `check` method: `size`, `at(index)` (a source-text rendering of
/// the node, via [`crate::parser::ast::format_statement`] — this core has no
/// structured AST-reflection value, so a node's printed form is what a
/// checker written against this object gets to pattern-match on), and
/// `asString`.
fn node_list_value(statements: &[Statement]) -> Value {
    let object = ObjectData::new("a node list");
    let descriptions: Rc<[String]> = statements.iter().map(crate::parser::ast::format_statement).collect();
    let count = descriptions.len();

    let size_method = Method::native("size", "size", 0, Location::start(), move |_receiver, _args, _interp| {
        Ok(Value::number(count as f64))
    });
    object.borrow_mut().install_method(size_method.uglified_name.clone(), size_method);

    let at_descriptions = descriptions.clone();
    let at_method = Method::native("at", "at", 1, Location::start(), move |_receiver, args, _interp| {
        let index = args[0]
            .as_number()
            .ok_or_else(|| ExceptionPacket::type_mismatch(&args[0].describe(), "a Number", Location::start()))?
            as usize;
        at_descriptions
            .get(index)
            .map(|s| Value::string(s.as_str()))
            .ok_or_else(|| ExceptionPacket::internal(format!("node list index {index} out of range")).into())
    });
    object.borrow_mut().install_method(at_method.uglified_name.clone(), at_method);

    let as_string_method = Method::native("asString", "asString", 0, Location::start(), move |_receiver, _args, _interp| {
        Ok(Value::string(descriptions.join("\n")))
    });
    object.borrow_mut().install_method(as_string_method.uglified_name.clone(), as_string_method);

    Value::Object(object)
}
