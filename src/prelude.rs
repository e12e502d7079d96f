//! The default prelude: the minimal `self` every module sees before a
//! `dialect` declaration (if any) replaces it, plus the primitive prototypes
//! (`Number`, `String`, `Boolean`, `Block`, ...) that back method dispatch on
//! non-object receivers.
//!
//! `spec.md` §6 deliberately excludes "building the prelude object from the
//! host's standard library" from the core — what's here is the handful of
//! operations the core's own tests and worked examples need to be runnable
//! at all (arithmetic, comparison, concatenation, block calling), not a
//! general-purpose standard library. A host embedding this crate is expected
//! to extend or replace this object before running real programs.

use std::rc::Rc;

use crate::interpreter::Interpreter;
use crate::lexer::Location;
use crate::runtime::{ExceptionKind, ExceptionPacket, Method, ObjectData, ObjectRef, Value};

const HERE: Location = Location { line: 1, column: 1 };

fn add_method(object: &ObjectRef, method: Rc<Method>) {
    object.borrow_mut().install_method(method.uglified_name.clone(), method);
}

fn number_prototype() -> ObjectRef {
    let object = ObjectData::new("Number");

    fn binary(op: &'static str, f: impl Fn(f64, f64) -> f64 + 'static) -> Rc<Method> {
        Method::native(op, op, 1, HERE, move |receiver, args, _| {
            let a = receiver.as_number().expect("Number method called on non-number receiver");
            let b = args[0]
                .as_number()
                .ok_or_else(|| ExceptionPacket::type_mismatch(&args[0].describe(), "a Number", HERE))?;
            Ok(Value::number(f(a, b)))
        })
    }

    fn comparison(op: &'static str, f: impl Fn(f64, f64) -> bool + 'static) -> Rc<Method> {
        Method::native(op, op, 1, HERE, move |receiver, args, _| {
            let a = receiver.as_number().expect("Number method called on non-number receiver");
            let b = args[0]
                .as_number()
                .ok_or_else(|| ExceptionPacket::type_mismatch(&args[0].describe(), "a Number", HERE))?;
            Ok(Value::boolean(f(a, b)))
        })
    }

    add_method(&object, binary("+", |a, b| a + b));
    add_method(&object, binary("-", |a, b| a - b));
    add_method(&object, binary("*", |a, b| a * b));
    add_method(&object, binary("/", |a, b| a / b));
    add_method(&object, binary("^", |a, b| a.powf(b)));
    add_method(&object, comparison("<", |a, b| a < b));
    add_method(&object, comparison(">", |a, b| a > b));
    add_method(&object, comparison("<=", |a, b| a <= b));
    add_method(&object, comparison(">=", |a, b| a >= b));
    add_method(&object, comparison("==", |a, b| a == b));
    add_method(&object, comparison("!=", |a, b| a != b));
    add_method(
        &object,
        Method::native("prefix-", "prefix-", 0, HERE, |receiver, _args, _| {
            Ok(Value::number(-receiver.as_number().expect("prefix- called on non-number")))
        }),
    );
    add_method(
        &object,
        Method::native("asString", "asString", 0, HERE, |receiver, _args, _| {
            Ok(Value::string(receiver.as_number().expect("asString called on non-number").to_string()))
        }),
    );
    object
}

fn string_prototype() -> ObjectRef {
    let object = ObjectData::new("String");

    add_method(
        &object,
        Method::native("++", "++", 1, HERE, |receiver, args, interpreter| {
            let left = receiver.as_str().expect("++ called on non-string receiver");
            let right = match args[0].as_str() {
                Some(s) => s.to_owned(),
                None => interpreter
                    .send(args[0].clone(), "asString", Vec::new(), HERE)?
                    .as_str()
                    .unwrap_or_default()
                    .to_owned(),
            };
            Ok(Value::string(format!("{left}{right}")))
        }),
    );
    add_method(
        &object,
        Method::native("==", "==", 1, HERE, |receiver, args, _| {
            let left = receiver.as_str().expect("== called on non-string receiver");
            Ok(Value::boolean(args[0].as_str() == Some(left)))
        }),
    );
    add_method(
        &object,
        Method::native("asString", "asString", 0, HERE, |receiver, _args, _| Ok(receiver.clone())),
    );
    object
}

fn boolean_prototype() -> ObjectRef {
    let object = ObjectData::new("Boolean");

    add_method(
        &object,
        Method::native("&&", "&&", 1, HERE, |receiver, args, _| {
            let a = receiver.as_boolean().expect("&& called on non-boolean receiver");
            let b = args[0]
                .as_boolean()
                .ok_or_else(|| ExceptionPacket::type_mismatch(&args[0].describe(), "a Boolean", HERE))?;
            Ok(Value::boolean(a && b))
        }),
    );
    add_method(
        &object,
        Method::native("||", "||", 1, HERE, |receiver, args, _| {
            let a = receiver.as_boolean().expect("|| called on non-boolean receiver");
            let b = args[0]
                .as_boolean()
                .ok_or_else(|| ExceptionPacket::type_mismatch(&args[0].describe(), "a Boolean", HERE))?;
            Ok(Value::boolean(a || b))
        }),
    );
    add_method(
        &object,
        Method::native("prefix!", "prefix!", 0, HERE, |receiver, _args, _| {
            Ok(Value::boolean(!receiver.as_boolean().expect("prefix! called on non-boolean")))
        }),
    );
    add_method(
        &object,
        Method::native("asString", "asString", 0, HERE, |receiver, _args, _| {
            Ok(Value::string(receiver.as_boolean().expect("asString called on non-boolean").to_string()))
        }),
    );
    object
}

fn done_prototype() -> ObjectRef {
    let object = ObjectData::new("Done");
    add_method(
        &object,
        Method::native("asString", "asString", 0, HERE, |_receiver, _args, _| Ok(Value::string("done"))),
    );
    object
}

/// Blocks answer `value`, `value(a)`, `value(a)value(b)`, … up to this
/// arity; a call shaped beyond it falls through to `NoSuchMethod` same as
/// any other unrecognised selector.
const MAX_BLOCK_ARITY: usize = 8;

fn block_prototype() -> ObjectRef {
    let object = ObjectData::new("Block");
    for arity in 0..=MAX_BLOCK_ARITY {
        let selector = if arity == 0 {
            "value".to_owned()
        } else {
            std::iter::repeat("value").take(arity).collect::<Vec<_>>().join("_")
        };
        add_method(
            &object,
            Method::native(selector.clone(), selector, arity, HERE, |receiver, args, interpreter| {
                let block = receiver.as_block().expect("value() called on non-block receiver");
                interpreter.apply_block(block, args.to_vec(), block.location)
            }),
        );
    }
    object
}

fn exception_prototype() -> ObjectRef {
    let object = ObjectData::new("Exception");
    add_method(
        &object,
        Method::native("asString", "asString", 0, HERE, |receiver, _args, _| match receiver {
            Value::Exception(packet) => Ok(Value::string(packet.message.clone())),
            _ => unreachable!("asString called on non-exception receiver"),
        }),
    );
    object
}

fn install_print(prelude: &ObjectRef) {
    add_method(
        prelude,
        Method::native("print", "print", 1, HERE, |_receiver, args, interpreter| {
            let text = match args[0].as_str() {
                Some(s) => s.to_owned(),
                None => interpreter.send(args[0].clone(), "asString", Vec::new(), HERE)?.describe(),
            };
            println!("{text}");
            Ok(Value::Done)
        }),
    );
}

fn install_exception_kind_names(prelude: &ObjectRef) {
    for kind in [
        ExceptionKind::NoSuchMethod,
        ExceptionKind::UndefinedValue,
        ExceptionKind::TypeMismatch,
        ExceptionKind::InvalidReturn,
        ExceptionKind::Redefinition,
        ExceptionKind::IncompleteObject,
        ExceptionKind::InvalidMethod,
        ExceptionKind::InvalidType,
        ExceptionKind::InvalidRequest,
        ExceptionKind::UnresolvedRequest,
        ExceptionKind::UnresolvedSuperRequest,
        ExceptionKind::UnresolvedModule,
        ExceptionKind::InternalError,
        ExceptionKind::CheckerFailure,
    ] {
        let name = kind.to_string();
        add_method(
            prelude,
            Method::native(name.clone(), name.clone(), 0, HERE, move |_receiver, _args, _| {
                Ok(Value::string(name.clone()))
            }),
        );
    }
}

/// Installs a bare getter method answering a fixed value — how the prelude
/// exposes its singletons (`done`, `true`, `false`, `Unknown`, `Object`),
/// since requests dispatch against an object's method table, never its slots
/// (`src/runtime/object.rs`).
fn install_constant(object: &ObjectRef, name: &'static str, value: Value) {
    add_method(
        object,
        Method::native(name, name, 0, HERE, move |_receiver, _args, _| Ok(value.clone())),
    );
}

/// The primitive prototypes backing method dispatch on non-object receivers,
/// independent of any particular [`Interpreter`] instance — the module
/// coordinator (`src/module.rs`) clones this map into every nested
/// interpreter it spins up for an imported module, rather than relying on
/// this crate's single long-lived `Interpreter` that a simpler host might
/// use directly.
pub fn prototypes() -> std::collections::HashMap<&'static str, ObjectRef> {
    let mut map = std::collections::HashMap::new();
    map.insert("Number", number_prototype());
    map.insert("String", string_prototype());
    map.insert("Boolean", boolean_prototype());
    map.insert("Done", done_prototype());
    map.insert("Block", block_prototype());
    map.insert("Exception", exception_prototype());
    map
}

/// Builds the default prelude object on its own, with no [`Interpreter`] to
/// install prototypes onto — what [`crate::module::ModuleTable`] calls so it
/// can pair the prelude with [`prototypes`] for every nested interpreter it
/// constructs.
pub fn build() -> Value {
    let prelude = ObjectData::new("prelude");
    install_constant(&prelude, "done", Value::Done);
    install_constant(&prelude, "true", Value::boolean(true));
    install_constant(&prelude, "false", Value::boolean(false));
    install_constant(
        &prelude,
        "Unknown",
        Value::Object(ObjectData::new(crate::interpreter::pattern::UNKNOWN_SINGLETON_NAME)),
    );
    install_constant(&prelude, "Object", Value::Object(ObjectData::new("Object")));

    install_print(&prelude);
    install_exception_kind_names(&prelude);

    Value::Object(prelude)
}

/// Builds the default prelude object and installs its primitive prototypes
/// on `interpreter`. Called once per standalone [`Interpreter`] that isn't
/// going through [`crate::module::ModuleTable`] (e.g. a unit test).
pub fn install(interpreter: &mut Interpreter) -> Value {
    for (kind, object) in prototypes() {
        interpreter.install_prototype(kind, object);
    }
    build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_prototype_answers_arithmetic() {
        let mut interpreter = Interpreter::new("test");
        install(&mut interpreter);
        let result = interpreter.send(Value::number(2.0), "+", vec![Value::number(3.0)], HERE).unwrap();
        assert_eq!(result.as_number(), Some(5.0));
    }

    #[test]
    fn string_prototype_concatenates() {
        let mut interpreter = Interpreter::new("test");
        install(&mut interpreter);
        let result = interpreter
            .send(Value::string("a"), "++", vec![Value::string("b")], HERE)
            .unwrap();
        assert_eq!(result.as_str(), Some("ab"));
    }

    #[test]
    fn prelude_exposes_expected_names() {
        let mut interpreter = Interpreter::new("test");
        let prelude = install(&mut interpreter);
        let done = interpreter.send(prelude.clone(), "done", Vec::new(), HERE).unwrap();
        assert_eq!(done, Value::Done);
    }
}
