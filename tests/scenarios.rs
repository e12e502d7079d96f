//! End-to-end scenarios from the language's own worked examples: a module's
//! source text goes in, a runtime [`Value`] (or an [`ExceptionPacket`]) comes
//! out. Each test here mirrors one literal input/outcome pair rather than
//! probing an internal function directly.

use parlance::interpreter::Interpreter;
use parlance::parser::ast::{Expression, ObjectConstructor};
use parlance::parser::Parser;
use parlance::prelude;
use parlance::runtime::{ExceptionKind, Value};

/// Parses `source` as a module body, evaluates it against a fresh
/// interpreter with the default prelude installed, and hands back both the
/// interpreter (so a test can send further messages to the result) and the
/// resulting object.
fn run(source: &str) -> (Interpreter, Result<Value, parlance::runtime::ExceptionPacket>) {
    let mut parser = Parser::new(source).expect("lexing failed");
    let statements = parser.parse_module().expect("parsing failed");
    let location = statements[0].location();
    let wrapper = Expression::ObjectConstructor(ObjectConstructor { inherits: None, body: statements, location });

    let mut interpreter = Interpreter::new("scenario");
    prelude::install(&mut interpreter);
    let root = parlance::interpreter::Frame::root();
    root.set_self_value(prelude::build());

    let result = interpreter.eval_expression(&wrapper, &root).map_err(|unwind| match unwind {
        parlance::interpreter::Unwind::Exception(packet) => packet,
        parlance::interpreter::Unwind::Return { value, .. } => panic!("unexpected non-local return of {value:?}"),
    });
    (interpreter, result)
}

fn here() -> parlance::lexer::Location {
    parlance::lexer::Location::new(1, 1)
}

/// [`Interpreter::send`] unwinds with [`parlance::interpreter::Unwind`]
/// rather than a bare [`parlance::runtime::ExceptionPacket`]; every
/// top-level send in these tests is expected to either succeed or raise, so
/// unwrap the `Return` case eagerly.
fn send(
    interpreter: &mut Interpreter,
    receiver: Value,
    name: &str,
    args: Vec<Value>,
) -> Result<Value, parlance::runtime::ExceptionPacket> {
    interpreter.send(receiver, name, args, here()).map_err(|unwind| match unwind {
        parlance::interpreter::Unwind::Exception(packet) => packet,
        parlance::interpreter::Unwind::Return { value, .. } => panic!("unexpected non-local return of {value:?}"),
    })
}

#[test]
fn def_hoisting_across_use() {
    let (mut interpreter, result) = run("method f { a }\ndef a = 3\nf");
    let object = result.expect("module evaluation failed");
    let answer = send(&mut interpreter, object, "f", Vec::new()).expect("sending 'f' failed");
    assert_eq!(answer.as_number(), Some(3.0));
}

#[test]
fn undeclared_name_raises_no_such_method() {
    let (mut interpreter, result) = run("method f { a }\ndef a = 3\nf");
    let object = result.expect("module evaluation failed");
    let err = send(&mut interpreter, object, "neverBound", Vec::new())
        .expect_err("expected NoSuchMethod for an undeclared name");
    assert_eq!(err.kind, ExceptionKind::NoSuchMethod);
}

#[test]
fn override_with_super() {
    let source = r#"
        def a = object {
            method m { 1 }
        }
        def b = object {
            inherits a
            method m { super.m + 10 }
        }
        b
    "#;
    let (mut interpreter, result) = run(source);
    let object = result.expect("module evaluation failed");
    let b = send(&mut interpreter, object, "b", Vec::new()).expect("reading 'b' failed");
    let answer = send(&mut interpreter, b, "m", Vec::new()).expect("sending 'm' failed");
    assert_eq!(answer.as_number(), Some(11.0));
}

#[test]
fn self_inside_incomplete_object_raises() {
    let (_interpreter, result) = run("object { def x = self }");
    let err = result.expect_err("expected IncompleteObject");
    assert_eq!(err.kind, ExceptionKind::IncompleteObject);
}

#[test]
fn type_literal_duplicate_member_raises_invalid_type() {
    let mut parser = Parser::new("type { m, m }").expect("lexing failed");
    let statements = parser.parse_module().expect("parsing failed");
    let location = statements[0].location();
    let wrapper = Expression::ObjectConstructor(ObjectConstructor { inherits: None, body: statements, location });

    let mut interpreter = Interpreter::new("scenario");
    prelude::install(&mut interpreter);
    let root = parlance::interpreter::Frame::root();
    root.set_self_value(prelude::build());

    let err = match interpreter.eval_expression(&wrapper, &root) {
        Err(parlance::interpreter::Unwind::Exception(packet)) => packet,
        other => panic!("expected InvalidType, got {other:?}"),
    };
    assert_eq!(err.kind, ExceptionKind::InvalidType);
}

#[test]
fn non_local_return_from_block_exits_enclosing_method_only() {
    let source = r#"
        method f {
            { return 2 }.value
            0
        }
    "#;
    let (mut interpreter, result) = run(source);
    let object = result.expect("module evaluation failed");
    let answer = send(&mut interpreter, object, "f", Vec::new()).expect("sending 'f' failed");
    assert_eq!(answer.as_number(), Some(2.0));
}

#[test]
fn string_interpolation_concatenates_around_the_spliced_expression() {
    let (mut interpreter, result) = run(r#"def greeting = "x={1+1}y""#);
    let object = result.expect("module evaluation failed");
    let value = send(&mut interpreter, object, "greeting", Vec::new()).expect("reading 'greeting' failed");
    assert_eq!(value.as_str(), Some("x=2y"));
}

#[test]
fn internal_reassignment_of_a_var_is_visible_through_its_external_getter() {
    let source = r#"
        var count = 0
        method bump { count := count + 1 }
    "#;
    let (mut interpreter, result) = run(source);
    let object = result.expect("module evaluation failed");
    send(&mut interpreter, object.clone(), "bump", Vec::new()).expect("sending 'bump' failed");
    let value = send(&mut interpreter, object, "count", Vec::new()).expect("reading 'count' failed");
    assert_eq!(value.as_number(), Some(1.0));
}

#[test]
fn var_setter_is_reachable_through_a_qualified_request() {
    let source = r#"
        var count = 0
        method bump { count := count + 1 }
    "#;
    let (mut interpreter, result) = run(source);
    let object = result.expect("module evaluation failed");
    send(&mut interpreter, object.clone(), "bump", Vec::new()).expect("sending 'bump' failed");
    let setter_name = "count :=";
    let after = send(&mut interpreter, object.clone(), setter_name, vec![Value::number(41.0)])
        .expect("external setter failed");
    assert!(matches!(after, Value::Done));
    let value = send(&mut interpreter, object, "count", Vec::new()).expect("reading 'count' failed");
    assert_eq!(value.as_number(), Some(41.0));
}

#[test]
fn qualified_setter_writes_the_same_store_an_unqualified_reassignment_reads() {
    let source = r#"
        var count = 0
        method bump { count := count + 1 }
    "#;
    let (mut interpreter, result) = run(source);
    let object = result.expect("module evaluation failed");
    send(&mut interpreter, object.clone(), "count :=", vec![Value::number(99.0)]).expect("external setter failed");
    send(&mut interpreter, object.clone(), "bump", Vec::new()).expect("sending 'bump' failed");
    let value = send(&mut interpreter, object, "count", Vec::new()).expect("reading 'count' failed");
    assert_eq!(value.as_number(), Some(100.0));
}

#[test]
fn qualified_setter_re_asserts_the_declared_pattern() {
    let source = r#"
        var count: [v | v > 0] := 1
    "#;
    let (mut interpreter, result) = run(source);
    let object = result.expect("module evaluation failed");
    let err = send(&mut interpreter, object, "count :=", vec![Value::number(-1.0)])
        .expect_err("expected TypeMismatch from a negative count");
    assert_eq!(err.kind, ExceptionKind::TypeMismatch);
}

#[test]
fn unqualified_reassignment_re_asserts_the_declared_pattern() {
    let source = r#"
        var count: [v | v > 0] := 1
        method setNegative { count := -1 }
    "#;
    let (mut interpreter, result) = run(source);
    let object = result.expect("module evaluation failed");
    let err = send(&mut interpreter, object, "setNegative", Vec::new())
        .expect_err("expected TypeMismatch from a negative count");
    assert_eq!(err.kind, ExceptionKind::TypeMismatch);
}

#[test]
fn generic_object_pattern_is_consulted_through_assert() {
    let source = r#"
        def isPositive = object {
            method assert(candidate) { candidate > 0 }
        }
        var count: isPositive := 1
        method setNegative { count := -1 }
    "#;
    let (mut interpreter, result) = run(source);
    let object = result.expect("module evaluation failed");
    let err = send(&mut interpreter, object, "setNegative", Vec::new())
        .expect_err("expected TypeMismatch from a pattern object's assert() returning false");
    assert_eq!(err.kind, ExceptionKind::TypeMismatch);
}
