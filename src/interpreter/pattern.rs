//! Pattern assertion: deciding whether a value satisfies a parameter
//! pattern, and producing the value (possibly transformed) bound to the
//! parameter name if so (spec.md §4.1 "Patterns").
//!
//! Four kinds of pattern value are recognised: the `Unknown` singleton
//! (matches anything, used for untyped parameters), a structural `Type`
//! (checked against the value's understood messages), a `Block` (invoked as
//! a custom matcher — a boolean result decides the match, any other result
//! both confirms the match and replaces the bound value), and an ordinary
//! object exposing an `assert()` method (anything else, including
//! primitive literals used as an equality pattern).

use crate::lexer::Location;
use crate::runtime::{ExceptionPacket, Value};

use super::{Interpreter, Unwind};

pub const UNKNOWN_SINGLETON_NAME: &str = "Unknown";

pub fn assert(
    interpreter: &mut Interpreter,
    value: Value,
    pattern: &Value,
    location: Location,
) -> Result<Value, Unwind> {
    match pattern {
        Value::Object(o) if o.borrow().label == UNKNOWN_SINGLETON_NAME => Ok(value),
        Value::TypeProxy(proxy) => {
            let resolved = proxy.borrow().resolved_value().cloned();
            match resolved {
                Some(inner) => assert(interpreter, value, &inner, location),
                None => {
                    let name = proxy.borrow().name().to_owned();
                    Err(Unwind::Exception(ExceptionPacket::incomplete_object_for_name(&name, location)))
                }
            }
        }
        Value::Type(ty) => {
            if interpreter.conforms_to(&value, ty) {
                Ok(value)
            } else {
                Err(Unwind::Exception(ExceptionPacket::type_mismatch(
                    &value.describe(),
                    &format!("type {}", ty.name),
                    location,
                )))
            }
        }
        Value::Block(block) => {
            let result = interpreter.apply_block(block, vec![value.clone()], location)?;
            match result {
                Value::Boolean(true) => Ok(value),
                Value::Boolean(false) => Err(Unwind::Exception(ExceptionPacket::type_mismatch(
                    &value.describe(),
                    "the given block pattern",
                    location,
                ))),
                other => Ok(other),
            }
        }
        Value::Object(_) => {
            let result = interpreter.send(pattern.clone(), "assert", vec![value.clone()], location)?;
            match result.as_boolean() {
                Some(true) => Ok(value),
                Some(false) => Err(Unwind::Exception(ExceptionPacket::type_mismatch(
                    &value.describe(),
                    &pattern.describe(),
                    location,
                ))),
                None => Err(Unwind::Exception(ExceptionPacket::internal(format!(
                    "{} returned a non-boolean from assert()",
                    pattern.describe()
                )))),
            }
        }
        literal => {
            if literal == &value {
                Ok(value)
            } else {
                Err(Unwind::Exception(ExceptionPacket::type_mismatch(
                    &value.describe(),
                    &literal.describe(),
                    location,
                )))
            }
        }
    }
}
