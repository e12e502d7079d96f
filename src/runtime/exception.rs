use std::fmt::{self, Display};

use crate::lexer::Location;

use super::value::Value;

/// The taxonomy of dynamic failures a running program can raise, per
/// spec.md §4.3/§7. Lexical and syntactic errors never reach this type —
/// they surface as [`crate::lexer::LexError`] / [`crate::parser::ParseError`]
/// before a module is ever evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionKind {
    NoSuchMethod,
    UndefinedValue,
    TypeMismatch,
    InvalidReturn,
    Redefinition,
    IncompleteObject,
    InvalidMethod,
    InvalidType,
    InvalidRequest,
    UnresolvedRequest,
    UnresolvedSuperRequest,
    UnresolvedModule,
    InternalError,
    CheckerFailure,
}

impl Display for ExceptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExceptionKind::NoSuchMethod => "NoSuchMethod",
            ExceptionKind::UndefinedValue => "UndefinedValue",
            ExceptionKind::TypeMismatch => "TypeMismatch",
            ExceptionKind::InvalidReturn => "InvalidReturn",
            ExceptionKind::Redefinition => "Redefinition",
            ExceptionKind::IncompleteObject => "IncompleteObject",
            ExceptionKind::InvalidMethod => "InvalidMethod",
            ExceptionKind::InvalidType => "InvalidType",
            ExceptionKind::InvalidRequest => "InvalidRequest",
            ExceptionKind::UnresolvedRequest => "UnresolvedRequest",
            ExceptionKind::UnresolvedSuperRequest => "UnresolvedSuperRequest",
            ExceptionKind::UnresolvedModule => "UnresolvedModule",
            ExceptionKind::InternalError => "InternalError",
            ExceptionKind::CheckerFailure => "CheckerFailure",
        };
        f.write_str(name)
    }
}

/// One frame of a request-chain stack trace, pushed at every request
/// boundary (spec.md §4.3 "Exceptions").
#[derive(Debug, Clone)]
pub struct StackFrame {
    pub method_name: String,
    pub receiver_description: String,
    pub module_and_location: String,
}

/// A value-level carrier for an error: kind tag, a descriptive inner value,
/// and the stack trace accumulated while it propagated.
#[derive(Debug, Clone)]
pub struct ExceptionPacket {
    pub kind: ExceptionKind,
    pub message: String,
    pub object: Option<Value>,
    pub trace: Vec<StackFrame>,
}

impl ExceptionPacket {
    pub fn new(kind: ExceptionKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            object: None,
            trace: Vec::new(),
        }
    }

    pub fn with_object(mut self, object: Value) -> Self {
        self.object = Some(object);
        self
    }

    pub fn push_frame(&mut self, frame: StackFrame) {
        self.trace.push(frame);
    }

    pub fn no_such_method(receiver: &str, pretty: &str, location: Location) -> Self {
        Self::new(
            ExceptionKind::NoSuchMethod,
            format!("{receiver} does not understand '{pretty}' (requested at {location})"),
        )
    }

    pub fn undefined_value(name: &str) -> Self {
        Self::new(ExceptionKind::UndefinedValue, format!("'{name}' is not yet defined"))
    }

    pub fn unresolved_request(name: &str, location: Location) -> Self {
        Self::new(
            ExceptionKind::UnresolvedRequest,
            format!("unresolved request '{name}' at {location}"),
        )
    }

    pub fn unresolved_assign_to_name(name: &str, location: Location) -> Self {
        Self::new(
            ExceptionKind::UnresolvedRequest,
            format!("'{name}' exists but is not assignable (assignment at {location})"),
        )
    }

    pub fn unresolved_assign_to_unresolved_name(name: &str, location: Location) -> Self {
        Self::new(
            ExceptionKind::UnresolvedRequest,
            format!("'{name}' is not defined, so it cannot be assigned to (at {location})"),
        )
    }

    pub fn unresolved_super_request(name: &str, location: Location) -> Self {
        Self::new(
            ExceptionKind::UnresolvedSuperRequest,
            format!("no overridden method named '{name}' (requested at {location})"),
        )
    }

    pub fn unresolved_module(path: &str) -> Self {
        Self::new(ExceptionKind::UnresolvedModule, format!("could not resolve module '{path}'"))
    }

    pub fn incomplete_object_for_self(location: Location) -> Self {
        Self::new(
            ExceptionKind::IncompleteObject,
            format!("'self' cannot be observed while its object is still under construction (at {location})"),
        )
    }

    pub fn incomplete_object_for_name(name: &str, location: Location) -> Self {
        Self::new(
            ExceptionKind::IncompleteObject,
            format!("'{name}' has not been initialized yet (read at {location})"),
        )
    }

    pub fn redefinition(name: &str, location: Location) -> Self {
        Self::new(
            ExceptionKind::Redefinition,
            format!("'{name}' is already defined in this scope (redefined at {location})"),
        )
    }

    pub fn invalid_return_outside_method(location: Location) -> Self {
        Self::new(
            ExceptionKind::InvalidReturn,
            format!("'return' used outside of a method (at {location})"),
        )
    }

    pub fn invalid_return_inside_object(location: Location) -> Self {
        Self::new(
            ExceptionKind::InvalidReturn,
            format!("'return' inside an object constructor does not exit a method (at {location})"),
        )
    }

    pub fn invalid_return_for_completed_method(location: Location) -> Self {
        Self::new(
            ExceptionKind::InvalidReturn,
            format!("'return' reached a method activation that has already completed (at {location})"),
        )
    }

    pub fn type_mismatch(value_description: &str, pattern_description: &str, location: Location) -> Self {
        Self::new(
            ExceptionKind::TypeMismatch,
            format!(
                "{value_description} does not match {pattern_description} (asserted at {location})"
            ),
        )
    }

    pub fn confidential_override_of_public(name: &str, location: Location) -> Self {
        Self::new(
            ExceptionKind::InvalidMethod,
            format!("'{name}' cannot be overridden confidentially; the inherited method is public (at {location})"),
        )
    }

    pub fn override_accessor(name: &str, location: Location) -> Self {
        Self::new(
            ExceptionKind::InvalidMethod,
            format!("'{name}' is a var's automatic accessor and cannot be overridden by a method (at {location})"),
        )
    }

    pub fn override_shape_mismatch(name: &str, expected: usize, found: usize, location: Location) -> Self {
        Self::new(
            ExceptionKind::InvalidMethod,
            format!(
                "'{name}' overrides an inherited method taking {expected} argument(s) with one taking {found} (at {location})"
            ),
        )
    }

    pub fn duplicate_method_name(name: &str) -> Self {
        Self::new(ExceptionKind::InvalidType, format!("duplicate method name '{name}' in type literal"))
    }

    pub fn self_dependent_type(name: &str, location: Location) -> Self {
        Self::new(
            ExceptionKind::InvalidType,
            format!("type '{name}' depends on itself (declared at {location})"),
        )
    }

    pub fn checker_failure(message: impl Into<String>) -> Self {
        Self::new(ExceptionKind::CheckerFailure, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ExceptionKind::InternalError, message)
    }
}

impl Display for ExceptionPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}: {}", self.kind, self.message)?;
        for frame in self.trace.iter().rev() {
            writeln!(
                f,
                "  at {} on {} ({})",
                frame.method_name, frame.receiver_description, frame.module_and_location
            )?;
        }
        Ok(())
    }
}

impl std::error::Error for ExceptionPacket {}
