//! Value and method-table model: the second of the three subsystems
//! described by spec.md — objects, blocks, types, and exceptions, plus the
//! method-name uglification rules that tie signatures to dispatch keys.

mod block;
mod exception;
mod method;
mod object;
mod types;
mod uglify;
mod value;

pub use block::{BlockData, BlockRef};
pub use exception::{ExceptionKind, ExceptionPacket, StackFrame};
pub use method::{Method, MethodBody, NativeFn, ParamArity, ParamSpec, PartShape};
pub use object::{ObjectData, ObjectRef};
pub use types::{SignatureShape, Type, TypeProxyData, TypeProxyRef};
pub use uglify::{pretty_name, uglify, PartName};
pub use value::Value;
