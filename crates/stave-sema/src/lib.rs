//! Stave semantic analysis: the program model.
//!
//! Given parsed sources, the core constructs a graph of named, resolvable
//! elements (globals, functions, classes, enums, namespaces, fields,
//! properties and their typed instances) together with a type table mapping
//! type expressions to concrete types, including generic instantiations.
//!
//! The aggregate is a single [`Program`]: the initializer runs once over all
//! sources and produces a ready element graph; the resolver runs lazily,
//! driven by the emitter, memoizing every class and function instance.

pub mod elements;
pub mod errors;
pub mod flow;
mod initializer;
mod monomorph;
pub mod program;
pub mod resolver;
pub mod types;

#[cfg(test)]
mod tests;

pub use elements::{
    CommonFlags, DecoratorFlags, Element, ElementArena, ElementId, ElementKind, ElementPayload,
    OperatorKind,
};
pub use errors::{Diagnostics, SemanticError, SemanticWarning, TypeError, TypeWarning};
pub use flow::{Flow, FlowFlags};
pub use program::{Program, ProgramOptions};
pub use resolver::{ExprContext, ResolvedExpression, TypeContext};
pub use types::{
    NativeType, PointerWidth, Signature, SignatureId, Ty, TypeId, TypeIdVec, TypeRegistry,
};
