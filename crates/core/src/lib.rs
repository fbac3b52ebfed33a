//! httpdesign core engine
//!
//! Evaluates declarative HTTP API designs into an expression graph, resolves
//! inheritance, routes and transport mapping, validates the result and
//! exports the resolved model defined in `httpdesign-common`.
//!
//! Designs are written against [`Dsl`] or loaded from YAML, JSON or TOML
//! documents (see [`document`]).

pub mod compiler;
pub mod document;
pub mod dsl;
pub mod error;
pub mod eval;
pub mod export;
pub mod expr;
pub mod http;
pub mod location;
pub mod naming;

pub use compiler::{compile, compile_document, compile_file, compile_root, compile_str};
pub use document::{Document, Format};
pub use dsl::{Dsl, ResponseKey, TypeSpec};
pub use error::{Diagnostic, DiagnosticKind, Diagnostics, Error, Result};
pub use httpdesign_common::ResolvedModel;
