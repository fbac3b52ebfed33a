//! Shared types for the httpdesign compiler
//!
//! This crate contains the resolved HTTP model produced by `httpdesign-core`
//! and consumed by the `httpdesign` CLI and by downstream generators. It is
//! the stable contract between the engine and anything that renders it.

pub mod model;

// Re-export commonly used types
pub use model::{
    ApiModel, EndpointModel, ErrorModel, FieldModel, ParamModel, ResolvedModel, ResponseModel,
    RouteModel, SchemeModel, ServiceModel, TagModel, TypeModel, TypeRef,
};

/// Version of the resolved model layout, bumped on incompatible changes.
pub const MODEL_VERSION: u32 = 1;
