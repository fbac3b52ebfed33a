//! HTTP transport mapping: path resolution, inheritance, body derivation,
//! finalization and validation.

mod body;
mod finalize;
mod inherit;
pub mod route;
mod validate;

pub use body::{REQUEST_SUFFIX, RESPONSE_SUFFIX};
pub use finalize::{AUTHORIZATION, finalize};
pub use validate::validate;
