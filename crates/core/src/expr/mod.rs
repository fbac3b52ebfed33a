//! Expression graph built by the DSL and transformed by finalize.

mod attribute;
mod endpoint;
mod mapped;
mod root;
mod types;

pub use attribute::{Attribute, DataType, Object, Primitive, Validation};
pub use endpoint::{
    BODY_ORIGIN_META, DEFAULT_CANONICAL_ENDPOINT, Endpoint, HttpError, HttpRoot, HttpService, ParamLocation,
    ResolvedScheme, Response, Route, STATUS_BAD_REQUEST, STATUS_NO_CONTENT, STATUS_OK, Tag, Verb,
};
pub use mapped::MappedAttribute;
pub use root::{Api, Method, MethodError, Requirement, Root, SchemeKind, SecurityScheme, Service};
pub use types::{
    DEFAULT_VIEW, ResultInfo, TypeId, TypeRegistry, UserType, VIEW_META, View, ViewField,
};
