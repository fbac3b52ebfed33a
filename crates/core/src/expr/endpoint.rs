//! HTTP part of the expression graph.
//!
//! The fields documented as "set by finalize" are empty while the design is
//! being evaluated and are only read afterwards.

use std::fmt;

use super::attribute::Attribute;
use super::mapped::MappedAttribute;
use super::root::SchemeKind;
use crate::http::route;

/// Default status of a response with a body.
pub const STATUS_OK: u16 = 200;
/// Default status of a response without body.
pub const STATUS_NO_CONTENT: u16 = 204;
/// Default status of error responses.
pub const STATUS_BAD_REQUEST: u16 = 400;

/// Meta key marking a body declared as `Body("attr")`: the body is the
/// payload (or result) attribute named by the meta value.
pub const BODY_ORIGIN_META: &str = "origin:attribute";

/// Name of the endpoint used as canonical endpoint when none is set.
pub const DEFAULT_CANONICAL_ENDPOINT: &str = "show";

/// HTTP method of a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Verb {
    /// `GET`
    Get,
    /// `HEAD`
    Head,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `DELETE`
    Delete,
    /// `CONNECT`
    Connect,
    /// `OPTIONS`
    Options,
    /// `TRACE`
    Trace,
    /// `PATCH`
    Patch,
}

impl Verb {
    /// Every verb.
    pub const ALL: [Self; 9] = [
        Self::Get,
        Self::Head,
        Self::Post,
        Self::Put,
        Self::Delete,
        Self::Connect,
        Self::Options,
        Self::Trace,
        Self::Patch,
    ];

    /// Upper case name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Connect => "CONNECT",
            Self::Options => "OPTIONS",
            Self::Trace => "TRACE",
            Self::Patch => "PATCH",
        }
    }

    /// Parse a verb, ignoring case.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// API level HTTP properties and the HTTP services.
#[derive(Debug, Clone, Default)]
pub struct HttpRoot {
    /// Base path prepended to every service path.
    pub path: String,
    /// Params shared by every endpoint.
    pub params: MappedAttribute,
    /// Headers shared by every endpoint.
    pub headers: MappedAttribute,
    /// Error responses shared by every endpoint.
    pub errors: Vec<HttpError>,
    /// HTTP services in declaration order.
    pub services: Vec<HttpService>,
}

impl HttpRoot {
    /// Service named `name`.
    pub fn service(&self, name: &str) -> Option<&HttpService> {
        self.services.iter().find(|s| s.name == name)
    }

    /// Position of the service named `name`.
    pub fn service_index(&self, name: &str) -> Option<usize> {
        self.services.iter().position(|s| s.name == name)
    }
}

/// HTTP view of a service.
#[derive(Debug, Clone, Default)]
pub struct HttpService {
    /// Service name.
    pub name: String,
    /// Base paths as declared with `Path`.
    pub paths: Vec<String>,
    /// Params shared by the service endpoints.
    pub params: MappedAttribute,
    /// Headers shared by the service endpoints.
    pub headers: MappedAttribute,
    /// Parent service.
    pub parent: Option<String>,
    /// Endpoint providing the canonical route, `show` when unset.
    pub canonical_endpoint: Option<String>,
    /// Endpoints in declaration order.
    pub endpoints: Vec<Endpoint>,
    /// Error responses shared by the service endpoints.
    pub errors: Vec<HttpError>,
    /// Base paths prefixed with the API or parent paths, set by finalize.
    pub full_paths: Vec<String>,
}

impl HttpService {
    /// Endpoint named `name`.
    pub fn endpoint(&self, name: &str) -> Option<&Endpoint> {
        self.endpoints.iter().find(|e| e.name == name)
    }

    /// Name of the canonical endpoint.
    pub fn canonical_endpoint_name(&self) -> &str {
        self.canonical_endpoint
            .as_deref()
            .unwrap_or(DEFAULT_CANONICAL_ENDPOINT)
    }

    /// The canonical endpoint, if declared.
    pub fn canonical(&self) -> Option<&Endpoint> {
        self.endpoint(self.canonical_endpoint_name())
    }
}

/// HTTP view of a method.
#[derive(Debug, Clone, Default)]
pub struct Endpoint {
    /// Name of the method, also the endpoint name.
    pub name: String,
    /// Service of the method.
    pub service: String,
    /// Routes in declaration order.
    pub routes: Vec<Route>,
    /// Path and query string parameters.
    pub params: MappedAttribute,
    /// Request headers.
    pub headers: MappedAttribute,
    /// Request body, computed by finalize unless declared with `Body`.
    pub body: Option<Attribute>,
    /// Success responses.
    pub responses: Vec<Response>,
    /// Error responses.
    pub errors: Vec<HttpError>,
    /// `MapParams`: `Some("")` maps the whole payload, `Some(attr)` one attribute.
    pub map_query_params: Option<String>,
    /// Decode the request body as multipart.
    pub multipart_request: bool,
    /// Subset of `params` bound to route wildcards, set by finalize.
    pub path_params: MappedAttribute,
    /// Subset of `params` read from the query string, set by finalize.
    pub query_params: MappedAttribute,
    /// Security schemes and where their credentials travel, set by finalize.
    pub security: Vec<ResolvedScheme>,
}

impl Endpoint {
    /// True when every route ignores the service and API base paths.
    pub fn has_absolute_routes(&self) -> bool {
        self.routes.iter().all(Route::is_absolute)
    }

    /// Wildcard names across every route, in order of appearance.
    pub fn route_params(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for r in &self.routes {
            for p in r.params() {
                if !names.contains(&p) {
                    names.push(p);
                }
            }
        }
        names
    }
}

/// A verb and path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// HTTP method.
    pub verb: Verb,
    /// Path template, `//` prefix marks an absolute path.
    pub path: String,
    /// One path per service base path, set by finalize.
    pub full_paths: Vec<String>,
}

impl Route {
    /// Route with no full paths yet.
    pub fn new(verb: Verb, path: impl Into<String>) -> Self {
        Self {
            verb,
            path: path.into(),
            full_paths: Vec::new(),
        }
    }

    /// Whether the path ignores the service and API base paths.
    pub fn is_absolute(&self) -> bool {
        self.path.starts_with("//")
    }

    /// Wildcards of every full path, duplicates removed.
    pub fn params(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for p in &self.full_paths {
            for w in route::wildcards(p) {
                if !names.contains(&w) {
                    names.push(w);
                }
            }
        }
        names
    }
}

/// An HTTP response.
#[derive(Debug, Clone, Default)]
pub struct Response {
    /// Status code, 0 while unset.
    pub status: u16,
    /// Free form description.
    pub description: Option<String>,
    /// Result attribute value selecting this response.
    pub tag: Option<Tag>,
    /// Response headers.
    pub headers: MappedAttribute,
    /// Response body, computed by finalize unless declared with `Body`.
    pub body: Option<Attribute>,
    /// Content type of the body.
    pub content_type: Option<String>,
}

impl Response {
    /// Empty response with `status`.
    pub fn with_status(status: u16) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }
}

/// Response discriminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    /// Result attribute name.
    pub name: String,
    /// Value selecting the response.
    pub value: String,
}

/// Mapping of a named error to an HTTP response.
#[derive(Debug, Clone, Default)]
pub struct HttpError {
    /// Error name.
    pub name: String,
    /// Response written for the error.
    pub response: Response,
}

impl HttpError {
    /// Error mapped to an empty response with `status`.
    pub fn new(name: impl Into<String>, status: u16) -> Self {
        Self {
            name: name.into(),
            response: Response::with_status(status),
        }
    }
}

/// Where a credential travels when it is not in the `Authorization` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamLocation {
    /// A request header.
    Header,
    /// A query string parameter.
    Query,
}

impl ParamLocation {
    /// Lower case name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Header => "header",
            Self::Query => "query",
        }
    }
}

/// A security scheme applied to an endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedScheme {
    /// Scheme name.
    pub scheme: String,
    /// Scheme kind.
    pub kind: SchemeKind,
    /// Payload attribute holding the credential, `None` for basic auth or
    /// when the payload defines no tagged attribute.
    pub attribute: Option<String>,
    /// Every payload attribute carrying credentials: the tagged username and
    /// password for basic auth, `attribute` for the other kinds.
    pub attributes: Vec<String>,
    /// Where the credential travels, `None` when the payload has no credential.
    pub location: Option<ParamLocation>,
    /// Header or param name carrying the credential.
    pub wire_name: Option<String>,
}
