//! Transport agnostic part of the expression graph: API, services, methods,
//! errors and security schemes.

use super::attribute::Attribute;
use super::endpoint::HttpRoot;
use super::types::TypeRegistry;

/// The whole design.
#[derive(Debug, Clone, Default)]
pub struct Root {
    /// API level properties.
    pub api: Api,
    /// Named types.
    pub types: TypeRegistry,
    /// Security schemes.
    pub schemes: Vec<SecurityScheme>,
    /// Services in declaration order.
    pub services: Vec<Service>,
    /// HTTP mapping.
    pub http: HttpRoot,
}

impl Root {
    /// Service named `name`.
    pub fn service(&self, name: &str) -> Option<&Service> {
        self.services.iter().find(|s| s.name == name)
    }

    /// Method `method` of service `service`.
    pub fn method(&self, service: &str, method: &str) -> Option<&Method> {
        self.service(service)
            .and_then(|s| s.methods.iter().find(|m| m.name == method))
    }

    /// Security scheme named `name`.
    pub fn scheme(&self, name: &str) -> Option<&SecurityScheme> {
        self.schemes.iter().find(|s| s.name == name)
    }

    /// Error definition visible from a method: method first, then service, then API.
    pub fn error(&self, service: &str, method: &str, name: &str) -> Option<&MethodError> {
        self.method(service, method)
            .and_then(|m| named_error(&m.errors, name))
            .or_else(|| {
                self.service(service)
                    .and_then(|s| named_error(&s.errors, name))
            })
            .or_else(|| named_error(&self.api.errors, name))
    }
}

fn named_error<'a>(errors: &'a [MethodError], name: &str) -> Option<&'a MethodError> {
    errors.iter().find(|e| e.name == name)
}

/// API level properties.
#[derive(Debug, Clone, Default)]
pub struct Api {
    /// API name.
    pub name: String,
    /// Title.
    pub title: Option<String>,
    /// Free form description.
    pub description: Option<String>,
    /// API version.
    pub version: Option<String>,
    /// Errors every method may return.
    pub errors: Vec<MethodError>,
    /// Default security requirements.
    pub requirements: Vec<Requirement>,
}

/// A service and its methods.
#[derive(Debug, Clone, Default)]
pub struct Service {
    /// Service name.
    pub name: String,
    /// Free form description.
    pub description: Option<String>,
    /// Methods in declaration order.
    pub methods: Vec<Method>,
    /// Errors every method of the service may return.
    pub errors: Vec<MethodError>,
    /// Security requirements of the methods.
    pub requirements: Vec<Requirement>,
}

/// A service method.
#[derive(Debug, Clone, Default)]
pub struct Method {
    /// Method name.
    pub name: String,
    /// Free form description.
    pub description: Option<String>,
    /// Payload, empty when the method takes none.
    pub payload: Attribute,
    /// Result, empty when the method returns nothing.
    pub result: Attribute,
    /// Errors the method may return.
    pub errors: Vec<MethodError>,
    /// Security requirements, overriding the service's.
    pub requirements: Vec<Requirement>,
    /// Set by `NoSecurity`: the method ignores inherited requirements.
    pub no_security: bool,
}

/// A named error a method may return.
#[derive(Debug, Clone, Default)]
pub struct MethodError {
    /// Error name.
    pub name: String,
    /// Error type.
    pub attribute: Attribute,
}

/// Kind of a security scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemeKind {
    /// HTTP basic auth.
    Basic,
    /// API key.
    ApiKey,
    /// JSON web token.
    Jwt,
    /// OAuth2 access token.
    OAuth2,
}

impl SchemeKind {
    /// Lower case name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::ApiKey => "apikey",
            Self::Jwt => "jwt",
            Self::OAuth2 => "oauth2",
        }
    }

    /// Meta tag identifying the payload attribute carrying the credential.
    pub fn credential_tag(self, scheme: &str) -> Option<String> {
        match self {
            Self::Basic => None,
            Self::ApiKey => Some(format!("security:apikey:{scheme}")),
            Self::Jwt => Some("security:token".to_string()),
            Self::OAuth2 => Some("security:accesstoken".to_string()),
        }
    }
}

/// A named security scheme.
#[derive(Debug, Clone)]
pub struct SecurityScheme {
    /// Scheme name.
    pub name: String,
    /// Scheme kind.
    pub kind: SchemeKind,
    /// Free form description.
    pub description: Option<String>,
}

/// Schemes that must all be satisfied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Requirement {
    /// Scheme names.
    pub schemes: Vec<String>,
}
