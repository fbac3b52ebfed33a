//! Design documents: a YAML, JSON or TOML rendition of the declaration
//! surface.
//!
//! A document is decoded with serde and replayed through [`Dsl`], so it goes
//! through the same evaluation, finalize and validation as a design written
//! in Rust.
//!
//! ```yaml
//! api:
//!   name: calc
//! services:
//!   - name: calc
//!     methods:
//!       - name: add
//!         payload:
//!           attributes: { a: Int, b: Int }
//!           required: [a, b]
//!         result: Int
//!         http:
//!           routes: ["GET /add/{a}/{b}"]
//! ```

use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::dsl::{Dsl, ResponseKey, TypeSpec};
use crate::error::{Error, Result};
use crate::expr::{SchemeKind, Verb};

/// Encoding of a design document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// `.yaml` or `.yml`
    Yaml,
    /// `.json`
    Json,
    /// `.toml`
    Toml,
}

impl Format {
    /// Format implied by a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|ext| ext.to_str())? {
            "yaml" | "yml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            "toml" => Some(Self::Toml),
            _ => None,
        }
    }

    /// Display name used in decode errors.
    pub fn name(self) -> &'static str {
        match self {
            Self::Yaml => "YAML",
            Self::Json => "JSON",
            Self::Toml => "TOML",
        }
    }
}

/// Root of a design document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Document {
    /// API definition, a default API is used when absent.
    pub api: Option<ApiDoc>,
    /// Security schemes referenced by name from `security` lists.
    #[serde(default)]
    pub security_schemes: Vec<SchemeDoc>,
    /// User types.
    #[serde(default)]
    pub types: Vec<TypeDoc>,
    /// Result types with their views.
    #[serde(default)]
    pub result_types: Vec<ResultTypeDoc>,
    /// Services in declaration order.
    #[serde(default)]
    pub services: Vec<ServiceDoc>,
}

/// The API: name, metadata, API-wide errors, security and HTTP base path.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiDoc {
    /// API name.
    pub name: String,
    /// Title shown in generated documentation.
    pub title: Option<String>,
    /// API version.
    pub version: Option<String>,
    /// Free form description.
    pub description: Option<String>,
    /// Errors every method may return.
    #[serde(default)]
    pub errors: Vec<ErrorDoc>,
    /// Schemes required by default by every method.
    #[serde(default)]
    pub security: Vec<String>,
    /// Base path and API-wide error responses.
    pub http: Option<HttpDoc>,
}

/// Kind of a security scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemeKindDoc {
    /// HTTP basic auth.
    Basic,
    /// API key.
    #[serde(alias = "api_key")]
    ApiKey,
    /// JSON web token.
    Jwt,
    /// OAuth2 access token.
    OAuth2,
}

impl From<SchemeKindDoc> for SchemeKind {
    fn from(kind: SchemeKindDoc) -> Self {
        match kind {
            SchemeKindDoc::Basic => Self::Basic,
            SchemeKindDoc::ApiKey => Self::ApiKey,
            SchemeKindDoc::Jwt => Self::Jwt,
            SchemeKindDoc::OAuth2 => Self::OAuth2,
        }
    }
}

/// A named security scheme.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemeDoc {
    /// Scheme name.
    pub name: String,
    /// Scheme kind.
    pub kind: SchemeKindDoc,
    /// Free form description.
    pub description: Option<String>,
}

/// A user type: an object unless `type` names another shape.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TypeDoc {
    /// Type name, unique across the design.
    pub name: String,
    /// Type expression for non-object types.
    #[serde(rename = "type")]
    pub ty: Option<String>,
    /// Free form description.
    pub description: Option<String>,
    /// Object attributes in declaration order.
    #[serde(default)]
    pub attributes: IndexMap<String, AttributeDoc>,
    /// Names of the required attributes.
    #[serde(default)]
    pub required: Vec<String>,
}

/// A result type: an object type with a media type identifier and views.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResultTypeDoc {
    /// Media type identifier, e.g. `application/vnd.bottle`.
    pub identifier: String,
    /// Type name.
    pub name: String,
    /// Free form description.
    pub description: Option<String>,
    /// Content type of responses, the identifier when absent.
    pub content_type: Option<String>,
    /// Object attributes in declaration order.
    #[serde(default)]
    pub attributes: IndexMap<String, AttributeDoc>,
    /// Names of the required attributes.
    #[serde(default)]
    pub required: Vec<String>,
    /// Views, a `default` view listing every attribute is added when absent.
    #[serde(default)]
    pub views: Vec<ViewDoc>,
}

/// A named subset of the attributes of a result type.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ViewDoc {
    /// View name.
    pub name: String,
    /// Attributes rendered by the view.
    pub fields: Vec<ViewFieldDoc>,
}

/// A view field: an attribute name, optionally rendered with a nested view.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ViewFieldDoc {
    /// Attribute rendered with the default view.
    Name(String),
    /// Attribute rendered with a view of its own result type.
    WithView {
        /// Attribute name.
        name: String,
        /// View of the attribute's result type.
        view: String,
    },
}

/// An attribute: a bare type expression or a full definition.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AttributeDoc {
    /// Type expression such as `Int`, `array<String>` or a type name.
    Type(String),
    /// Definition with validations, metadata or nested attributes.
    Full(Box<AttributeSpec>),
}

/// Full attribute definition. A spec without `type` but with `attributes`
/// is an inline object.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AttributeSpec {
    /// Type expression.
    #[serde(rename = "type")]
    pub ty: Option<String>,
    /// Free form description.
    pub description: Option<String>,
    /// Default value.
    pub default: Option<Value>,
    /// Example values.
    pub examples: Vec<Value>,
    /// Allowed values.
    #[serde(rename = "enum")]
    pub enum_values: Vec<Value>,
    /// String format such as `uuid` or `date-time`.
    pub format: Option<String>,
    /// Regular expression string values must match.
    pub pattern: Option<String>,
    /// Minimum numeric value.
    pub minimum: Option<f64>,
    /// Maximum numeric value.
    pub maximum: Option<f64>,
    /// Minimum length of strings and collections.
    pub min_length: Option<usize>,
    /// Maximum length of strings and collections.
    pub max_length: Option<usize>,
    /// Arbitrary metadata.
    pub meta: IndexMap<String, Vec<String>>,
    /// Credential carried by the attribute.
    pub security: Option<CredentialDoc>,
    /// Nested object attributes.
    pub attributes: IndexMap<String, AttributeDoc>,
    /// Names of the required nested attributes.
    pub required: Vec<String>,
}

/// Credential an attribute carries for security schemes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialDoc {
    /// Basic auth username.
    Username,
    /// Basic auth password.
    Password,
    /// JWT token.
    Token,
    /// OAuth2 access token.
    AccessToken,
    /// API key of the named scheme.
    ApiKey(String),
}

impl CredentialDoc {
    fn tag(&self) -> String {
        match self {
            Self::Username => "security:username".to_string(),
            Self::Password => "security:password".to_string(),
            Self::Token => SchemeKind::Jwt.credential_tag("").unwrap_or_default(),
            Self::AccessToken => SchemeKind::OAuth2.credential_tag("").unwrap_or_default(),
            Self::ApiKey(scheme) => SchemeKind::ApiKey.credential_tag(scheme).unwrap_or_default(),
        }
    }
}

/// A named error, an `ErrorResult` struct unless `type` is given.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ErrorDoc {
    /// Error name.
    pub name: String,
    /// Type expression of the error attribute.
    #[serde(rename = "type")]
    pub ty: Option<String>,
}

/// A service and its methods.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceDoc {
    /// Service name.
    pub name: String,
    /// Free form description.
    pub description: Option<String>,
    /// Errors every method of the service may return.
    #[serde(default)]
    pub errors: Vec<ErrorDoc>,
    /// Schemes required by the methods of the service.
    #[serde(default)]
    pub security: Vec<String>,
    /// Base paths, parent, params, headers and error responses.
    pub http: Option<HttpDoc>,
    /// Methods in declaration order.
    #[serde(default)]
    pub methods: Vec<MethodDoc>,
}

/// A service method.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MethodDoc {
    /// Method name.
    pub name: String,
    /// Free form description.
    pub description: Option<String>,
    /// Payload attribute.
    pub payload: Option<AttributeDoc>,
    /// Result attribute.
    pub result: Option<AttributeDoc>,
    /// View of the result type rendered by the method.
    pub result_view: Option<String>,
    /// Errors the method may return.
    #[serde(default)]
    pub errors: Vec<ErrorDoc>,
    /// Schemes required by the method, overriding the service's.
    #[serde(default)]
    pub security: Vec<String>,
    /// Disable every inherited security requirement.
    #[serde(default)]
    pub no_security: bool,
    /// Transport mapping of the method.
    pub http: Option<HttpDoc>,
}

/// HTTP properties of the API, a service or a method. Fields that do not
/// apply at a level are reported as invalid uses.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpDoc {
    /// Single base path.
    pub path: Option<String>,
    /// Several base paths of a service.
    pub paths: Vec<String>,
    /// Parent service.
    pub parent: Option<String>,
    /// Endpoint whose first route prefixes child service paths.
    pub canonical_method: Option<String>,
    /// Routes of a method.
    pub routes: Vec<RouteDoc>,
    /// Path and query params, `attribute:wire` names allowed.
    pub params: IndexMap<String, Option<AttributeDoc>>,
    /// Headers, `attribute:wire` names allowed.
    pub headers: IndexMap<String, Option<AttributeDoc>>,
    /// Explicit request body.
    pub body: Option<BodyDoc>,
    /// Payload attribute decoded from the query string, empty for the whole
    /// payload.
    pub map_params: Option<String>,
    /// Decode the request body as multipart.
    pub multipart_request: bool,
    /// Success and error responses.
    pub responses: Vec<ResponseDoc>,
}

/// A route written as `"VERB /path"`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct RouteDoc {
    /// HTTP method.
    pub verb: Verb,
    /// Path relative to the service base paths.
    pub path: String,
}

impl TryFrom<String> for RouteDoc {
    type Error = String;

    fn try_from(route: String) -> Result<Self, Self::Error> {
        let (verb, path) = route
            .trim()
            .split_once(char::is_whitespace)
            .unwrap_or((route.trim(), ""));
        let verb = Verb::from_name(verb)
            .ok_or_else(|| format!("invalid route {route:?}: unknown HTTP method {verb:?}"))?;
        Ok(Self {
            verb,
            path: path.trim().to_string(),
        })
    }
}

/// Body of a request or response: a payload (result) attribute, a type or
/// an object listing attributes.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BodyDoc {
    /// Payload (result) attribute used as body.
    pub attribute: Option<String>,
    /// Type expression of the body.
    #[serde(rename = "type")]
    pub ty: Option<String>,
    /// Attributes listed in an object body.
    pub attributes: IndexMap<String, Option<AttributeDoc>>,
    /// Names of the required body attributes.
    pub required: Vec<String>,
}

/// A success response (`status`) or an error response (`error` and `code`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResponseDoc {
    /// Status of a success response.
    pub status: Option<u16>,
    /// Name of the error the response maps.
    pub error: Option<String>,
    /// Status of an error response.
    pub code: Option<u16>,
    /// Free form description.
    pub description: Option<String>,
    /// Result attribute value selecting the response.
    pub tag: Option<TagDoc>,
    /// Response headers.
    pub headers: IndexMap<String, Option<AttributeDoc>>,
    /// Explicit response body.
    pub body: Option<BodyDoc>,
    /// Content type of the response.
    pub content_type: Option<String>,
}

/// Result attribute name and value selecting a response.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TagDoc {
    /// Result attribute name.
    pub name: String,
    /// Value selecting the response.
    pub value: String,
}

impl Document {
    /// Decode a document.
    pub fn parse(text: &str, format: Format) -> Result<Self> {
        let decoded = match format {
            Format::Yaml => serde_yaml::from_str(text).map_err(|e| e.to_string()),
            Format::Json => serde_json::from_str(text).map_err(|e| e.to_string()),
            Format::Toml => toml::from_str(text).map_err(|e| e.to_string()),
        };
        decoded.map_err(|message| Error::Document {
            format: format.name(),
            message,
        })
    }

    /// Read and decode a document, picking the format from the extension.
    pub fn load(path: &Path) -> Result<Self> {
        let format = Format::from_path(path).ok_or_else(|| Error::Document {
            format: "unknown",
            message: format!(
                "cannot infer the format of {}: expected .yaml, .yml, .json or .toml",
                path.display()
            ),
        })?;
        let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), format = format.name(), "loading design document");
        Self::parse(&text, format)
    }

    /// Replay the document through the declaration surface.
    pub fn define(self, d: &mut Dsl<'_>) {
        for scheme in &self.security_schemes {
            let description = scheme.description.clone();
            let body = move |s: &mut Dsl<'_>| {
                if let Some(text) = &description {
                    s.description(text);
                }
            };
            match SchemeKind::from(scheme.kind) {
                SchemeKind::Basic => d.basic_auth_security(&scheme.name, body),
                SchemeKind::ApiKey => d.api_key_security(&scheme.name, body),
                SchemeKind::Jwt => d.jwt_security(&scheme.name, body),
                SchemeKind::OAuth2 => d.oauth2_security(&scheme.name, body),
            }
        }
        if let Some(api) = self.api {
            let name = api.name.clone();
            d.api(&name, move |a| define_api(a, &api));
        }
        for ty in self.types {
            let spec = ty.ty.as_deref().map_or(TypeSpec::Empty, type_spec);
            let name = ty.name.clone();
            d.type_of(&name, spec, move |t| {
                if let Some(text) = &ty.description {
                    t.description(text);
                }
                define_object(t, &ty.attributes, &ty.required);
            });
        }
        for rt in self.result_types {
            let (identifier, name) = (rt.identifier.clone(), rt.name.clone());
            d.result_type(&identifier, &name, move |r| define_result_type(r, &rt));
        }
        for service in self.services {
            let name = service.name.clone();
            d.service(&name, move |s| define_service(s, service));
        }
    }
}

/// Type expression of a document. Malformed expressions are kept as names
/// and reported as unknown types.
fn type_spec(expr: &str) -> TypeSpec {
    TypeSpec::parse(expr).unwrap_or_else(|_| TypeSpec::Named(expr.trim().to_string()))
}

fn strs(values: &[String]) -> Vec<&str> {
    values.iter().map(String::as_str).collect()
}

fn define_api(a: &mut Dsl<'_>, api: &ApiDoc) {
    if let Some(title) = &api.title {
        a.title(title);
    }
    if let Some(version) = &api.version {
        a.version(version);
    }
    if let Some(text) = &api.description {
        a.description(text);
    }
    define_errors(a, &api.errors);
    if !api.security.is_empty() {
        a.security(&strs(&api.security));
    }
    if let Some(http) = api.http.clone() {
        a.http(move |h| define_http(h, &http));
    }
}

fn define_result_type(r: &mut Dsl<'_>, rt: &ResultTypeDoc) {
    if let Some(text) = &rt.description {
        r.description(text);
    }
    if let Some(ct) = &rt.content_type {
        r.content_type(ct);
    }
    r.attributes(|a| define_object(a, &rt.attributes, &rt.required));
    for view in &rt.views {
        r.view(&view.name, |v| {
            for field in &view.fields {
                match field {
                    ViewFieldDoc::Name(name) => v.field(name),
                    ViewFieldDoc::WithView { name, view } => v.field_view(name, view),
                }
            }
        });
    }
}

fn define_service(s: &mut Dsl<'_>, service: ServiceDoc) {
    if let Some(text) = &service.description {
        s.description(text);
    }
    define_errors(s, &service.errors);
    if !service.security.is_empty() {
        s.security(&strs(&service.security));
    }
    if let Some(http) = service.http {
        s.http(move |h| define_http(h, &http));
    }
    for method in service.methods {
        let name = method.name.clone();
        s.method(&name, move |m| define_method(m, method));
    }
}

fn define_method(m: &mut Dsl<'_>, method: MethodDoc) {
    if let Some(text) = &method.description {
        m.description(text);
    }
    if let Some(payload) = &method.payload {
        match payload {
            AttributeDoc::Type(ty) => m.payload(type_spec(ty)),
            AttributeDoc::Full(spec) => {
                let ty = spec.ty.as_deref().map_or(TypeSpec::Empty, type_spec);
                m.payload_with(ty, |p| define_rules(p, spec));
            }
        }
    }
    match (&method.result, &method.result_view) {
        (Some(AttributeDoc::Type(ty)), Some(view)) => m.result_view(type_spec(ty), view),
        (Some(AttributeDoc::Type(ty)), None) => m.result(type_spec(ty)),
        (Some(AttributeDoc::Full(spec)), _) => {
            let ty = spec.ty.as_deref().map_or(TypeSpec::Empty, type_spec);
            m.result_with(ty, |r| define_rules(r, spec));
        }
        (None, _) => {}
    }
    define_errors(m, &method.errors);
    if !method.security.is_empty() {
        m.security(&strs(&method.security));
    }
    if method.no_security {
        m.no_security();
    }
    if let Some(http) = method.http {
        m.http(move |h| define_http(h, &http));
    }
}

fn define_errors(d: &mut Dsl<'_>, errors: &[ErrorDoc]) {
    for error in errors {
        match &error.ty {
            Some(ty) => d.error_type(&error.name, type_spec(ty)),
            None => d.error(&error.name),
        }
    }
}

/// Attributes and required names of the object under construction.
fn define_object(d: &mut Dsl<'_>, attributes: &IndexMap<String, AttributeDoc>, required: &[String]) {
    for (name, attr) in attributes {
        define_attribute(d, name, attr);
    }
    if !required.is_empty() {
        d.required(&strs(required));
    }
}

fn define_attribute(d: &mut Dsl<'_>, name: &str, attr: &AttributeDoc) {
    match attr {
        AttributeDoc::Type(ty) => d.attribute(name, type_spec(ty)),
        AttributeDoc::Full(spec) => {
            let ty = spec.ty.as_deref().map_or(TypeSpec::Empty, type_spec);
            d.attribute_with(name, ty, |a| define_rules(a, spec));
        }
    }
}

/// Documentation, rules, metadata and nested attributes of an attribute.
fn define_rules(d: &mut Dsl<'_>, spec: &AttributeSpec) {
    if let Some(text) = &spec.description {
        d.description(text);
    }
    if let Some(value) = &spec.default {
        d.default(value.clone());
    }
    for example in &spec.examples {
        d.example(example.clone());
    }
    if !spec.enum_values.is_empty() {
        d.enum_values(spec.enum_values.iter().cloned());
    }
    if let Some(format) = &spec.format {
        d.format(format);
    }
    if let Some(pattern) = &spec.pattern {
        d.pattern(pattern);
    }
    if let Some(min) = spec.minimum {
        d.minimum(min);
    }
    if let Some(max) = spec.maximum {
        d.maximum(max);
    }
    if let Some(len) = spec.min_length {
        d.min_length(len);
    }
    if let Some(len) = spec.max_length {
        d.max_length(len);
    }
    for (key, values) in &spec.meta {
        d.meta(key, &strs(values));
    }
    if let Some(credential) = &spec.security {
        d.meta(&credential.tag(), &[]);
    }
    define_object(d, &spec.attributes, &spec.required);
}

/// Params or headers of an HTTP expression, or the headers of a response.
fn define_mapped(h: &mut Dsl<'_>, entries: &IndexMap<String, Option<AttributeDoc>>, headers: bool) {
    for (name, attr) in entries {
        match (attr, headers) {
            (None, false) => h.param(name),
            (None, true) => h.header(name),
            (Some(AttributeDoc::Type(ty)), false) => h.param_typed(name, type_spec(ty)),
            (Some(AttributeDoc::Type(ty)), true) => h.header_typed(name, type_spec(ty)),
            (Some(AttributeDoc::Full(spec)), headers) => {
                let ty = spec.ty.as_deref().map_or(TypeSpec::Empty, type_spec);
                if headers {
                    h.header_with(name, ty, |a| define_rules(a, spec));
                } else {
                    h.param_with(name, ty, |a| define_rules(a, spec));
                }
            }
        }
    }
}

fn define_body(h: &mut Dsl<'_>, body: &BodyDoc) {
    if let Some(attr) = &body.attribute {
        return h.body(attr);
    }
    if let Some(ty) = &body.ty {
        return h.body_type(type_spec(ty));
    }
    h.body_object(|b| {
        for (name, attr) in &body.attributes {
            match attr {
                Some(attr) => define_attribute(b, name, attr),
                None => b.field(name),
            }
        }
        if !body.required.is_empty() {
            b.required(&strs(&body.required));
        }
    });
}

fn define_http(h: &mut Dsl<'_>, http: &HttpDoc) {
    for path in http.path.iter().chain(&http.paths) {
        h.path(path);
    }
    if let Some(parent) = &http.parent {
        h.parent(parent);
    }
    if let Some(name) = &http.canonical_method {
        h.canonical_method(name);
    }
    for route in &http.routes {
        h.route(route.verb, &route.path);
    }
    define_mapped(h, &http.params, false);
    define_mapped(h, &http.headers, true);
    if let Some(body) = &http.body {
        define_body(h, body);
    }
    match http.map_params.as_deref() {
        Some("") => h.map_params(),
        Some(attr) => h.map_params_to(attr),
        None => {}
    }
    if http.multipart_request {
        h.multipart_request();
    }
    for response in &http.responses {
        let key = match &response.error {
            Some(error) => ResponseKey::Error(error.clone()),
            None => ResponseKey::Status(response.status.unwrap_or_default()),
        };
        h.response(key, |r| define_response(r, response));
    }
}

fn define_response(r: &mut Dsl<'_>, response: &ResponseDoc) {
    if let Some(code) = response.code {
        r.code(code);
    }
    if let Some(text) = &response.description {
        r.description(text);
    }
    if let Some(tag) = &response.tag {
        r.tag(&tag.name, &tag.value);
    }
    define_mapped(r, &response.headers, true);
    if let Some(body) = &response.body {
        define_body(r, body);
    }
    if let Some(ct) = &response.content_type {
        r.content_type(ct);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_route_doc_parses_verb_and_path() {
        let route = RouteDoc::try_from("post /items/{id}".to_string()).unwrap();
        assert_eq!(route.verb, Verb::Post);
        assert_eq!(route.path, "/items/{id}");
        let bare = RouteDoc::try_from("GET".to_string()).unwrap();
        assert_eq!(bare.path, "");
        assert!(RouteDoc::try_from("FETCH /x".to_string()).is_err());
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(Format::from_path(Path::new("a/design.yml")), Some(Format::Yaml));
        assert_eq!(Format::from_path(Path::new("design.json")), Some(Format::Json));
        assert_eq!(Format::from_path(Path::new("design.toml")), Some(Format::Toml));
        assert_eq!(Format::from_path(Path::new("design.txt")), None);
    }

    #[test]
    fn test_attribute_shorthand_and_full_form() {
        let doc = Document::parse(
            r#"
types:
  - name: Bottle
    attributes:
      name: String
      vintage:
        type: Int
        minimum: 1900
        security: token
    required: [name]
"#,
            Format::Yaml,
        )
        .unwrap();
        let ty = &doc.types[0];
        assert!(matches!(&ty.attributes["name"], AttributeDoc::Type(t) if t == "String"));
        let AttributeDoc::Full(vintage) = &ty.attributes["vintage"] else {
            unreachable!("full attribute expected")
        };
        assert_eq!(vintage.minimum, Some(1900.0));
        assert_eq!(vintage.security, Some(CredentialDoc::Token));
    }

    #[test]
    fn test_parse_errors_name_the_format() {
        let err = Document::parse("services: [", Format::Yaml).unwrap_err();
        assert!(err.to_string().starts_with("failed to parse YAML design document"));
        let err = Document::parse(r#"{"unknown": 1}"#, Format::Json).unwrap_err();
        assert!(matches!(err, Error::Document { format: "JSON", .. }));
        let err = Document::parse(
            r#"
[[services]]
name = "s"
[[services.methods]]
name = "m"
[services.methods.http]
routes = ["FETCH /"]
"#,
            Format::Toml,
        )
        .unwrap_err();
        assert!(err.to_string().contains("unknown HTTP method"), "{err}");
    }
}
