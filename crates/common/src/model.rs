//! Resolved HTTP model.
//!
//! Every collection in this module is ordered deterministically by the
//! engine so that two runs over the same design serialize to identical bytes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The fully resolved design: one entry per service plus the named types the
/// transport mapping refers to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedModel {
    /// Layout version, see [`crate::MODEL_VERSION`].
    pub version: u32,
    /// API name, title and base path.
    pub api: ApiModel,
    /// Services in declaration order.
    pub services: Vec<ServiceModel>,
    /// Named types reachable from params, headers and bodies, sorted by name then uid.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<TypeModel>,
}

impl ResolvedModel {
    /// Look up a service by name.
    pub fn service(&self, name: &str) -> Option<&ServiceModel> {
        self.services.iter().find(|s| s.name == name)
    }

    /// Look up a named type by name.
    pub fn named_type(&self, name: &str) -> Option<&TypeModel> {
        self.types.iter().find(|t| t.name == name)
    }

    /// Field names of an object type, following named type references.
    pub fn field_names<'a>(&'a self, ty: &'a TypeRef) -> Vec<&'a str> {
        let mut current = ty;
        // Named types may alias each other; bound the walk by the table size.
        for _ in 0..=self.types.len() {
            match current {
                TypeRef::Object { fields } => {
                    return fields.iter().map(|f| f.name.as_str()).collect();
                }
                TypeRef::Named { uid, .. } => match self.types.iter().find(|t| &t.uid == uid) {
                    Some(t) => current = &t.ty,
                    None => break,
                },
                _ => break,
            }
        }
        Vec::new()
    }
}

/// API level summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiModel {
    /// API name.
    pub name: String,
    /// Title shown in generated documentation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// API version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Base path shared by every service.
    pub base_path: String,
}

/// A service with its resolved base paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceModel {
    /// Service name.
    pub name: String,
    /// Base paths after concatenating API and parent paths.
    pub paths: Vec<String>,
    /// Parent service whose canonical route prefixes the paths.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Endpoint providing the canonical route of the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical_endpoint: Option<String>,
    /// Params shared by every endpoint.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<ParamModel>,
    /// Headers shared by every endpoint.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<ParamModel>,
    /// Endpoints in declaration order.
    pub endpoints: Vec<EndpointModel>,
}

impl ServiceModel {
    /// Look up an endpoint by name.
    pub fn endpoint(&self, name: &str) -> Option<&EndpointModel> {
        self.endpoints.iter().find(|e| e.name == name)
    }
}

/// HTTP view of a method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointModel {
    /// Method name.
    pub name: String,
    /// Routes in declaration order.
    pub routes: Vec<RouteModel>,
    /// Params bound from route wildcards.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path_params: Vec<ParamModel>,
    /// Params bound from the query string.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub query_params: Vec<ParamModel>,
    /// Request headers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<ParamModel>,
    /// Request body, `None` when the request has no body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<TypeRef>,
    /// Payload attribute decoded from the query string as a map, empty for the whole payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_query_params: Option<String>,
    /// Whether the body is decoded as multipart.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub multipart_request: bool,
    /// Success responses.
    pub responses: Vec<ResponseModel>,
    /// Error responses.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ErrorModel>,
    /// Security schemes in requirement order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub security: Vec<SchemeModel>,
}

impl EndpointModel {
    /// Names of every request attribute across path, query, headers and
    /// inline body, followed by the credentials the `Authorization` header
    /// carries without a declared header (basic auth).
    pub fn request_attribute_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .path_params
            .iter()
            .chain(&self.query_params)
            .chain(&self.headers)
            .map(|p| p.name.as_str())
            .collect();
        if let Some(TypeRef::Object { fields }) = &self.body {
            names.extend(fields.iter().map(|f| f.name.as_str()));
        }
        for attr in self.security.iter().flat_map(|s| &s.attributes) {
            if !names.contains(&attr.as_str()) {
                names.push(attr);
            }
        }
        names
    }
}

/// A route with one full path per service base path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteModel {
    /// HTTP method, e.g. `GET`.
    pub verb: String,
    /// Path relative to the service base paths.
    pub path: String,
    /// Path under each service base path.
    pub full_paths: Vec<String>,
}

/// A path parameter, query parameter or header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamModel {
    /// Attribute name in the payload or result.
    pub name: String,
    /// Name on the wire (differs from `name` with the `attr:wire` notation).
    pub wire_name: String,
    /// Type of the value.
    #[serde(rename = "type")]
    pub ty: TypeRef,
    /// Whether the request must carry it.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
    /// Free form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Default value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

/// An HTTP response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseModel {
    /// HTTP status code.
    pub status: u16,
    /// Result attribute value selecting this response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<TagModel>,
    /// Response headers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<ParamModel>,
    /// Response body, `None` when the response has no body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<TypeRef>,
    /// Content type of the body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

/// Response discriminator: the response applies when result attribute `name` equals `value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagModel {
    /// Result attribute name.
    pub name: String,
    /// Value selecting the response.
    pub value: String,
}

/// An error and the response it maps to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorModel {
    /// Error name.
    pub name: String,
    /// Response written for the error.
    pub response: ResponseModel,
}

/// A security scheme applied to an endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemeModel {
    /// Scheme name.
    pub scheme: String,
    /// Scheme kind: `basic`, `apikey`, `jwt` or `oauth2`.
    pub kind: String,
    /// Payload attribute carrying the credential (none for basic auth).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
    /// Every payload attribute carrying credentials, including the basic
    /// auth username and password.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<String>,
    /// `header` or `query`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Header or query param name carrying the credential.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wire_name: Option<String>,
}

/// A named type definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeModel {
    /// Type name.
    pub name: String,
    /// Unique identifier of the type, shared by copies of a declared type.
    pub uid: String,
    /// Definition of the type.
    #[serde(rename = "type")]
    pub ty: TypeRef,
    /// Free form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Media type identifier for result types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    /// Views of a result type.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub views: Vec<String>,
}

/// Reference to a type as seen from a param, header or body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeRef {
    /// A primitive such as `Int` or `String`.
    Primitive {
        /// Primitive name.
        name: String,
    },
    /// An array.
    Array {
        /// Element type.
        elem: Box<TypeRef>,
    },
    /// A map.
    Map {
        /// Key type.
        key: Box<TypeRef>,
        /// Value type.
        elem: Box<TypeRef>,
    },
    /// An inline object.
    Object {
        /// Fields in declaration order.
        fields: Vec<FieldModel>,
    },
    /// Reference to an entry of [`ResolvedModel::types`], `uid` disambiguates equal names.
    Named {
        /// Type name.
        name: String,
        /// Type uid.
        uid: String,
    },
}

impl TypeRef {
    /// Name of the referenced named type, if any.
    pub fn type_name(&self) -> Option<&str> {
        match self {
            Self::Named { name, .. } => Some(name),
            _ => None,
        }
    }
}

/// A field of an object type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldModel {
    /// Field name.
    pub name: String,
    /// Field type.
    #[serde(rename = "type")]
    pub ty: TypeRef,
    /// Whether the field is required.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_type_ref_serializes_with_kind_tag() {
        let t = TypeRef::Array {
            elem: Box::new(TypeRef::Primitive {
                name: "String".into(),
            }),
        };
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(
            json,
            r#"{"kind":"array","elem":{"kind":"primitive","name":"String"}}"#
        );
        let back: TypeRef = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
    }

    #[test]
    fn test_request_attribute_names_includes_body_fields() {
        let param = |name: &str| ParamModel {
            name: name.into(),
            wire_name: name.into(),
            ty: TypeRef::Primitive {
                name: "Int".into(),
            },
            required: true,
            description: None,
            default: None,
        };
        let endpoint = EndpointModel {
            name: "add".into(),
            routes: vec![],
            path_params: vec![param("a")],
            query_params: vec![param("b")],
            headers: vec![],
            body: Some(TypeRef::Object {
                fields: vec![FieldModel {
                    name: "c".into(),
                    ty: TypeRef::Primitive {
                        name: "Int".into(),
                    },
                    required: false,
                }],
            }),
            map_query_params: None,
            multipart_request: false,
            responses: vec![],
            errors: vec![],
            security: vec![],
        };
        assert_eq!(endpoint.request_attribute_names(), vec!["a", "b", "c"]);

        let scheme = |attributes: &[&str]| SchemeModel {
            scheme: "basic".into(),
            kind: "basic".into(),
            attribute: None,
            attributes: attributes.iter().map(|a| (*a).to_string()).collect(),
            location: Some("header".into()),
            wire_name: Some("Authorization".into()),
        };
        let secured = EndpointModel {
            security: vec![scheme(&["user", "pass"]), scheme(&["a"])],
            ..endpoint
        };
        assert_eq!(
            secured.request_attribute_names(),
            vec!["a", "b", "c", "user", "pass"]
        );
    }
}
