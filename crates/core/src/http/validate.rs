//! Validation of a finalized design.
//!
//! Every check runs; nothing stops at the first violation. The pass never
//! mutates the design.

use std::collections::HashSet;

use tracing::debug;

use super::finalize::effective_requirements;
use super::route;
use crate::error::Diagnostics;
use crate::expr::{
    Attribute, BODY_ORIGIN_META, DEFAULT_VIEW, DataType, Endpoint, HttpError, HttpService,
    MappedAttribute, Method, Response, Root, Route, SchemeKind, TypeRegistry, VIEW_META,
};
use crate::location;
use crate::naming::{body_allowed_for_status, split_wire_name};

/// Check a finalized design and return every violation found.
pub fn validate(root: &Root) -> Diagnostics {
    let mut diags = Diagnostics::new();
    validate_types(&root.types, &mut diags);
    for service in &root.services {
        for method in &service.methods {
            validate_method(root, &service.name, method, &mut diags);
        }
    }
    validate_http_root(root, &mut diags);
    for service in &root.http.services {
        validate_service(root, service, &mut diags);
        for endpoint in &service.endpoints {
            validate_endpoint(root, service, endpoint, &mut diags);
        }
    }
    debug!(diagnostics = diags.len(), "validation done");
    diags
}

fn validate_types(types: &TypeRegistry, diags: &mut Diagnostics) {
    for (_, ut) in types.declared() {
        let loc = if ut.result.is_some() {
            location::result_type(&ut.name)
        } else {
            location::user_type(&ut.name)
        };
        for msg in types.validate_attribute("", &ut.attribute) {
            diags.structural(&loc, msg);
        }
        let Some(info) = &ut.result else {
            continue;
        };
        if !info.views.iter().any(|v| v.name == DEFAULT_VIEW) {
            diags.structural(&loc, "result type must define a default view");
        }
        for view in &info.views {
            for field in &view.fields {
                let Some(att) = types.find(&ut.attribute, &field.name) else {
                    diags.structural(
                        &loc,
                        format!(
                            "view {:?} refers to attribute {:?} which is not defined",
                            view.name, field.name
                        ),
                    );
                    continue;
                };
                if let Some(nested) = &field.view {
                    if !has_view(types, &att.ty, nested) {
                        diags.missing(
                            &loc,
                            format!(
                                "view {:?} of attribute {:?} is not defined",
                                nested, field.name
                            ),
                        );
                    }
                }
            }
        }
    }
}

/// Whether `ty`, a result type or an array of result types, defines `view`.
fn has_view(types: &TypeRegistry, ty: &DataType, view: &str) -> bool {
    let ty = types.as_array(ty).map_or(ty, |elem| &elem.ty);
    types
        .result_type(ty)
        .is_some_and(|(_, info)| info.views.iter().any(|v| v.name == view))
}

fn validate_method(root: &Root, service: &str, method: &Method, diags: &mut Diagnostics) {
    let types = &root.types;
    let loc = location::method(service, &method.name);
    for msg in types.validate_attribute("payload", &method.payload) {
        diags.structural(&loc, msg);
    }
    for msg in types.validate_attribute("result", &method.result) {
        diags.structural(&loc, msg);
    }
    for error in &method.errors {
        for msg in types.validate_attribute(&format!("error {}", error.name), &error.attribute) {
            diags.structural(&loc, msg);
        }
    }

    if let Some(view) = method.result.meta_value(VIEW_META) {
        if !has_view(types, &method.result.ty, view) {
            diags.missing(
                &loc,
                format!(
                    "result type {:?} has no view {view:?}",
                    types.type_name(&method.result.ty)
                ),
            );
        }
    }

    if method.payload.ty.is_empty() {
        return;
    }
    let requirements = effective_requirements(root, service, method);
    for name in requirements.iter().flat_map(|r| &r.schemes) {
        let Some(scheme) = root.scheme(name) else {
            continue;
        };
        let missing = |tag: &str| types.tagged_attribute(&method.payload, tag).is_none();
        let mut report = |what: &str, construct: &str| {
            diags.structural(
                &loc,
                format!(
                    "payload of method {:?} of service {service:?} does not define {what} attribute, use {construct} to define one",
                    method.name
                ),
            );
        };
        let tag = scheme.kind.credential_tag(&scheme.name).unwrap_or_default();
        match scheme.kind {
            SchemeKind::Basic => {
                if missing("security:username") {
                    report("a username", "Username");
                }
                if missing("security:password") {
                    report("a password", "Password");
                }
            }
            SchemeKind::ApiKey if missing(&tag) => report("an API key", "APIKey"),
            SchemeKind::Jwt if missing(&tag) => report("a JWT", "Token"),
            SchemeKind::OAuth2 if missing(&tag) => report("a OAuth2 access token", "AccessToken"),
            SchemeKind::ApiKey | SchemeKind::Jwt | SchemeKind::OAuth2 => {}
        }
    }
}

fn validate_http_root(root: &Root, diags: &mut Diagnostics) {
    let loc = location::api(&root.api.name);
    let types = &root.types;
    for msg in types.validate_attribute("parameters", root.http.params.attribute()) {
        diags.structural(&loc, msg);
    }
    for msg in types.validate_attribute("headers", root.http.headers.attribute()) {
        diags.structural(&loc, msg);
    }
    for error in &root.http.errors {
        let declared = root.api.errors.iter().any(|e| e.name == error.name)
            || root.services.iter().any(|s| {
                s.errors.iter().any(|e| e.name == error.name)
                    || s.methods
                        .iter()
                        .any(|m| m.errors.iter().any(|e| e.name == error.name))
            });
        if !declared {
            diags.missing(&loc, format!("undefined error {:?}", error.name));
        }
    }
}

fn validate_service(root: &Root, service: &HttpService, diags: &mut Diagnostics) {
    let loc = location::service(&service.name);
    let types = &root.types;
    for msg in types.validate_attribute("parameters", service.params.attribute()) {
        diags.structural(&loc, msg);
    }
    for msg in types.validate_attribute("headers", service.headers.attribute()) {
        diags.structural(&loc, msg);
    }

    if let Some(name) = &service.parent {
        match root.http.service(name) {
            None => diags.missing(&loc, format!("Parent service {name} not found")),
            Some(parent) => {
                if parent.canonical().is_none() {
                    diags.structural(
                        &loc,
                        format!("Parent service {name} has no canonical endpoint"),
                    );
                }
                if parent.parent.as_deref() == Some(service.name.as_str()) {
                    diags.structural(&loc, format!("Parent service {name} is also child"));
                }
            }
        }
    }
    if let Some(name) = &service.canonical_endpoint {
        if service.endpoint(name).is_none() {
            diags.missing(&loc, format!("Unknown canonical endpoint {name}"));
        }
    }

    let design = root.service(&service.name);
    for error in &service.errors {
        let declared = root.api.errors.iter().any(|e| e.name == error.name)
            || design.is_some_and(|s| {
                s.errors.iter().any(|e| e.name == error.name)
                    || s.methods
                        .iter()
                        .any(|m| m.errors.iter().any(|e| e.name == error.name))
            });
        if !declared {
            diags.missing(&loc, format!("undefined error {:?}", error.name));
        }
    }
}

fn validate_endpoint(root: &Root, service: &HttpService, endpoint: &Endpoint, diags: &mut Diagnostics) {
    let Some(method) = root.method(&endpoint.service, &endpoint.name) else {
        return;
    };
    let types = &root.types;
    let loc = location::endpoint(&service.name, &endpoint.name);

    if endpoint.name.is_empty() {
        diags.structural(&loc, "Endpoint name cannot be empty");
    }
    match endpoint.routes.split_first() {
        None => diags.structural(&loc, "No route defined for HTTP endpoint"),
        Some((first, rest)) => {
            for r in &endpoint.routes {
                validate_route(types, service, endpoint, r, &method.payload, diags);
            }
            let params = first.params();
            for r in rest {
                let other = r.params();
                for p in params.iter().filter(|p| !other.contains(p)) {
                    diags.structural(&loc, format!("Param {p:?} does not appear in all routes"));
                }
                for p in other.iter().filter(|p| !params.contains(p)) {
                    diags.structural(&loc, format!("Param {p:?} does not appear in all routes"));
                }
            }
        }
    }

    validate_responses(types, service, endpoint, method, diags);
    validate_params(types, endpoint, &method.payload, &loc, diags);
    validate_headers(types, &endpoint.headers, &method.payload, &loc, diags);

    if let Some(body) = &endpoint.body {
        for msg in types.validate_attribute("HTTP endpoint payload", body) {
            diags.structural(&loc, msg);
        }
    }

    for error in &endpoint.errors {
        validate_error(root, service, endpoint, error, diags);
    }

    validate_payload_shape(types, endpoint, &method.payload, &loc, diags);
}

fn validate_route(
    types: &TypeRegistry,
    service: &HttpService,
    endpoint: &Endpoint,
    r: &Route,
    payload: &Attribute,
    diags: &mut Diagnostics,
) {
    let loc = location::route(r.verb, &r.path, &service.name, &endpoint.name);
    let params = r.params();
    if !params.is_empty() {
        if payload.ty.is_empty() {
            diags.structural(
                &loc,
                "Route parameters are defined, but method payload is not defined.",
            );
        } else {
            match types.resolve(&payload.ty) {
                DataType::Map { .. } => diags.structural(
                    &loc,
                    "Route parameters are defined, but method payload is a map. Method payload must be a primitive or an object.",
                ),
                DataType::Object(fields) => {
                    for p in params.iter().filter(|p| !fields.contains_key(*p)) {
                        diags.structural(
                            &loc,
                            format!("Route param {p:?} not found in method payload"),
                        );
                    }
                }
                _ => {}
            }
            if params.len() > 1 && types.is_primitive(&payload.ty) {
                diags.structural(
                    &loc,
                    "Multiple route parameters are defined, but method payload is a primitive. Only one router parameter can be defined if payload is primitive.",
                );
            }
        }
    }

    for path in &r.full_paths {
        for w in route::duplicate_wildcards(path) {
            diags.structural(
                &loc,
                format!("Wildcard {w:?} appears multiple times in full path {path:?}"),
            );
        }
    }
}

fn validate_responses(
    types: &TypeRegistry,
    service: &HttpService,
    endpoint: &Endpoint,
    method: &Method,
    diags: &mut Diagnostics,
) {
    let loc = location::endpoint(&service.name, &endpoint.name);
    let response_loc = location::response(&service.name, &endpoint.name);
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    for r in &endpoint.responses {
        if !seen.insert(r.status) && reported.insert(r.status) {
            diags.structural(
                &response_loc,
                format!("Multiple response definitions with status code {}", r.status),
            );
        }
        validate_response(types, &response_loc, r, &method.result, diags);
    }

    let has_tags = endpoint.responses.iter().any(|r| r.tag.is_some());
    let all_tagged = endpoint.responses.iter().all(|r| r.tag.is_some());
    if has_tags && all_tagged {
        diags.structural(
            &loc,
            "All responses define a Tag, at least one response must define no Tag.",
        );
    }
    if has_tags && !types.is_object(&method.result.ty) {
        diags.structural(
            &loc,
            "Some responses define a Tag but the method Result type is not an object.",
        );
    }
}

/// Check a success or error response against the attribute it renders.
fn validate_response(
    types: &TypeRegistry,
    loc: &str,
    r: &Response,
    result: &Attribute,
    diags: &mut Diagnostics,
) {
    if r.status == 0 {
        diags.structural(loc, "HTTP response status not defined");
    } else if !body_allowed_for_status(r.status)
        && r.body.as_ref().is_some_and(|b| !types.is_empty_attribute(b))
    {
        diags.structural(
            loc,
            format!(
                "Response body defined for status code {} which does not allow response body.",
                r.status
            ),
        );
    }

    let inview = if types.result_type(&result.ty).is_some() {
        " all views of"
    } else {
        ""
    };

    if !r.headers.is_empty() {
        for msg in types.validate_attribute("HTTP response headers", r.headers.attribute()) {
            diags.structural(loc, msg);
        }
        if types.is_empty_attribute(result) {
            diags.structural(loc, "response defines headers but result is empty");
        } else if types.is_object(&result.ty) {
            for (name, _) in r.headers.iter() {
                match header_attribute(types, result, name) {
                    None => diags.structural(
                        loc,
                        format!(
                            "header {name:?} has no equivalent attribute in{inview} result type, use notation 'attribute_name:header_name' to identify corresponding result type attribute."
                        ),
                    ),
                    Some(att) if !primitive_or_array_of_primitives(types, &att.ty) => {
                        diags.structural(
                            loc,
                            format!(
                                "attribute {name:?} used in HTTP headers must be a primitive type or an array of primitive types."
                            ),
                        );
                    }
                    Some(_) => {}
                }
            }
        } else if r.headers.len() > 1 {
            diags.structural(
                loc,
                "response defines more than one headers but result type is not an object",
            );
        } else if types.is_array(&result.ty)
            && !primitive_or_array_of_primitives(types, &result.ty)
        {
            diags.structural(
                loc,
                "Array result is mapped to an HTTP header but is not an array of primitive types.",
            );
        }
    }

    let Some(body) = &r.body else {
        return;
    };
    for msg in types.validate_attribute("HTTP response body", body) {
        diags.structural(loc, msg);
    }
    if !types.is_object(&result.ty) {
        return;
    }
    let names: Vec<String> = match body.meta_value(BODY_ORIGIN_META) {
        Some(origin) => vec![origin.to_string()],
        None => types
            .as_object(&body.ty)
            .map(|o| o.keys().map(|k| split_wire_name(k).0.to_string()).collect())
            .unwrap_or_default(),
    };
    for name in names {
        if body_attribute(types, result, &name).is_none() {
            diags.structural(
                loc,
                format!("body {name:?} has no equivalent attribute in{inview} result type"),
            );
        }
    }
}

/// Result attribute a response header maps to. With a result type the
/// attribute must be rendered by the selected view, or by every view when
/// none is selected.
fn header_attribute<'a>(types: &'a TypeRegistry, result: &'a Attribute, name: &str) -> Option<&'a Attribute> {
    if let Some((id, info)) = types.result_type(&result.ty) {
        let rendered = match result.meta_value(VIEW_META) {
            Some(view) => types.get(id).and_then(|ut| ut.view(view)).is_some_and(|v| v.has_field(name)),
            None => info.views.iter().all(|v| v.has_field(name)),
        };
        if !rendered {
            return None;
        }
    }
    types.find(result, name)
}

/// Result attribute a response body field maps to, honoring a selected view.
fn body_attribute<'a>(types: &'a TypeRegistry, result: &'a Attribute, name: &str) -> Option<&'a Attribute> {
    if let (Some((id, _)), Some(view)) = (types.result_type(&result.ty), result.meta_value(VIEW_META)) {
        let in_view = types
            .get(id)
            .and_then(|ut| ut.view(view))
            .is_some_and(|v| v.has_field(name));
        if !in_view {
            return None;
        }
    }
    types.find(result, name)
}

fn primitive_or_array_of_primitives(types: &TypeRegistry, ty: &DataType) -> bool {
    match types.as_array(ty) {
        Some(elem) => types.is_primitive(&elem.ty),
        None => types.is_primitive(ty),
    }
}

fn validate_error(
    root: &Root,
    service: &HttpService,
    endpoint: &Endpoint,
    error: &HttpError,
    diags: &mut Diagnostics,
) {
    let loc = location::endpoint(&service.name, &endpoint.name);
    match root.error(&endpoint.service, &endpoint.name, &error.name) {
        None => diags.missing(&loc, format!("undefined error {:?}", error.name)),
        Some(declared) => {
            let response_loc = location::response(&service.name, &endpoint.name);
            validate_response(&root.types, &response_loc, &error.response, &declared.attribute, diags);
        }
    }
}

fn validate_params(
    types: &TypeRegistry,
    endpoint: &Endpoint,
    payload: &Attribute,
    loc: &str,
    diags: &mut Diagnostics,
) {
    if endpoint.params.is_empty() {
        return;
    }
    for (name, att) in endpoint.path_params.iter() {
        if types.is_object(&att.ty) {
            diags.structural(loc, format!("path parameter {name} cannot be an object, path parameter types must be primitive, array or map (query string only)"));
        } else if types.is_map(&att.ty) {
            diags.structural(loc, format!("path parameter {name} cannot be a map, path parameter types must be primitive or array"));
        } else if let Some(elem) = types.as_array(&att.ty) {
            if !types.is_primitive(&elem.ty) {
                diags.structural(loc, format!("elements of array path parameter {name} must be primitive"));
            }
        } else {
            for msg in types.validate_attribute(&format!("path parameter {name}"), att) {
                diags.structural(loc, msg);
            }
        }
    }
    for (name, att) in endpoint.query_params.iter() {
        if types.is_object(&att.ty) {
            diags.structural(loc, format!("query parameter {name} cannot be an object, query parameter types must be primitive, array or map (query string only)"));
        } else if let Some(elem) = types.as_array(&att.ty) {
            if !types.is_primitive(&elem.ty) {
                diags.structural(loc, format!("elements of array query parameter {name} must be primitive"));
            }
        } else {
            for msg in types.validate_attribute(&format!("query parameter {name}"), att) {
                diags.structural(loc, msg);
            }
        }
    }

    let count = endpoint.path_params.len() + endpoint.query_params.len();
    match types.resolve(&payload.ty) {
        DataType::Object(fields) => {
            for (name, _) in endpoint.path_params.iter() {
                if !fields.contains_key(name) {
                    diags.structural(loc, format!("Path parameter {name:?} not found in payload."));
                }
            }
            for (name, _) in endpoint.query_params.iter() {
                if !fields.contains_key(name) {
                    diags.structural(loc, format!("Querys string parameter {name:?} not found in payload."));
                }
            }
        }
        DataType::Array(_) if count > 1 => diags.structural(
            loc,
            "Payload type is array but HTTP endpoint defines multiple parameters. At most one parameter must be defined and it must be an array.",
        ),
        DataType::Map { .. } if count > 1 => diags.structural(
            loc,
            "Payload type is map but HTTP endpoint defines multiple parameters. At most one query string parameter must be defined and it must be a map.",
        ),
        _ => {}
    }
}

fn validate_headers(
    types: &TypeRegistry,
    headers: &MappedAttribute,
    payload: &Attribute,
    loc: &str,
    diags: &mut Diagnostics,
) {
    if headers.is_empty() {
        return;
    }
    for (name, att) in headers.iter() {
        if types.is_object(&att.ty) {
            diags.structural(loc, format!("header {name} cannot be an object, header type must be primitive or array"));
        } else if let Some(elem) = types.as_array(&att.ty) {
            if !types.is_primitive(&elem.ty) {
                diags.structural(loc, format!("elements of array header {name} must be primitive"));
            }
        } else {
            for msg in types.validate_attribute(&format!("header {name}"), att) {
                diags.structural(loc, msg);
            }
        }
    }
    match types.resolve(&payload.ty) {
        DataType::Object(fields) => {
            for (name, _) in headers.iter() {
                if !fields.contains_key(name) {
                    diags.structural(loc, format!("header {name:?} is not found in payload."));
                }
            }
        }
        DataType::Array(_) if headers.len() > 1 => diags.structural(
            loc,
            "Payload type is array but HTTP endpoint defines multiple headers. At most one header must be defined and it must be an array.",
        ),
        DataType::Map { .. } => diags.structural(
            loc,
            "Payload type is map but HTTP endpoint defines headers. Map payloads can only be decoded from HTTP request bodies or query strings.",
        ),
        _ => {}
    }
}

/// Consistency of params, headers, body, `MapParams` and
/// `MultipartRequest` with the shape of the payload.
fn validate_payload_shape(
    types: &TypeRegistry,
    endpoint: &Endpoint,
    payload: &Attribute,
    loc: &str,
    diags: &mut Diagnostics,
) {
    let has_body = endpoint
        .body
        .as_ref()
        .is_some_and(|b| !b.ty.is_empty());
    let multipart = endpoint.multipart_request;

    if payload.ty.is_empty() {
        if endpoint.map_query_params.is_some() {
            diags.structural(loc, "MapParams is set but Payload is not defined");
        }
        if multipart {
            diags.structural(loc, "MultipartRequest is set but Payload is not defined");
        }
        if !endpoint.params.is_empty() {
            diags.structural(loc, "Params are set but Payload is not defined.");
        }
        if !endpoint.headers.is_empty() {
            diags.structural(loc, "Headers are set but Payload is not defined.");
        }
        return;
    }

    if types.is_array(&payload.ty) {
        if endpoint.map_query_params.is_some() {
            diags.structural(loc, "MapParams is set but Payload type is array. Payload type must be map or an object with a map attribute");
        }
        let has_params = !endpoint.params.is_empty();
        let has_headers = !endpoint.headers.is_empty();
        if has_params && multipart {
            diags.structural(loc, "Payload type is array but HTTP endpoint defines MultipartRequest and route/query string parameters. At most one of these must be defined.");
        }
        if has_headers {
            if multipart {
                diags.structural(loc, "Payload type is array but HTTP endpoint defines MultipartRequest and headers. At most one of these must be defined.");
            }
            if has_params {
                diags.structural(loc, "Payload type is array but HTTP endpoint defines both route or query string parameters and headers. At most one parameter or header must be defined and it must be of type array.");
            }
        }
        if let Some(body) = endpoint.body.as_ref().filter(|_| has_body) {
            if multipart {
                diags.structural(loc, "Payload type is array but HTTP endpoint defines MultipartRequest and body. At most one of these must be defined.");
            }
            if !types.is_array(&body.ty) {
                diags.structural(loc, "Payload type is array but HTTP endpoint body is not.");
            }
            if has_params {
                diags.structural(loc, "Payload type is array but HTTP endpoint defines both a body and route or query string parameters. At most one of these must be defined and it must be an array.");
            }
            if has_headers {
                diags.structural(loc, "Payload type is array but HTTP endpoint defines both a body and headers. At most one of these must be defined and it must be an array.");
            }
        }
    }

    if let Some((key, elem)) = types.as_map(&payload.ty) {
        if let Some(attr) = &endpoint.map_query_params {
            if multipart {
                diags.structural(loc, "Payload type is map but HTTP endpoint defines MultipartRequest and MapParams. At most one of these must be defined.");
            }
            if !attr.is_empty() {
                diags.structural(loc, "MapParams is set to an attribute in the Payload but Payload is a map. Payload must be an object with an attribute of map type");
            }
            if !types.is_primitive(&key.ty) {
                diags.structural(loc, "MapParams is set and Payload type is map. But payload key type must be a primitive");
            }
            match types.as_array(&elem.ty) {
                Some(inner) if !types.is_primitive(&inner.ty) => diags.structural(loc, "MapParams is set and Payload type is map. But array elements in payload element type must be primitive"),
                Some(_) => {}
                None if !types.is_primitive(&elem.ty) => diags.structural(loc, "MapParams is set and Payload type is map. But payload element type must be a primitive or array"),
                None => {}
            }
        }
        let has_params = !endpoint.params.is_empty();
        if has_params && multipart {
            diags.structural(loc, "Payload type is map but HTTP endpoint defines MultipartRequest and route/query string parameters. At most one of these must be defined.");
        }
        if let Some(body) = endpoint.body.as_ref().filter(|_| has_body) {
            if multipart {
                diags.structural(loc, "Payload type is map but HTTP endpoint defines MultipartRequest and body. At most one of these must be defined.");
            }
            if !types.is_map(&body.ty) {
                diags.structural(loc, "Payload type is map but HTTP endpoint body is not.");
            }
            if has_params {
                diags.structural(loc, "Payload type is map but HTTP endpoint defines both a body and route or query string parameters. At most one of these must be defined and it must be a map.");
            }
        }
    }

    if types.is_object(&payload.ty) {
        match endpoint.map_query_params.as_deref() {
            Some("") => diags.structural(loc, "MapParams is set to map entire payload but payload is an object. Payload must be a map."),
            Some(attr) if !types.find(payload, attr).is_some_and(|a| types.is_map(&a.ty)) => {
                diags.structural(loc, format!("MapParams is set to an attribute in Payload. But payload has no attribute with type map and name {attr}"));
            }
            _ => {}
        }
        if let Some(body) = endpoint.body.as_ref().filter(|_| has_body) {
            if multipart {
                diags.structural(loc, "HTTP endpoint defines MultipartRequest and body. At most one of these must be defined.");
            }
            let names: Vec<String> = match body.meta_value(BODY_ORIGIN_META) {
                Some(origin) => vec![origin.to_string()],
                None => types
                    .as_object(&body.ty)
                    .map(|o| o.keys().map(|k| split_wire_name(k).0.to_string()).collect())
                    .unwrap_or_default(),
            };
            for name in names {
                if types.find(payload, &name).is_none() {
                    diags.structural(loc, format!("Body {name:?} is not found in Payload."));
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::dsl::{Dsl, TypeSpec};
    use crate::error::DiagnosticKind;
    use crate::eval::Evaluator;
    use crate::expr::Primitive;
    use crate::http::finalize;

    fn check(design: impl FnOnce(&mut Dsl<'_>)) -> Diagnostics {
        let mut eval = Evaluator::new();
        eval.run(design);
        assert!(eval.diagnostics().is_empty(), "{}", eval.diagnostics());
        let (mut root, _) = eval.into_parts();
        finalize(&mut root).unwrap();
        validate(&root)
    }

    #[test]
    fn test_valid_design_has_no_diagnostics() {
        let diags = check(|d| {
            d.service("calc", |s| {
                s.method("add", |m| {
                    m.payload_object(|p| {
                        p.attribute("a", Primitive::Int);
                        p.attribute("b", Primitive::Int);
                        p.required(&["a", "b"]);
                    });
                    m.result(Primitive::Int);
                    m.http(|h| h.get("/add/{a}/{b}"));
                });
            });
        });
        assert!(diags.is_empty(), "{diags}");
    }

    #[test]
    fn test_duplicate_wildcard_in_full_path() {
        let diags = check(|d| {
            d.service("InvalidRoute", |s| {
                s.http(|h| h.path("/{id}"));
                s.method("Method", |m| {
                    m.payload_object(|p| p.attribute("id", Primitive::String));
                    m.http(|h| h.post("/{id}"));
                });
            });
        });
        let rendered: Vec<String> = diags.iter().map(ToString::to_string).collect();
        assert!(
            rendered.contains(
                &r#"route POST "/{id}" of service "InvalidRoute" HTTP endpoint "Method": Wildcard "id" appears multiple times in full path "/{id}/{id}""#
                    .to_string()
            ),
            "{diags}"
        );
    }

    #[test]
    fn test_all_responses_tagged() {
        let diags = check(|d| {
            d.service("s", |s| {
                s.method("create", |m| {
                    m.result_object(|r| {
                        r.attribute("id", Primitive::String);
                        r.attribute("outcome", Primitive::String);
                    });
                    m.http(|h| {
                        h.post("/");
                        h.response(201u16, |r| r.tag("outcome", "created"));
                        h.response(202u16, |r| r.tag("outcome", "accepted"));
                    });
                });
            });
        });
        assert!(diags.contains_message(
            "All responses define a Tag, at least one response must define no Tag."
        ));
        assert_eq!(diags.len(), 1, "{diags}");
    }

    #[test]
    fn test_response_checks() {
        let diags = check(|d| {
            d.service("s", |s| {
                s.method("get", |m| {
                    m.result_object(|r| r.attribute("id", Primitive::String));
                    m.http(|h| {
                        h.get("/");
                        h.response(204u16, |r| r.header("etag:ETag"));
                        h.response(204u16, |_| {});
                    });
                });
            });
        });
        assert!(diags.contains_message("Multiple response definitions with status code 204"));
        assert!(diags.contains_message(
            "Response body defined for status code 204 which does not allow response body."
        ));
        assert!(diags.contains_message(
            "header \"etag\" has no equivalent attribute in result type, use notation 'attribute_name:header_name' to identify corresponding result type attribute."
        ));
    }

    #[test]
    fn test_params_without_payload() {
        let diags = check(|d| {
            d.service("s", |s| {
                s.method("list", |m| {
                    m.http(|h| {
                        h.get("/{id}");
                        h.param("limit");
                        h.header("X-Trace");
                        h.map_params();
                    });
                });
            });
        });
        for msg in [
            "MapParams is set but Payload is not defined",
            "Params are set but Payload is not defined.",
            "Headers are set but Payload is not defined.",
            "Route parameters are defined, but method payload is not defined.",
        ] {
            assert!(diags.contains_message(msg), "missing {msg:?} in {diags}");
        }
    }

    #[test]
    fn test_params_and_routes_against_object_payload() {
        let diags = check(|d| {
            d.service("s", |s| {
                s.method("m", |m| {
                    m.payload_object(|p| p.attribute("id", Primitive::String));
                    m.http(|h| {
                        h.get("/{id}/{other}");
                        h.get("/{id}");
                        h.param("q");
                        h.header("X-Unknown");
                    });
                });
            });
        });
        for msg in [
            "Route param \"other\" not found in method payload",
            "Param \"other\" does not appear in all routes",
            "Path parameter \"other\" not found in payload.",
            "Querys string parameter \"q\" not found in payload.",
            "header \"X-Unknown\" is not found in payload.",
        ] {
            assert!(diags.contains_message(msg), "missing {msg:?} in {diags}");
        }
    }

    #[test]
    fn test_service_references() {
        let diags = check(|d| {
            d.service("orphan", |s| {
                s.http(|h| {
                    h.parent("missing");
                    h.canonical_method("nope");
                });
                s.method("list", |m| m.http(|h| h.get("/")));
            });
            d.service("a", |s| {
                s.http(|h| h.parent("b"));
                s.method("show", |m| m.http(|h| h.get("/a")));
            });
            d.service("b", |s| {
                s.http(|h| h.parent("a"));
                s.method("list", |m| m.http(|h| h.get("/b")));
            });
        });
        let missing: Vec<_> = diags
            .of_kind(DiagnosticKind::MissingReference)
            .map(|d| d.message.as_str())
            .collect();
        assert!(missing.contains(&"Parent service missing not found"));
        assert!(missing.contains(&"Unknown canonical endpoint nope"));
        assert!(diags.contains_message("Parent service b has no canonical endpoint"));
        assert!(diags.contains_message("Parent service a is also child"));
    }

    #[test]
    fn test_security_tags_and_error_mappings() {
        let diags = check(|d| {
            d.jwt_security("jwt", |_| {});
            d.service("s", |s| {
                s.method("m", |m| {
                    m.security(&["jwt"]);
                    m.payload_object(|p| p.attribute("data", Primitive::String));
                    m.http(|h| {
                        h.post("/");
                        h.response("ghost", |r| r.code(404));
                    });
                });
            });
        });
        assert!(diags.contains_message(
            "payload of method \"m\" of service \"s\" does not define a JWT attribute, use Token to define one"
        ));
        let missing: Vec<_> = diags.of_kind(DiagnosticKind::MissingReference).collect();
        assert_eq!(missing.len(), 1, "{diags}");
        assert_eq!(missing[0].message, "undefined error \"ghost\"");
    }

    #[test]
    fn test_result_views() {
        let diags = check(|d| {
            d.result_type("application/vnd.item", "Item", |r| {
                r.attributes(|a| a.attribute("id", Primitive::String));
                r.view("tiny", |v| v.field("name"));
            });
            d.service("s", |s| {
                s.method("show", |m| {
                    m.result_view("Item", "full");
                    m.http(|h| h.get("/"));
                });
            });
        });
        assert!(diags.contains_message("result type must define a default view"));
        assert!(diags.contains_message(
            "view \"tiny\" refers to attribute \"name\" which is not defined"
        ));
        assert!(diags.contains_message("result type \"Item\" has no view \"full\""));
    }

    fn assert_messages(diags: &Diagnostics, messages: &[&str]) {
        for msg in messages {
            assert!(diags.contains_message(msg), "missing {msg:?} in {diags}");
        }
    }

    fn filter_type(d: &mut Dsl<'_>) {
        d.type_("Filter", |t| t.attribute("field", Primitive::String));
    }

    #[test]
    fn test_params_and_headers_must_be_primitive_or_arrays_of_primitives() {
        let diags = check(|d| {
            filter_type(d);
            d.service("s", |s| {
                s.method("search", |m| {
                    m.payload_object(|p| {
                        p.attribute("ids", TypeSpec::array_of("Filter"));
                        p.attribute("filter", "Filter");
                        p.attribute("terms", TypeSpec::array_of("Filter"));
                        p.attribute("scope", "Filter");
                        p.attribute("tags", TypeSpec::array_of("Filter"));
                    });
                    m.http(|h| {
                        h.get("/search/{ids}");
                        h.param("filter");
                        h.param("terms");
                        h.header("scope:X-Scope");
                        h.header("tags:X-Tags");
                    });
                });
            });
        });
        assert_messages(
            &diags,
            &[
                "elements of array path parameter ids must be primitive",
                "query parameter filter cannot be an object, query parameter types must be primitive, array or map (query string only)",
                "elements of array query parameter terms must be primitive",
                "header scope cannot be an object, header type must be primitive or array",
                "elements of array header tags must be primitive",
            ],
        );
    }

    #[test]
    fn test_array_payload_shape() {
        let diags = check(|d| {
            d.service("s", |s| {
                s.method("mixed", |m| {
                    m.payload(TypeSpec::array_of(Primitive::String));
                    m.http(|h| {
                        h.post("/mixed");
                        h.param("ids");
                        h.header("X-Ids");
                        h.multipart_request();
                    });
                });
                s.method("mapped", |m| {
                    m.payload(TypeSpec::array_of(Primitive::String));
                    m.http(|h| {
                        h.post("/mapped");
                        h.map_params();
                    });
                });
                s.method("scalar_body", |m| {
                    m.payload(TypeSpec::array_of(Primitive::String));
                    m.http(|h| {
                        h.post("/scalar");
                        h.body_type(Primitive::String);
                    });
                });
            });
        });
        assert_messages(
            &diags,
            &[
                "Payload type is array but HTTP endpoint defines MultipartRequest and route/query string parameters. At most one of these must be defined.",
                "Payload type is array but HTTP endpoint defines MultipartRequest and headers. At most one of these must be defined.",
                "Payload type is array but HTTP endpoint defines both route or query string parameters and headers. At most one parameter or header must be defined and it must be of type array.",
                "MapParams is set but Payload type is array. Payload type must be map or an object with a map attribute",
                "Payload type is array but HTTP endpoint body is not.",
            ],
        );
    }

    #[test]
    fn test_map_payload_shape() {
        let diags = check(|d| {
            filter_type(d);
            d.service("s", |s| {
                s.method("multipart", |m| {
                    m.payload(TypeSpec::map_of(Primitive::String, Primitive::String));
                    m.http(|h| {
                        h.post("/multipart");
                        h.map_params_to("values");
                        h.multipart_request();
                    });
                });
                s.method("keys", |m| {
                    m.payload(TypeSpec::map_of("Filter", TypeSpec::array_of("Filter")));
                    m.http(|h| {
                        h.get("/keys");
                        h.map_params();
                    });
                });
                s.method("elems", |m| {
                    m.payload(TypeSpec::map_of(Primitive::String, "Filter"));
                    m.http(|h| {
                        h.get("/elems");
                        h.map_params();
                    });
                });
                s.method("split", |m| {
                    m.payload(TypeSpec::map_of(Primitive::String, Primitive::String));
                    m.http(|h| {
                        h.get("/split");
                        h.param("a");
                        h.param("b");
                        h.header("X-Trace");
                    });
                });
            });
        });
        assert_messages(
            &diags,
            &[
                "Payload type is map but HTTP endpoint defines MultipartRequest and MapParams. At most one of these must be defined.",
                "MapParams is set to an attribute in the Payload but Payload is a map. Payload must be an object with an attribute of map type",
                "MapParams is set and Payload type is map. But payload key type must be a primitive",
                "MapParams is set and Payload type is map. But array elements in payload element type must be primitive",
                "MapParams is set and Payload type is map. But payload element type must be a primitive or array",
                "Payload type is map but HTTP endpoint defines multiple parameters. At most one query string parameter must be defined and it must be a map.",
                "Payload type is map but HTTP endpoint defines headers. Map payloads can only be decoded from HTTP request bodies or query strings.",
            ],
        );
    }

    #[test]
    fn test_map_params_attribute_of_object_payload() {
        let diags = check(|d| {
            d.service("s", |s| {
                s.method("whole", |m| {
                    m.payload_object(|p| p.attribute("q", Primitive::String));
                    m.http(|h| {
                        h.get("/whole");
                        h.map_params();
                    });
                });
                s.method("scalar", |m| {
                    m.payload_object(|p| p.attribute("q", Primitive::String));
                    m.http(|h| {
                        h.get("/scalar");
                        h.map_params_to("q");
                    });
                });
                s.method("valid", |m| {
                    m.payload_object(|p| {
                        p.attribute(
                            "q",
                            TypeSpec::map_of(Primitive::String, Primitive::String),
                        );
                    });
                    m.http(|h| {
                        h.get("/valid");
                        h.map_params_to("q");
                    });
                });
            });
        });
        assert_messages(
            &diags,
            &[
                "MapParams is set to map entire payload but payload is an object. Payload must be a map.",
                "MapParams is set to an attribute in Payload. But payload has no attribute with type map and name q",
            ],
        );
        assert_eq!(diags.len(), 2, "{diags}");
    }
}
