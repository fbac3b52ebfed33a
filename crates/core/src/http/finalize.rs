//! Finalize: turn the evaluated design into the resolved HTTP mapping.
//!
//! Services are processed parents first so child services see the finalized
//! path params of their parent canonical endpoint. Each endpoint goes through
//! the same fixed sequence: route full paths, inherited params and headers,
//! wildcard params, param initialization, security headers, header
//! initialization, request body, path/query split, responses, errors.

use std::collections::HashSet;
use std::mem;

use tracing::debug;

use super::{body, inherit, route};
use crate::error::{Error, Result};
use crate::expr::{
    Attribute, BODY_ORIGIN_META, Endpoint, HttpRoot, MappedAttribute, Method, ParamLocation,
    Requirement, ResolvedScheme, Response, Root, STATUS_NO_CONTENT, STATUS_OK, TypeRegistry,
    VIEW_META,
};
use crate::naming::{split_wire_name, status_suffix};

/// Header carrying security credentials unless the design maps them
/// elsewhere.
pub const AUTHORIZATION: &str = "Authorization";

/// Finalize every HTTP service and endpoint of `root`.
pub fn finalize(root: &mut Root) -> Result<()> {
    // The registry is moved out so it can be mutated while the rest of the
    // design is read.
    let mut types = mem::take(&mut root.types);
    let outcome = finalize_services(root, &mut types);
    root.types = types;
    outcome
}

fn finalize_services(root: &mut Root, types: &mut TypeRegistry) -> Result<()> {
    let result_types: Vec<_> = types
        .declared()
        .filter(|(_, ut)| ut.result.is_some())
        .map(|(id, _)| id)
        .collect();
    for id in result_types {
        types.ensure_default_view(id);
    }

    for s in service_order(&root.http) {
        let Some(service) = root.http.services.get(s) else {
            return Err(Error::Bug(format!("service index {s} out of range")));
        };
        let full_paths = route::service_full_paths(&root.http, service);
        let count = service.endpoints.len();
        if let Some(service) = root.http.services.get_mut(s) {
            service.full_paths = full_paths;
        }
        for e in 0..count {
            finalize_endpoint(root, types, s, e)?;
        }
        debug!(
            service = %root.http.services.get(s).map_or("", |svc| svc.name.as_str()),
            endpoints = count,
            "service finalized"
        );
    }
    Ok(())
}

/// Service indexes ordered so that parents come before their children.
/// Parent cycles are broken arbitrarily; validation reports them.
fn service_order(http: &HttpRoot) -> Vec<usize> {
    fn visit(
        http: &HttpRoot,
        index: usize,
        placed: &mut HashSet<usize>,
        visiting: &mut HashSet<usize>,
        order: &mut Vec<usize>,
    ) {
        if placed.contains(&index) || !visiting.insert(index) {
            return;
        }
        let parent = http
            .services
            .get(index)
            .and_then(|s| s.parent.as_deref())
            .and_then(|p| http.service_index(p));
        if let Some(parent) = parent {
            visit(http, parent, placed, visiting, order);
        }
        visiting.remove(&index);
        placed.insert(index);
        order.push(index);
    }

    let mut order = Vec::with_capacity(http.services.len());
    let mut placed = HashSet::new();
    let mut visiting = HashSet::new();
    for index in 0..http.services.len() {
        visit(http, index, &mut placed, &mut visiting, &mut order);
    }
    order
}

fn finalize_endpoint(root: &mut Root, types: &mut TypeRegistry, s: usize, e: usize) -> Result<()> {
    let slot = root
        .http
        .services
        .get_mut(s)
        .and_then(|svc| svc.endpoints.get_mut(e))
        .ok_or_else(|| Error::Bug(format!("endpoint {e} of HTTP service {s} out of range")))?;
    let mut endpoint = mem::take(slot);
    let method = root
        .method(&endpoint.service, &endpoint.name)
        .cloned()
        .ok_or_else(|| {
            Error::Bug(format!(
                "HTTP endpoint {:?} of service {:?} has no method",
                endpoint.name, endpoint.service
            ))
        })?;
    let service = root
        .http
        .services
        .get(s)
        .ok_or_else(|| Error::Bug(format!("HTTP service {s} out of range")))?;

    for r in &mut endpoint.routes {
        r.full_paths = route::route_full_paths(r, &service.full_paths);
    }

    let (params, headers) = inherit::params_and_headers(&root.http, types, service, &endpoint);
    endpoint.params = params;
    endpoint.headers = headers;
    inherit::add_wildcard_params(&mut endpoint);
    init_mapped(types, &mut endpoint.params, &method.payload);

    let implicit_headers = resolve_security(root, types, &mut endpoint, &method);
    init_mapped(types, &mut endpoint.headers, &method.payload);

    if let Some(explicit) = &mut endpoint.body {
        init_body(types, explicit, &method.payload);
    }
    let request = body::request_body(
        types,
        &service.name,
        &endpoint,
        &method.payload,
        &implicit_headers,
    );
    endpoint.body = Some(request);

    let wildcards = endpoint.route_params();
    endpoint.path_params = endpoint
        .params
        .filtered(|n| wildcards.iter().any(|w| w == n));
    endpoint.query_params = endpoint
        .params
        .filtered(|n| !wildcards.iter().any(|w| w == n));

    if endpoint.responses.is_empty() {
        let status = if types.is_empty_attribute(&method.result) {
            STATUS_NO_CONTENT
        } else {
            STATUS_OK
        };
        endpoint.responses.push(Response::with_status(status));
    }
    let result = projected_result(types, &method.result);
    let several = endpoint.responses.len() > 1;
    for response in &mut endpoint.responses {
        finalize_response(types, response, &result, &method.result);
        let name = if several {
            format!("{}{}", endpoint.name, status_suffix(response.status))
        } else {
            endpoint.name.clone()
        };
        let derived = body::response_body(types, &service.name, &name, &result, response);
        response.body = Some(derived);
    }

    let mut errors = inherit::errors(root, types, service, &endpoint, &method);
    for error in &mut errors {
        let Some(declared) = root.error(&endpoint.service, &method.name, &error.name) else {
            continue;
        };
        let attr = declared.attribute.clone();
        finalize_response(types, &mut error.response, &attr, &attr);
        let name = format!("{}_{}", endpoint.name, error.name);
        let derived = body::response_body(types, &service.name, &name, &attr, &error.response);
        error.response.body = Some(derived);
    }
    endpoint.errors = errors;

    debug!(
        service = %endpoint.service,
        endpoint = %endpoint.name,
        routes = endpoint.routes.len(),
        responses = endpoint.responses.len(),
        errors = endpoint.errors.len(),
        "endpoint finalized"
    );
    if let Some(slot) = root
        .http
        .services
        .get_mut(s)
        .and_then(|svc| svc.endpoints.get_mut(e))
    {
        *slot = endpoint;
    }
    Ok(())
}

/// Initialize params or headers from the payload (or result) attributes of
/// the same name. A non-object payload initializes every entry.
fn init_mapped(types: &TypeRegistry, mapped: &mut MappedAttribute, source: &Attribute) {
    let object = types.is_object(&source.ty);
    let mut required = Vec::new();
    if let Some(fields) = mapped.fields_mut() {
        for (name, att) in fields.iter_mut() {
            if object {
                if let Some(design) = types.find(source, name) {
                    att.init_from(design);
                }
                if types.is_required(source, name) {
                    required.push(name.clone());
                }
            } else {
                att.init_from(source);
                required.push(name.clone());
            }
        }
    }
    for name in required {
        mapped.add_required(&name);
    }
}

/// Initialize an explicit body from the payload (or result): a body naming
/// an attribute takes its type, an object body takes the types of the
/// attributes it lists.
fn init_body(types: &TypeRegistry, body: &mut Attribute, source: &Attribute) {
    if let Some(origin) = body.meta_value(BODY_ORIGIN_META).map(str::to_string) {
        if let Some(design) = types.find(source, &origin) {
            body.init_from(design);
        }
        return;
    }
    let object = types.is_object(&source.ty);
    let mut required = Vec::new();
    if let Some(fields) = body.fields_mut() {
        for (name, att) in fields.iter_mut() {
            let key = split_wire_name(name).0;
            if object {
                if let Some(design) = types.find(source, key) {
                    att.init_from(design);
                }
                if types.is_required(source, key) {
                    required.push(key.to_string());
                }
            } else if !source.ty.is_empty() {
                att.init_from(source);
                required.push(key.to_string());
            }
        }
    }
    for name in required {
        body.add_required(&name);
    }
}

fn finalize_response(
    types: &TypeRegistry,
    response: &mut Response,
    attr: &Attribute,
    declared: &Attribute,
) {
    if let Some(explicit) = &mut response.body {
        init_body(types, explicit, attr);
    }
    init_mapped(types, &mut response.headers, attr);
    if response.content_type.is_none() {
        response.content_type = types
            .result_type(&declared.ty)
            .map(|(_, info)| info.content_type.clone().unwrap_or_else(|| info.identifier.clone()));
    }
}

/// The method result projected onto the view selected with
/// `Result(type, view)`. Unknown views are reported by validation; the
/// unprojected result is used meanwhile.
fn projected_result(types: &mut TypeRegistry, result: &Attribute) -> Attribute {
    match result.meta_value(VIEW_META).map(str::to_string) {
        Some(view) => types
            .project(result, &view)
            .unwrap_or_else(|_| result.clone()),
        None => result.clone(),
    }
}

/// Requirements applying to a method: its own, else its service's, else the
/// API's. `NoSecurity` disables them all.
pub(crate) fn effective_requirements<'a>(
    root: &'a Root,
    service: &str,
    method: &'a Method,
) -> &'a [Requirement] {
    if method.no_security {
        return &[];
    }
    if !method.requirements.is_empty() {
        return &method.requirements;
    }
    match root.service(service) {
        Some(svc) if !svc.requirements.is_empty() => &svc.requirements,
        _ => &root.api.requirements,
    }
}

/// Where an attribute is explicitly carried: header or query param, with its
/// wire name.
fn find_key(endpoint: &Endpoint, attr: &str) -> Option<(ParamLocation, String)> {
    if endpoint.headers.contains(attr) {
        return Some((ParamLocation::Header, endpoint.headers.wire_name(attr).to_string()));
    }
    if endpoint.params.contains(attr) {
        return Some((ParamLocation::Query, endpoint.params.wire_name(attr).to_string()));
    }
    None
}

/// Resolve the security schemes of an endpoint. Credentials not mapped to a
/// param or header are read from the `Authorization` header. Returns the
/// basic auth attributes the header carries implicitly.
fn resolve_security(
    root: &Root,
    types: &TypeRegistry,
    endpoint: &mut Endpoint,
    method: &Method,
) -> Vec<String> {
    let mut implicit = Vec::new();
    let requirements = effective_requirements(root, &endpoint.service, method);
    for scheme_name in requirements.iter().flat_map(|r| &r.schemes) {
        let Some(scheme) = root.scheme(scheme_name) else {
            continue;
        };
        if endpoint.security.iter().any(|s| &s.scheme == scheme_name) {
            continue;
        }
        let mut resolved = ResolvedScheme {
            scheme: scheme.name.clone(),
            kind: scheme.kind,
            attribute: None,
            attributes: Vec::new(),
            location: Some(ParamLocation::Header),
            wire_name: Some(AUTHORIZATION.to_string()),
        };
        match scheme.kind.credential_tag(&scheme.name) {
            None => {
                for tag in ["security:username", "security:password"] {
                    if let Some(field) = types.tagged_attribute(&method.payload, tag) {
                        if find_key(endpoint, &field).is_none() && !implicit.contains(&field) {
                            implicit.push(field.clone());
                        }
                        resolved.attributes.push(field);
                    }
                }
            }
            Some(tag) => match types.tagged_attribute(&method.payload, &tag) {
                Some(field) => {
                    if let Some((location, wire)) = find_key(endpoint, &field) {
                        resolved.location = Some(location);
                        resolved.wire_name = Some(wire);
                    } else {
                        let attr = types.find(&method.payload, &field).cloned().unwrap_or_default();
                        endpoint.headers.add(&field, attr);
                        endpoint.headers.map(&field, AUTHORIZATION);
                        if types.is_required(&method.payload, &field) {
                            endpoint.headers.add_required(&field);
                        }
                    }
                    resolved.attributes.push(field.clone());
                    resolved.attribute = Some(field);
                }
                None => {
                    resolved.location = None;
                    resolved.wire_name = None;
                }
            },
        }
        endpoint.security.push(resolved);
    }
    implicit
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::dsl::Dsl;
    use crate::eval::Evaluator;
    use crate::expr::{DataType, Primitive, SchemeKind};

    fn finalized(design: impl FnOnce(&mut Dsl<'_>)) -> Root {
        let mut eval = Evaluator::new();
        eval.run(design);
        assert!(eval.diagnostics().is_empty(), "{}", eval.diagnostics());
        let (mut root, _) = eval.into_parts();
        finalize(&mut root).unwrap();
        root
    }

    fn endpoint<'a>(root: &'a Root, service: &str, name: &str) -> &'a Endpoint {
        root.http.service(service).unwrap().endpoint(name).unwrap()
    }

    #[test]
    fn test_params_initialized_from_payload() {
        let root = finalized(|d| {
            d.service("calc", |s| {
                s.method("div", |m| {
                    m.payload_object(|p| {
                        p.attribute_with("a", Primitive::Int, |a| a.description("dividend"));
                        p.attribute("b", Primitive::Int);
                        p.attribute("round", Primitive::Boolean);
                        p.required(&["a", "b"]);
                    });
                    m.http(|h| {
                        h.get("/div/{a}/{b}");
                        h.param("round");
                    });
                });
            });
        });
        let e = endpoint(&root, "calc", "div");
        assert_eq!(e.path_params.names(), vec!["a", "b"]);
        assert_eq!(e.query_params.names(), vec!["round"]);
        let a = e.path_params.find("a").unwrap();
        assert_eq!(a.ty, DataType::Primitive(Primitive::Int));
        assert_eq!(a.description.as_deref(), Some("dividend"));
        assert!(e.path_params.is_required("a"));
        assert!(!e.query_params.is_required("round"));
        assert!(e.body.as_ref().unwrap().ty.is_empty());
    }

    #[test]
    fn test_child_service_paths_and_inherited_params() {
        let root = finalized(|d| {
            d.api("api", |a| a.http(|h| h.path("/api")));
            d.service("account", |s| {
                s.method("show", |m| {
                    m.payload_object(|p| p.attribute("account_id", Primitive::UInt));
                    m.http(|h| h.get("/{account_id}"));
                });
                s.http(|h| h.path("/accounts"));
            });
            d.service("bottle", |s| {
                s.http(|h| {
                    h.path("/bottles");
                    h.parent("account");
                });
                s.method("list", |m| {
                    m.payload_object(|p| p.attribute("account_id", Primitive::UInt));
                    m.http(|h| h.get(""));
                });
            });
        });
        let svc = root.http.service("bottle").unwrap();
        assert_eq!(svc.full_paths, vec!["/api/accounts/{account_id}/bottles"]);
        let e = svc.endpoint("list").unwrap();
        assert_eq!(e.routes[0].full_paths, vec!["/api/accounts/{account_id}/bottles"]);
        let id = e.path_params.find("account_id").unwrap();
        assert_eq!(id.ty, DataType::Primitive(Primitive::UInt));
    }

    #[test]
    fn test_security_credentials_go_to_authorization_header() {
        let root = finalized(|d| {
            d.jwt_security("jwt", |_| {});
            d.basic_auth_security("basic", |_| {});
            d.service("s", |s| {
                s.security(&["jwt"]);
                s.method("secure", |m| {
                    m.payload_object(|p| {
                        p.token("token", Primitive::String);
                        p.attribute("data", Primitive::String);
                        p.required(&["token"]);
                    });
                    m.http(|h| h.post("/"));
                });
                s.method("login", |m| {
                    m.security(&["basic"]);
                    m.payload_object(|p| {
                        p.username("user", Primitive::String);
                        p.password("pass", Primitive::String);
                        p.attribute("remember", Primitive::Boolean);
                    });
                    m.http(|h| h.post("/login"));
                });
                s.method("open", |m| {
                    m.no_security();
                    m.http(|h| h.get("/open"));
                });
            });
        });
        let secure = endpoint(&root, "s", "secure");
        assert_eq!(secure.headers.wire_name("token"), AUTHORIZATION);
        assert!(secure.headers.is_required("token"));
        assert_eq!(secure.security[0].attribute.as_deref(), Some("token"));
        assert_eq!(secure.security[0].attributes, vec!["token"]);
        let body = secure.body.as_ref().unwrap();
        let fields = root.types.as_object(&body.ty).unwrap();
        assert_eq!(fields.keys().collect::<Vec<_>>(), vec!["data"]);

        let login = endpoint(&root, "s", "login");
        assert_eq!(login.security[0].kind, SchemeKind::Basic);
        assert_eq!(login.security[0].attribute, None);
        assert_eq!(login.security[0].attributes, vec!["user", "pass"]);
        assert!(login.headers.is_empty());
        let body = login.body.as_ref().unwrap();
        let fields = root.types.as_object(&body.ty).unwrap();
        assert_eq!(fields.keys().collect::<Vec<_>>(), vec!["remember"]);

        assert!(endpoint(&root, "s", "open").security.is_empty());
    }

    #[test]
    fn test_multiple_responses_are_named_after_status() {
        let root = finalized(|d| {
            d.service("s", |s| {
                s.method("create", |m| {
                    m.result_object(|r| {
                        r.attribute("id", Primitive::String);
                        r.attribute("outcome", Primitive::String);
                    });
                    m.http(|h| {
                        h.post("/");
                        h.response(201u16, |r| r.tag("outcome", "created"));
                        h.response(200u16, |_| {});
                    });
                });
            });
        });
        let e = endpoint(&root, "s", "create");
        let names: Vec<_> = e
            .responses
            .iter()
            .map(|r| root.types.type_name(&r.body.as_ref().unwrap().ty))
            .collect();
        assert_eq!(names, vec!["CreateCreatedResponseBody", "CreateOKResponseBody"]);
    }

    #[test]
    fn test_errors_get_bodies_and_content_type() {
        let root = finalized(|d| {
            d.service("s", |s| {
                s.method("get", |m| {
                    m.error("not_found");
                    m.http(|h| {
                        h.get("/");
                        h.response("not_found", |r| r.code(404));
                    });
                });
            });
        });
        let e = endpoint(&root, "s", "get");
        assert_eq!(e.responses[0].status, STATUS_NO_CONTENT);
        let error = &e.errors[0];
        assert_eq!(error.response.status, 404);
        assert_eq!(
            error.response.content_type.as_deref(),
            Some("application/vnd.error")
        );
        let body = error.response.body.as_ref().unwrap();
        assert_eq!(root.types.type_name(&body.ty), "get_not_found_response_body");
    }
}
