//! Cascading of params, headers and error responses down the service
//! hierarchy.

use crate::expr::{
    Attribute, Endpoint, HttpError, HttpRoot, HttpService, MappedAttribute, Method, Primitive,
    Root, STATUS_BAD_REQUEST, TypeRegistry,
};

/// Params and headers of an endpoint merged with the ones of the API, the
/// service and, unless every route is absolute, the parent canonical
/// endpoint. Later sources win: API, service, parent, endpoint.
pub fn params_and_headers(
    http: &HttpRoot,
    types: &TypeRegistry,
    service: &HttpService,
    endpoint: &Endpoint,
) -> (MappedAttribute, MappedAttribute) {
    let mut params = MappedAttribute::new();
    let mut headers = MappedAttribute::new();
    params.merge(types, &http.params);
    headers.merge(types, &http.headers);
    params.merge(types, &service.params);
    headers.merge(types, &service.headers);

    let canonical = service
        .parent
        .as_deref()
        .and_then(|p| http.service(p))
        .and_then(HttpService::canonical);
    if let Some(canonical) = canonical {
        if !endpoint.has_absolute_routes() {
            params.merge(types, &canonical_path_params(canonical));
        }
    }

    params.merge(types, &endpoint.params);
    headers.merge(types, &endpoint.headers);
    (params, headers)
}

/// Path params of a canonical endpoint: the finalized ones when available,
/// else the declared params bound to its route wildcards.
fn canonical_path_params(canonical: &Endpoint) -> MappedAttribute {
    if !canonical.path_params.is_empty() {
        return canonical.path_params.clone();
    }
    let wildcards = canonical.route_params();
    canonical
        .params
        .filtered(|name| wildcards.iter().any(|w| w == name))
}

/// Add a `String` param for every route wildcard without a declared param.
pub fn add_wildcard_params(endpoint: &mut Endpoint) {
    for name in endpoint.route_params() {
        if !endpoint.params.contains(&name) {
            endpoint
                .params
                .add(&name, Attribute::primitive(Primitive::String));
        }
    }
}

/// Error responses of an endpoint: its own mappings, then copies of the
/// service mappings, then copies of the API mappings. Inherited mappings are
/// kept only for errors the method can return; the first mapping of a name
/// wins. Errors of the method or its service mapped nowhere get a 400
/// response.
pub fn errors(
    root: &Root,
    types: &mut TypeRegistry,
    service: &HttpService,
    endpoint: &Endpoint,
    method: &Method,
) -> Vec<HttpError> {
    let visible = |name: &str| root.error(&endpoint.service, &method.name, name).is_some();
    let mut out: Vec<HttpError> = Vec::new();
    for e in &endpoint.errors {
        if !out.iter().any(|o| o.name == e.name) {
            out.push(e.clone());
        }
    }
    for e in service.errors.iter().chain(&root.http.errors) {
        if visible(&e.name) && !out.iter().any(|o| o.name == e.name) {
            out.push(duplicate_error(types, e));
        }
    }

    let declared = method
        .errors
        .iter()
        .chain(root.service(&endpoint.service).map_or(&[][..], |s| s.errors.as_slice()));
    for e in declared {
        if !out.iter().any(|o| o.name == e.name) {
            out.push(HttpError::new(e.name.clone(), STATUS_BAD_REQUEST));
        }
    }
    out
}

/// Deep copy of an error mapping so finalizing it for one endpoint does not
/// affect the others.
fn duplicate_error(types: &mut TypeRegistry, error: &HttpError) -> HttpError {
    let mut copy = error.clone();
    if let Some(body) = &error.response.body {
        copy.response.body = Some(types.duplicate(body));
    }
    copy
}
