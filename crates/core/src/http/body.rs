//! Request and response body derivation.
//!
//! A body is what is left of the payload (or result, or error) once the
//! attributes carried by params and headers are taken out. Derived bodies are
//! new named types; the named types they reach are copies suffixed with
//! `RequestBody` / `ResponseBody` so the declared types keep their names.

use crate::expr::{
    Attribute, Endpoint, MappedAttribute, Response, ResultInfo, TypeRegistry, UserType, View,
    ViewField,
};
use crate::naming::concat;

/// Suffix of the named types reachable from a request body.
pub const REQUEST_SUFFIX: &str = "RequestBody";
/// Suffix of the named types reachable from a response body.
pub const RESPONSE_SUFFIX: &str = "ResponseBody";

/// Request body of an endpoint whose params and headers are final.
/// `implicit_headers` lists payload attributes carried by the
/// `Authorization` header without being declared as headers.
pub fn request_body(
    types: &mut TypeRegistry,
    service: &str,
    endpoint: &Endpoint,
    payload: &Attribute,
    implicit_headers: &[String],
) -> Attribute {
    let name = concat(&[&endpoint.name, "Request", "Body"]);
    if let Some(body) = &endpoint.body {
        let body = types.duplicate(body);
        types.rename(&body, &name, REQUEST_SUFFIX);
        return body;
    }

    let body_only = endpoint.headers.is_empty()
        && endpoint.params.is_empty()
        && endpoint.map_query_params.is_none();
    if !types.is_object(&payload.ty) {
        if body_only && !payload.ty.is_empty() {
            let body = types.duplicate(payload);
            types.rename(&body, &name, REQUEST_SUFFIX);
            return body;
        }
        return Attribute::default();
    }

    let payload = types.duplicate(payload);
    let mut body = MappedAttribute::from_object(types, &payload);
    remove_all(&mut body, &endpoint.headers);
    remove_all(&mut body, &endpoint.params);
    if let Some(attr) = endpoint.map_query_params.as_deref().filter(|a| !a.is_empty()) {
        body.remove(attr);
    }
    for attr in implicit_headers {
        body.remove(attr);
    }
    if body.is_empty() {
        return Attribute::default();
    }
    let body = body.into_attribute();
    types.append_suffix(&body.ty, REQUEST_SUFFIX);
    let id = types.insert(UserType::new(name, format!("{service}#{}", endpoint.name), body));
    Attribute::user(id)
}

/// Body of a success or error response.
///
/// `name` is the endpoint name, suffixed with the status text when the
/// endpoint has several responses, or `<endpoint>_<error>` for errors.
/// `attr` is the (projected) result or error attribute.
pub fn response_body(
    types: &mut TypeRegistry,
    service: &str,
    name: &str,
    attr: &Attribute,
    response: &Response,
) -> Attribute {
    let name = concat(&[name, "Response", "Body"]);
    if attr.ty.is_empty() {
        return Attribute::default();
    }

    if let Some(body) = &response.body {
        if !types.is_object(&body.ty) {
            return body.clone();
        }
        if types.is_empty_attribute(body) {
            return Attribute::default();
        }
        let body = types.duplicate(body);
        types.rename(&body, &name, RESPONSE_SUFFIX);
        return body;
    }

    if !types.is_object(&attr.ty) {
        if response.headers.is_empty() {
            let body = types.duplicate(attr);
            types.rename(&body, &name, "Response");
            return body;
        }
        return Attribute::default();
    }

    let result = types.result_type(&attr.ty).map(|(_, info)| info.clone());
    let copy = types.duplicate(attr);
    let mut body = MappedAttribute::from_object(types, &copy);
    remove_all(&mut body, &response.headers);
    if body.is_empty() {
        return Attribute::default();
    }
    let body = body.into_attribute();
    types.append_suffix(&body.ty, RESPONSE_SUFFIX);
    let mut ut = UserType::new(name.clone(), concat(&[service, "#", &name]), body);
    ut.result = result.map(|info| without_headers(info, &response.headers));
    let id = types.insert(ut);
    Attribute {
        meta: attr.meta.clone(),
        ..Attribute::user(id)
    }
}

fn remove_all(body: &mut MappedAttribute, taken: &MappedAttribute) {
    for name in taken.names() {
        body.remove(&name);
    }
}

/// Result type views with the attributes carried by headers removed.
fn without_headers(info: ResultInfo, headers: &MappedAttribute) -> ResultInfo {
    let views = info
        .views
        .into_iter()
        .map(|v| View {
            fields: v
                .fields
                .into_iter()
                .filter(|f: &ViewField| !headers.contains(&f.name))
                .collect(),
            ..v
        })
        .collect();
    ResultInfo { views, ..info }
}
