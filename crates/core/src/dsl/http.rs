//! HTTP constructs: routes, params, headers, bodies and responses.

use super::{Dsl, TypeSpec};
use crate::eval::{Expr, Phase};
use crate::expr::{
    Attribute, BODY_ORIGIN_META, Endpoint, HttpError, HttpService, MappedAttribute, Response,
    Route, STATUS_BAD_REQUEST, Tag, Verb,
};

/// What a `Response` declaration applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseKey {
    /// A success response of an endpoint.
    Status(u16),
    /// The response an error maps to.
    Error(String),
}

impl From<u16> for ResponseKey {
    fn from(status: u16) -> Self {
        Self::Status(status)
    }
}

impl From<&str> for ResponseKey {
    fn from(name: &str) -> Self {
        Self::Error(name.to_string())
    }
}

impl From<String> for ResponseKey {
    fn from(name: String) -> Self {
        Self::Error(name)
    }
}

impl Dsl<'_> {
    /// Open the HTTP body of the API, a service or a method. Method level
    /// bodies define the endpoint of the method.
    pub fn http<F>(&mut self, body: F)
    where
        F: FnOnce(&mut Dsl<'_>) + 'static,
    {
        match self.expr {
            Expr::Api => self.defer(Phase::ApiHttp, Expr::HttpRoot, body),
            Expr::Service(s) => {
                let Some(name) = self.eval.root.services.get(s).map(|s| s.name.clone()) else {
                    return;
                };
                let index = self.http_service(&name);
                self.defer(Phase::ServiceHttp, Expr::HttpService(index), body);
            }
            Expr::Method(s, m) => {
                let Some(service) = self.eval.root.services.get(s) else {
                    return;
                };
                let Some(method) = service.methods.get(m).map(|m| m.name.clone()) else {
                    return;
                };
                let service = service.name.clone();
                let index = self.http_service(&service);
                let Some(svc) = self.eval.root.http.services.get_mut(index) else {
                    return;
                };
                let endpoint = match svc.endpoints.iter().position(|e| e.name == method) {
                    Some(e) => e,
                    None => {
                        svc.endpoints.push(Endpoint {
                            name: method,
                            service,
                            ..Endpoint::default()
                        });
                        svc.endpoints.len() - 1
                    }
                };
                self.defer(Phase::Endpoints, Expr::Endpoint(index, endpoint), body);
            }
            _ => self.usage("HTTP"),
        }
    }

    /// Index of the HTTP service named `name`, created on first use.
    fn http_service(&mut self, name: &str) -> usize {
        let http = &mut self.eval.root.http;
        if let Some(index) = http.service_index(name) {
            return index;
        }
        http.services.push(HttpService {
            name: name.to_string(),
            ..HttpService::default()
        });
        http.services.len() - 1
    }

    fn endpoint_mut(&mut self) -> Option<&mut Endpoint> {
        let Expr::Endpoint(s, e) = self.expr else {
            return None;
        };
        self.eval
            .root
            .http
            .services
            .get_mut(s)
            .and_then(|svc| svc.endpoints.get_mut(e))
    }

    // ========================================================================
    // Paths and service hierarchy
    // ========================================================================

    /// Base path of the API or of a service. A service may declare several.
    pub fn path(&mut self, path: &str) {
        match self.expr {
            Expr::HttpRoot => self.eval.root.http.path = path.to_string(),
            Expr::HttpService(i) => {
                if let Some(svc) = self.eval.root.http.services.get_mut(i) {
                    svc.paths.push(path.to_string());
                }
            }
            _ => self.usage("Path"),
        }
    }

    /// Make the service a child of `service`: its paths are prefixed with the
    /// canonical endpoint path of the parent.
    pub fn parent(&mut self, service: &str) {
        let Expr::HttpService(i) = self.expr else {
            return self.usage("Parent");
        };
        if let Some(svc) = self.eval.root.http.services.get_mut(i) {
            svc.parent = Some(service.to_string());
        }
    }

    /// Endpoint whose first route prefixes the paths of child services.
    pub fn canonical_method(&mut self, name: &str) {
        let Expr::HttpService(i) = self.expr else {
            return self.usage("CanonicalMethod");
        };
        if let Some(svc) = self.eval.root.http.services.get_mut(i) {
            svc.canonical_endpoint = Some(name.to_string());
        }
    }

    // ========================================================================
    // Routes
    // ========================================================================

    /// Add a route to the endpoint. Paths starting with `//` ignore the API
    /// and service base paths.
    pub fn route(&mut self, verb: Verb, path: &str) {
        match self.endpoint_mut() {
            Some(endpoint) => endpoint.routes.push(Route::new(verb, path)),
            None => self.usage(verb.as_str()),
        }
    }

    /// `GET` route.
    pub fn get(&mut self, path: &str) {
        self.route(Verb::Get, path);
    }

    /// `HEAD` route.
    pub fn head(&mut self, path: &str) {
        self.route(Verb::Head, path);
    }

    /// `POST` route.
    pub fn post(&mut self, path: &str) {
        self.route(Verb::Post, path);
    }

    /// `PUT` route.
    pub fn put(&mut self, path: &str) {
        self.route(Verb::Put, path);
    }

    /// `DELETE` route.
    pub fn delete(&mut self, path: &str) {
        self.route(Verb::Delete, path);
    }

    /// `CONNECT` route.
    pub fn connect(&mut self, path: &str) {
        self.route(Verb::Connect, path);
    }

    /// `OPTIONS` route.
    pub fn options(&mut self, path: &str) {
        self.route(Verb::Options, path);
    }

    /// `TRACE` route.
    pub fn trace(&mut self, path: &str) {
        self.route(Verb::Trace, path);
    }

    /// `PATCH` route.
    pub fn patch(&mut self, path: &str) {
        self.route(Verb::Patch, path);
    }

    // ========================================================================
    // Params and headers
    // ========================================================================

    /// Declare a path or query string parameter, `name` or `name:wire`. The
    /// type comes from the payload attribute of the same name.
    pub fn param(&mut self, name: &str) {
        self.param_with(name, TypeSpec::Empty, |_| {});
    }

    /// Declare a parameter with an explicit type.
    pub fn param_typed(&mut self, name: &str, ty: impl Into<TypeSpec>) {
        self.param_with(name, ty, |_| {});
    }

    /// Declare a parameter and refine it with `body`.
    pub fn param_with<F>(&mut self, name: &str, ty: impl Into<TypeSpec>, body: F)
    where
        F: FnOnce(&mut Dsl<'_>),
    {
        self.mapped_attribute("Param", false, name, &ty.into(), body);
    }

    /// Declare several params at once; `body` may mark them required.
    pub fn params<F>(&mut self, body: F)
    where
        F: FnOnce(&mut Dsl<'_>),
    {
        self.mapped_group("Params", false, body);
    }

    /// Declare a header, `name` or `name:wire`.
    pub fn header(&mut self, name: &str) {
        self.header_with(name, TypeSpec::Empty, |_| {});
    }

    /// Declare a header with an explicit type.
    pub fn header_typed(&mut self, name: &str, ty: impl Into<TypeSpec>) {
        self.header_with(name, ty, |_| {});
    }

    /// Declare a header and refine it with `body`.
    pub fn header_with<F>(&mut self, name: &str, ty: impl Into<TypeSpec>, body: F)
    where
        F: FnOnce(&mut Dsl<'_>),
    {
        self.mapped_attribute("Header", true, name, &ty.into(), body);
    }

    /// Declare several headers at once; `body` may mark them required.
    pub fn headers<F>(&mut self, body: F)
    where
        F: FnOnce(&mut Dsl<'_>),
    {
        self.mapped_group("Headers", true, body);
    }

    /// The params or headers of the current HTTP expression.
    fn mapped(&mut self, headers: bool) -> Option<&mut MappedAttribute> {
        let http = &mut self.eval.root.http;
        match &mut self.expr {
            Expr::HttpRoot => Some(pick(&mut http.params, &mut http.headers, headers)),
            Expr::HttpService(i) => http
                .services
                .get_mut(*i)
                .map(|s| pick(&mut s.params, &mut s.headers, headers)),
            Expr::Endpoint(s, e) => http
                .services
                .get_mut(*s)
                .and_then(|svc| svc.endpoints.get_mut(*e))
                .map(|e| pick(&mut e.params, &mut e.headers, headers)),
            Expr::Response(resp) if headers => Some(&mut resp.headers),
            _ => None,
        }
    }

    fn mapped_attribute<F>(
        &mut self,
        construct: &str,
        headers: bool,
        name: &str,
        ty: &TypeSpec,
        body: F,
    ) where
        F: FnOnce(&mut Dsl<'_>),
    {
        let in_group = matches!(self.expr, Expr::Attribute(_));
        if !in_group && self.mapped(headers).is_none() {
            return self.usage(construct);
        }
        let Some(base) = self.resolve(ty) else {
            return;
        };
        let attr = self.child_attribute(base, body);
        if in_group {
            // Inside `Params`/`Headers`: keep the raw `name:wire` key, the
            // group splits it when it is stored.
            match self.inline_attribute(construct).and_then(Attribute::ensure_object) {
                Some(fields) => {
                    fields.insert(name.to_string(), attr);
                }
                None => self.usage(construct),
            }
        } else if let Some(target) = self.mapped(headers) {
            target.add(name, attr);
        }
    }

    fn mapped_group<F>(&mut self, construct: &str, headers: bool, body: F)
    where
        F: FnOnce(&mut Dsl<'_>),
    {
        if self.mapped(headers).is_none() {
            return self.usage(construct);
        }
        let group = self.child_attribute(Attribute::object(), body);
        let group = MappedAttribute::from_object(&self.eval.root.types, &group);
        if let Some(target) = self.mapped(headers) {
            target.extend_from(&group);
        }
    }

    /// Decode the whole payload from the query string as a map.
    pub fn map_params(&mut self) {
        self.set_map_params(String::new());
    }

    /// Decode payload attribute `attr` from the query string as a map.
    pub fn map_params_to(&mut self, attr: &str) {
        self.set_map_params(attr.to_string());
    }

    fn set_map_params(&mut self, attr: String) {
        match self.endpoint_mut() {
            Some(endpoint) => endpoint.map_query_params = Some(attr),
            None => self.usage("MapParams"),
        }
    }

    /// Decode the request body as multipart.
    pub fn multipart_request(&mut self) {
        match self.endpoint_mut() {
            Some(endpoint) => endpoint.multipart_request = true,
            None => self.usage("MultipartRequest"),
        }
    }

    // ========================================================================
    // Bodies
    // ========================================================================

    /// Use the payload (or result) attribute `attr` as body.
    pub fn body(&mut self, attr: &str) {
        let mut origin = Attribute::default();
        origin.add_meta(BODY_ORIGIN_META, attr);
        self.set_body(origin);
    }

    /// Use a body of type `ty`.
    pub fn body_type(&mut self, ty: impl Into<TypeSpec>) {
        if !self.accepts_body() {
            return self.usage("Body");
        }
        if let Some(attr) = self.resolve(&ty.into()) {
            self.set_body(attr);
        }
    }

    /// Use an object listing payload (or result) attributes as body.
    pub fn body_object<F>(&mut self, body: F)
    where
        F: FnOnce(&mut Dsl<'_>),
    {
        if !self.accepts_body() {
            return self.usage("Body");
        }
        let attr = self.child_attribute(Attribute::object(), body);
        self.set_body(attr);
    }

    fn accepts_body(&self) -> bool {
        matches!(self.expr, Expr::Endpoint(..) | Expr::Response(_))
    }

    fn set_body(&mut self, attr: Attribute) {
        if let Expr::Response(resp) = &mut self.expr {
            resp.body = Some(attr);
            return;
        }
        match self.endpoint_mut() {
            Some(endpoint) => endpoint.body = Some(attr),
            None => self.usage("Body"),
        }
    }

    // ========================================================================
    // Responses
    // ========================================================================

    /// Declare a success response (status key) of an endpoint, or the
    /// response an error maps to (error name key) at API, service or endpoint
    /// level. Error responses default to status 400.
    pub fn response<F>(&mut self, key: impl Into<ResponseKey>, body: F)
    where
        F: FnOnce(&mut Dsl<'_>),
    {
        let key = key.into();
        let allowed = match key {
            ResponseKey::Status(_) => matches!(self.expr, Expr::Endpoint(..)),
            ResponseKey::Error(_) => matches!(
                self.expr,
                Expr::HttpRoot | Expr::HttpService(_) | Expr::Endpoint(..)
            ),
        };
        if !allowed {
            return self.usage("Response");
        }
        let status = match key {
            ResponseKey::Status(status) => status,
            ResponseKey::Error(_) => STATUS_BAD_REQUEST,
        };
        let expr = Expr::Response(Box::new(Response::with_status(status)));
        let Expr::Response(response) = self.child(expr, body) else {
            return;
        };
        let response = *response;
        match key {
            ResponseKey::Status(_) => {
                if let Some(endpoint) = self.endpoint_mut() {
                    endpoint.responses.push(response);
                }
            }
            ResponseKey::Error(name) => {
                let error = HttpError { name, response };
                match self.expr {
                    Expr::HttpRoot => self.eval.root.http.errors.push(error),
                    Expr::HttpService(i) => {
                        if let Some(svc) = self.eval.root.http.services.get_mut(i) {
                            svc.errors.push(error);
                        }
                    }
                    _ => {
                        if let Some(endpoint) = self.endpoint_mut() {
                            endpoint.errors.push(error);
                        }
                    }
                }
            }
        }
    }

    /// Status code of a response.
    pub fn code(&mut self, status: u16) {
        match &mut self.expr {
            Expr::Response(resp) => resp.status = status,
            _ => self.usage("Code"),
        }
    }

    /// Select the response when result attribute `name` holds `value`.
    pub fn tag(&mut self, name: &str, value: &str) {
        match &mut self.expr {
            Expr::Response(resp) => {
                resp.tag = Some(Tag {
                    name: name.to_string(),
                    value: value.to_string(),
                });
            }
            _ => self.usage("Tag"),
        }
    }

    /// Content type of a response, or of every response using a result type.
    pub fn content_type(&mut self, content_type: &str) {
        let content_type = Some(content_type.to_string());
        match &mut self.expr {
            Expr::Response(resp) => resp.content_type = content_type,
            Expr::ResultType(id) => {
                let info = self
                    .eval
                    .root
                    .types
                    .get_mut(*id)
                    .and_then(|ut| ut.result.as_mut());
                if let Some(info) = info {
                    info.content_type = content_type;
                }
            }
            _ => self.usage("ContentType"),
        }
    }
}

fn pick<'a>(
    params: &'a mut MappedAttribute,
    headers: &'a mut MappedAttribute,
    want_headers: bool,
) -> &'a mut MappedAttribute {
    if want_headers { headers } else { params }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use crate::eval::Evaluator;
    use crate::expr::{BODY_ORIGIN_META, DataType, Primitive, Root, Verb};

    use super::*;

    fn run(design: impl FnOnce(&mut Dsl<'_>)) -> Evaluator {
        let mut eval = Evaluator::new();
        eval.run(design);
        eval
    }

    fn endpoint<'a>(root: &'a Root, service: &str, name: &str) -> &'a Endpoint {
        root.http.service(service).unwrap().endpoint(name).unwrap()
    }

    #[test]
    fn test_routes_params_and_headers() {
        let eval = run(|d| {
            d.service("s", |s| {
                s.method("m", |m| {
                    m.payload_object(|p| {
                        p.attribute("id", Primitive::Int);
                        p.attribute("q", Primitive::String);
                        p.attribute("token", Primitive::String);
                    });
                    m.http(|h| {
                        h.get("/items/{id}");
                        h.route(Verb::Patch, "//abs/{id}");
                        h.param_typed("id", Primitive::Int);
                        h.params(|p| {
                            p.param("q:query");
                            p.required(&["q"]);
                        });
                        h.header("token:Authorization");
                    });
                });
            });
        });
        assert!(eval.diagnostics().is_empty(), "{}", eval.diagnostics());
        let e = endpoint(eval.root(), "s", "m");
        assert_eq!(e.service, "s");
        assert_eq!(e.routes.len(), 2);
        assert_eq!(e.routes[1].verb, Verb::Patch);
        assert_eq!(e.params.names(), vec!["id".to_string(), "q".to_string()]);
        assert_eq!(e.params.wire_name("q"), "query");
        assert!(e.params.is_required("q"));
        assert_eq!(e.headers.wire_name("token"), "Authorization");
    }

    #[test]
    fn test_service_and_api_http() {
        let eval = run(|d| {
            d.api("api", |a| {
                a.http(|h| {
                    h.path("/api");
                    h.header_typed("version:X-Version", Primitive::String);
                    h.response("unauthorized", |r| r.code(401));
                });
            });
            d.service("child", |s| {
                s.http(|h| {
                    h.path("/children");
                    h.parent("parent");
                    h.canonical_method("get");
                    h.response("conflict", |r| r.code(409));
                });
            });
        });
        assert!(eval.diagnostics().is_empty(), "{}", eval.diagnostics());
        let http = &eval.root().http;
        assert_eq!(http.path, "/api");
        assert_eq!(http.headers.wire_name("version"), "X-Version");
        assert_eq!(http.errors[0].name, "unauthorized");
        assert_eq!(http.errors[0].response.status, 401);
        let svc = http.service("child").unwrap();
        assert_eq!(svc.paths, vec!["/children".to_string()]);
        assert_eq!(svc.parent.as_deref(), Some("parent"));
        assert_eq!(svc.canonical_endpoint_name(), "get");
        assert_eq!(svc.errors[0].response.status, 409);
    }

    #[test]
    fn test_responses_and_bodies() {
        let eval = run(|d| {
            d.service("s", |s| {
                s.method("m", |m| {
                    m.payload_object(|p| p.attribute("doc", Primitive::Bytes));
                    m.result_object(|r| {
                        r.attribute("outcome", Primitive::String);
                        r.attribute("location", Primitive::String);
                    });
                    m.error("not_found");
                    m.http(|h| {
                        h.put("/");
                        h.body("doc");
                        h.response(201u16, |r| {
                            r.tag("outcome", "created");
                            r.header("location:Location");
                            r.content_type("application/json");
                        });
                        h.response(202u16, |r| r.description("accepted"));
                        h.response("not_found", |r| r.code(404));
                        h.response("bad", |_| {});
                    });
                });
            });
        });
        assert!(eval.diagnostics().is_empty(), "{}", eval.diagnostics());
        let e = endpoint(eval.root(), "s", "m");
        let body = e.body.as_ref().unwrap();
        assert_eq!(body.ty, DataType::Empty);
        assert_eq!(body.meta_value(BODY_ORIGIN_META), Some("doc"));
        assert_eq!(e.responses.len(), 2);
        let created = &e.responses[0];
        assert_eq!(created.status, 201);
        assert_eq!(created.tag.as_ref().unwrap().value, "created");
        assert_eq!(created.headers.wire_name("location"), "Location");
        assert_eq!(created.content_type.as_deref(), Some("application/json"));
        assert_eq!(e.errors.len(), 2);
        assert_eq!(e.errors[0].response.status, 404);
        assert_eq!(e.errors[1].response.status, STATUS_BAD_REQUEST);
    }

    #[test]
    fn test_http_constructs_outside_their_context() {
        let eval = run(|d| {
            d.api("api", |a| {
                a.http(|h| {
                    h.get("/");
                    h.response(200u16, |_| {});
                    h.body("x");
                });
            });
            d.service("s", |s| {
                s.method("m", |m| {
                    m.http(|h| {
                        h.parent("other");
                        h.map_params();
                        h.multipart_request();
                    });
                });
            });
        });
        let diags = eval.diagnostics();
        for message in [
            "invalid use of GET",
            "invalid use of Response",
            "invalid use of Body",
            "invalid use of Parent",
        ] {
            assert!(diags.contains_message(message), "missing {message:?} in {diags}");
        }
        assert_eq!(diags.len(), 4, "{diags}");
        let e = endpoint(eval.root(), "s", "m");
        assert_eq!(e.map_query_params.as_deref(), Some(""));
        assert!(e.multipart_request);
    }
}
