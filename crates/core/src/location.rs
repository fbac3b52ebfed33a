//! Human readable names of design entities, used as diagnostic locations.

use crate::expr::Verb;

/// `API "name"`
pub fn api(name: &str) -> String {
    format!("API {name:?}")
}

/// `service "name"`
pub fn service(name: &str) -> String {
    format!("service {name:?}")
}

/// `method "m" of service "s"`
pub fn method(service: &str, method: &str) -> String {
    format!("method {method:?} of service {service:?}")
}

/// `service "s" HTTP endpoint "e"`
pub fn endpoint(service: &str, endpoint: &str) -> String {
    if endpoint.is_empty() {
        format!("service {service:?} unnamed HTTP endpoint")
    } else {
        format!("service {service:?} HTTP endpoint {endpoint:?}")
    }
}

/// `route GET "/path" of service "s" HTTP endpoint "e"`
pub fn route(verb: Verb, path: &str, service: &str, endpoint_name: &str) -> String {
    format!(
        "route {verb} {path:?} of {}",
        endpoint(service, endpoint_name)
    )
}

/// `HTTP response of service "s" HTTP endpoint "e"`
pub fn response(service: &str, endpoint_name: &str) -> String {
    format!("HTTP response of {}", endpoint(service, endpoint_name))
}

/// `type "name"`
pub fn user_type(name: &str) -> String {
    format!("type {name:?}")
}

/// `result type "name"`
pub fn result_type(name: &str) -> String {
    format!("result type {name:?}")
}

/// `security scheme "name"`
pub fn scheme(name: &str) -> String {
    format!("security scheme {name:?}")
}
