//! Naming helpers shared by the body deriver and the projector.

use http::StatusCode;

/// Capitalize the first letter of a string.
pub fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().chain(chars).collect(),
    }
}

/// Concatenate name parts with casing that follows the first part:
///
/// - `my_endpoint` + `Request` + `Body` → `my_endpoint_request_body`
/// - `My_endpoint` + `request` + `body` → `My_endpoint_Request_Body`
/// - `myEndpoint` + `request` + `Body` → `MyEndpointRequestBody`
pub fn concat(parts: &[&str]) -> String {
    let Some((first, rest)) = parts.split_first() else {
        return String::new();
    };
    if rest.is_empty() {
        return (*first).to_string();
    }
    let underscored = first.contains('_');
    let lower = first.chars().next().is_some_and(char::is_lowercase);
    let mut name = String::from(*first);
    match (underscored, lower) {
        (true, true) => {
            for part in rest {
                name.push('_');
                name.push_str(&part.to_lowercase());
            }
        }
        (true, false) => {
            for part in rest {
                name.push('_');
                name.push_str(&capitalize_first(part));
            }
        }
        _ => {
            name = capitalize_first(first);
            for part in rest {
                name.push_str(&capitalize_first(part));
            }
        }
    }
    name
}

/// Canonical reason phrase of an HTTP status code, empty when unknown.
pub fn status_text(status: u16) -> &'static str {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
        .unwrap_or_default()
}

/// Status reason phrase reduced to identifier characters, e.g. `NoContent`.
pub fn status_suffix(status: u16) -> String {
    status_text(status)
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect()
}

/// Whether a response with this status may carry a body.
pub fn body_allowed_for_status(status: u16) -> bool {
    StatusCode::from_u16(status).ok().is_none_or(|code| {
        !(code.is_informational()
            || code == StatusCode::NO_CONTENT
            || code == StatusCode::NOT_MODIFIED)
    })
}

/// Split an `attribute:wire` name into its attribute and wire parts.
pub fn split_wire_name(spec: &str) -> (&str, Option<&str>) {
    match spec.split_once(':') {
        Some((name, wire)) if !wire.is_empty() => (name, Some(wire)),
        Some((name, _)) => (name, None),
        None => (spec, None),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_capitalize_first() {
        assert_eq!(capitalize_first("foo"), "Foo");
        assert_eq!(capitalize_first(""), "");
        assert_eq!(capitalize_first("ABC"), "ABC");
    }

    #[test]
    fn test_concat_casing() {
        assert_eq!(
            concat(&["my_endpoint", "Request", "BODY"]),
            "my_endpoint_request_body"
        );
        assert_eq!(
            concat(&["My_endpoint", "response", "body"]),
            "My_endpoint_Response_Body"
        );
        assert_eq!(
            concat(&["myEndpoint", "streaming", "Body"]),
            "MyEndpointStreamingBody"
        );
        assert_eq!(concat(&["add", "Request", "Body"]), "AddRequestBody");
        assert_eq!(concat(&["single"]), "single");
        assert_eq!(concat(&[]), "");
    }

    #[test]
    fn test_status_suffix_strips_spaces() {
        assert_eq!(status_suffix(204), "NoContent");
        assert_eq!(status_suffix(201), "Created");
        assert_eq!(status_suffix(203), "NonAuthoritativeInformation");
        assert_eq!(status_suffix(299), "");
        assert_eq!(status_suffix(1000), "");
        assert_eq!(status_text(404), "Not Found");
    }

    #[test]
    fn test_body_allowed_for_status() {
        assert!(body_allowed_for_status(200));
        assert!(body_allowed_for_status(400));
        assert!(!body_allowed_for_status(204));
        assert!(!body_allowed_for_status(304));
        assert!(!body_allowed_for_status(101));
    }

    #[test]
    fn test_split_wire_name() {
        assert_eq!(split_wire_name("id"), ("id", None));
        assert_eq!(split_wire_name("id:ID"), ("id", Some("ID")));
        assert_eq!(split_wire_name("id:"), ("id", None));
    }
}
