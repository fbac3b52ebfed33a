//! Path templates: wildcards, normalization and full path computation.
//!
//! A wildcard is a path segment of the form `{name}` or `{*name}` (catch-all).
//! Full paths are computed by joining the API base path, the parent service
//! canonical route, the service base path and the route path.

use std::collections::HashSet;

use crate::expr::{HttpRoot, HttpService, Route};

/// Names of the wildcards of a path, in order, duplicates included.
pub fn wildcards(path: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut rest = path;
    while let Some(start) = rest.find("/{") {
        let after = &rest[start + 2..];
        let body = after.strip_prefix('*').unwrap_or(after);
        let len = body
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(body.len());
        if len > 0 && body[len..].starts_with('}') {
            names.push(body[..len].to_string());
            rest = &body[len + 1..];
        } else {
            rest = after;
        }
    }
    names
}

/// Wildcards appearing more than once in `path`, each reported once.
pub fn duplicate_wildcards(path: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut dups: Vec<String> = Vec::new();
    for name in wildcards(path) {
        if !seen.insert(name.clone()) && !dups.contains(&name) {
            dups.push(name);
        }
    }
    dups
}

/// Normalize a URL path: leading slash, no repeated slashes, `.` and `..`
/// resolved. A trailing slash is kept.
pub fn clean(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    let mut out = format!("/{}", segments.join("/"));
    if path.ends_with('/') && !segments.is_empty() {
        out.push('/');
    }
    out
}

/// Join two paths and normalize the result, dropping any trailing slash.
pub fn join(base: &str, path: &str) -> String {
    let joined = clean(&format!("{base}/{path}"));
    match joined.strip_suffix('/') {
        Some(trimmed) if !trimmed.is_empty() => trimmed.to_string(),
        _ => joined,
    }
}

/// Full paths of a route given the full paths of its service.
pub fn route_full_paths(route: &Route, bases: &[String]) -> Vec<String> {
    if route.is_absolute() {
        return vec![clean(&route.path[1..])];
    }
    bases.iter().map(|base| join(base, &route.path)).collect()
}

/// Base paths of a service: its own paths prefixed with the full path of its
/// parent canonical route, or with the API base path.
pub fn service_full_paths(http: &HttpRoot, service: &HttpService) -> Vec<String> {
    let mut visiting = HashSet::new();
    service_paths(http, service, &mut visiting)
}

fn service_paths<'a>(
    http: &'a HttpRoot,
    service: &'a HttpService,
    visiting: &mut HashSet<&'a str>,
) -> Vec<String> {
    if service.paths.is_empty() {
        return vec![clean(&http.path)];
    }
    if !visiting.insert(service.name.as_str()) {
        // Parent cycle, reported by validation.
        return Vec::new();
    }
    let parent = service.parent.as_deref().and_then(|p| http.service(p));
    let bases = match parent {
        Some(parent) => parent
            .canonical()
            .and_then(|c| c.routes.first())
            .map(|route| route_full_paths(route, &service_paths(http, parent, visiting)))
            .unwrap_or_default(),
        None => vec![http.path.clone()],
    };
    let mut paths = Vec::new();
    for p in &service.paths {
        if p.starts_with("//") {
            paths.push(clean(p));
            continue;
        }
        paths.extend(bases.iter().map(|base| join(base, p)));
    }
    visiting.remove(service.name.as_str());
    paths
}
