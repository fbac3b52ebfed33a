//! Design documents compiled from disk.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::fs;
use std::path::PathBuf;

use httpdesign_core::{Error, compile_file};
use tempfile::TempDir;

const CELLAR_YAML: &str = r#"
api:
  name: cellar
  title: Cellar API
  version: "1.0"
  http:
    path: /api
security_schemes:
  - name: jwt
    kind: jwt
types:
  - name: Bottle
    attributes:
      name: String
      vintage:
        type: Int
        minimum: 1900
    required: [name]
result_types:
  - identifier: application/vnd.bottle
    name: StoredBottle
    attributes:
      id: Int
      name: String
      vintage: Int
    required: [id, name]
    views:
      - name: default
        fields: [id, name, vintage]
      - name: tiny
        fields: [id]
services:
  - name: bottles
    errors:
      - name: not_found
    http:
      path: /bottles
      responses:
        - error: not_found
          code: 404
    methods:
      - name: show
        security: [jwt]
        payload:
          attributes:
            id: Int
            view: String
            token:
              type: String
              security: token
          required: [id]
        result: StoredBottle
        http:
          routes: ["GET /{id}"]
          params:
            view:
      - name: add
        payload: Bottle
        result: StoredBottle
        result_view: tiny
        http:
          routes: ["POST /"]
          responses:
            - status: 201
"#;

fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_yaml_document_compiles() {
    let dir = TempDir::new().unwrap();
    let model = compile_file(&write(&dir, "cellar.yaml", CELLAR_YAML)).unwrap();

    assert_eq!(model.api.name, "cellar");
    assert_eq!(model.api.title.as_deref(), Some("Cellar API"));
    assert_eq!(model.api.base_path, "/api");
    let bottles = model.service("bottles").unwrap();
    assert_eq!(bottles.paths, vec!["/api/bottles"]);

    let show = bottles.endpoint("show").unwrap();
    assert_eq!(show.routes[0].full_paths, vec!["/api/bottles/{id}"]);
    assert_eq!(show.path_params[0].name, "id");
    assert_eq!(show.query_params[0].name, "view");
    assert_eq!(show.headers[0].name, "token");
    assert_eq!(show.headers[0].wire_name, "Authorization");
    assert!(show.body.is_none());
    assert_eq!(show.security[0].scheme, "jwt");
    assert_eq!(show.responses[0].status, 200);
    assert_eq!(
        show.responses[0].content_type.as_deref(),
        Some("application/vnd.bottle")
    );
    let not_found = &show.errors[0];
    assert_eq!(not_found.name, "not_found");
    assert_eq!(not_found.response.status, 404);

    let add = bottles.endpoint("add").unwrap();
    assert_eq!(add.responses[0].status, 201);
    assert_eq!(add.body.as_ref().unwrap().type_name(), Some("AddRequestBody"));
    let result = add.responses[0].body.as_ref().unwrap();
    assert_eq!(model.field_names(result), vec!["id"]);
}

#[test]
fn test_json_and_toml_documents_compile() {
    let dir = TempDir::new().unwrap();
    let json = write(
        &dir,
        "calc.json",
        r#"{
  "services": [{
    "name": "calc",
    "methods": [{
      "name": "add",
      "payload": {"attributes": {"a": "Int", "b": "Int"}, "required": ["a", "b"]},
      "result": "Int",
      "http": {"routes": ["GET /add/{a}/{b}"]}
    }]
  }]
}"#,
    );
    let toml = write(
        &dir,
        "calc.toml",
        r#"
[[services]]
name = "calc"

[[services.methods]]
name = "add"
result = "Int"

[services.methods.payload]
required = ["a", "b"]
attributes = { a = "Int", b = "Int" }

[services.methods.http]
routes = ["GET /add/{a}/{b}"]
"#,
    );
    let from_json = compile_file(&json).unwrap();
    let from_toml = compile_file(&toml).unwrap();
    assert_eq!(from_json, from_toml);
    let add = from_json.service("calc").unwrap().endpoint("add").unwrap();
    let names: Vec<&str> = add.path_params.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b"]);
}

#[test]
fn test_document_design_errors_are_reported() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "broken.yaml",
        r#"
services:
  - name: s
    http:
      parent: ghost
    methods:
      - name: m
        payload: Missing
        http:
          routes: ["GET /"]
      - name: n
        payload: "array<"
"#,
    );
    let err = compile_file(&path).unwrap_err();
    let diags = err.diagnostics().expect("design diagnostics");
    assert!(diags.contains_message(r#"unknown type "Missing""#), "{diags}");
    assert!(diags.contains_message(r#"unknown type "array<""#), "{diags}");
}

#[test]
fn test_unreadable_and_unknown_files() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("missing.yaml");
    assert!(matches!(compile_file(&missing), Err(Error::Io { .. })));

    let text = write(&dir, "design.txt", "services: []");
    let err = compile_file(&text).unwrap_err();
    assert!(matches!(err, Error::Document { format: "unknown", .. }));
    assert!(err.to_string().contains("design.txt"));
}
