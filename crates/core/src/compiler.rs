//! Compilation pipeline: evaluate, finalize, validate, export.

use std::path::Path;

use httpdesign_common::ResolvedModel;
use tracing::{info, warn};

use crate::document::{Document, Format};
use crate::dsl::Dsl;
use crate::error::{Error, Result};
use crate::eval::Evaluator;
use crate::expr::Root;
use crate::export::export;
use crate::http;

/// Compile a design written against the declaration surface.
///
/// Evaluation errors stop the run before finalization; validation errors are
/// returned together as [`Error::Design`].
pub fn compile<F>(design: F) -> Result<ResolvedModel>
where
    F: FnOnce(&mut Dsl<'_>),
{
    let mut eval = Evaluator::new();
    eval.run(design);
    let (root, diagnostics) = eval.into_parts();
    if !diagnostics.is_empty() {
        warn!(count = diagnostics.len(), "design evaluation failed");
        return Err(Error::Design(diagnostics));
    }
    compile_root(root)
}

/// Finalize, validate and export an evaluated design.
pub fn compile_root(mut root: Root) -> Result<ResolvedModel> {
    http::finalize(&mut root)?;
    let diagnostics = http::validate(&root);
    if !diagnostics.is_empty() {
        warn!(count = diagnostics.len(), "design validation failed");
        return Err(Error::Design(diagnostics));
    }
    let model = export(&root);
    info!(
        api = %model.api.name,
        services = model.services.len(),
        types = model.types.len(),
        "design compiled"
    );
    Ok(model)
}

/// Compile a decoded design document.
pub fn compile_document(document: Document) -> Result<ResolvedModel> {
    compile(move |d| document.define(d))
}

/// Compile design document text.
pub fn compile_str(text: &str, format: Format) -> Result<ResolvedModel> {
    compile_document(Document::parse(text, format)?)
}

/// Load and compile a design document file.
pub fn compile_file(path: &Path) -> Result<ResolvedModel> {
    info!(path = %path.display(), "compiling design");
    compile_document(Document::load(path)?)
}
