//! Diagnostics and the crate error type.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Category of a recoverable design problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// A declaration was used in a context that does not support it.
    Usage,
    /// The design violates a structural rule (routes, responses, payload shape...).
    StructuralConstraint,
    /// The design names an error, service, endpoint, type or view that does not exist.
    MissingReference,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Usage => "usage",
            Self::StructuralConstraint => "structural constraint",
            Self::MissingReference => "missing reference",
        })
    }
}

/// One problem found in a design, tagged with the entity it was found in.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{location}: {message}")]
pub struct Diagnostic {
    /// Category of the problem.
    pub kind: DiagnosticKind,
    /// Human readable name of the offending entity, e.g. `service "calc" HTTP endpoint "add"`.
    pub location: String,
    /// What is wrong.
    pub message: String,
}

impl Diagnostic {
    /// Diagnostic of any kind.
    pub fn new(kind: DiagnosticKind, location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            location: location.into(),
            message: message.into(),
        }
    }

    /// Invalid use of a declaration.
    pub fn usage(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Usage, location, message)
    }

    /// Structural constraint violation.
    pub fn structural(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::StructuralConstraint, location, message)
    }

    /// Reference to an undefined entity.
    pub fn missing(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::MissingReference, location, message)
    }
}

/// Ordered collection of diagnostics reported by one compilation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    /// Empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a diagnostic.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.0.push(diagnostic);
    }

    /// Record a structural constraint violation.
    pub fn structural(&mut self, location: &str, message: impl Into<String>) {
        self.push(Diagnostic::structural(location, message));
    }

    /// Record a missing reference.
    pub fn missing(&mut self, location: &str, message: impl Into<String>) {
        self.push(Diagnostic::missing(location, message));
    }

    /// Append every diagnostic of `other`.
    pub fn extend(&mut self, other: Self) {
        self.0.extend(other.0);
    }

    /// True when no problem was found.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of diagnostics.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Diagnostics in the order they were reported.
    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.0.iter()
    }

    /// True if any diagnostic carries exactly this message.
    pub fn contains_message(&self, message: &str) -> bool {
        self.0.iter().any(|d| d.message == message)
    }

    /// Diagnostics of a given kind.
    pub fn of_kind(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter().filter(move |d| d.kind == kind)
    }

    /// Owned diagnostics in report order.
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.0
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, d) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{d}")?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<Diagnostic> for Diagnostics {
    fn from_iter<T: IntoIterator<Item = Diagnostic>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Errors returned by the compiler.
#[derive(Debug, Error)]
pub enum Error {
    /// The design is invalid; every problem found is listed.
    #[error("{0}")]
    Design(Diagnostics),

    /// An internal invariant of the engine was violated. No model is produced.
    #[error("internal error: {0}")]
    Bug(String),

    /// A design document could not be decoded.
    #[error("failed to parse {format} design document: {message}")]
    Document {
        /// Format name.
        format: &'static str,
        /// Decoder message.
        message: String,
    },

    /// A design document could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// Path of the document.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Diagnostics carried by a design error, empty for other variants.
    pub fn diagnostics(&self) -> Option<&Diagnostics> {
        match self {
            Self::Design(d) => Some(d),
            _ => None,
        }
    }
}

/// Result type of the compiler.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_display_prefixes_location() {
        let d = Diagnostic::structural(
            r#"service "calc" HTTP endpoint "add""#,
            "No route defined for HTTP endpoint",
        );
        assert_eq!(
            d.to_string(),
            r#"service "calc" HTTP endpoint "add": No route defined for HTTP endpoint"#
        );
    }

    #[test]
    fn test_diagnostics_display_joins_lines() {
        let mut diags = Diagnostics::new();
        diags.structural("a", "first");
        diags.missing("b", "second");
        assert_eq!(diags.to_string(), "a: first\nb: second");
        assert_eq!(diags.of_kind(DiagnosticKind::MissingReference).count(), 1);
        assert!(diags.contains_message("second"));
    }

    #[test]
    fn test_design_error_exposes_diagnostics() {
        let err = Error::Design(Diagnostics::from_iter([Diagnostic::usage(
            "top-level",
            "invalid use of Payload",
        )]));
        assert_eq!(err.to_string(), "top-level: invalid use of Payload");
        assert_eq!(err.diagnostics().map(Diagnostics::len), Some(1));
        assert!(Error::Bug("x".into()).diagnostics().is_none());
    }
}
