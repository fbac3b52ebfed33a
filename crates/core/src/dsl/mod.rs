//! Declaration surface.
//!
//! Every construct is a method of [`Dsl`], the explicit evaluation context.
//! A construct first checks that the current [`Expr`] supports it and reports
//! `invalid use of <Construct>` otherwise, then mutates the expression. Bodies
//! of nested constructs run against a child context; the ones that depend on
//! declarations made elsewhere are queued (see [`crate::eval`]).
//!
//! ```
//! use httpdesign_core::expr::Primitive;
//!
//! let model = httpdesign_core::compile(|d| {
//!     d.api("calc", |_| {});
//!     d.service("calc", |s| {
//!         s.method("add", |m| {
//!             m.payload_object(|p| {
//!                 p.attribute("a", Primitive::Int);
//!                 p.attribute("b", Primitive::Int);
//!                 p.required(&["a", "b"]);
//!             });
//!             m.result(Primitive::Int);
//!             m.http(|h| {
//!                 h.get("/add/{a}/{b}");
//!             });
//!         });
//!     });
//! })
//! .unwrap();
//! let endpoint = model.services[0].endpoint("add").unwrap();
//! assert_eq!(endpoint.path_params.len(), 2);
//! ```

mod design;
mod http;

use std::fmt;

use crate::error::Diagnostic;
use crate::eval::{Evaluator, Expr, Phase};
use crate::expr::{Attribute, Primitive};

pub use http::ResponseKey;

/// Evaluation context handed to every design body.
#[derive(Debug)]
pub struct Dsl<'a> {
    eval: &'a mut Evaluator,
    expr: Expr,
    location: String,
}

impl<'a> Dsl<'a> {
    pub(crate) fn new(eval: &'a mut Evaluator, expr: Expr, location: String) -> Self {
        Self {
            eval,
            expr,
            location,
        }
    }

    /// The expression constructs currently apply to.
    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Location used for diagnostics reported from this context.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Run `body` against a child context and return the child expression.
    fn child<F>(&mut self, expr: Expr, body: F) -> Expr
    where
        F: FnOnce(&mut Dsl<'_>),
    {
        let location = self.eval.location_of(&expr, &self.location);
        let mut child = Dsl::new(&mut *self.eval, expr, location);
        body(&mut child);
        child.expr
    }

    /// Run `body` against an attribute under construction.
    fn child_attribute<F>(&mut self, attr: Attribute, body: F) -> Attribute
    where
        F: FnOnce(&mut Dsl<'_>),
    {
        match self.child(Expr::Attribute(Box::new(attr)), body) {
            Expr::Attribute(attr) => *attr,
            _ => Attribute::default(),
        }
    }

    fn defer<F>(&mut self, phase: Phase, expr: Expr, body: F)
    where
        F: FnOnce(&mut Dsl<'_>) + 'static,
    {
        let location = self.eval.location_of(&expr, &self.location);
        self.eval.defer(phase, expr, location, Box::new(body));
    }

    fn defer_at<F>(&mut self, phase: Phase, location: String, body: F)
    where
        F: FnOnce(&mut Dsl<'_>) + 'static,
    {
        self.eval.defer(phase, Expr::Top, location, Box::new(body));
    }

    fn usage(&mut self, construct: &str) {
        let diagnostic =
            Diagnostic::usage(self.location.clone(), format!("invalid use of {construct}"));
        self.eval.report(diagnostic);
    }

    fn missing(&mut self, message: impl Into<String>) {
        let diagnostic = Diagnostic::missing(self.location.clone(), message);
        self.eval.report(diagnostic);
    }

    fn structural(&mut self, message: impl Into<String>) {
        let diagnostic = Diagnostic::structural(self.location.clone(), message);
        self.eval.report(diagnostic);
    }

    /// Turn a type spec into an attribute, reporting unknown type names.
    fn resolve(&mut self, spec: &TypeSpec) -> Option<Attribute> {
        match spec {
            TypeSpec::Empty => Some(Attribute::default()),
            TypeSpec::Primitive(p) => Some(Attribute::primitive(*p)),
            TypeSpec::Named(name) => {
                if let Some(p) = Primitive::from_name(name) {
                    return Some(Attribute::primitive(p));
                }
                if let Some(id) = self.eval.root.types.lookup(name) {
                    return Some(Attribute::user(id));
                }
                self.missing(format!("unknown type {name:?}"));
                None
            }
            TypeSpec::ArrayOf(elem) => self.resolve(elem).map(Attribute::array_of),
            TypeSpec::MapOf(key, elem) => {
                let key = self.resolve(key)?;
                let elem = self.resolve(elem)?;
                Some(Attribute::map_of(key, elem))
            }
        }
    }
}

/// Type of an attribute as written in a design, resolved when the construct
/// using it runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeSpec {
    /// No type: an object when the construct opens a body, otherwise the type
    /// is taken from the matching payload or result attribute.
    Empty,
    /// A primitive.
    Primitive(Primitive),
    /// A primitive or declared type name.
    Named(String),
    /// `array<T>`
    ArrayOf(Box<TypeSpec>),
    /// `map<K, V>`
    MapOf(Box<TypeSpec>, Box<TypeSpec>),
}

impl TypeSpec {
    /// `array<elem>`
    pub fn array_of(elem: impl Into<Self>) -> Self {
        Self::ArrayOf(Box::new(elem.into()))
    }

    /// `map<key, elem>`
    pub fn map_of(key: impl Into<Self>, elem: impl Into<Self>) -> Self {
        Self::MapOf(Box::new(key.into()), Box::new(elem.into()))
    }

    /// Parse a type expression: a type name, `array<T>` or `map<K, V>`.
    pub fn parse(expr: &str) -> Result<Self, String> {
        let expr = expr.trim();
        if let Some(inner) = generic_args(expr, "array") {
            return Ok(Self::array_of(Self::parse(inner)?));
        }
        if let Some(inner) = generic_args(expr, "map") {
            let (key, elem) = split_top_level(inner)
                .ok_or_else(|| format!("invalid map type {expr:?}: expected map<K, V>"))?;
            return Ok(Self::map_of(Self::parse(key)?, Self::parse(elem)?));
        }
        let valid = !expr.is_empty()
            && expr
                .chars()
                .all(|c| c.is_alphanumeric() || c == '_' || c == '.');
        if !valid {
            return Err(format!("invalid type expression {expr:?}"));
        }
        Ok(Primitive::from_name(expr).map_or_else(|| Self::Named(expr.to_string()), Self::Primitive))
    }
}

fn generic_args<'a>(expr: &'a str, name: &str) -> Option<&'a str> {
    expr.strip_prefix(name)?
        .trim_start()
        .strip_prefix('<')?
        .strip_suffix('>')
}

/// Split `K, V` at the comma that is not nested in angle brackets.
fn split_top_level(s: &str) -> Option<(&str, &str)> {
    let mut depth = 0i32;
    for (i, c) in s.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth -= 1,
            ',' if depth == 0 => return Some((&s[..i], &s[i + 1..])),
            _ => {}
        }
    }
    None
}

impl fmt::Display for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Primitive(p) => write!(f, "{p}"),
            Self::Named(n) => f.write_str(n),
            Self::ArrayOf(elem) => write!(f, "array<{elem}>"),
            Self::MapOf(key, elem) => write!(f, "map<{key}, {elem}>"),
        }
    }
}

impl From<Primitive> for TypeSpec {
    fn from(p: Primitive) -> Self {
        Self::Primitive(p)
    }
}

impl From<&str> for TypeSpec {
    fn from(name: &str) -> Self {
        Self::Named(name.to_string())
    }
}

impl From<String> for TypeSpec {
    fn from(name: String) -> Self {
        Self::Named(name)
    }
}
