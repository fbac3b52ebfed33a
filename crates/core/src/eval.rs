//! Deferred, phased evaluation of design bodies.
//!
//! A design is a closure run against a [`Dsl`] context. Constructs that open a
//! body whose content depends on declarations made elsewhere (type bodies,
//! service and method bodies, every `http` body) do not run it right away:
//! the body is queued for a later [`Phase`]. Phases run in a fixed order and
//! each one drains its queue before the next starts, so an endpoint body always
//! sees its method fully declared, whatever the declaration order was.

use std::fmt;

use tracing::debug;

use crate::dsl::Dsl;
use crate::error::{Diagnostic, Diagnostics};
use crate::expr::{Attribute, Response, Root, TypeId};
use crate::location;

/// A queued design body.
pub(crate) type Body = Box<dyn FnOnce(&mut Dsl<'_>)>;

/// Evaluation phases, run in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    /// API body.
    Api,
    /// User type bodies.
    Types,
    /// Result type bodies.
    ResultTypes,
    /// Service bodies.
    Services,
    /// Method bodies.
    Methods,
    /// API `http` body.
    ApiHttp,
    /// Service `http` bodies.
    ServiceHttp,
    /// Method `http` bodies.
    Endpoints,
}

impl Phase {
    /// Every phase in run order.
    pub const ALL: [Self; 8] = [
        Self::Api,
        Self::Types,
        Self::ResultTypes,
        Self::Services,
        Self::Methods,
        Self::ApiHttp,
        Self::ServiceHttp,
        Self::Endpoints,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

/// The expression a DSL construct applies to.
///
/// Variants holding indexes point into the [`Root`] being built; `Attribute`
/// and `Response` own the value under construction, which the construct that
/// opened the body stores once the body returns.
#[derive(Debug, Clone)]
pub enum Expr {
    /// Top level of a design.
    Top,
    /// The API.
    Api,
    /// Security scheme index.
    Scheme(usize),
    /// Result type being defined.
    ResultType(TypeId),
    /// View index of a result type.
    View(TypeId, usize),
    /// Service index.
    Service(usize),
    /// Service index, method index.
    Method(usize, usize),
    /// Attribute under construction.
    Attribute(Box<Attribute>),
    /// API `http` body.
    HttpRoot,
    /// HTTP service index.
    HttpService(usize),
    /// HTTP service index, endpoint index.
    Endpoint(usize, usize),
    /// Response under construction.
    Response(Box<Response>),
}

impl Expr {
    /// Construct name used in usage errors about the context itself.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Top => "top level",
            Self::Api => "API",
            Self::Scheme(_) => "security scheme",
            Self::ResultType(_) => "result type",
            Self::View(..) => "view",
            Self::Service(_) => "service",
            Self::Method(..) => "method",
            Self::Attribute(_) => "attribute",
            Self::HttpRoot => "API HTTP",
            Self::HttpService(_) => "service HTTP",
            Self::Endpoint(..) => "HTTP endpoint",
            Self::Response(_) => "HTTP response",
        }
    }
}

struct Deferred {
    expr: Expr,
    location: String,
    body: Body,
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("expr", &self.expr.kind())
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

/// Owns the design under construction and the diagnostics reported so far.
#[derive(Debug)]
pub struct Evaluator {
    pub(crate) root: Root,
    pub(crate) diagnostics: Diagnostics,
    queues: Vec<Vec<Deferred>>,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self {
            root: Root::default(),
            diagnostics: Diagnostics::new(),
            queues: Phase::ALL.iter().map(|_| Vec::new()).collect(),
        }
    }
}

impl Evaluator {
    /// Evaluator with an empty design.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run a design: the top level closure first, then every queued body
    /// phase by phase.
    pub fn run<F>(&mut self, design: F)
    where
        F: FnOnce(&mut Dsl<'_>),
    {
        {
            let mut top = Dsl::new(self, Expr::Top, "design".to_string());
            design(&mut top);
        }
        for phase in Phase::ALL {
            let mut replayed = 0usize;
            loop {
                let batch = std::mem::take(&mut self.queues[phase.index()]);
                if batch.is_empty() {
                    break;
                }
                for deferred in batch {
                    replayed += 1;
                    let mut dsl = Dsl::new(self, deferred.expr, deferred.location);
                    (deferred.body)(&mut dsl);
                }
            }
            debug!(?phase, bodies = replayed, "evaluation phase done");
        }
    }

    pub(crate) fn defer(&mut self, phase: Phase, expr: Expr, location: String, body: Body) {
        self.queues[phase.index()].push(Deferred {
            expr,
            location,
            body,
        });
    }

    pub(crate) fn report(&mut self, diagnostic: Diagnostic) {
        debug!(%diagnostic, "design error");
        self.diagnostics.push(diagnostic);
    }

    /// Design built so far.
    pub fn root(&self) -> &Root {
        &self.root
    }

    /// Diagnostics reported so far.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Split into the design and its diagnostics.
    pub fn into_parts(self) -> (Root, Diagnostics) {
        (self.root, self.diagnostics)
    }

    /// Location of an expression, falling back to `parent` for anonymous
    /// expressions (attributes and responses).
    pub(crate) fn location_of(&self, expr: &Expr, parent: &str) -> String {
        let root = &self.root;
        let service_name = |i: usize| root.services.get(i).map_or("", |s| s.name.as_str());
        let http_name = |i: usize| root.http.services.get(i).map_or("", |s| s.name.as_str());
        match expr {
            Expr::Top => "design".to_string(),
            Expr::Api => location::api(&root.api.name),
            Expr::Scheme(i) => location::scheme(root.schemes.get(*i).map_or("", |s| s.name.as_str())),
            Expr::ResultType(id) | Expr::View(id, _) => {
                location::result_type(root.types.get(*id).map_or("", |t| t.name.as_str()))
            }
            Expr::Service(i) => location::service(service_name(*i)),
            Expr::Method(s, m) => location::method(
                service_name(*s),
                root.services
                    .get(*s)
                    .and_then(|svc| svc.methods.get(*m))
                    .map_or("", |m| m.name.as_str()),
            ),
            Expr::HttpRoot => location::api(&root.api.name),
            Expr::HttpService(i) => location::service(http_name(*i)),
            Expr::Endpoint(s, e) => location::endpoint(
                http_name(*s),
                root.http
                    .services
                    .get(*s)
                    .and_then(|svc| svc.endpoints.get(*e))
                    .map_or("", |e| e.name.as_str()),
            ),
            Expr::Attribute(_) | Expr::Response(_) => parent.to_string(),
        }
    }
}
