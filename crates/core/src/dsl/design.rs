//! Transport agnostic constructs: API, types, services, methods, attributes
//! and security.

use serde_json::Value;

use super::{Dsl, TypeSpec};
use crate::eval::{Expr, Phase};
use crate::expr::{
    Attribute, DataType, Method, MethodError, Object, Primitive, Requirement, ResultInfo,
    SchemeKind, SecurityScheme, Service, UserType, VIEW_META, View, ViewField,
};
use crate::location;

/// Name of the type used by errors declared without a type.
pub const ERROR_RESULT: &str = "ErrorResult";

/// Media type identifier of [`ERROR_RESULT`].
pub const ERROR_RESULT_IDENTIFIER: &str = "application/vnd.error";

impl Dsl<'_> {
    // ========================================================================
    // Top level
    // ========================================================================

    /// Name the API and queue its body.
    pub fn api<F>(&mut self, name: &str, body: F)
    where
        F: FnOnce(&mut Dsl<'_>) + 'static,
    {
        if !matches!(self.expr, Expr::Top) {
            return self.usage("API");
        }
        self.eval.root.api.name = name.to_string();
        self.defer(Phase::Api, Expr::Api, body);
    }

    /// Declare an object type. The name is usable right away, the body runs
    /// once every type name is known.
    pub fn type_<F>(&mut self, name: &str, body: F)
    where
        F: FnOnce(&mut Dsl<'_>) + 'static,
    {
        self.type_of(name, TypeSpec::Empty, body);
    }

    /// Declare a named type of any shape, e.g. a named array.
    pub fn type_of<F>(&mut self, name: &str, ty: impl Into<TypeSpec>, body: F)
    where
        F: FnOnce(&mut Dsl<'_>) + 'static,
    {
        if !matches!(self.expr, Expr::Top) {
            return self.usage("Type");
        }
        let declared = self
            .eval
            .root
            .types
            .declare(UserType::new(name, name, Attribute::object()));
        let Ok(id) = declared else {
            return self.structural(format!("type {name:?} is already defined"));
        };
        let spec = ty.into();
        self.defer_at(Phase::Types, location::user_type(name), move |d| {
            let base = match &spec {
                TypeSpec::Empty => Some(Attribute::object()),
                other => d.resolve(other),
            };
            let Some(base) = base else {
                return;
            };
            let attr = d.child_attribute(base, body);
            if let Some(ut) = d.eval.root.types.get_mut(id) {
                ut.attribute = attr;
            }
        });
    }

    /// Declare a result type: a named object with a media type identifier and
    /// views. A result type declaring no view gets a `default` view listing
    /// every attribute.
    pub fn result_type<F>(&mut self, identifier: &str, name: &str, body: F)
    where
        F: FnOnce(&mut Dsl<'_>) + 'static,
    {
        if !matches!(self.expr, Expr::Top) {
            return self.usage("ResultType");
        }
        let declared = self.eval.root.types.declare(UserType {
            result: Some(ResultInfo {
                identifier: identifier.to_string(),
                content_type: None,
                views: Vec::new(),
            }),
            ..UserType::new(name, name, Attribute::object())
        });
        match declared {
            Ok(id) => self.defer(Phase::ResultTypes, Expr::ResultType(id), body),
            Err(_) => self.structural(format!("result type {name:?} is already defined")),
        }
    }

    /// Declare a service. Its body runs once every type is declared.
    pub fn service<F>(&mut self, name: &str, body: F)
    where
        F: FnOnce(&mut Dsl<'_>) + 'static,
    {
        if !matches!(self.expr, Expr::Top) {
            return self.usage("Service");
        }
        if self.eval.root.service(name).is_some() {
            return self.structural(format!("service {name:?} is already defined"));
        }
        self.eval.root.services.push(Service {
            name: name.to_string(),
            ..Service::default()
        });
        let index = self.eval.root.services.len() - 1;
        self.defer(Phase::Services, Expr::Service(index), body);
    }

    /// Declare a basic auth scheme.
    pub fn basic_auth_security<F>(&mut self, name: &str, body: F)
    where
        F: FnOnce(&mut Dsl<'_>),
    {
        self.security_scheme("BasicAuthSecurity", name, SchemeKind::Basic, body);
    }

    /// Declare an API key scheme.
    pub fn api_key_security<F>(&mut self, name: &str, body: F)
    where
        F: FnOnce(&mut Dsl<'_>),
    {
        self.security_scheme("APIKeySecurity", name, SchemeKind::ApiKey, body);
    }

    /// Declare a JWT scheme.
    pub fn jwt_security<F>(&mut self, name: &str, body: F)
    where
        F: FnOnce(&mut Dsl<'_>),
    {
        self.security_scheme("JWTSecurity", name, SchemeKind::Jwt, body);
    }

    /// Declare an OAuth2 scheme.
    pub fn oauth2_security<F>(&mut self, name: &str, body: F)
    where
        F: FnOnce(&mut Dsl<'_>),
    {
        self.security_scheme("OAuth2Security", name, SchemeKind::OAuth2, body);
    }

    fn security_scheme<F>(&mut self, construct: &str, name: &str, kind: SchemeKind, body: F)
    where
        F: FnOnce(&mut Dsl<'_>),
    {
        if !matches!(self.expr, Expr::Top) {
            return self.usage(construct);
        }
        if self.eval.root.scheme(name).is_some() {
            return self.structural(format!("security scheme {name:?} is already defined"));
        }
        self.eval.root.schemes.push(SecurityScheme {
            name: name.to_string(),
            kind,
            description: None,
        });
        let index = self.eval.root.schemes.len() - 1;
        self.child(Expr::Scheme(index), body);
    }

    // ========================================================================
    // API, service and method
    // ========================================================================

    /// API title.
    pub fn title(&mut self, title: &str) {
        if !matches!(self.expr, Expr::Api) {
            return self.usage("Title");
        }
        self.eval.root.api.title = Some(title.to_string());
    }

    /// API version.
    pub fn version(&mut self, version: &str) {
        if !matches!(self.expr, Expr::Api) {
            return self.usage("Version");
        }
        self.eval.root.api.version = Some(version.to_string());
    }

    /// Description of the API, a scheme, a service, a method, an attribute or a response.
    pub fn description(&mut self, text: &str) {
        let text = Some(text.to_string());
        match &mut self.expr {
            Expr::Attribute(attr) => attr.description = text,
            Expr::Response(resp) => resp.description = text,
            Expr::Api => self.eval.root.api.description = text,
            Expr::Scheme(i) => {
                if let Some(s) = self.eval.root.schemes.get_mut(*i) {
                    s.description = text;
                }
            }
            Expr::Service(i) => {
                if let Some(s) = self.eval.root.services.get_mut(*i) {
                    s.description = text;
                }
            }
            Expr::Method(s, m) => {
                if let Some(method) = method_at(&mut self.eval.root.services, *s, *m) {
                    method.description = text;
                }
            }
            Expr::ResultType(id) => {
                if let Some(ut) = self.eval.root.types.get_mut(*id) {
                    ut.attribute.description = text;
                }
            }
            _ => self.usage("Description"),
        }
    }

    /// Declare a method and queue its body.
    pub fn method<F>(&mut self, name: &str, body: F)
    where
        F: FnOnce(&mut Dsl<'_>) + 'static,
    {
        let Expr::Service(s) = self.expr else {
            return self.usage("Method");
        };
        let Some(service) = self.eval.root.services.get_mut(s) else {
            return;
        };
        if service.methods.iter().any(|m| m.name == name) {
            return self.structural(format!("method {name:?} is already defined"));
        }
        service.methods.push(Method {
            name: name.to_string(),
            ..Method::default()
        });
        let index = service.methods.len() - 1;
        self.defer(Phase::Methods, Expr::Method(s, index), body);
    }

    /// Set the payload type.
    pub fn payload(&mut self, ty: impl Into<TypeSpec>) {
        self.payload_with(ty, |_| {});
    }

    /// Set the payload to an inline object built by `body`.
    pub fn payload_object<F>(&mut self, body: F)
    where
        F: FnOnce(&mut Dsl<'_>),
    {
        self.method_attribute("Payload", TypeSpec::Empty, None, body, |m, attr| {
            m.payload = attr;
        });
    }

    /// Set the payload type and refine it with `body`.
    pub fn payload_with<F>(&mut self, ty: impl Into<TypeSpec>, body: F)
    where
        F: FnOnce(&mut Dsl<'_>),
    {
        self.method_attribute("Payload", ty.into(), None, body, |m, attr| {
            m.payload = attr;
        });
    }

    /// Set the result type.
    pub fn result(&mut self, ty: impl Into<TypeSpec>) {
        self.result_with(ty, |_| {});
    }

    /// Set the result to a view of a result type.
    pub fn result_view(&mut self, ty: impl Into<TypeSpec>, view: &str) {
        self.method_attribute("Result", ty.into(), Some(view), |_| {}, |m, attr| {
            m.result = attr;
        });
    }

    /// Set the result to an inline object built by `body`.
    pub fn result_object<F>(&mut self, body: F)
    where
        F: FnOnce(&mut Dsl<'_>),
    {
        self.method_attribute("Result", TypeSpec::Empty, None, body, |m, attr| {
            m.result = attr;
        });
    }

    /// Set the result type and refine it with `body`.
    pub fn result_with<F>(&mut self, ty: impl Into<TypeSpec>, body: F)
    where
        F: FnOnce(&mut Dsl<'_>),
    {
        self.method_attribute("Result", ty.into(), None, body, |m, attr| {
            m.result = attr;
        });
    }

    fn method_attribute<F, S>(
        &mut self,
        construct: &str,
        ty: TypeSpec,
        view: Option<&str>,
        body: F,
        store: S,
    ) where
        F: FnOnce(&mut Dsl<'_>),
        S: FnOnce(&mut Method, Attribute),
    {
        let Expr::Method(s, m) = self.expr else {
            return self.usage(construct);
        };
        let base = match &ty {
            TypeSpec::Empty => Some(Attribute::object()),
            other => self.resolve(other),
        };
        let Some(base) = base else {
            return;
        };
        let mut attr = self.child_attribute(base, body);
        if let Some(view) = view {
            attr.meta.insert(VIEW_META.to_string(), vec![view.to_string()]);
        }
        if let Some(method) = method_at(&mut self.eval.root.services, s, m) {
            store(method, attr);
        }
    }

    /// Declare an error using the default error type.
    pub fn error(&mut self, name: &str) {
        if !self.accepts_errors() {
            return self.usage("Error");
        }
        let ty = self.error_result();
        self.add_error(name, Attribute::user(ty));
    }

    /// Declare an error with an explicit type.
    pub fn error_type(&mut self, name: &str, ty: impl Into<TypeSpec>) {
        if !self.accepts_errors() {
            return self.usage("Error");
        }
        if let Some(attr) = self.resolve(&ty.into()) {
            self.add_error(name, attr);
        }
    }

    fn accepts_errors(&self) -> bool {
        matches!(self.expr, Expr::Api | Expr::Service(_) | Expr::Method(..))
    }

    fn add_error(&mut self, name: &str, attribute: Attribute) {
        let root = &mut self.eval.root;
        let errors = match self.expr {
            Expr::Api => Some(&mut root.api.errors),
            Expr::Service(s) => root.services.get_mut(s).map(|s| &mut s.errors),
            Expr::Method(s, m) => method_at(&mut root.services, s, m).map(|m| &mut m.errors),
            _ => None,
        };
        let Some(errors) = errors else {
            return;
        };
        if errors.iter().any(|e| e.name == name) {
            return self.structural(format!("error {name:?} is already defined"));
        }
        errors.push(MethodError {
            name: name.to_string(),
            attribute,
        });
    }

    /// The default error type, declared on first use unless the design
    /// declares its own.
    fn error_result(&mut self) -> crate::expr::TypeId {
        let types = &mut self.eval.root.types;
        if let Some(id) = types.lookup(ERROR_RESULT) {
            return id;
        }
        let mut fields = Object::new();
        for (name, p) in [
            ("name", Primitive::String),
            ("id", Primitive::String),
            ("message", Primitive::String),
            ("temporary", Primitive::Boolean),
            ("timeout", Primitive::Boolean),
            ("fault", Primitive::Boolean),
        ] {
            fields.insert(name.to_string(), Attribute::primitive(p));
        }
        let mut attribute = Attribute::new(DataType::Object(fields));
        for name in ["name", "id", "message", "temporary", "timeout", "fault"] {
            attribute.add_required(name);
        }
        attribute.description = Some("Error response result type".to_string());
        let ut = UserType {
            result: Some(ResultInfo {
                identifier: ERROR_RESULT_IDENTIFIER.to_string(),
                content_type: None,
                views: Vec::new(),
            }),
            ..UserType::new(ERROR_RESULT, ERROR_RESULT, attribute)
        };
        match types.declare(ut) {
            Ok(id) | Err(id) => {
                types.ensure_default_view(id);
                id
            }
        }
    }

    /// Require every scheme in `schemes`. Methods inherit the requirements of
    /// their service, services the ones of the API.
    pub fn security(&mut self, schemes: &[&str]) {
        if !matches!(self.expr, Expr::Api | Expr::Service(_) | Expr::Method(..)) {
            return self.usage("Security");
        }
        let mut requirement = Requirement::default();
        for name in schemes {
            if self.eval.root.scheme(name).is_none() {
                self.missing(format!("unknown security scheme {name:?}"));
                return;
            }
            requirement.schemes.push((*name).to_string());
        }
        let root = &mut self.eval.root;
        let target = match self.expr {
            Expr::Api => Some(&mut root.api.requirements),
            Expr::Service(s) => root.services.get_mut(s).map(|s| &mut s.requirements),
            Expr::Method(s, m) => method_at(&mut root.services, s, m).map(|m| &mut m.requirements),
            _ => None,
        };
        if let Some(target) = target {
            target.push(requirement);
        }
    }

    /// Remove any inherited security requirement from the method.
    pub fn no_security(&mut self) {
        let Expr::Method(s, m) = self.expr else {
            return self.usage("NoSecurity");
        };
        if let Some(method) = method_at(&mut self.eval.root.services, s, m) {
            method.no_security = true;
            method.requirements.clear();
        }
    }

    // ========================================================================
    // Result types
    // ========================================================================

    /// Define the attributes of a result type.
    pub fn attributes<F>(&mut self, body: F)
    where
        F: FnOnce(&mut Dsl<'_>),
    {
        let Expr::ResultType(id) = self.expr else {
            return self.usage("Attributes");
        };
        let current = self
            .eval
            .root
            .types
            .get(id)
            .map(|ut| ut.attribute.clone())
            .unwrap_or_else(Attribute::object);
        let attr = self.child_attribute(current, body);
        if let Some(ut) = self.eval.root.types.get_mut(id) {
            ut.attribute = attr;
        }
    }

    /// Define a view of a result type; `body` lists its attributes with
    /// [`Dsl::field`] and [`Dsl::field_view`].
    pub fn view<F>(&mut self, name: &str, body: F)
    where
        F: FnOnce(&mut Dsl<'_>),
    {
        let Expr::ResultType(id) = self.expr else {
            return self.usage("View");
        };
        let Some(info) = self
            .eval
            .root
            .types
            .get_mut(id)
            .and_then(|ut| ut.result.as_mut())
        else {
            return;
        };
        if info.views.iter().any(|v| v.name == name) {
            return self.structural(format!("view {name:?} is already defined"));
        }
        info.views.push(View {
            name: name.to_string(),
            fields: Vec::new(),
        });
        let index = info.views.len() - 1;
        self.child(Expr::View(id, index), body);
    }

    /// Reference an attribute by name: lists it in a view, or declares an
    /// untyped attribute whose type comes from the payload or result.
    pub fn field(&mut self, name: &str) {
        if matches!(self.expr, Expr::View(..)) {
            self.add_view_field(name, None);
        } else {
            self.attribute(name, TypeSpec::Empty);
        }
    }

    /// List an attribute in a view, rendering it with a view of its own
    /// result type.
    pub fn field_view(&mut self, name: &str, view: &str) {
        if !matches!(self.expr, Expr::View(..)) {
            return self.usage("View");
        }
        self.add_view_field(name, Some(view));
    }

    fn add_view_field(&mut self, name: &str, nested: Option<&str>) {
        let Expr::View(id, index) = self.expr else {
            return;
        };
        let view = self
            .eval
            .root
            .types
            .get_mut(id)
            .and_then(|ut| ut.result.as_mut())
            .and_then(|info| info.views.get_mut(index));
        if let Some(view) = view {
            view.fields.push(ViewField {
                name: name.to_string(),
                view: nested.map(str::to_string),
            });
        }
    }

    // ========================================================================
    // Attributes
    // ========================================================================

    /// Add an attribute to the current object.
    pub fn attribute(&mut self, name: &str, ty: impl Into<TypeSpec>) {
        self.attribute_with(name, ty, |_| {});
    }

    /// Add an attribute to the current object. `body` may set rules or, for
    /// untyped attributes, declare nested attributes.
    pub fn attribute_with<F>(&mut self, name: &str, ty: impl Into<TypeSpec>, body: F)
    where
        F: FnOnce(&mut Dsl<'_>),
    {
        if !matches!(self.expr, Expr::Attribute(_) | Expr::ResultType(_)) {
            return self.usage("Attribute");
        }
        let Some(base) = self.resolve(&ty.into()) else {
            return;
        };
        let attr = self.child_attribute(base, body);
        match self.current_attribute("Attribute").and_then(Attribute::ensure_object) {
            Some(fields) => {
                fields.insert(name.to_string(), attr);
            }
            None => self.usage("Attribute"),
        }
    }

    /// Mark attributes of the current object as required.
    pub fn required(&mut self, names: &[&str]) {
        if let Some(attr) = self.current_attribute("Required") {
            for name in names {
                attr.add_required(name);
            }
        }
    }

    /// Default value of the attribute.
    pub fn default(&mut self, value: impl Into<Value>) {
        if let Some(attr) = self.inline_attribute("Default") {
            attr.default = Some(value.into());
        }
    }

    /// Add an example value.
    pub fn example(&mut self, value: impl Into<Value>) {
        if let Some(attr) = self.inline_attribute("Example") {
            attr.examples.push(value.into());
        }
    }

    /// Append metadata values under `key`.
    pub fn meta(&mut self, key: &str, values: &[&str]) {
        if let Some(attr) = self.current_attribute("Meta") {
            attr.meta
                .entry(key.to_string())
                .or_default()
                .extend(values.iter().map(|v| (*v).to_string()));
        }
    }

    /// Values the attribute is restricted to.
    pub fn enum_values<V: Into<Value>>(&mut self, values: impl IntoIterator<Item = V>) {
        if let Some(attr) = self.inline_attribute("Enum") {
            attr.validation_mut().values = values.into_iter().map(Into::into).collect();
        }
    }

    /// String format, e.g. `uuid`.
    pub fn format(&mut self, format: &str) {
        if let Some(attr) = self.inline_attribute("Format") {
            attr.validation_mut().format = Some(format.to_string());
        }
    }

    /// Regular expression string values must match.
    pub fn pattern(&mut self, pattern: &str) {
        if let Some(attr) = self.inline_attribute("Pattern") {
            attr.validation_mut().pattern = Some(pattern.to_string());
        }
    }

    /// Minimum numeric value.
    pub fn minimum(&mut self, min: f64) {
        if let Some(attr) = self.inline_attribute("Minimum") {
            attr.validation_mut().minimum = Some(min);
        }
    }

    /// Maximum numeric value.
    pub fn maximum(&mut self, max: f64) {
        if let Some(attr) = self.inline_attribute("Maximum") {
            attr.validation_mut().maximum = Some(max);
        }
    }

    /// Minimum length of strings and collections.
    pub fn min_length(&mut self, len: usize) {
        if let Some(attr) = self.inline_attribute("MinLength") {
            attr.validation_mut().min_length = Some(len);
        }
    }

    /// Maximum length of strings and collections.
    pub fn max_length(&mut self, len: usize) {
        if let Some(attr) = self.inline_attribute("MaxLength") {
            attr.validation_mut().max_length = Some(len);
        }
    }

    /// Attribute holding the basic auth user name.
    pub fn username(&mut self, name: &str, ty: impl Into<TypeSpec>) {
        self.tagged_attribute("Username", name, ty.into(), "security:username".to_string());
    }

    /// Attribute holding the basic auth password.
    pub fn password(&mut self, name: &str, ty: impl Into<TypeSpec>) {
        self.tagged_attribute("Password", name, ty.into(), "security:password".to_string());
    }

    /// Attribute holding the key of API key scheme `scheme`.
    pub fn api_key(&mut self, scheme: &str, name: &str, ty: impl Into<TypeSpec>) {
        let tag = SchemeKind::ApiKey
            .credential_tag(scheme)
            .unwrap_or_default();
        self.tagged_attribute("APIKey", name, ty.into(), tag);
    }

    /// Attribute holding a JWT token.
    pub fn token(&mut self, name: &str, ty: impl Into<TypeSpec>) {
        let tag = SchemeKind::Jwt.credential_tag("").unwrap_or_default();
        self.tagged_attribute("Token", name, ty.into(), tag);
    }

    /// Attribute holding an OAuth2 access token.
    pub fn access_token(&mut self, name: &str, ty: impl Into<TypeSpec>) {
        let tag = SchemeKind::OAuth2.credential_tag("").unwrap_or_default();
        self.tagged_attribute("AccessToken", name, ty.into(), tag);
    }

    fn tagged_attribute(&mut self, construct: &str, name: &str, ty: TypeSpec, tag: String) {
        if !matches!(self.expr, Expr::Attribute(_)) {
            return self.usage(construct);
        }
        self.attribute_with(name, ty, move |a| {
            if let Expr::Attribute(attr) = &mut a.expr {
                attr.meta.entry(tag).or_default();
            }
        });
    }

    /// The attribute rules apply to: the attribute under construction or the
    /// attribute of the result type being defined.
    pub(super) fn current_attribute(&mut self, construct: &str) -> Option<&mut Attribute> {
        let result_type = match self.expr {
            Expr::ResultType(id) => Some(id),
            _ => None,
        };
        if result_type.is_none() && !matches!(self.expr, Expr::Attribute(_)) {
            self.usage(construct);
            return None;
        }
        match result_type {
            Some(id) => self.eval.root.types.get_mut(id).map(|ut| &mut ut.attribute),
            None => match &mut self.expr {
                Expr::Attribute(attr) => Some(attr.as_mut()),
                _ => None,
            },
        }
    }

    pub(super) fn inline_attribute(&mut self, construct: &str) -> Option<&mut Attribute> {
        if !matches!(self.expr, Expr::Attribute(_)) {
            self.usage(construct);
            return None;
        }
        match &mut self.expr {
            Expr::Attribute(attr) => Some(attr.as_mut()),
            _ => None,
        }
    }
}

fn method_at(services: &mut [Service], s: usize, m: usize) -> Option<&mut Method> {
    services.get_mut(s).and_then(|svc| svc.methods.get_mut(m))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use serde_json::json;

    use crate::eval::Evaluator;
    use crate::expr::{DataType, Primitive, SchemeKind};

    use super::*;

    fn run(design: impl FnOnce(&mut Dsl<'_>)) -> Evaluator {
        let mut eval = Evaluator::new();
        eval.run(design);
        eval
    }

    #[test]
    fn test_type_body_sees_later_types() {
        let eval = run(|d| {
            d.type_("Outer", |t| {
                t.attribute("inner", "Inner");
                t.required(&["inner"]);
            });
            d.type_("Inner", |t| t.attribute("v", Primitive::String));
        });
        assert!(eval.diagnostics().is_empty(), "{}", eval.diagnostics());
        let types = &eval.root().types;
        let outer = types.lookup("Outer").unwrap();
        let inner = types.lookup("Inner").unwrap();
        let outer_ty = DataType::User(outer);
        let fields = types.as_object(&outer_ty).unwrap();
        assert_eq!(fields["inner"].ty, DataType::User(inner));
        assert!(types.is_required(&Attribute::user(outer), "inner"));
    }

    #[test]
    fn test_attribute_rules() {
        let eval = run(|d| {
            d.type_("T", |t| {
                t.attribute_with("n", Primitive::Int, |a| {
                    a.description("a number");
                    a.minimum(1.0);
                    a.maximum(10.0);
                    a.default(3);
                    a.example(4);
                    a.enum_values([1, 3, 4]);
                });
                t.attribute_with("nested", TypeSpec::Empty, |a| {
                    a.attribute("x", Primitive::Boolean);
                });
            });
        });
        assert!(eval.diagnostics().is_empty(), "{}", eval.diagnostics());
        let types = &eval.root().types;
        let id = types.lookup("T").unwrap();
        let ty = DataType::User(id);
        let fields = types.as_object(&ty).unwrap();
        let n = &fields["n"];
        assert_eq!(n.description.as_deref(), Some("a number"));
        let v = n.validation.as_ref().unwrap();
        assert_eq!((v.minimum, v.maximum), (Some(1.0), Some(10.0)));
        assert_eq!(v.values, vec![json!(1), json!(3), json!(4)]);
        assert_eq!(n.default, Some(json!(3)));
        assert!(types.is_object(&fields["nested"].ty));
    }

    #[test]
    fn test_duplicate_declarations_are_reported() {
        let eval = run(|d| {
            d.type_("T", |_| {});
            d.type_("T", |_| {});
            d.service("s", |s| {
                s.method("m", |_| {});
                s.method("m", |_| {});
            });
            d.service("s", |_| {});
        });
        let diags = eval.diagnostics();
        assert!(diags.contains_message(r#"type "T" is already defined"#));
        assert!(diags.contains_message(r#"method "m" is already defined"#));
        assert!(diags.contains_message(r#"service "s" is already defined"#));
    }

    #[test]
    fn test_result_type_views() {
        let eval = run(|d| {
            d.result_type("application/vnd.bottle", "Bottle", |r| {
                r.description("A bottle");
                r.attributes(|a| {
                    a.attribute("id", Primitive::Int);
                    a.attribute("name", Primitive::String);
                });
                r.view("default", |v| {
                    v.field("id");
                    v.field("name");
                });
                r.view("tiny", |v| v.field("id"));
                r.content_type("application/json");
            });
        });
        assert!(eval.diagnostics().is_empty(), "{}", eval.diagnostics());
        let types = &eval.root().types;
        let ut = types.get(types.lookup("Bottle").unwrap()).unwrap();
        let info = ut.result.as_ref().unwrap();
        assert_eq!(info.views.len(), 2);
        assert!(ut.view("tiny").unwrap().has_field("id"));
        assert_eq!(info.content_type.as_deref(), Some("application/json"));
        assert_eq!(ut.attribute.description.as_deref(), Some("A bottle"));
    }

    #[test]
    fn test_errors_and_security() {
        let eval = run(|d| {
            d.jwt_security("jwt", |s| s.description("JWT auth"));
            d.api("api", |a| {
                a.error("unauthorized");
                a.security(&["jwt"]);
            });
            d.service("s", |s| {
                s.method("m", |m| {
                    m.error_type("not_found", Primitive::String);
                    m.payload_object(|p| p.token("token", Primitive::String));
                    m.no_security();
                });
                s.method("bad", |m| m.security(&["nope"]));
            });
        });
        let diags = eval.diagnostics();
        assert_eq!(diags.len(), 1, "{diags}");
        assert!(diags.contains_message(r#"unknown security scheme "nope""#));

        let root = eval.root();
        assert_eq!(root.scheme("jwt").unwrap().kind, SchemeKind::Jwt);
        assert_eq!(root.api.requirements.len(), 1);
        let m = root.method("s", "m").unwrap();
        assert!(m.no_security);
        assert_eq!(
            root.types.tagged_attribute(&m.payload, "security:token").as_deref(),
            Some("token")
        );
        let unauthorized = root.error("s", "m", "unauthorized").unwrap();
        assert_eq!(
            unauthorized.attribute.ty,
            DataType::User(root.types.lookup(ERROR_RESULT).unwrap())
        );
        assert!(root.error("s", "m", "not_found").is_some());
    }

    #[test]
    fn test_result_view_records_meta() {
        let eval = run(|d| {
            d.result_type("application/vnd.bottle", "Bottle", |r| {
                r.attributes(|a| a.attribute("id", Primitive::Int));
            });
            d.service("s", |s| s.method("m", |m| m.result_view("Bottle", "tiny")));
        });
        let m = eval.root().method("s", "m").unwrap();
        assert_eq!(m.result.meta_value(VIEW_META), Some("tiny"));
    }

    #[test]
    fn test_usage_errors() {
        let eval = run(|d| {
            d.attribute("a", Primitive::Int);
            d.service("s", |s| {
                s.payload(Primitive::Int);
                s.title("x");
            });
        });
        let messages: Vec<_> = eval
            .diagnostics()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(
            messages,
            vec![
                "design: invalid use of Attribute",
                r#"service "s": invalid use of Payload"#,
                r#"service "s": invalid use of Title"#,
            ]
        );
    }
}
