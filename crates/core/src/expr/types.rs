//! Named types and the registry that owns them.
//!
//! Every named type (user types, result types and the body types derived
//! during finalize) is stored once in [`TypeRegistry`] and referenced by
//! [`TypeId`]. Recursive walks over the type graph carry a seen-set keyed by
//! [`TypeId`] so self-referential types terminate.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde_json::Value;

use super::attribute::{Attribute, DataType, Object};
use crate::naming::capitalize_first;

/// Name of the view every result type provides.
pub const DEFAULT_VIEW: &str = "default";

/// Meta key recording the view selected by `Result(type, view)`.
pub const VIEW_META: &str = "view";

/// Stable identity of a named type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeId(usize);

impl TypeId {
    /// Position in the registry.
    pub fn index(self) -> usize {
        self.0
    }
}

/// A named type.
#[derive(Debug, Clone, PartialEq)]
pub struct UserType {
    /// Type name.
    pub name: String,
    /// Unique identifier, stable across renames.
    pub uid: String,
    /// Type definition.
    pub attribute: Attribute,
    /// Set for result types.
    pub result: Option<ResultInfo>,
}

impl UserType {
    /// Plain named type.
    pub fn new(name: impl Into<String>, uid: impl Into<String>, attribute: Attribute) -> Self {
        Self {
            name: name.into(),
            uid: uid.into(),
            attribute,
            result: None,
        }
    }

    /// Look up a view of a result type.
    pub fn view(&self, name: &str) -> Option<&View> {
        self.result
            .as_ref()
            .and_then(|r| r.views.iter().find(|v| v.name == name))
    }
}

/// Result type specifics: media type identifier and views.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultInfo {
    /// Media type identifier.
    pub identifier: String,
    /// Content type, when it differs from the identifier.
    pub content_type: Option<String>,
    /// Views in declaration order.
    pub views: Vec<View>,
}

/// Named subset of a result type's attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct View {
    /// View name.
    pub name: String,
    /// Attributes rendered by the view.
    pub fields: Vec<ViewField>,
}

impl View {
    /// Whether the view renders attribute `name`.
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }
}

/// Attribute listed in a view, optionally rendered with a nested view.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewField {
    /// Attribute name.
    pub name: String,
    /// View used to render the attribute, when it is a result type.
    pub view: Option<String>,
}

static EMPTY: DataType = DataType::Empty;

/// Arena of every named type of a design.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: Vec<UserType>,
    declared: BTreeMap<String, TypeId>,
}

impl TypeRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a named type so it can be looked up by name. Returns the
    /// existing id as error when the name is taken.
    pub fn declare(&mut self, ty: UserType) -> Result<TypeId, TypeId> {
        if let Some(existing) = self.declared.get(&ty.name) {
            return Err(*existing);
        }
        let name = ty.name.clone();
        let id = self.insert(ty);
        self.declared.insert(name, id);
        Ok(id)
    }

    /// Store a type without making it visible by name.
    pub fn insert(&mut self, ty: UserType) -> TypeId {
        self.types.push(ty);
        TypeId(self.types.len() - 1)
    }

    /// Declared type named `name`.
    pub fn lookup(&self, name: &str) -> Option<TypeId> {
        self.declared.get(name).copied()
    }

    /// Type `id`.
    pub fn get(&self, id: TypeId) -> Option<&UserType> {
        self.types.get(id.0)
    }

    /// Mutable type `id`.
    pub fn get_mut(&mut self, id: TypeId) -> Option<&mut UserType> {
        self.types.get_mut(id.0)
    }

    /// Declared types ordered by name.
    pub fn declared(&self) -> impl Iterator<Item = (TypeId, &UserType)> {
        self.declared
            .values()
            .filter_map(|id| self.get(*id).map(|t| (*id, t)))
    }

    /// Number of stored types, declared or not.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// True when no type is stored.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    // ========================================================================
    // Classification
    // ========================================================================

    /// Follow named type references down to a structural type.
    pub fn resolve<'a>(&'a self, ty: &'a DataType) -> &'a DataType {
        let mut current = ty;
        for _ in 0..=self.types.len() {
            match current {
                DataType::User(id) => match self.get(*id) {
                    Some(ut) => current = &ut.attribute.ty,
                    None => return &EMPTY,
                },
                other => return other,
            }
        }
        &EMPTY
    }

    /// Whether `ty` resolves to an object.
    pub fn is_object(&self, ty: &DataType) -> bool {
        matches!(self.resolve(ty), DataType::Object(_))
    }

    /// Whether `ty` resolves to an array.
    pub fn is_array(&self, ty: &DataType) -> bool {
        matches!(self.resolve(ty), DataType::Array(_))
    }

    /// Whether `ty` resolves to a map.
    pub fn is_map(&self, ty: &DataType) -> bool {
        matches!(self.resolve(ty), DataType::Map { .. })
    }

    /// Whether `ty` resolves to a primitive.
    pub fn is_primitive(&self, ty: &DataType) -> bool {
        matches!(self.resolve(ty), DataType::Primitive(_))
    }

    /// Object `ty` resolves to.
    pub fn as_object<'a>(&'a self, ty: &'a DataType) -> Option<&'a Object> {
        match self.resolve(ty) {
            DataType::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Element of the array `ty` resolves to.
    pub fn as_array<'a>(&'a self, ty: &'a DataType) -> Option<&'a Attribute> {
        match self.resolve(ty) {
            DataType::Array(elem) => Some(elem),
            _ => None,
        }
    }

    /// Key and element of the map `ty` resolves to.
    pub fn as_map<'a>(&'a self, ty: &'a DataType) -> Option<(&'a Attribute, &'a Attribute)> {
        match self.resolve(ty) {
            DataType::Map { key, elem } => Some((key, elem)),
            _ => None,
        }
    }

    /// Result type referenced directly by `ty`.
    pub fn result_type(&self, ty: &DataType) -> Option<(TypeId, &ResultInfo)> {
        match ty {
            DataType::User(id) => self
                .get(*id)
                .and_then(|ut| ut.result.as_ref().map(|r| (*id, r))),
            _ => None,
        }
    }

    /// True for an empty type or an object without attributes.
    pub fn is_empty_attribute(&self, attr: &Attribute) -> bool {
        match self.resolve(&attr.ty) {
            DataType::Empty => true,
            DataType::Object(o) => o.is_empty(),
            _ => false,
        }
    }

    /// Attribute `name` of an object attribute.
    pub fn find<'a>(&'a self, attr: &'a Attribute, name: &str) -> Option<&'a Attribute> {
        self.as_object(&attr.ty).and_then(|o| o.get(name))
    }

    /// Required names of an object attribute, including the ones declared on
    /// the named types it refers to.
    pub fn required_names(&self, attr: &Attribute) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        let mut current = attr;
        for _ in 0..=self.types.len() {
            for r in current.required() {
                if !names.contains(r) {
                    names.push(r.clone());
                }
            }
            match &current.ty {
                DataType::User(id) => match self.get(*id) {
                    Some(ut) => current = &ut.attribute,
                    None => break,
                },
                _ => break,
            }
        }
        names
    }

    /// Whether attribute `name` of an object attribute is required.
    pub fn is_required(&self, attr: &Attribute, name: &str) -> bool {
        self.required_names(attr).iter().any(|r| r == name)
    }

    /// Name of the first attribute of an object carrying the meta key `tag`.
    pub fn tagged_attribute(&self, attr: &Attribute, tag: &str) -> Option<String> {
        self.as_object(&attr.ty)?
            .iter()
            .find(|(_, a)| a.has_meta(tag))
            .map(|(name, _)| name.clone())
    }

    /// Type expression used in diagnostics and design documents.
    pub fn type_name(&self, ty: &DataType) -> String {
        match ty {
            DataType::Empty => "Empty".to_string(),
            DataType::Primitive(p) => p.name().to_string(),
            DataType::Object(_) => "object".to_string(),
            DataType::Array(elem) => format!("array<{}>", self.type_name(&elem.ty)),
            DataType::Map { key, elem } => format!(
                "map<{}, {}>",
                self.type_name(&key.ty),
                self.type_name(&elem.ty)
            ),
            DataType::User(id) => self
                .get(*id)
                .map_or_else(|| "<unknown>".to_string(), |ut| ut.name.clone()),
        }
    }

    // ========================================================================
    // Merge and duplication
    // ========================================================================

    /// Merge the attributes of the object `other` into `base`.
    ///
    /// For names defined on both sides the attribute of `other` wins (its
    /// description falls back to the one of `base`); required names are
    /// unioned. A `base` referring to a named type is inlined first so the
    /// named type itself is never mutated.
    pub fn merge(&self, base: &mut Attribute, other: &Attribute) {
        let Some(right) = self.as_object(&other.ty) else {
            return;
        };
        if let DataType::User(_) = base.ty {
            let inlined = self.as_object(&base.ty).cloned();
            let required = self.required_names(base);
            if let Some(fields) = inlined {
                base.ty = DataType::Object(fields);
                for name in &required {
                    base.add_required(name);
                }
            }
        }
        let right_required = self.required_names(other);
        let Some(left) = base.ensure_object() else {
            return;
        };
        for (name, att) in right {
            match left.get_mut(name) {
                Some(existing) => {
                    let mut merged = att.clone();
                    if merged.description.is_none() {
                        merged.description = existing.description.take();
                    }
                    *existing = merged;
                }
                None => {
                    left.insert(name.clone(), att.clone());
                }
            }
        }
        for name in &right_required {
            base.add_required(name);
        }
    }

    /// Deep copy an attribute, giving every named type it reaches a fresh
    /// identity. Shared and recursive references are preserved in the copy.
    pub fn duplicate(&mut self, attr: &Attribute) -> Attribute {
        let mut seen = HashMap::new();
        self.duplicate_attribute(attr, &mut seen)
    }

    fn duplicate_attribute(
        &mut self,
        attr: &Attribute,
        seen: &mut HashMap<TypeId, TypeId>,
    ) -> Attribute {
        let mut out = attr.clone();
        out.ty = self.duplicate_type(&attr.ty, seen);
        out
    }

    fn duplicate_type(&mut self, ty: &DataType, seen: &mut HashMap<TypeId, TypeId>) -> DataType {
        match ty {
            DataType::User(id) => {
                if let Some(copy) = seen.get(id) {
                    return DataType::User(*copy);
                }
                let Some(original) = self.get(*id).cloned() else {
                    return ty.clone();
                };
                let copy = self.insert(UserType {
                    attribute: Attribute::default(),
                    ..original.clone()
                });
                seen.insert(*id, copy);
                let attribute = self.duplicate_attribute(&original.attribute, seen);
                if let Some(ut) = self.get_mut(copy) {
                    ut.attribute = attribute;
                }
                DataType::User(copy)
            }
            DataType::Object(fields) => {
                let mut copy = Object::with_capacity(fields.len());
                for (name, att) in fields {
                    let att = self.duplicate_attribute(att, seen);
                    copy.insert(name.clone(), att);
                }
                DataType::Object(copy)
            }
            DataType::Array(elem) => DataType::Array(Box::new(self.duplicate_attribute(elem, seen))),
            DataType::Map { key, elem } => DataType::Map {
                key: Box::new(self.duplicate_attribute(key, seen)),
                elem: Box::new(self.duplicate_attribute(elem, seen)),
            },
            DataType::Empty | DataType::Primitive(_) => ty.clone(),
        }
    }

    // ========================================================================
    // Walking and renaming
    // ========================================================================

    /// Visit every named type reachable from `ty`, each exactly once.
    pub fn walk<F: FnMut(TypeId)>(&self, ty: &DataType, mut visit: F) {
        let mut seen = HashSet::new();
        self.walk_rec(ty, &mut visit, &mut seen);
    }

    fn walk_rec<F: FnMut(TypeId)>(&self, ty: &DataType, visit: &mut F, seen: &mut HashSet<TypeId>) {
        match ty {
            DataType::User(id) => {
                if !seen.insert(*id) {
                    return;
                }
                visit(*id);
                if let Some(ut) = self.get(*id) {
                    self.walk_rec(&ut.attribute.ty, visit, seen);
                }
            }
            DataType::Object(fields) => {
                for att in fields.values() {
                    self.walk_rec(&att.ty, visit, seen);
                }
            }
            DataType::Array(elem) => self.walk_rec(&elem.ty, visit, seen),
            DataType::Map { key, elem } => {
                self.walk_rec(&key.ty, visit, seen);
                self.walk_rec(&elem.ty, visit, seen);
            }
            DataType::Empty | DataType::Primitive(_) => {}
        }
    }

    /// Append `suffix` to the name of every named type reachable from `ty`.
    /// Each type is suffixed once however many times the walk reaches it.
    pub fn append_suffix(&mut self, ty: &DataType, suffix: &str) {
        let mut ids = Vec::new();
        self.walk(ty, |id| ids.push(id));
        self.suffix_all(&ids, suffix);
    }

    fn suffix_all(&mut self, ids: &[TypeId], suffix: &str) {
        for id in ids {
            if let Some(ut) = self.get_mut(*id) {
                ut.name.push_str(suffix);
            }
        }
    }

    /// Rename the named type of `attr` to `name` and suffix every named type
    /// nested in it. Inline composites only get their nested types suffixed.
    pub fn rename(&mut self, attr: &Attribute, name: &str, suffix: &str) {
        match &attr.ty {
            DataType::User(id) => {
                let id = *id;
                let Some(ut) = self.get_mut(id) else {
                    return;
                };
                ut.name = name.to_string();
                let mut ids = Vec::new();
                let mut seen = HashSet::from([id]);
                if let Some(ut) = self.get(id) {
                    self.walk_rec(&ut.attribute.ty, &mut |n| ids.push(n), &mut seen);
                }
                self.suffix_all(&ids, suffix);
            }
            DataType::Object(_) | DataType::Array(_) | DataType::Map { .. } => {
                self.append_suffix(&attr.ty, suffix);
            }
            DataType::Empty | DataType::Primitive(_) => {}
        }
    }

    // ========================================================================
    // Result type views
    // ========================================================================

    /// Add a `default` view listing every attribute to a result type
    /// declaring no view.
    pub fn ensure_default_view(&mut self, id: TypeId) {
        let fields: Vec<ViewField> = match self.get(id) {
            Some(ut) => self
                .as_object(&ut.attribute.ty)
                .map(|o| {
                    o.keys()
                        .map(|name| ViewField {
                            name: name.clone(),
                            view: None,
                        })
                        .collect()
                })
                .unwrap_or_default(),
            None => return,
        };
        if let Some(info) = self.get_mut(id).and_then(|ut| ut.result.as_mut()) {
            if info.views.is_empty() {
                info.views.push(View {
                    name: DEFAULT_VIEW.to_string(),
                    fields,
                });
            }
        }
    }

    /// Project a result type (or an array of result types) onto one of its
    /// views. Nested result types are projected onto the view named on the
    /// view field, `default` otherwise.
    pub fn project(&mut self, attr: &Attribute, view: &str) -> Result<Attribute, String> {
        let mut memo = HashMap::new();
        self.project_attribute(attr, view, &mut memo)
    }

    fn project_attribute(
        &mut self,
        attr: &Attribute,
        view: &str,
        memo: &mut HashMap<(TypeId, String), TypeId>,
    ) -> Result<Attribute, String> {
        match &attr.ty {
            DataType::User(id) if self.result_type(&attr.ty).is_some() => {
                let projected = self.project_type(*id, view, memo)?;
                let mut out = attr.clone();
                out.ty = DataType::User(projected);
                out.meta.remove(VIEW_META);
                Ok(out)
            }
            DataType::Array(elem) => {
                let projected = self.project_attribute(elem, view, memo)?;
                let mut out = attr.clone();
                out.ty = DataType::Array(Box::new(projected));
                Ok(out)
            }
            other => Err(format!(
                "cannot project {} onto view {view:?}: not a result type",
                self.type_name(other)
            )),
        }
    }

    fn holds_result_type(&self, ty: &DataType) -> bool {
        match ty {
            DataType::Array(elem) => self.holds_result_type(&elem.ty),
            other => self.result_type(other).is_some(),
        }
    }

    fn project_type(
        &mut self,
        id: TypeId,
        view: &str,
        memo: &mut HashMap<(TypeId, String), TypeId>,
    ) -> Result<TypeId, String> {
        if let Some(done) = memo.get(&(id, view.to_string())) {
            return Ok(*done);
        }
        let original = self
            .get(id)
            .cloned()
            .ok_or_else(|| format!("unknown type #{}", id.0))?;
        let Some(info) = original.result.clone() else {
            return Err(format!("type {:?} is not a result type", original.name));
        };
        let Some(selected) = info.views.iter().find(|v| v.name == view).cloned() else {
            return Err(format!(
                "result type {:?} has no view {view:?}",
                original.name
            ));
        };

        let name = if view == DEFAULT_VIEW {
            original.name.clone()
        } else {
            format!("{}{}", original.name, capitalize_first(view))
        };
        let projected = self.insert(UserType::new(
            name,
            format!("{}#{view}", original.uid),
            Attribute::default(),
        ));
        memo.insert((id, view.to_string()), projected);

        let source = self
            .as_object(&original.attribute.ty)
            .cloned()
            .unwrap_or_default();
        let required = self.required_names(&original.attribute);
        let mut fields = Object::new();
        for field in &selected.fields {
            let Some(att) = source.get(&field.name) else {
                return Err(format!(
                    "view {view:?} of result type {:?} references unknown attribute {:?}",
                    original.name, field.name
                ));
            };
            let att = if self.holds_result_type(&att.ty) {
                let nested = field.view.as_deref().unwrap_or(DEFAULT_VIEW);
                self.project_attribute(att, nested, memo)?
            } else {
                att.clone()
            };
            fields.insert(field.name.clone(), att);
        }

        let mut attribute = Attribute {
            description: original.attribute.description.clone(),
            ..Attribute::new(DataType::Object(fields))
        };
        for name in required {
            if selected.has_field(&name) {
                attribute.add_required(&name);
            }
        }
        let identifier = if view == DEFAULT_VIEW {
            info.identifier.clone()
        } else {
            format!("{}; view={view}", info.identifier)
        };
        let views = vec![View {
            name: DEFAULT_VIEW.to_string(),
            fields: selected
                .fields
                .iter()
                .map(|f| ViewField {
                    name: f.name.clone(),
                    view: None,
                })
                .collect(),
        }];
        if let Some(ut) = self.get_mut(projected) {
            ut.attribute = attribute;
            ut.result = Some(ResultInfo {
                identifier,
                content_type: info.content_type,
                views,
            });
        }
        Ok(projected)
    }

    // ========================================================================
    // Attribute validation
    // ========================================================================

    /// Check the rules of an attribute and of the inline attributes it
    /// contains. Named types are validated on their own and not entered.
    pub fn validate_attribute(&self, ctx: &str, attr: &Attribute) -> Vec<String> {
        let mut errors = Vec::new();
        self.validate_rec(ctx, attr, &mut errors);
        errors
    }

    fn validate_rec(&self, ctx: &str, attr: &Attribute, errors: &mut Vec<String>) {
        let prefix = if ctx.is_empty() {
            String::new()
        } else {
            format!("{ctx}: ")
        };
        if let Some(v) = &attr.validation {
            for e in v.check_rules() {
                errors.push(format!("{prefix}{e}"));
            }
        }
        if let Some(fields) = self.as_object(&attr.ty) {
            for name in attr.required() {
                if !fields.contains_key(name) {
                    errors.push(format!("{prefix}required field {name:?} does not exist"));
                }
            }
        }
        if let Some(default) = &attr.default {
            if !self.value_matches(&attr.ty, default) {
                errors.push(format!(
                    "{prefix}default value {default} is incompatible with attribute of type {}",
                    self.type_name(&attr.ty)
                ));
            } else if let Some(v) = &attr.validation {
                for e in v.check_value(default) {
                    errors.push(format!("{prefix}default {e}"));
                }
            }
        }
        let child = |name: &str| {
            if ctx.is_empty() {
                name.to_string()
            } else {
                format!("{ctx}.{name}")
            }
        };
        match &attr.ty {
            DataType::Object(fields) => {
                for (name, att) in fields {
                    self.validate_rec(&child(name), att, errors);
                }
            }
            DataType::Array(elem) => self.validate_rec(&child("elem"), elem, errors),
            DataType::Map { key, elem } => {
                self.validate_rec(&child("key"), key, errors);
                self.validate_rec(&child("elem"), elem, errors);
            }
            DataType::Empty | DataType::Primitive(_) | DataType::User(_) => {}
        }
    }

    /// Whether a JSON value is an instance of `ty`.
    pub fn value_matches(&self, ty: &DataType, value: &Value) -> bool {
        match self.resolve(ty) {
            DataType::Empty | DataType::User(_) => true,
            DataType::Primitive(p) => p.accepts(value),
            DataType::Array(elem) => value
                .as_array()
                .is_some_and(|items| items.iter().all(|v| self.value_matches(&elem.ty, v))),
            DataType::Map { elem, .. } => value
                .as_object()
                .is_some_and(|m| m.values().all(|v| self.value_matches(&elem.ty, v))),
            DataType::Object(fields) => value.as_object().is_some_and(|m| {
                m.iter().all(|(k, v)| {
                    fields
                        .get(k)
                        .is_none_or(|att| self.value_matches(&att.ty, v))
                })
            }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::expr::Primitive;
    use serde_json::json;

    fn object(fields: &[(&str, Attribute)]) -> Attribute {
        let mut obj = Object::new();
        for (name, att) in fields {
            obj.insert((*name).to_string(), att.clone());
        }
        Attribute::new(DataType::Object(obj))
    }

    fn int() -> Attribute {
        Attribute::primitive(Primitive::Int)
    }

    fn string() -> Attribute {
        Attribute::primitive(Primitive::String)
    }

    /// `Node { value: Int, next: Node }`
    fn recursive_node(reg: &mut TypeRegistry) -> TypeId {
        let id = reg
            .declare(UserType::new("Node", "Node", Attribute::default()))
            .unwrap();
        reg.get_mut(id).unwrap().attribute =
            object(&[("value", int()), ("next", Attribute::user(id))]);
        id
    }

    #[test]
    fn test_classification_follows_named_types() {
        let mut reg = TypeRegistry::new();
        let id = reg
            .declare(UserType::new("Pair", "Pair", object(&[("a", int())])))
            .unwrap();
        let ty = DataType::User(id);
        assert!(reg.is_object(&ty));
        assert!(!reg.is_array(&ty));
        assert!(reg.is_array(&Attribute::array_of(int()).ty));
        assert!(reg.is_map(&Attribute::map_of(string(), int()).ty));
        assert!(reg.is_primitive(&int().ty));
        assert!(reg.find(&Attribute::user(id), "a").is_some());
    }

    #[test]
    fn test_declare_rejects_duplicate_names() {
        let mut reg = TypeRegistry::new();
        let first = reg.declare(UserType::new("A", "A", int())).unwrap();
        assert_eq!(reg.declare(UserType::new("A", "A", string())), Err(first));
        assert_eq!(reg.lookup("A"), Some(first));
    }

    #[test]
    fn test_merge_override_wins_and_required_union() {
        let reg = TypeRegistry::new();
        let mut base = object(&[("a", int()), ("b", int())]);
        base.add_required("a");
        let mut described = int();
        described.description = Some("base b".into());
        base.fields_mut().unwrap().insert("b".into(), described);

        let mut other = object(&[("b", string()), ("c", int())]);
        other.add_required("c");
        reg.merge(&mut base, &other);

        let fields = base.fields().unwrap();
        assert_eq!(
            fields.keys().collect::<Vec<_>>(),
            vec!["a", "b", "c"],
            "insertion order preserved"
        );
        assert_eq!(fields["b"].ty, DataType::Primitive(Primitive::String));
        assert_eq!(fields["b"].description.as_deref(), Some("base b"));
        assert_eq!(base.required(), ["a".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_merge_does_not_mutate_named_base() {
        let mut reg = TypeRegistry::new();
        let id = reg
            .declare(UserType::new("T", "T", object(&[("a", int())])))
            .unwrap();
        let mut base = Attribute::user(id);
        reg.merge(&mut base, &object(&[("b", int())]));
        assert_eq!(base.fields().unwrap().len(), 2);
        let ty = DataType::User(id);
        assert_eq!(reg.as_object(&ty).unwrap().len(), 1);
    }

    #[test]
    fn test_duplicate_gives_fresh_identities_and_keeps_cycles() {
        let mut reg = TypeRegistry::new();
        let node = recursive_node(&mut reg);
        let copy = reg.duplicate(&Attribute::user(node));
        let DataType::User(copy_id) = copy.ty else {
            panic!("expected a named type");
        };
        assert_ne!(copy_id, node);
        let copy_ty = DataType::User(copy_id);
        let next = &reg.as_object(&copy_ty).unwrap()["next"];
        assert_eq!(next.ty, DataType::User(copy_id), "cycle points at the copy");

        reg.get_mut(copy_id).unwrap().name = "Changed".into();
        assert_eq!(reg.get(node).unwrap().name, "Node");
    }

    #[test]
    fn test_append_suffix_terminates_and_suffixes_each_type_once() {
        let mut reg = TypeRegistry::new();
        let node = recursive_node(&mut reg);
        let holder = object(&[("first", Attribute::user(node)), ("second", Attribute::user(node))]);
        reg.append_suffix(&holder.ty, "RequestBody");
        assert_eq!(reg.get(node).unwrap().name, "NodeRequestBody");
    }

    #[test]
    fn test_append_suffix_applies_to_names_already_ending_with_it() {
        let mut reg = TypeRegistry::new();
        let id = reg
            .declare(UserType::new("ItemRequestBody", "ItemRequestBody", int()))
            .unwrap();
        let holder = object(&[("inner", Attribute::user(id))]);
        reg.append_suffix(&holder.ty, "RequestBody");
        assert_eq!(reg.get(id).unwrap().name, "ItemRequestBodyRequestBody");
    }

    #[test]
    fn test_rename_renames_top_and_suffixes_nested() {
        let mut reg = TypeRegistry::new();
        let node = recursive_node(&mut reg);
        let outer = reg.insert(UserType::new(
            "Outer",
            "Outer",
            object(&[("node", Attribute::user(node))]),
        ));
        reg.rename(&Attribute::user(outer), "AddResponseBody", "Response");
        assert_eq!(reg.get(outer).unwrap().name, "AddResponseBody");
        assert_eq!(reg.get(node).unwrap().name, "NodeResponse");
    }

    #[test]
    fn test_project_selects_view_attributes() {
        let mut reg = TypeRegistry::new();
        let mut att = object(&[("id", int()), ("name", string()), ("secret", string())]);
        att.add_required("id");
        att.add_required("secret");
        let id = reg
            .declare(UserType {
                result: Some(ResultInfo {
                    identifier: "application/vnd.bottle".into(),
                    content_type: None,
                    views: vec![View {
                        name: "tiny".into(),
                        fields: vec![ViewField {
                            name: "id".into(),
                            view: None,
                        }],
                    }],
                }),
                ..UserType::new("Bottle", "Bottle", att)
            })
            .unwrap();
        reg.ensure_default_view(id);
        assert_eq!(reg.get(id).unwrap().result.as_ref().unwrap().views.len(), 1);

        let projected = reg.project(&Attribute::user(id), "tiny").unwrap();
        let DataType::User(pid) = projected.ty else {
            panic!("expected a named type");
        };
        let ut = reg.get(pid).unwrap();
        assert_eq!(ut.name, "BottleTiny");
        assert_eq!(ut.attribute.required(), ["id".to_string()]);
        assert_eq!(
            ut.result.as_ref().unwrap().identifier,
            "application/vnd.bottle; view=tiny"
        );
        assert!(reg.project(&Attribute::user(id), "missing").is_err());
        assert!(reg.project(&int(), "default").is_err());
    }

    #[test]
    fn test_project_recursive_result_type_terminates() {
        let mut reg = TypeRegistry::new();
        let id = reg
            .declare(UserType::new("Tree", "Tree", Attribute::default()))
            .unwrap();
        reg.get_mut(id).unwrap().attribute = object(&[
            ("name", string()),
            ("children", Attribute::array_of(Attribute::user(id))),
        ]);
        reg.get_mut(id).unwrap().result = Some(ResultInfo {
            identifier: "application/vnd.tree".into(),
            content_type: None,
            views: Vec::new(),
        });
        reg.ensure_default_view(id);
        let projected = reg.project(&Attribute::user(id), DEFAULT_VIEW).unwrap();
        let DataType::User(pid) = projected.ty else {
            panic!("expected a named type");
        };
        let projected_ty = DataType::User(pid);
        let children = &reg.as_object(&projected_ty).unwrap()["children"];
        assert_eq!(
            reg.as_array(&children.ty).unwrap().ty,
            DataType::User(pid),
            "recursive field points at the projection"
        );
    }

    #[test]
    fn test_validate_attribute_reports_every_problem() {
        let reg = TypeRegistry::new();
        let mut att = object(&[("a", int())]);
        att.add_required("missing");
        let mut field = int();
        field.default = Some(json!("nope"));
        att.fields_mut().unwrap().insert("b".into(), field);
        let errors = reg.validate_attribute("payload", &att);
        assert_eq!(
            errors,
            vec![
                r#"payload: required field "missing" does not exist"#.to_string(),
                r#"payload.b: default value "nope" is incompatible with attribute of type Int"#
                    .to_string(),
            ]
        );
    }

    #[test]
    fn test_tagged_attribute() {
        let reg = TypeRegistry::new();
        let mut token = string();
        token.add_meta("security:token", "");
        let att = object(&[("a", int()), ("token", token)]);
        assert_eq!(
            reg.tagged_attribute(&att, "security:token").as_deref(),
            Some("token")
        );
        assert_eq!(reg.tagged_attribute(&att, "security:accesstoken"), None);
    }
}
