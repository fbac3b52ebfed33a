//! Attribute sets whose members may carry a different name on the wire.
//!
//! Params and headers are declared as `attribute` or `attribute:wire`; the
//! object keeps the attribute name and the mapping remembers the wire name.

use std::collections::BTreeMap;

use super::attribute::{Attribute, Object};
use super::types::TypeRegistry;
use crate::naming::split_wire_name;

/// An object attribute whose members may be renamed on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct MappedAttribute {
    attribute: Attribute,
    wire: BTreeMap<String, String>,
}

impl Default for MappedAttribute {
    fn default() -> Self {
        Self {
            attribute: Attribute::object(),
            wire: BTreeMap::new(),
        }
    }
}

impl MappedAttribute {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an attribute declared as `name` or `name:wire`. Returns the attribute name.
    pub fn add(&mut self, spec: &str, attr: Attribute) -> String {
        let (name, wire) = split_wire_name(spec);
        if let Some(fields) = self.attribute.ensure_object() {
            fields.insert(name.to_string(), attr);
        }
        if let Some(wire) = wire {
            self.wire.insert(name.to_string(), wire.to_string());
        }
        name.to_string()
    }

    /// Map an existing attribute to a wire name.
    pub fn map(&mut self, name: &str, wire: &str) {
        self.wire.insert(name.to_string(), wire.to_string());
    }

    /// Underlying object attribute.
    pub fn attribute(&self) -> &Attribute {
        &self.attribute
    }

    /// Members in declaration order.
    pub fn fields(&self) -> &Object {
        static NONE: std::sync::LazyLock<Object> = std::sync::LazyLock::new(Object::new);
        self.attribute.fields().unwrap_or(&NONE)
    }

    /// Mutable members.
    pub fn fields_mut(&mut self) -> Option<&mut Object> {
        self.attribute.ensure_object()
    }

    /// Member names in declaration order.
    pub fn names(&self) -> Vec<String> {
        self.fields().keys().cloned().collect()
    }

    /// Member named `name`.
    pub fn find(&self, name: &str) -> Option<&Attribute> {
        self.fields().get(name)
    }

    /// Whether `name` is a member.
    pub fn contains(&self, name: &str) -> bool {
        self.fields().contains_key(name)
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.fields().len()
    }

    /// True when there is no member.
    pub fn is_empty(&self) -> bool {
        self.fields().is_empty()
    }

    /// Name of the attribute on the wire.
    pub fn wire_name<'a>(&'a self, name: &'a str) -> &'a str {
        self.wire.get(name).map_or(name, String::as_str)
    }

    /// Attribute name whose wire name is `wire`, if any.
    pub fn attribute_for_wire(&self, wire: &str) -> Option<&str> {
        self.wire
            .iter()
            .find(|(_, w)| w.as_str() == wire)
            .map(|(n, _)| n.as_str())
    }

    /// Whether member `name` is required.
    pub fn is_required(&self, name: &str) -> bool {
        self.attribute.required().iter().any(|r| r == name)
    }

    /// Mark member `name` required.
    pub fn add_required(&mut self, name: &str) {
        self.attribute.add_required(name);
    }

    /// Names of the required members.
    pub fn required(&self) -> &[String] {
        self.attribute.required()
    }

    /// Remove an attribute, its required flag and its wire mapping.
    pub fn remove(&mut self, name: &str) {
        if let Some(fields) = self.attribute.fields_mut() {
            fields.shift_remove(name);
        }
        self.attribute.remove_required(name);
        self.wire.remove(name);
    }

    /// Merge `other` into `self`; `other` wins on conflicts.
    pub fn merge(&mut self, types: &TypeRegistry, other: &Self) {
        types.merge(&mut self.attribute, &other.attribute);
        for (name, wire) in &other.wire {
            self.wire.insert(name.clone(), wire.clone());
        }
    }

    /// Add the attributes, required flags and wire names of `other`,
    /// replacing attributes of the same name.
    pub fn extend_from(&mut self, other: &Self) {
        if let Some(fields) = self.attribute.ensure_object() {
            for (name, att) in other.fields() {
                fields.insert(name.clone(), att.clone());
            }
        }
        for name in other.required() {
            self.attribute.add_required(name);
        }
        for (name, wire) in &other.wire {
            self.wire.insert(name.clone(), wire.clone());
        }
    }

    /// Build a mapped attribute from any object attribute, splitting
    /// `name:wire` keys.
    pub fn from_object(types: &TypeRegistry, attr: &Attribute) -> Self {
        let mut mapped = Self::new();
        let required = types.required_names(attr);
        if let Some(fields) = types.as_object(&attr.ty) {
            for (spec, att) in fields {
                mapped.add(spec, att.clone());
            }
        }
        for name in required {
            mapped.add_required(split_wire_name(&name).0);
        }
        mapped.attribute.description.clone_from(&attr.description);
        mapped
    }

    /// Keep only the attributes for which `keep` returns true.
    pub fn filtered(&self, mut keep: impl FnMut(&str) -> bool) -> Self {
        let mut out = Self::new();
        for (name, att) in self.fields() {
            if keep(name) {
                out.add(name, att.clone());
                if let Some(wire) = self.wire.get(name) {
                    out.map(name, wire);
                }
                if self.is_required(name) {
                    out.add_required(name);
                }
            }
        }
        out
    }

    /// Members with their names.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Attribute)> {
        self.fields().iter()
    }

    /// Underlying object attribute.
    pub fn into_attribute(self) -> Attribute {
        self.attribute
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::expr::{DataType, Primitive};

    #[test]
    fn test_add_splits_wire_name() {
        let mut m = MappedAttribute::new();
        let name = m.add("id:X-Request-ID", Attribute::primitive(Primitive::String));
        assert_eq!(name, "id");
        assert!(m.contains("id"));
        assert_eq!(m.wire_name("id"), "X-Request-ID");
        assert_eq!(m.wire_name("other"), "other");
        assert_eq!(m.attribute_for_wire("X-Request-ID"), Some("id"));
    }

    #[test]
    fn test_remove_clears_required_and_wire() {
        let mut m = MappedAttribute::new();
        m.add("a:A", Attribute::primitive(Primitive::Int));
        m.add_required("a");
        m.remove("a");
        assert!(m.is_empty());
        assert!(!m.is_required("a"));
        assert_eq!(m.wire_name("a"), "a");
    }

    #[test]
    fn test_merge_other_wins() {
        let types = TypeRegistry::new();
        let mut base = MappedAttribute::new();
        base.add("a", Attribute::primitive(Primitive::String));
        let mut other = MappedAttribute::new();
        other.add("a:alpha", Attribute::primitive(Primitive::Int));
        other.add_required("a");
        base.merge(&types, &other);
        assert_eq!(
            base.find("a").unwrap().ty,
            DataType::Primitive(Primitive::Int)
        );
        assert!(base.is_required("a"));
        assert_eq!(base.wire_name("a"), "alpha");
    }

    #[test]
    fn test_extend_from_adds_group() {
        let mut m = MappedAttribute::new();
        m.add("a", Attribute::primitive(Primitive::String));
        let mut group = MappedAttribute::new();
        group.add("b:B", Attribute::primitive(Primitive::Int));
        group.add_required("b");
        m.extend_from(&group);
        assert_eq!(m.names(), vec!["a".to_string(), "b".to_string()]);
        assert!(m.is_required("b"));
        assert_eq!(m.wire_name("b"), "B");
    }

    #[test]
    fn test_filtered_keeps_mapping() {
        let mut m = MappedAttribute::new();
        m.add("a:A", Attribute::primitive(Primitive::Int));
        m.add("b", Attribute::primitive(Primitive::Int));
        m.add_required("a");
        let only_a = m.filtered(|n| n == "a");
        assert_eq!(only_a.names(), vec!["a".to_string()]);
        assert!(only_a.is_required("a"));
        assert_eq!(only_a.wire_name("a"), "A");
    }
}
