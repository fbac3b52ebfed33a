//! Attributes, data types and validation rules.
//!
//! Named types live in the [`TypeRegistry`](super::TypeRegistry) arena and are
//! referenced from [`DataType::User`] by [`TypeId`], so an attribute is a plain
//! tree that can be cloned freely; only the registry can follow references.

use std::collections::BTreeMap;
use std::fmt;

use indexmap::IndexMap;
use serde_json::Value;

use super::types::TypeId;

/// Ordered set of named attributes. Insertion order is the declaration order.
pub type Object = IndexMap<String, Attribute>;

/// Built-in scalar types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    /// `true` or `false`.
    Boolean,
    /// Signed integer of platform size.
    Int,
    /// 32-bit signed integer.
    Int32,
    /// 64-bit signed integer.
    Int64,
    /// Unsigned integer of platform size.
    UInt,
    /// 32-bit unsigned integer.
    UInt32,
    /// 64-bit unsigned integer.
    UInt64,
    /// 32-bit float.
    Float32,
    /// 64-bit float.
    Float64,
    /// UTF-8 string.
    String,
    /// Raw bytes.
    Bytes,
    /// Any JSON value.
    Any,
}

impl Primitive {
    /// Every primitive, in the order names are looked up.
    pub const ALL: [Self; 12] = [
        Self::Boolean,
        Self::Int,
        Self::Int32,
        Self::Int64,
        Self::UInt,
        Self::UInt32,
        Self::UInt64,
        Self::Float32,
        Self::Float64,
        Self::String,
        Self::Bytes,
        Self::Any,
    ];

    /// Name as written in designs.
    pub fn name(self) -> &'static str {
        match self {
            Self::Boolean => "Boolean",
            Self::Int => "Int",
            Self::Int32 => "Int32",
            Self::Int64 => "Int64",
            Self::UInt => "UInt",
            Self::UInt32 => "UInt32",
            Self::UInt64 => "UInt64",
            Self::Float32 => "Float32",
            Self::Float64 => "Float64",
            Self::String => "String",
            Self::Bytes => "Bytes",
            Self::Any => "Any",
        }
    }

    /// Primitive named `name`.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    /// Whether a JSON value is a valid instance of this primitive.
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            Self::Boolean => value.is_boolean(),
            Self::Int | Self::Int32 | Self::Int64 => value.is_i64(),
            Self::UInt | Self::UInt32 | Self::UInt64 => value.is_u64(),
            Self::Float32 | Self::Float64 => value.is_number(),
            Self::String | Self::Bytes => value.is_string(),
            Self::Any => true,
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Shape of an attribute.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum DataType {
    /// No value at all, e.g. a method without payload.
    #[default]
    Empty,
    /// A primitive.
    Primitive(Primitive),
    /// An inline object.
    Object(Object),
    /// An array of the element attribute.
    Array(Box<Attribute>),
    /// A map.
    Map {
        /// Key attribute.
        key: Box<Attribute>,
        /// Value attribute.
        elem: Box<Attribute>,
    },
    /// Reference to a named type of the registry.
    User(TypeId),
}

impl DataType {
    /// True for [`DataType::Empty`].
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Short description used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Primitive(_) => "primitive",
            Self::Object(_) => "object",
            Self::Array(_) => "array",
            Self::Map { .. } => "map",
            Self::User(_) => "user type",
        }
    }
}

/// Validation rules attached to an attribute.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Validation {
    /// Enumerated allowed values.
    pub values: Vec<Value>,
    /// String format, e.g. `uuid`.
    pub format: Option<String>,
    /// Regular expression string values must match.
    pub pattern: Option<String>,
    /// Minimum numeric value.
    pub minimum: Option<f64>,
    /// Maximum numeric value.
    pub maximum: Option<f64>,
    /// Minimum length of strings and collections.
    pub min_length: Option<usize>,
    /// Maximum length of strings and collections.
    pub max_length: Option<usize>,
    /// Names of the required attributes when the attribute is an object.
    pub required: Vec<String>,
}

impl Validation {
    /// Whether `name` is listed as required.
    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|r| r == name)
    }

    /// List `name` as required, once.
    pub fn add_required(&mut self, name: &str) {
        if !self.is_required(name) {
            self.required.push(name.to_string());
        }
    }

    /// Stop listing `name` as required.
    pub fn remove_required(&mut self, name: &str) {
        self.required.retain(|r| r != name);
    }

    /// Merge `other` into `self`: rules set in `other` replace the ones in
    /// `self`, required names are unioned.
    pub fn merge(&mut self, other: &Self) {
        if !other.values.is_empty() {
            self.values.clone_from(&other.values);
        }
        if other.format.is_some() {
            self.format.clone_from(&other.format);
        }
        if other.pattern.is_some() {
            self.pattern.clone_from(&other.pattern);
        }
        if other.minimum.is_some() {
            self.minimum = other.minimum;
        }
        if other.maximum.is_some() {
            self.maximum = other.maximum;
        }
        if other.min_length.is_some() {
            self.min_length = other.min_length;
        }
        if other.max_length.is_some() {
            self.max_length = other.max_length;
        }
        for name in &other.required {
            self.add_required(name);
        }
    }

    /// Check the rules are consistent with each other.
    pub fn check_rules(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if let (Some(min), Some(max)) = (self.minimum, self.maximum) {
            if min > max {
                errors.push(format!("minimum {min} is greater than maximum {max}"));
            }
        }
        if let (Some(min), Some(max)) = (self.min_length, self.max_length) {
            if min > max {
                errors.push(format!(
                    "minimum length {min} is greater than maximum length {max}"
                ));
            }
        }
        errors
    }

    /// Check a value against the rules. Patterns are carried for generators
    /// and not evaluated here.
    pub fn check_value(&self, value: &Value) -> Vec<String> {
        let mut errors = Vec::new();
        if !self.values.is_empty() && !self.values.contains(value) {
            let allowed: Vec<String> = self.values.iter().map(Value::to_string).collect();
            errors.push(format!(
                "value {value} is not one of the allowed values [{}]",
                allowed.join(", ")
            ));
        }
        if let Some(n) = value.as_f64() {
            if let Some(min) = self.minimum {
                if n < min {
                    errors.push(format!("value {value} is lower than the minimum {min}"));
                }
            }
            if let Some(max) = self.maximum {
                if n > max {
                    errors.push(format!("value {value} is greater than the maximum {max}"));
                }
            }
        }
        let len = match value {
            Value::String(s) => Some(s.chars().count()),
            Value::Array(a) => Some(a.len()),
            _ => None,
        };
        if let Some(len) = len {
            if let Some(min) = self.min_length {
                if len < min {
                    errors.push(format!(
                        "value {value} is shorter than the minimum length {min}"
                    ));
                }
            }
            if let Some(max) = self.max_length {
                if len > max {
                    errors.push(format!(
                        "value {value} is longer than the maximum length {max}"
                    ));
                }
            }
        }
        errors
    }
}

/// A typed value with its documentation, rules and metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attribute {
    /// Shape of the value.
    pub ty: DataType,
    /// Free form description.
    pub description: Option<String>,
    /// Rules the value must satisfy.
    pub validation: Option<Validation>,
    /// Default value.
    pub default: Option<Value>,
    /// Example values.
    pub examples: Vec<Value>,
    /// Free-form key/values, e.g. `security:token` or `origin:attribute`.
    pub meta: BTreeMap<String, Vec<String>>,
}

impl Attribute {
    /// Attribute of type `ty` without rules.
    pub fn new(ty: DataType) -> Self {
        Self {
            ty,
            ..Self::default()
        }
    }

    /// An attribute holding an empty object.
    pub fn object() -> Self {
        Self::new(DataType::Object(Object::new()))
    }

    /// Primitive attribute.
    pub fn primitive(p: Primitive) -> Self {
        Self::new(DataType::Primitive(p))
    }

    /// Array attribute.
    pub fn array_of(elem: Self) -> Self {
        Self::new(DataType::Array(Box::new(elem)))
    }

    /// Map attribute.
    pub fn map_of(key: Self, elem: Self) -> Self {
        Self::new(DataType::Map {
            key: Box::new(key),
            elem: Box::new(elem),
        })
    }

    /// Reference to a named type.
    pub fn user(id: TypeId) -> Self {
        Self::new(DataType::User(id))
    }

    /// Attributes of an inline object. Named types are not followed.
    pub fn fields(&self) -> Option<&Object> {
        match &self.ty {
            DataType::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Mutable attributes of an inline object.
    pub fn fields_mut(&mut self) -> Option<&mut Object> {
        match &mut self.ty {
            DataType::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Turn an empty attribute into an empty object and return its fields.
    pub fn ensure_object(&mut self) -> Option<&mut Object> {
        if self.ty.is_empty() {
            self.ty = DataType::Object(Object::new());
        }
        self.fields_mut()
    }

    /// Rules of the attribute, created empty when absent.
    pub fn validation_mut(&mut self) -> &mut Validation {
        self.validation.get_or_insert_with(Validation::default)
    }

    /// Required names declared directly on this attribute.
    pub fn required(&self) -> &[String] {
        self.validation
            .as_ref()
            .map_or(&[][..], |v| v.required.as_slice())
    }

    /// Mark the nested attribute `name` required.
    pub fn add_required(&mut self, name: &str) {
        self.validation_mut().add_required(name);
    }

    /// Stop marking the nested attribute `name` required.
    pub fn remove_required(&mut self, name: &str) {
        if let Some(v) = &mut self.validation {
            v.remove_required(name);
        }
    }

    /// Append `value` under the meta `key`.
    pub fn add_meta(&mut self, key: &str, value: &str) {
        self.meta
            .entry(key.to_string())
            .or_default()
            .push(value.to_string());
    }

    /// Whether the meta `key` is set, with or without values.
    pub fn has_meta(&self, key: &str) -> bool {
        self.meta.contains_key(key)
    }

    /// First value recorded under a meta key.
    pub fn meta_value(&self, key: &str) -> Option<&str> {
        self.meta
            .get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Copy the type of `design` and fill the fields this attribute leaves
    /// unset. Does nothing when `design` has no type.
    pub fn init_from(&mut self, design: &Self) {
        if design.ty.is_empty() {
            return;
        }
        self.ty = design.ty.clone();
        if self.description.is_none() {
            self.description.clone_from(&design.description);
        }
        if self.validation.is_none() {
            self.validation.clone_from(&design.validation);
        }
        if self.default.is_none() {
            self.default.clone_from(&design.default);
        }
        if self.examples.is_empty() {
            self.examples.clone_from(&design.examples);
        }
        if self.meta.is_empty() {
            self.meta.clone_from(&design.meta);
        }
    }
}
