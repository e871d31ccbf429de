//! Reversible encoding of configuration values at the storage boundary
//!
//! The storage attributes have no native representation for absent values,
//! sets or callables. `ConfigValue` is the in-memory sum type; `AttrValue` is
//! what gets stored. Absent values map to a fixed sentinel string, sets to a
//! sorted list, callables to a descriptive string. The callable mapping is
//! one way: a decoded callable comes back as plain text.

use std::collections::{BTreeMap, BTreeSet};

use ndarray::{Array1, Array2};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// Sentinel stored for absent or defaulted values
pub const ABSENT_SENTINEL: &str = "None";

/// Prefix of the description stored for callable values
pub const CALLABLE_PREFIX: &str = "Custom function ";

/// In-memory configuration value
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    Absent,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Set(BTreeSet<String>),
    Vector(Array1<f64>),
    Matrix(Array2<f64>),
    ComplexVector(Array1<Complex64>),
    /// Named callable; only the name survives storage
    Callable(String),
}

/// Storage-level attribute value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<String>),
    Vector(Array1<f64>),
    Matrix(Array2<f64>),
    ComplexVector(Array1<Complex64>),
}

impl ConfigValue {
    /// Encode for storage
    pub fn sanitize(&self) -> AttrValue {
        match self {
            ConfigValue::Absent => AttrValue::Text(ABSENT_SENTINEL.to_string()),
            ConfigValue::Bool(v) => AttrValue::Bool(*v),
            ConfigValue::Int(v) => AttrValue::Int(*v),
            ConfigValue::Float(v) => AttrValue::Float(*v),
            ConfigValue::Text(v) => AttrValue::Text(v.clone()),
            // BTreeSet iterates in order, so the list is deterministic
            ConfigValue::Set(v) => AttrValue::List(v.iter().cloned().collect()),
            ConfigValue::Vector(v) => AttrValue::Vector(v.clone()),
            ConfigValue::Matrix(v) => AttrValue::Matrix(v.clone()),
            ConfigValue::ComplexVector(v) => AttrValue::ComplexVector(v.clone()),
            ConfigValue::Callable(name) => AttrValue::Text(format!("{CALLABLE_PREFIX}{name}")),
        }
    }

    /// Decode from storage
    pub fn unsanitize(value: &AttrValue) -> Self {
        match value {
            AttrValue::Text(v) if v == ABSENT_SENTINEL => ConfigValue::Absent,
            AttrValue::Text(v) => ConfigValue::Text(v.clone()),
            AttrValue::Bool(v) => ConfigValue::Bool(*v),
            AttrValue::Int(v) => ConfigValue::Int(*v),
            AttrValue::Float(v) => ConfigValue::Float(*v),
            AttrValue::List(v) => ConfigValue::Set(v.iter().cloned().collect()),
            AttrValue::Vector(v) => ConfigValue::Vector(v.clone()),
            AttrValue::Matrix(v) => ConfigValue::Matrix(v.clone()),
            AttrValue::ComplexVector(v) => ConfigValue::ComplexVector(v.clone()),
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, ConfigValue::Callable(_))
    }
}

/// Encode a whole option map, prefixing each key
pub fn sanitize_map(prefix: &str, values: &BTreeMap<String, ConfigValue>) -> BTreeMap<String, AttrValue> {
    values
        .iter()
        .map(|(key, value)| (format!("{prefix}{key}"), value.sanitize()))
        .collect()
}

/// Decode every attribute carrying `prefix`, stripping the prefix
pub fn unsanitize_map(prefix: &str, attrs: &BTreeMap<String, AttrValue>) -> BTreeMap<String, ConfigValue> {
    attrs
        .iter()
        .filter_map(|(key, value)| {
            key.strip_prefix(prefix)
                .map(|name| (name.to_string(), ConfigValue::unsanitize(value)))
        })
        .collect()
}
