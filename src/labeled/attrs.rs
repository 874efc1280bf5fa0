//! Attribute values attached to variables and datasets

use std::collections::BTreeMap;
use std::fmt;

/// A single attribute value, mirroring the NetCDF attribute types we keep
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Str(String),
    Strs(Vec<String>),
    Int(i64),
    Ints(Vec<i64>),
    Float(f64),
    Floats(Vec<f64>),
}

/// Ordered attribute map
pub type Attributes = BTreeMap<String, AttrValue>;

impl AttrValue {
    /// Returns the string payload, if this is a string attribute
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns a numeric scalar payload as f64
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Int(v) => Some(*v as f64),
            AttrValue::Float(v) => Some(*v),
            AttrValue::Ints(v) if v.len() == 1 => Some(v[0] as f64),
            AttrValue::Floats(v) if v.len() == 1 => Some(v[0]),
            _ => None,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Str(s) => write!(f, "\"{}\"", s),
            AttrValue::Strs(v) => write!(f, "{:?}", v),
            AttrValue::Int(v) => write!(f, "{}", v),
            AttrValue::Ints(v) => write!(f, "{:?}", v),
            AttrValue::Float(v) => write!(f, "{}", v),
            AttrValue::Floats(v) => write!(f, "{:?}", v),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Str(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Str(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Float(value)
    }
}

impl From<f32> for AttrValue {
    fn from(value: f32) -> Self {
        AttrValue::Float(f64::from(value))
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Int(value)
    }
}

impl From<i32> for AttrValue {
    fn from(value: i32) -> Self {
        AttrValue::Int(i64::from(value))
    }
}

impl From<Vec<f64>> for AttrValue {
    fn from(value: Vec<f64>) -> Self {
        AttrValue::Floats(value)
    }
}

impl From<Vec<String>> for AttrValue {
    fn from(value: Vec<String>) -> Self {
        AttrValue::Strs(value)
    }
}
