//! Runtime values exchanged with the host data model.
//!
//! Conversions are lenient in the way a property tree is: a string node read as an
//! integer parses its leading digits, a double read as a bool is `value != 0`, and an
//! unset node reads as zero / false / empty.

use crate::format::{parse_leading_float, parse_leading_int};
use std::fmt;

/// A single host value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Node exists but was never assigned.
    #[default]
    None,
    Bool(bool),
    Int(i32),
    Float(f32),
    Double(f64),
    String(String),
}

impl Value {
    pub fn as_bool(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(x) => *x != 0,
            Value::Float(x) => *x != 0.0,
            Value::Double(x) => *x != 0.0,
            Value::String(s) => {
                let t = s.trim();
                t.eq_ignore_ascii_case("true") || parse_leading_float(t) != 0.0
            }
        }
    }

    pub fn as_int(&self) -> i32 {
        match self {
            Value::None => 0,
            Value::Bool(b) => *b as i32,
            Value::Int(x) => *x,
            Value::Float(x) => *x as i32,
            Value::Double(x) => *x as i32,
            Value::String(s) => parse_leading_int(s).clamp(i32::MIN as i64, i32::MAX as i64) as i32,
        }
    }

    pub fn as_f32(&self) -> f32 {
        match self {
            Value::Float(x) => *x,
            other => other.as_f64() as f32,
        }
    }

    pub fn as_f64(&self) -> f64 {
        match self {
            Value::None => 0.0,
            Value::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Int(x) => *x as f64,
            Value::Float(x) => *x as f64,
            Value::Double(x) => *x,
            Value::String(s) => parse_leading_float(s),
        }
    }

    /// Convert to the variant of `template`; an unset template accepts anything.
    pub fn coerce_like(self, template: &Value) -> Value {
        match template {
            Value::None => self,
            Value::Bool(_) => Value::Bool(self.as_bool()),
            Value::Int(_) => Value::Int(self.as_int()),
            Value::Float(_) => Value::Float(self.as_f32()),
            Value::Double(_) => Value::Double(self.as_f64()),
            Value::String(_) => Value::String(self.as_string()),
        }
    }

    /// Textual form; `None` is the empty string.
    pub fn as_string(&self) -> String {
        match self {
            Value::None => String::new(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(x) => write!(f, "{}", x),
            Value::Float(x) => write!(f, "{}", x),
            Value::Double(x) => write!(f, "{}", x),
            Value::String(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(x: i32) -> Self {
        Value::Int(x)
    }
}

impl From<f32> for Value {
    fn from(x: f32) -> Self {
        Value::Float(x)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Double(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}
