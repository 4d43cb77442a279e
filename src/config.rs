//! Format-agnostic configuration tree consumed by the schema loader.
//!
//! A node has a name, an optional scalar value and ordered children. The text front
//! end in [`crate::parser`] produces this tree, but it can just as well be built by
//! hand or converted from another format.

use crate::loader::ConfigError;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigNode {
    pub name: String,
    pub value: Option<String>,
    pub children: Vec<ConfigNode>,
}

impl ConfigNode {
    pub fn new(name: impl Into<String>) -> Self {
        ConfigNode {
            name: name.into(),
            value: None,
            children: Vec::new(),
        }
    }

    pub fn leaf(name: impl Into<String>, value: impl Into<String>) -> Self {
        ConfigNode {
            name: name.into(),
            value: Some(value.into()),
            children: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: ConfigNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_leaf(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.with_child(ConfigNode::leaf(name, value))
    }

    /// First child with the given name.
    pub fn child(&self, name: &str) -> Option<&ConfigNode> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a ConfigNode> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Scalar value of the named child, if present.
    pub fn string(&self, name: &str) -> Option<&str> {
        self.child(name).and_then(|c| c.value.as_deref())
    }

    pub fn bool(&self, name: &str) -> Result<Option<bool>, ConfigError> {
        let Some(raw) = self.string(name) else {
            return Ok(None);
        };
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Ok(Some(true)),
            "false" | "no" | "0" => Ok(Some(false)),
            _ => Err(invalid(name, raw, "expected a boolean")),
        }
    }

    pub fn f64(&self, name: &str) -> Result<Option<f64>, ConfigError> {
        let Some(raw) = self.string(name) else {
            return Ok(None);
        };
        raw.trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| invalid(name, raw, "expected a number"))
    }

    pub fn i64(&self, name: &str) -> Result<Option<i64>, ConfigError> {
        let Some(raw) = self.string(name) else {
            return Ok(None);
        };
        parse_integer(raw)
            .map(Some)
            .ok_or_else(|| invalid(name, raw, "expected an integer"))
    }
}

/// Decimal or `0x`-prefixed hexadecimal integer.
pub fn parse_integer(raw: &str) -> Option<i64> {
    let s = raw.trim();
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let v = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()?
    } else {
        digits.parse::<i64>().ok()?
    };
    Some(if negative { -v } else { v })
}

fn invalid(option: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        option: option.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
