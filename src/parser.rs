//! Parse protocol definition text into a [`ConfigNode`] tree using PEST.
//!
//! ```text
//! output {
//!   binary_mode = false;
//!   var_separator = ",";
//!   line_separator = newline;
//!   chunk {
//!     name = "altitude";
//!     type = float;
//!     format = "%.1f";
//!     node = /position/altitude-ft;
//!   }
//! }
//! ```

use crate::config::ConfigNode;
use crate::loader::ConfigError;
use pest::Parser;
use pest_derive::Parser as PestParser;

#[derive(PestParser)]
#[grammar = "grammar.pest"]
struct DefinitionParser;

/// Parse definition text. The returned root node is named `root` and holds the
/// top-level entries as children.
pub fn parse_config(source: &str) -> Result<ConfigNode, ConfigError> {
    let pairs = DefinitionParser::parse(Rule::document, source)
        .map_err(|e| ConfigError::Parse(e.to_string()))?;
    let document = pairs
        .into_iter()
        .next()
        .ok_or_else(|| ConfigError::Parse("empty parse".to_string()))?;

    let mut root = ConfigNode::new("root");
    for inner in document.into_inner() {
        if inner.as_rule() == Rule::entry {
            root.children.push(build_entry(inner)?);
        }
    }
    Ok(root)
}

fn build_entry(pair: pest::iterators::Pair<Rule>) -> Result<ConfigNode, ConfigError> {
    let mut inner = pair.into_inner();
    let name = inner
        .next()
        .ok_or_else(|| ConfigError::Parse("entry: missing name".to_string()))?;
    let body = inner
        .next()
        .ok_or_else(|| ConfigError::Parse(format!("entry {}: missing body", name.as_str())))?;

    let mut node = ConfigNode::new(name.as_str());
    match body.as_rule() {
        Rule::block => {
            for child in body.into_inner() {
                if child.as_rule() == Rule::entry {
                    node.children.push(build_entry(child)?);
                }
            }
        }
        Rule::assignment => {
            let scalar = body
                .into_inner()
                .next()
                .and_then(|s| s.into_inner().next())
                .ok_or_else(|| ConfigError::Parse(format!("{}: missing value", node.name)))?;
            let value = match scalar.as_rule() {
                Rule::quoted => scalar
                    .into_inner()
                    .next()
                    .map(|p| p.as_str().to_string())
                    .unwrap_or_default(),
                _ => scalar.as_str().to_string(),
            };
            node.value = Some(value);
        }
        other => {
            return Err(ConfigError::Parse(format!(
                "{}: unexpected {:?}",
                node.name, other
            )))
        }
    }
    Ok(node)
}
