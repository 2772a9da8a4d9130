//! Typed leaf values.

use std::fmt;

use crate::error::{DeltaError, Result};
use crate::schema::LeafType;

/// Value of a leaf or leaf-list entry, parsed according to its schema type.
///
/// Values compare by meaning, not by spelling: `"01"` and `"1"` are the same
/// integer. Identity references are stored as `module:identity` tokens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LeafValue {
    String(String),
    Integer(i128),
    Boolean(bool),
    Empty,
    Enumeration(String),
}

impl LeafValue {
    /// Parse the text of a leaf element.
    ///
    /// `path` only feeds the error message.
    pub fn parse(text: &str, ty: LeafType, path: &str) -> Result<Self> {
        let invalid = |expected: &str| DeltaError::InvalidValue {
            path: path.to_string(),
            value: text.to_string(),
            expected: expected.to_string(),
        };
        match ty {
            LeafType::Integer { .. } => text
                .trim()
                .trim_start_matches('+')
                .parse::<i128>()
                .map(Self::Integer)
                .map_err(|_| invalid("integer")),
            LeafType::Boolean => match text.trim() {
                "true" => Ok(Self::Boolean(true)),
                "false" => Ok(Self::Boolean(false)),
                _ => Err(invalid("boolean")),
            },
            LeafType::Empty => {
                if text.trim().is_empty() {
                    Ok(Self::Empty)
                } else {
                    Err(invalid("empty"))
                }
            }
            LeafType::Enumeration | LeafType::Identityref => {
                let token = text.trim();
                if token.is_empty() {
                    Err(invalid("token"))
                } else {
                    Ok(Self::Enumeration(token.to_string()))
                }
            }
            LeafType::String => Ok(Self::String(text.to_string())),
        }
    }
}

impl fmt::Display for LeafValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) | Self::Enumeration(s) => f.write_str(s),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Empty => Ok(()),
        }
    }
}
