//! Wire encodings of a [`Delta`].
//!
//! Three stateless renderers share one delta representation:
//!
//! - [`encode_edit_config`]: a NETCONF `<config>` document with explicit
//!   `nc:operation` and `yang:insert` attributes
//! - [`encode_requests`]: independent RESTCONF-style requests in delta
//!   pre-order
//! - [`encode_set_request`]: a gNMI-style set request; reorders become a
//!   full-value replace of the collection
//!
//! [`encode`] dispatches on an [`Encoding`] chosen at runtime.

mod edit_config;
mod json;
mod path;
mod requests;
mod typed_update;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use edit_config::encode_edit_config;
pub use json::encode_tree;
pub use requests::{Method, RestRequest, encode_requests};
pub use typed_update::{Fallback, GnmiPath, PathElem, SetRequest, TypedValue, Update, encode_set_request};

use crate::config::EncodingConfig;
use crate::diff::Delta;
use crate::error::{DeltaError, Result};

/// Available encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Encoding {
    EditConfig,
    #[serde(rename = "restconf")]
    Requests,
    #[serde(rename = "gnmi")]
    TypedUpdate,
}

impl Encoding {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::EditConfig => "edit-config",
            Self::Requests => "restconf",
            Self::TypedUpdate => "gnmi",
        }
    }

    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::EditConfig, Self::Requests, Self::TypedUpdate]
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Encoding {
    type Err = DeltaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "edit-config" | "netconf" | "xml" => Ok(Self::EditConfig),
            "restconf" | "requests" | "rest" => Ok(Self::Requests),
            "gnmi" | "typed-update" => Ok(Self::TypedUpdate),
            other => Err(DeltaError::config(format!("unknown encoding '{other}'"))),
        }
    }
}

/// Output of [`encode`].
#[derive(Debug, Clone, PartialEq)]
pub enum EncodedDelta {
    EditConfig(String),
    Requests(Vec<RestRequest>),
    TypedUpdate(SetRequest),
}

impl EncodedDelta {
    #[must_use]
    pub const fn encoding(&self) -> Encoding {
        match self {
            Self::EditConfig(_) => Encoding::EditConfig,
            Self::Requests(_) => Encoding::Requests,
            Self::TypedUpdate(_) => Encoding::TypedUpdate,
        }
    }
}

/// Encode the forward direction of `delta`.
pub fn encode(delta: &Delta, encoding: Encoding, config: &EncodingConfig) -> Result<EncodedDelta> {
    let encoded = match encoding {
        Encoding::EditConfig => EncodedDelta::EditConfig(encode_edit_config(delta, config)?),
        Encoding::Requests => EncodedDelta::Requests(encode_requests(delta, config)?),
        Encoding::TypedUpdate => EncodedDelta::TypedUpdate(encode_set_request(delta, config)?),
    };
    tracing::debug!(encoding = %encoding, "encoded delta");
    Ok(encoded)
}
