//! **Schema-aware configuration deltas for YANG-modelled devices.**
//!
//! `yang-delta` computes the structural difference between two configuration
//! snapshots of a network device, applies such differences back to a
//! snapshot, and renders them for the usual management transports.
//!
//! ## Core Concepts & Modules
//!
//! - **[`schema`]**: the [`SchemaModel`], built once from a compiled schema
//!   document with [`compile_schema`]. It knows every node's kind, keys,
//!   ordering policy and default.
//! - **[`tree`]**: the [`ConfigTree`], one immutable snapshot resolved against
//!   the schema. Supports structural equality, merge, filter and a small
//!   path query language.
//! - **[`diff`]**: the [`DeltaEngine`], which subtracts one tree from another
//!   to produce a [`Delta`], applies deltas forward and backward, and
//!   negates them.
//! - **[`encode`]**: edit-config XML, RESTCONF request lists and gNMI-style
//!   set requests.
//! - **[`orderless`]**: the [`OrderlessTable`] of user-ordered paths whose
//!   order the device ignores.
//! - **[`config`]**: [`AppConfig`] and its YAML file discovery.
//!
//! ## Getting Started
//!
//! ```no_run
//! use std::sync::Arc;
//! use yang_delta::{ConfigTree, DeltaEngine, SchemaDocument, compile_schema};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let doc = SchemaDocument::from_yaml(&std::fs::read_to_string("schema.yaml")?)?;
//!     let schema = Arc::new(compile_schema(&doc)?);
//!
//!     let before = ConfigTree::from_xml(Arc::clone(&schema), &std::fs::read_to_string("running.xml")?)?;
//!     let after = ConfigTree::from_xml(Arc::clone(&schema), &std::fs::read_to_string("intended.xml")?)?;
//!
//!     let engine = DeltaEngine::new(schema);
//!     let delta = engine.diff(&before, &after)?;
//!     println!("{delta}");
//!
//!     // Round trip
//!     assert!(engine.apply(&before, &delta)?.equals(&after));
//!     assert!(engine.apply_inverse(&after, &delta)?.equals(&before));
//!     Ok(())
//! }
//! ```
//!
//! ### Encoding a Delta
//!
//! ```ignore
//! use yang_delta::encode::{Encoding, encode};
//!
//! let config = AppConfig::default();
//! let xml = encode_edit_config(&delta, &config.encoding)?;
//! let requests = encode(&delta, Encoding::Requests, &config.encoding)?;
//! ```

// Lint to discourage unwrap() in production code - prefer explicit error handling
#![warn(clippy::unwrap_used)]
// Pedantic lints: allow categories that are design choices for this codebase
#![allow(
    // Integer conversions between key positions and schema ids are bounded
    clippy::cast_possible_truncation,
    // Doc completeness: # Errors / # Panics sections are aspirational
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    // Tree walkers read better as one function per node kind
    clippy::too_many_lines,
    // Variable names like `from`/`to` or `before`/`after` are clear in context
    clippy::similar_names
)]

pub mod config;
pub mod diff;
pub mod encode;
pub mod error;
pub mod orderless;
pub mod schema;
pub mod tree;

// Re-export main types for convenience
pub use config::{AppConfig, AppConfigBuilder, ConfigError, ConfigPreset, Validatable};
pub use config::{DiffConfig, EncodingConfig, OrderlessConfig};
pub use diff::{Anchor, Delta, DeltaEngine, DeltaNode, DeltaSummary, DeltaTree, Operation};
pub use encode::{
    EncodedDelta, Encoding, RestRequest, SetRequest, encode, encode_edit_config, encode_requests,
    encode_set_request, encode_tree,
};
pub use error::{DeltaError, ErrorContext, OptionContext, Result};
pub use orderless::{OrderlessEntry, OrderlessTable};
pub use schema::{SchemaDocument, SchemaModel, compile_schema};
pub use tree::{ConfigTree, DataNode, EntryIdentity, LeafValue};
