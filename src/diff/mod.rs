//! Schema-aware delta engine.
//!
//! [`DeltaEngine::diff`] walks two [`ConfigTree`](crate::tree::ConfigTree)s
//! in lock-step under schema guidance and produces a [`Delta`]: a tree of
//! create, delete, replace, merge and reorder operations that carries its own
//! inverse.
//!
//! - Containers and leaves are matched by name, list entries by key tuple and
//!   leaf-list entries by value; position never decides identity.
//! - A switch between two cases of a choice deletes the old case subtree and
//!   creates the new one as a whole.
//! - User-ordered collections keep the longest run of entries whose relative
//!   order is unchanged and move the rest, each anchored after its new
//!   predecessor. Collections listed in an
//!   [`OrderlessTable`](crate::orderless::OrderlessTable) are treated as
//!   system-ordered.
//! - A leaf holding its schema default equals an absent leaf.
//! - An entry that moves and also changes below is one delta node: a merge
//!   of its child operations that carries the move as its anchor. Applying
//!   it patches the children first and then relocates the entry, so the two
//!   changes compose exactly as separate operations would.
//!
//! [`DeltaEngine::apply_edit`] applies a NETCONF edit-config document
//! directly, so the output of
//! [`encode_edit_config`](crate::encode::encode_edit_config) can be read
//! back.
//!
//! The following laws hold for trees `a`, `b` of one schema:
//!
//! - `apply(a, diff(a, b)) == b`
//! - `diff(b, a) == negate(diff(a, b))`
//! - `negate(negate(d)) == d`
//! - `diff(a, a)` is empty
//!
//! # Example
//!
//! ```ignore
//! use yang_delta::diff::DeltaEngine;
//!
//! let engine = DeltaEngine::new(schema.clone());
//! let delta = engine.diff(&running, &candidate)?;
//! assert_eq!(engine.apply(&running, &delta)?, candidate);
//! let rollback = delta.negate();
//! ```

mod apply;
mod delta;
mod edit;
mod engine;
mod order;

pub use delta::{
    Anchor, CollectionSnapshot, Delta, DeltaNode, DeltaSummary, DeltaTree, Operation,
};
pub use engine::DeltaEngine;
