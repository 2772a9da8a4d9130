//! Schema model.
//!
//! A [`SchemaModel`] indexes a compiled YANG schema: for every node its kind,
//! list keys, ordering policy, default value and status. Config trees resolve
//! every element against it, and the delta engine consults it to decide how
//! each collection is compared.
//!
//! The model is built once with [`compile_schema`] and is read-only afterwards.

mod compile;
mod model;
mod node;

pub use compile::{compile_schema, ModuleDocument, NodeDocument, SchemaDocument};
pub use model::{ModuleInfo, SchemaModel};
pub use node::{LeafType, NodeKind, Ordering, QName, SchemaId, SchemaNode, SchemaPath, Status};
