//! rb2c IR - parse-tree types
//!
//! The code generator consumes Ruby parse trees produced by an external
//! parser. This crate defines their in-memory shape and JSON wire format:
//!
//! - [`Node`] / [`NodeKind`]: one variant per node type, children boxed inline
//! - [`NodeType`]: the fieldless tag preprocessors are keyed by
//! - [`ParsedFile`]: one source file (optional `BEGIN` preamble + main tree)
//!
//! Trees are immutable once parsed: rewrites build new nodes.

mod node;
mod node_type;

pub use node::{Cpath, Literal, Node, NodeKind, ParsedFile, When};
pub use node_type::NodeType;

#[cfg(test)]
mod tests;
