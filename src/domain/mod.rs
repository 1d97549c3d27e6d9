//! Domain layer: shapes, placement targets and the placed zone tree.

pub mod error;
pub mod order;
pub mod shape;
pub mod tree;
