//! Application services: placement, rendering and the item pipeline.

pub mod error;
pub mod pipeline;
pub mod placement;
pub mod render;
