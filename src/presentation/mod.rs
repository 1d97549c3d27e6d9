//! HTML markup helpers and the built-in shape templates.

pub mod markup;
pub mod templates;
