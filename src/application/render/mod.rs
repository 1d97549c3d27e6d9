//! Streaming render dispatcher.
//!
//! The dispatcher walks a placed [`crate::domain::tree::ShapeTree`], resolves a
//! [`Template`] for each shape through an injected [`TemplateResolver`], and
//! writes the markup to a [`RenderStream`]. Nested renders share the page
//! resources (scripts, stylesheets, metas, links, title) of the outermost
//! stream.

mod dispatcher;
mod hooks;
mod renderer;
mod resolver;
mod stream;
mod template;
mod types;

pub use dispatcher::RenderDispatcher;
pub use hooks::{ErrorHook, FinallyHook};
pub use renderer::Renderer;
pub use resolver::{CachedResolver, TemplateRegistry, TemplateResolver};
pub use stream::{LinkTag, MetaTag, PageResources, RenderSink, RenderStream, SharedResources};
pub use template::{ShapeView, Template};
pub use types::{
    AssetPaths, RenderError, RenderOptions, RenderedPage, ShapeRequest, ShapeTarget,
};
