//! Content item → shapes → placed tree → rendered page.

use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::application::{
    placement::PlacementStrategy,
    render::{RenderDispatcher, RenderError, RenderSink, RenderedPage},
};
use crate::domain::{shape::Shape, tree::ShapeTree};

const PART_TYPE_KEY: &str = "_type";

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct PartLoadError {
    message: String,
}

impl PartLoadError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("part `{part}` could not be loaded")]
    PartLoader {
        part: String,
        #[source]
        source: PartLoadError,
    },
    #[error("content item must be a JSON object")]
    InvalidItem,
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// One part of a content item handed to its loader.
#[derive(Debug, Clone, Copy)]
pub struct PartContext<'a> {
    pub item: &'a Value,
    pub part_name: &'a str,
    pub part: &'a Value,
    pub display_type: &'a str,
}

/// Turns a part of a content item into the shapes that display it.
#[async_trait]
pub trait PartLoader: Send + Sync {
    async fn load(&self, context: PartContext<'_>) -> Result<Vec<Shape>, PartLoadError>;
}

/// Routes every part of an item to the loader registered for its part type.
///
/// A part's type is its `_type` field when it is an object carrying one, and
/// its name otherwise. Parts without a registered loader are skipped.
#[derive(Clone, Default)]
pub struct PartLoaderDispatch {
    loaders: IndexMap<String, Arc<dyn PartLoader>>,
}

impl PartLoaderDispatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_loader(mut self, part_type: impl Into<String>, loader: Arc<dyn PartLoader>) -> Self {
        self.loaders.insert(part_type.into(), loader);
        self
    }

    pub async fn load_item(
        &self,
        item: &Value,
        display_type: &str,
    ) -> Result<Vec<Shape>, PipelineError> {
        let parts = item.as_object().ok_or(PipelineError::InvalidItem)?;

        let mut shapes = Vec::new();
        for (part_name, part) in parts {
            if part_name == "meta" || part_name == "id" {
                continue;
            }
            let part_type = part
                .get(PART_TYPE_KEY)
                .and_then(Value::as_str)
                .unwrap_or(part_name);
            let Some(loader) = self.loaders.get(part_type) else {
                debug!(part = %part_name, part_type, "no part loader registered");
                continue;
            };

            let context = PartContext {
                item,
                part_name,
                part,
                display_type,
            };
            let loaded = loader
                .load(context)
                .await
                .map_err(|source| PipelineError::PartLoader {
                    part: part_name.clone(),
                    source,
                })?;
            shapes.extend(loaded);
        }
        Ok(shapes)
    }
}

/// Loaders for the part types every item understands: `title` and `text`.
pub fn builtin_loaders() -> PartLoaderDispatch {
    PartLoaderDispatch::new()
        .with_loader("title", Arc::new(TextPartLoader::new("title")))
        .with_loader("text", Arc::new(TextPartLoader::new("text")))
}

/// Loads `{"text": "..."}` or a bare string into a single shape of `shape_type`.
pub struct TextPartLoader {
    shape_type: String,
}

impl TextPartLoader {
    pub fn new(shape_type: impl Into<String>) -> Self {
        Self {
            shape_type: shape_type.into(),
        }
    }
}

#[async_trait]
impl PartLoader for TextPartLoader {
    async fn load(&self, context: PartContext<'_>) -> Result<Vec<Shape>, PartLoadError> {
        let text = match context.part {
            Value::String(text) => text.clone(),
            Value::Object(fields) => fields
                .get("text")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| {
                    PartLoadError::new(format!("part `{}` has no `text`", context.part_name))
                })?,
            _ => {
                return Err(PartLoadError::new(format!(
                    "part `{}` must be a string or an object",
                    context.part_name
                )));
            }
        };

        Ok(vec![
            Shape::new(self.shape_type.as_str())
                .named(context.part_name)
                .with_field("text", text),
        ])
    }
}

/// The full item pipeline: part loaders, placement, then rendering.
#[derive(Clone)]
pub struct ItemRenderService {
    loaders: PartLoaderDispatch,
    placement: PlacementStrategy,
    dispatcher: RenderDispatcher,
}

impl ItemRenderService {
    pub fn new(
        loaders: PartLoaderDispatch,
        placement: PlacementStrategy,
        dispatcher: RenderDispatcher,
    ) -> Self {
        Self {
            loaders,
            placement,
            dispatcher,
        }
    }

    /// Load and place the shapes of `item` under a fresh layout.
    pub async fn place_item(
        &self,
        item: &Value,
        display_type: &str,
    ) -> Result<ShapeTree, PipelineError> {
        let shapes = self
            .loaders
            .load_item(item, display_type)
            .await?
            .into_iter()
            .map(|shape| stamp(shape, item, display_type))
            .collect();

        Ok(self.placement.place_shapes(Shape::layout(), shapes))
    }

    #[instrument(skip(self, item))]
    pub async fn render_item(
        &self,
        item: &Value,
        display_type: &str,
    ) -> Result<RenderedPage, PipelineError> {
        let tree = self.place_item(item, display_type).await?;
        Ok(self.dispatcher.render_page(&tree).await?)
    }

    pub async fn stream_item(
        &self,
        item: &Value,
        display_type: &str,
        sink: impl RenderSink + 'static,
    ) -> Result<RenderedPage, PipelineError> {
        let tree = self.place_item(item, display_type).await?;
        Ok(self.dispatcher.stream_page(&tree, sink).await?)
    }
}

fn stamp(mut shape: Shape, item: &Value, display_type: &str) -> Shape {
    if shape.temp.display_type.is_none() {
        shape.temp.display_type = Some(display_type.to_string());
    }
    if shape.temp.item.is_none() {
        shape.temp.item = Some(item.clone());
    }
    shape
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    struct Failing;

    #[async_trait]
    impl PartLoader for Failing {
        async fn load(&self, _context: PartContext<'_>) -> Result<Vec<Shape>, PartLoadError> {
            Err(PartLoadError::new("storage unavailable"))
        }
    }

    #[tokio::test]
    async fn parts_dispatch_by_type_or_name() {
        let dispatch = builtin_loaders();

        let item = json!({
            "meta": {"type": "page"},
            "id": "/about",
            "title": "About",
            "body": {"_type": "text", "text": "Hello"},
            "tags": ["ignored"]
        });

        let shapes = dispatch.load_item(&item, "main").await.expect("parts load");
        assert_eq!(shapes.len(), 2);
        assert_eq!(shapes[0].shape_type(), Some("title"));
        assert_eq!(shapes[1].shape_type(), Some("text"));
        assert_eq!(shapes[1].name(), Some("body"));
    }

    #[tokio::test]
    async fn loader_failures_name_the_part() {
        let dispatch = PartLoaderDispatch::new().with_loader("title", Arc::new(Failing));
        let err = dispatch
            .load_item(&json!({"title": "x"}), "main")
            .await
            .expect_err("loader fails");

        assert!(matches!(err, PipelineError::PartLoader { ref part, .. } if part == "title"));
    }

    #[tokio::test]
    async fn items_must_be_objects() {
        let err = PartLoaderDispatch::new()
            .load_item(&json!("nope"), "main")
            .await
            .expect_err("not an object");
        assert!(matches!(err, PipelineError::InvalidItem));
    }

    #[test]
    fn stamping_keeps_existing_display_type() {
        let item = json!({"id": "/"});
        let shape = stamp(Shape::new("title").with_display_type("summary"), &item, "main");
        assert_eq!(shape.temp.display_type.as_deref(), Some("summary"));
        assert_eq!(shape.temp.item, Some(item));
    }
}
