//! The contract every shape template implements.

use async_trait::async_trait;
use serde_json::Value;

use crate::application::render::{renderer::Renderer, types::RenderError};
use crate::domain::{
    shape::{Shape, ZONE_TYPE},
    tree::{NodeId, ShapeTree},
};

/// Renders one shape by writing to the [`Renderer`]. Nested shapes are
/// rendered through the renderer so they share the page resources.
#[async_trait]
pub trait Template: Send + Sync {
    async fn render(
        &self,
        view: ShapeView<'_>,
        renderer: &mut Renderer<'_>,
    ) -> Result<(), RenderError>;
}

/// Read-only view of the shape being rendered and its place in the tree.
#[derive(Clone, Copy)]
pub struct ShapeView<'a> {
    tree: &'a ShapeTree,
    node: Option<NodeId>,
    shape: &'a Shape,
}

impl<'a> ShapeView<'a> {
    pub(crate) fn new(tree: &'a ShapeTree, node: Option<NodeId>, shape: &'a Shape) -> Self {
        Self { tree, node, shape }
    }

    pub fn shape(&self) -> &'a Shape {
        self.shape
    }

    pub fn tree(&self) -> &'a ShapeTree {
        self.tree
    }

    /// `None` for detached shapes.
    pub fn node(&self) -> Option<NodeId> {
        self.node
    }

    /// Zone shapes created by placement; the layout root is not one.
    pub fn is_zone(&self) -> bool {
        self.shape.shape_type() == Some(ZONE_TYPE)
    }

    pub fn items(&self) -> &'a [NodeId] {
        match self.node {
            Some(node) => self.tree.items(node),
            None => &[],
        }
    }

    pub fn zone(&self, name: &str) -> Option<NodeId> {
        self.node.and_then(|node| self.tree.zone(node, name))
    }

    /// Child zones in creation order.
    pub fn zones(&self) -> Vec<(&'a str, NodeId)> {
        match self.node {
            Some(node) => self.tree.zones(node).collect(),
            None => Vec::new(),
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.node.and_then(|node| self.tree.parent(node))
    }

    pub fn field(&self, name: &str) -> Option<&'a Value> {
        self.shape.field(name)
    }

    /// A string field, or the JSON text of a scalar one.
    pub fn text(&self, name: &str) -> Option<String> {
        match self.field(name)? {
            Value::Null => None,
            Value::String(text) => Some(text.clone()),
            other => Some(other.to_string()),
        }
    }

    /// A shape embedded in one of this shape's fields.
    pub fn embedded(&self, name: &str) -> Option<Shape> {
        self.field(name).and_then(Shape::from_value)
    }

    /// Whether rendering this shape as a zone would produce any content.
    pub fn has_content(&self) -> bool {
        match self.node {
            Some(node) => self.tree.has_content(node),
            None => false,
        }
    }
}
