//! Arena-backed zone tree produced by placement.
//!
//! The tree owns every shape. Zones own their child zones and their ordered
//! items by [`NodeId`]; a node's parent is a plain id looked up through the
//! arena, so the structure has no reference cycles.

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::domain::{order::ZonePath, shape::Shape};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
struct Node {
    shape: Shape,
    parent: Option<NodeId>,
    zone: Option<ZoneSlots>,
}

#[derive(Debug, Clone, Default)]
struct ZoneSlots {
    zones: IndexMap<String, NodeId>,
    items: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct ShapeTree {
    nodes: Vec<Node>,
}

impl ShapeTree {
    /// Start a tree whose root is the given layout shape.
    pub fn new(layout: Shape) -> Self {
        Self {
            nodes: vec![Node {
                shape: layout,
                parent: None,
                zone: Some(ZoneSlots::default()),
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&Shape> {
        self.nodes.get(id.0).map(|node| &node.shape)
    }

    /// Node ids are only minted by this tree, so indexing cannot miss.
    pub fn shape(&self, id: NodeId) -> &Shape {
        &self.nodes[id.0].shape
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|node| node.parent)
    }

    pub fn is_zone(&self, id: NodeId) -> bool {
        self.nodes
            .get(id.0)
            .is_some_and(|node| node.zone.is_some())
    }

    /// Ordered items of a zone; empty for leaf shapes.
    pub fn items(&self, id: NodeId) -> &[NodeId] {
        self.slots(id)
            .map(|slots| slots.items.as_slice())
            .unwrap_or_default()
    }

    pub fn zone(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.slots(id)
            .and_then(|slots| slots.zones.get(name).copied())
    }

    /// Child zones in creation order.
    pub fn zones(&self, id: NodeId) -> impl Iterator<Item = (&str, NodeId)> + '_ {
        self.slots(id)
            .into_iter()
            .flat_map(|slots| slots.zones.iter().map(|(name, id)| (name.as_str(), *id)))
    }

    /// A zone has content when it, or any zone nested in it, holds items.
    pub fn has_content(&self, id: NodeId) -> bool {
        match self.slots(id) {
            Some(slots) => {
                !slots.items.is_empty() || slots.zones.values().any(|zone| self.has_content(*zone))
            }
            None => false,
        }
    }

    /// Look up an existing zone by path from the root.
    pub fn zone_at(&self, path: &ZonePath) -> Option<NodeId> {
        path.segments()
            .iter()
            .try_fold(self.root(), |current, name| self.zone(current, name))
    }

    /// Walk `path` from the root, creating missing zones on the way.
    pub(crate) fn ensure_zone(&mut self, path: &ZonePath) -> NodeId {
        let mut current = self.root();
        for name in path.segments() {
            current = match self.zone(current, name) {
                Some(existing) => existing,
                None => self.create_zone(current, name),
            };
        }
        current
    }

    fn create_zone(&mut self, parent: NodeId, name: &str) -> NodeId {
        let id = self.push(Shape::zone(name), Some(parent), Some(ZoneSlots::default()));
        self.slots_mut(parent)
            .zones
            .insert(name.to_string(), id);
        tracing::trace!(zone = name, parent = parent.0, "created zone");
        id
    }

    /// Add a shape owned by `zone`. It joins the zone's items once the
    /// placement pass hands over the finalised order via [`Self::set_items`].
    pub(crate) fn adopt(&mut self, zone: NodeId, shape: Shape) -> NodeId {
        self.push(shape, Some(zone), None)
    }

    pub(crate) fn set_items(&mut self, zone: NodeId, items: Vec<NodeId>) {
        self.slots_mut(zone).items = items;
    }

    fn push(&mut self, shape: Shape, parent: Option<NodeId>, zone: Option<ZoneSlots>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            shape,
            parent,
            zone,
        });
        id
    }

    fn slots(&self, id: NodeId) -> Option<&ZoneSlots> {
        self.nodes.get(id.0).and_then(|node| node.zone.as_ref())
    }

    /// Only called with ids of zones this tree created.
    fn slots_mut(&mut self, id: NodeId) -> &mut ZoneSlots {
        self.nodes[id.0]
            .zone
            .get_or_insert_with(ZoneSlots::default)
    }

    /// JSON view of the placed tree: each zone lists its `zones` and `items`.
    pub fn to_value(&self) -> Value {
        self.node_value(self.root())
    }

    fn node_value(&self, id: NodeId) -> Value {
        let mut value = serde_json::to_value(self.shape(id))
            .unwrap_or_else(|_| Value::Object(Map::new()));

        if let (Some(slots), Value::Object(object)) = (self.slots(id), &mut value) {
            let zones: Map<String, Value> = slots
                .zones
                .iter()
                .map(|(name, zone)| (name.clone(), self.node_value(*zone)))
                .collect();
            let items: Vec<Value> = slots.items.iter().map(|item| self.node_value(*item)).collect();
            object.insert("zones".to_string(), Value::Object(zones));
            object.insert("items".to_string(), Value::Array(items));
        }

        value
    }
}
