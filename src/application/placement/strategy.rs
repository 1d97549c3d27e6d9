use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use metrics::counter;
use tracing::{debug, trace, warn};

use crate::application::placement::{
    function::PlacementFunction,
    matcher::{DecisionOrigin, PlacementDecision, match_zone},
    rules::RuleSet,
};
use crate::domain::{
    order::{Order, OrderKey},
    shape::Shape,
    tree::{NodeId, ShapeTree},
};

const METRIC_SHAPES_PLACED: &str = "placard_shapes_placed_total";
const METRIC_SHAPES_DROPPED: &str = "placard_shapes_dropped_total";

/// Places shapes into the zones of a layout.
///
/// Each shape is routed by its own `meta.placement` when present, otherwise by
/// the first matching declarative rule. Placement functions then see whatever
/// is left. Shapes nobody claims are dropped.
#[derive(Clone, Default)]
pub struct PlacementStrategy {
    rules: Arc<RuleSet>,
    functions: Vec<Arc<dyn PlacementFunction>>,
}

impl PlacementStrategy {
    pub fn new(rules: Arc<RuleSet>) -> Self {
        Self {
            rules,
            functions: Vec::new(),
        }
    }

    /// Register an executable rule source. Functions run in registration
    /// order, after every declarative rule.
    pub fn with_function(mut self, function: Arc<dyn PlacementFunction>) -> Self {
        self.functions.push(function);
        self
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn place_shapes(&self, layout: Shape, shapes: Vec<Shape>) -> ShapeTree {
        let mut tree = ShapeTree::new(layout);
        let mut zones = ZoneBuffers::default();
        let mut remaining = Vec::new();

        for shape in shapes {
            match self.decide(&shape) {
                Some(decision) => zones.place(&mut tree, shape, decision),
                None => remaining.push(shape),
            }
        }

        for function in &self.functions {
            if remaining.is_empty() {
                break;
            }
            remaining = apply_function(function.as_ref(), &mut tree, &mut zones, remaining);
        }

        for shape in &remaining {
            debug!(
                shape_type = shape.shape_type().unwrap_or_default(),
                shape_name = shape.name().unwrap_or_default(),
                "no placement rule matched; dropping shape"
            );
        }
        counter!(METRIC_SHAPES_DROPPED).increment(remaining.len() as u64);
        counter!(METRIC_SHAPES_PLACED).increment(zones.placed as u64);

        zones.finalize(&mut tree);
        tree
    }

    fn decide(&self, shape: &Shape) -> Option<PlacementDecision> {
        if let Some(placement) = shape.meta.placement.as_ref() {
            match placement.target() {
                Ok(target) => {
                    return Some(PlacementDecision {
                        target,
                        origin: DecisionOrigin::SelfPlacement,
                    });
                }
                Err(err) => {
                    warn!(error = %err, "ignoring malformed self-placement");
                }
            }
        }

        match_zone(shape, &self.rules)
    }
}

fn apply_function(
    function: &dyn PlacementFunction,
    tree: &mut ShapeTree,
    zones: &mut ZoneBuffers,
    candidates: Vec<Shape>,
) -> Vec<Shape> {
    let proposals = function.propose(tree.shape(tree.root()), &candidates);
    if proposals.is_empty() {
        return candidates;
    }

    let mut accepted = HashMap::new();
    let mut sequence = Vec::new();
    for proposal in proposals {
        if proposal.candidate >= candidates.len() {
            warn!(
                function = function.name(),
                candidate = proposal.candidate,
                "placement function proposed an unknown candidate"
            );
            continue;
        }
        if accepted.contains_key(&proposal.candidate) {
            continue;
        }
        sequence.push(proposal.candidate);
        accepted.insert(proposal.candidate, proposal.target);
    }

    let mut slots: Vec<Option<Shape>> = candidates.into_iter().map(Some).collect();
    for index in sequence {
        let (Some(shape), Some(target)) = (slots[index].take(), accepted.remove(&index)) else {
            continue;
        };
        let decision = PlacementDecision {
            target,
            origin: DecisionOrigin::Function {
                name: function.name().to_string(),
            },
        };
        zones.place(tree, shape, decision);
    }

    slots.into_iter().flatten().collect()
}

#[derive(Default)]
struct ZoneBuffers {
    buffers: HashMap<NodeId, ZoneBuffer>,
    placed: usize,
}

impl ZoneBuffers {
    fn place(&mut self, tree: &mut ShapeTree, shape: Shape, decision: PlacementDecision) {
        let PlacementDecision { target, origin } = decision;
        let zone = tree.ensure_zone(&target.path);
        let node = tree.adopt(zone, shape);
        trace!(zone = %target.path, order = %target.order, origin = %origin, "placed shape");

        self.buffers
            .entry(zone)
            .or_default()
            .insert(node, target.order);
        self.placed += 1;
    }

    fn finalize(self, tree: &mut ShapeTree) {
        for (zone, buffer) in self.buffers {
            tree.set_items(zone, buffer.finalize());
        }
    }
}

#[derive(Default)]
struct ZoneBuffer {
    entries: Vec<Entry>,
    anchor: Option<NodeId>,
}

struct Entry {
    node: NodeId,
    order: Order,
    /// Shape a `before`/`after` entry was inserted against.
    anchor: Option<NodeId>,
}

impl ZoneBuffer {
    fn insert(&mut self, node: NodeId, order: Order) {
        let relative = matches!(order, Order::Before | Order::After);
        let anchor = self.anchor.filter(|_| relative);
        let anchor_index =
            anchor.and_then(|anchor| self.entries.iter().position(|entry| entry.node == anchor));

        let position = match (&order, anchor_index) {
            (Order::Before, Some(index)) => index,
            (Order::After, Some(index)) => index + 1,
            _ => self.entries.len(),
        };

        self.entries.insert(
            position,
            Entry {
                node,
                order,
                anchor,
            },
        );
        self.anchor = Some(node);
    }

    /// Relative entries travel with the shape they were anchored to. Groups
    /// led by a keyed entry are stably sorted among the slots such groups
    /// occupy; unordered groups never move.
    fn finalize(self) -> Vec<NodeId> {
        let anchors: HashMap<NodeId, Option<NodeId>> = self
            .entries
            .iter()
            .map(|entry| (entry.node, entry.anchor))
            .collect();
        let leader = |mut node: NodeId| {
            while let Some(Some(anchor)) = anchors.get(&node) {
                node = *anchor;
            }
            node
        };

        let mut groups: Vec<Group> = Vec::new();
        let mut group_of: HashMap<NodeId, usize> = HashMap::new();
        for entry in &self.entries {
            let lead = leader(entry.node);
            let index = *group_of.entry(lead).or_insert_with(|| {
                groups.push(Group {
                    key: None,
                    members: Vec::new(),
                });
                groups.len() - 1
            });
            if entry.node == lead {
                groups[index].key = entry.order.key().cloned();
            }
            groups[index].members.push(entry.node);
        }

        let slots: Vec<usize> = groups
            .iter()
            .enumerate()
            .filter(|(_, group)| group.key.is_some())
            .map(|(index, _)| index)
            .collect();
        let mut keyed: Vec<Group> = slots
            .iter()
            .map(|&index| std::mem::take(&mut groups[index]))
            .collect();
        keyed.sort_by(|left, right| left.key.cmp(&right.key));
        for (slot, group) in slots.into_iter().zip(keyed) {
            groups[slot] = group;
        }

        let mut seen = HashSet::with_capacity(self.entries.len());
        groups
            .into_iter()
            .flat_map(|group| group.members)
            .filter(|node| seen.insert(*node))
            .collect()
    }
}

/// A leading entry plus the relative entries chained onto it, in output order.
#[derive(Default)]
struct Group {
    key: Option<OrderKey>,
    members: Vec<NodeId>,
}
