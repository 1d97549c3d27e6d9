use std::sync::Arc;

use placard::{
    application::placement::{FnPlacement, PlacementStrategy, Proposal, RuleFile, RuleSet},
    domain::{
        order::{PlacementTarget, ZonePath},
        shape::Shape,
        tree::{NodeId, ShapeTree},
    },
};
use serde_json::{Value, json};

fn module_rules() -> RuleSet {
    let module1 = RuleFile::from_value(
        "module1/placement.json",
        &json!({
            "matches": [
                {"type": "widget", "path": "sidebar", "order": "after"},
                {
                    "id": "^/foo/.*",
                    "type": "^(page|post)$",
                    "displayType": "summary",
                    "path": "content/header"
                },
                {"type": "^page$", "displayType": "main", "path": "content", "order": "before"},
                {"name": "^named$", "path": "zone2", "order": "2"},
                {"meta.item.meta.type": "^deep-.*", "path": "zone2", "order": "3"}
            ],
            "tag-cloud-widget": {"path": "footer"},
            "shape1": {"path": "zone1", "order": "2.1"},
            "shape2": {"path": "zone1", "order": "2.0"},
            "shape3": {"path": "zone2", "order": "1"}
        }),
    )
    .expect("module1 rules");

    let module2 = RuleFile::from_toml_str(
        "module2/placement.toml",
        "[shape3]\npath = \"zone1\"\norder = \"1\"\n",
    )
    .expect("module2 rules");

    RuleSet::from_files([module1, module2])
}

fn strategy() -> PlacementStrategy {
    let custom = FnPlacement::new("module2/custom", |_root: &Shape, candidates: &[Shape]| {
        candidates
            .iter()
            .enumerate()
            .filter(|(_, shape)| shape.shape_type() == Some("custom"))
            .map(|(index, _)| {
                Proposal::new(
                    index,
                    PlacementTarget::parse("custom-zone", Some("before")).expect("valid target"),
                )
            })
            .collect()
    });

    PlacementStrategy::new(Arc::new(module_rules())).with_function(Arc::new(custom))
}

fn shapes() -> Vec<Shape> {
    let raw = json!([
        {"meta": {"type": "page"}, "temp": {"displayType": "main"}, "id": "/"},
        {"meta": {"type": "page"}, "temp": {"displayType": "main"}, "id": "/baz"},
        {"meta": {"type": "page"}, "temp": {"displayType": "summary"}, "id": "/foo/bar"},
        {"meta": {"type": "post"}, "temp": {"displayType": "summary"}, "id": "/foo/post"},
        {"meta": {"type": "html-widget"}, "id": ":widget:html1"},
        {"meta": {"type": "html-widget"}, "id": ":widget:html2"},
        {"meta": {"type": "tag-cloud-widget"}, "id": ":widget:tag-cloud"},
        {"meta": {"type": "shape1"}, "id": ":shape1:1"},
        {"meta": {"type": "shape1"}, "id": ":shape1:2"},
        {"meta": {"type": "shape2"}, "id": ":shape2:1"},
        {"meta": {"type": "shape3"}, "id": ":shape3:1"},
        {"meta": {"type": "named-shape", "name": "named"}, "id": ":named:1"},
        {"meta": {"item": {"meta": {"type": "deep-item"}}}, "id": ":deep:"},
        {"meta": {"type": "custom"}, "id": ":custom:1"},
        {"meta": {"type": "custom"}, "id": ":custom:2"},
        {"meta": {"placement": "zone2:4"}, "id": ":self-placed1:"},
        {"meta": {"placement": {"path": "zone2", "order": "5"}}, "id": ":self-placed2:"},
        {"meta": {"type": "wont-get-placed"}, "id": ":wont-get-placed:"}
    ]);
    serde_json::from_value(raw).expect("shapes decode")
}

fn zone(tree: &ShapeTree, path: &str) -> NodeId {
    tree.zone_at(&ZonePath::parse(path).expect("valid path"))
        .unwrap_or_else(|| panic!("zone `{path}` exists"))
}

fn ids(tree: &ShapeTree, path: &str) -> Vec<String> {
    tree.items(zone(tree, path))
        .iter()
        .map(|id| tree.shape(*id).id().unwrap_or_default().to_string())
        .collect()
}

#[test]
fn shapes_land_in_their_zones_in_order() {
    let tree = strategy().place_shapes(Shape::layout(), shapes());

    assert_eq!(ids(&tree, "content"), ["/baz", "/"]);
    assert_eq!(ids(&tree, "content/header"), ["/foo/bar", "/foo/post"]);
    assert_eq!(ids(&tree, "custom-zone"), [":custom:2", ":custom:1"]);
    assert_eq!(
        ids(&tree, "sidebar"),
        [":widget:html1", ":widget:html2", ":widget:tag-cloud"]
    );
    assert_eq!(ids(&tree, "zone1"), [":shape2:1", ":shape1:1", ":shape1:2"]);
    assert_eq!(
        ids(&tree, "zone2"),
        [":shape3:1", ":named:1", ":deep:", ":self-placed1:", ":self-placed2:"]
    );
}

fn placed_ids(tree: &ShapeTree, node: NodeId, ids: &mut Vec<String>) {
    for item in tree.items(node) {
        ids.extend(tree.shape(*item).id().map(str::to_string));
    }
    for (_, zone) in tree.zones(node) {
        placed_ids(tree, zone, ids);
    }
}

#[test]
fn unmatched_shapes_and_unused_zones_are_absent() {
    let tree = strategy().place_shapes(Shape::layout(), shapes());

    assert!(tree.zone(tree.root(), "footer").is_none());
    let mut placed = Vec::new();
    placed_ids(&tree, tree.root(), &mut placed);
    assert_eq!(placed.len(), 17);
    assert!(!placed.iter().any(|id| id == ":wont-get-placed:"));
}

#[test]
fn zones_and_items_link_to_their_parents() {
    let tree = strategy().place_shapes(Shape::layout(), shapes());
    let root = tree.root();

    for name in ["content", "custom-zone", "sidebar", "zone1", "zone2"] {
        assert_eq!(tree.parent(zone(&tree, name)), Some(root), "zone `{name}`");
    }
    let content = zone(&tree, "content");
    let header = zone(&tree, "content/header");
    assert_eq!(tree.parent(header), Some(content));

    for path in ["content", "content/header", "sidebar", "zone1", "zone2", "custom-zone"] {
        let zone_id = zone(&tree, path);
        for item in tree.items(zone_id) {
            assert_eq!(tree.parent(*item), Some(zone_id), "item of `{path}`");
        }
    }
}

#[test]
fn zone_shapes_carry_their_name_and_alternate() {
    let tree = strategy().place_shapes(Shape::layout(), shapes());
    let header = tree.shape(zone(&tree, "content/header"));

    assert_eq!(header.shape_type(), Some("zone"));
    assert_eq!(header.name(), Some("header"));
    assert_eq!(header.meta.alternates, ["zone-header"]);
}

#[test]
fn placement_is_repeatable() {
    let placement = strategy();
    let first: Value = placement.place_shapes(Shape::layout(), shapes()).to_value();
    let second: Value = placement.place_shapes(Shape::layout(), shapes()).to_value();

    assert_eq!(first, second);
    assert_eq!(first["zones"]["zone1"]["items"][0]["id"], ":shape2:1");
}
