//! Shapes: the view-model fragments that get placed into zones and rendered.
//!
//! A shape is plain data. `meta` identifies it (type, name, template
//! alternates, optional self-placement), `temp` carries render-scope data such
//! as the display type, and every other field is the payload its template
//! consumes. Container relations (parent, zone items) live in
//! [`crate::domain::tree::ShapeTree`], never on the shape itself.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::{error::DomainError, order::PlacementTarget};

pub const ZONE_TYPE: &str = "zone";
pub const LAYOUT_TYPE: &str = "layout";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Shape {
    #[serde(default)]
    pub meta: ShapeMeta,
    #[serde(default, skip_serializing_if = "ShapeTemp::is_empty")]
    pub temp: ShapeTemp,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ShapeMeta {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub shape_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Fallback template names, most specific first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternates: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placement: Option<SelfPlacement>,
    /// The content item this shape was built from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeTemp {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<Value>,
}

impl ShapeTemp {
    pub fn is_empty(&self) -> bool {
        self.display_type.is_none() && self.item.is_none()
    }
}

/// A shape's own declaration of where it goes, overriding external rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SelfPlacement {
    /// `"zone/path:order"`
    Shorthand(String),
    Explicit {
        path: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        order: Option<String>,
    },
}

impl SelfPlacement {
    pub fn target(&self) -> Result<PlacementTarget, DomainError> {
        match self {
            SelfPlacement::Shorthand(value) => PlacementTarget::parse_shorthand(value),
            SelfPlacement::Explicit { path, order } => {
                PlacementTarget::parse(path, order.as_deref()).map_err(|err| {
                    DomainError::invalid_self_placement(path.clone(), err.to_string())
                })
            }
        }
    }
}

impl Shape {
    pub fn new(shape_type: impl Into<String>) -> Self {
        Self {
            meta: ShapeMeta {
                shape_type: Some(shape_type.into()),
                ..ShapeMeta::default()
            },
            ..Self::default()
        }
    }

    /// The container shape created for a zone. Zones can be themed per name
    /// through the `zone-{name}` alternate.
    pub fn zone(name: &str) -> Self {
        Self::new(ZONE_TYPE)
            .named(name)
            .with_alternate(format!("{ZONE_TYPE}-{name}"))
    }

    pub fn layout() -> Self {
        Self::new(LAYOUT_TYPE)
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.meta.name = Some(name.into());
        self
    }

    pub fn with_alternate(mut self, alternate: impl Into<String>) -> Self {
        self.meta.alternates.push(alternate.into());
        self
    }

    pub fn with_display_type(mut self, display_type: impl Into<String>) -> Self {
        self.temp.display_type = Some(display_type.into());
        self
    }

    pub fn with_item(mut self, item: Value) -> Self {
        self.meta.item = Some(item);
        self
    }

    pub fn with_placement(mut self, placement: SelfPlacement) -> Self {
        self.meta.placement = Some(placement);
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn shape_type(&self) -> Option<&str> {
        self.meta.shape_type.as_deref()
    }

    pub fn name(&self) -> Option<&str> {
        self.meta.name.as_deref()
    }

    pub fn id(&self) -> Option<&str> {
        self.fields.get("id").and_then(Value::as_str)
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// A shape embedded as a field of another shape, recognised by its `meta`
    /// object.
    pub fn from_value(value: &Value) -> Option<Shape> {
        let object = value.as_object()?;
        if !object.get("meta").is_some_and(Value::is_object) {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }

    /// Stringified value of a shape attribute, or `None` when any segment of
    /// the path is absent.
    pub fn attribute(&self, path: &AttributePath) -> Option<Cow<'_, str>> {
        match path {
            AttributePath::Type => self.shape_type().map(Cow::Borrowed),
            AttributePath::DisplayType => self.temp.display_type.as_deref().map(Cow::Borrowed),
            AttributePath::Name => self.name().map(Cow::Borrowed),
            AttributePath::Id => self.fields.get("id").and_then(Field::json_text),
            AttributePath::Path(segments) => {
                let (first, rest) = segments.split_first()?;
                let mut field = match first.as_str() {
                    "meta" => Field::Meta(&self.meta),
                    "temp" => Field::Temp(&self.temp),
                    other => Field::Json(self.fields.get(other)?),
                };
                for segment in rest {
                    field = field.child(segment)?;
                }
                field.text()
            }
        }
    }
}

/// Attribute a placement predicate inspects. The well-known names map onto
/// their canonical locations; anything else is a dotted path from the shape
/// root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributePath {
    Type,
    DisplayType,
    Id,
    Name,
    Path(Vec<String>),
}

impl AttributePath {
    pub fn parse(key: &str) -> Self {
        match key {
            "type" => Self::Type,
            "displayType" => Self::DisplayType,
            "id" => Self::Id,
            "name" => Self::Name,
            dotted => Self::Path(dotted.split('.').map(str::to_string).collect()),
        }
    }
}

#[derive(Clone, Copy)]
enum Field<'a> {
    Meta(&'a ShapeMeta),
    Temp(&'a ShapeTemp),
    Placement(&'a SelfPlacement),
    Str(&'a str),
    Strings(&'a [String]),
    Json(&'a Value),
}

impl<'a> Field<'a> {
    fn child(self, segment: &str) -> Option<Field<'a>> {
        match self {
            Field::Meta(meta) => match segment {
                "type" => meta.shape_type.as_deref().map(Field::Str),
                "name" => meta.name.as_deref().map(Field::Str),
                "alternates" => Some(Field::Strings(&meta.alternates)),
                "placement" => meta.placement.as_ref().map(Field::Placement),
                "item" => meta.item.as_ref().map(Field::Json),
                _ => None,
            },
            Field::Temp(temp) => match segment {
                "displayType" => temp.display_type.as_deref().map(Field::Str),
                "item" => temp.item.as_ref().map(Field::Json),
                _ => None,
            },
            Field::Placement(SelfPlacement::Explicit { path, order }) => match segment {
                "path" => Some(Field::Str(path)),
                "order" => order.as_deref().map(Field::Str),
                _ => None,
            },
            Field::Placement(SelfPlacement::Shorthand(_)) | Field::Str(_) => None,
            Field::Strings(values) => {
                let index: usize = segment.parse().ok()?;
                values.get(index).map(|value| Field::Str(value))
            }
            Field::Json(Value::Object(map)) => map.get(segment).map(Field::Json),
            Field::Json(Value::Array(values)) => {
                let index: usize = segment.parse().ok()?;
                values.get(index).map(Field::Json)
            }
            Field::Json(_) => None,
        }
    }

    fn text(self) -> Option<Cow<'a, str>> {
        match self {
            Field::Str(value) => Some(Cow::Borrowed(value)),
            Field::Strings(values) => Some(Cow::Owned(values.join(","))),
            Field::Placement(SelfPlacement::Shorthand(value)) => Some(Cow::Borrowed(value)),
            Field::Json(value) => Field::json_text(value),
            Field::Meta(_) | Field::Temp(_) | Field::Placement(_) => None,
        }
    }

    fn json_text(value: &Value) -> Option<Cow<'_, str>> {
        match value {
            Value::Null => None,
            Value::String(text) => Some(Cow::Borrowed(text)),
            other => Some(Cow::Owned(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::domain::order::Order;

    #[test]
    fn deserializes_wire_layout() {
        let shape: Shape = serde_json::from_value(json!({
            "meta": {"type": "page", "name": "home", "alternates": ["page-home"]},
            "temp": {"displayType": "main"},
            "id": "/",
            "title": "Home"
        }))
        .expect("valid shape");

        assert_eq!(shape.shape_type(), Some("page"));
        assert_eq!(shape.name(), Some("home"));
        assert_eq!(shape.meta.alternates, vec!["page-home".to_string()]);
        assert_eq!(shape.temp.display_type.as_deref(), Some("main"));
        assert_eq!(shape.id(), Some("/"));
        assert_eq!(shape.field("title"), Some(&json!("Home")));
    }

    #[test]
    fn well_known_attributes_resolve_to_canonical_fields() {
        let shape = Shape::new("page")
            .named("home")
            .with_display_type("summary")
            .with_field("id", "/foo/bar");

        assert_eq!(shape.attribute(&AttributePath::parse("type")).unwrap(), "page");
        assert_eq!(shape.attribute(&AttributePath::parse("name")).unwrap(), "home");
        assert_eq!(
            shape.attribute(&AttributePath::parse("displayType")).unwrap(),
            "summary"
        );
        assert_eq!(shape.attribute(&AttributePath::parse("id")).unwrap(), "/foo/bar");
    }

    #[test]
    fn dotted_paths_walk_nested_values() {
        let shape = Shape::default().with_item(json!({"meta": {"type": "deep-item"}, "tags": ["a", "b"]}));

        let deep = AttributePath::parse("meta.item.meta.type");
        assert_eq!(shape.attribute(&deep).unwrap(), "deep-item");

        let indexed = AttributePath::parse("meta.item.tags.1");
        assert_eq!(shape.attribute(&indexed).unwrap(), "b");
    }

    #[test]
    fn missing_segments_yield_none() {
        let shape = Shape::new("page");
        assert!(shape.attribute(&AttributePath::parse("meta.item.meta.type")).is_none());
        assert!(shape.attribute(&AttributePath::parse("id")).is_none());
        assert!(shape.attribute(&AttributePath::parse("nope.deeper")).is_none());
    }

    #[test]
    fn scalar_payloads_are_stringified() {
        let shape = Shape::new("counter").with_field("count", 3).with_field("live", true);
        assert_eq!(shape.attribute(&AttributePath::parse("count")).unwrap(), "3");
        assert_eq!(shape.attribute(&AttributePath::parse("live")).unwrap(), "true");
    }

    #[test]
    fn self_placement_accepts_both_forms() {
        let shorthand: Shape =
            serde_json::from_value(json!({"meta": {"placement": "zone2:4"}})).unwrap();
        let explicit: Shape =
            serde_json::from_value(json!({"meta": {"placement": {"path": "zone2", "order": "5"}}}))
                .unwrap();

        let first = shorthand.meta.placement.unwrap().target().unwrap();
        let second = explicit.meta.placement.unwrap().target().unwrap();
        assert_eq!(first.path.to_string(), "zone2");
        assert_eq!(first.order, Order::parse(Some("4")).unwrap());
        assert_eq!(second.order, Order::parse(Some("5")).unwrap());
    }

    #[test]
    fn embedded_shapes_require_meta_object() {
        assert!(Shape::from_value(&json!({"meta": {"type": "footer"}, "copy": "c"})).is_some());
        assert!(Shape::from_value(&json!({"copy": "c"})).is_none());
        assert!(Shape::from_value(&json!("text")).is_none());
    }

    #[test]
    fn zone_shapes_carry_name_alternate() {
        let zone = Shape::zone("sidebar");
        assert_eq!(zone.shape_type(), Some(ZONE_TYPE));
        assert_eq!(zone.meta.alternates, vec!["zone-sidebar".to_string()]);
    }
}
