use std::num::NonZeroUsize;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::application::render::{
    hooks::{ErrorHook, FinallyHook},
    stream::PageResources,
};
use crate::domain::{shape::Shape, tree::NodeId};

/// Structured errors surfaced by the render dispatcher.
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    #[error("no template found for shape `{shape}` (tried {candidates:?})")]
    UnresolvedTemplate {
        shape: String,
        candidates: Vec<String>,
    },
    #[error("template `{template}` failed: {message}")]
    Template { template: String, message: String },
    #[error("template lookup for `{name}` failed: {message}")]
    Resolution { name: String, message: String },
    #[error("markup rendering failed: {message}")]
    Markup { message: String },
    #[error("render output sink is closed")]
    SinkClosed,
}

impl RenderError {
    pub fn template(template: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Template {
            template: template.into(),
            message: message.into(),
        }
    }

    pub fn resolution(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Resolution {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn markup(message: impl Into<String>) -> Self {
        Self::Markup {
            message: message.into(),
        }
    }
}

/// What a [`ShapeRequest`] renders.
#[derive(Debug, Clone)]
pub enum ShapeTarget {
    /// A shape owned by the placed tree; zones and items resolve through it.
    Node(NodeId),
    /// A shape that is not part of the tree, e.g. one embedded in a field.
    Detached(Box<Shape>),
}

impl ShapeTarget {
    pub fn node(&self) -> Option<NodeId> {
        match self {
            ShapeTarget::Node(id) => Some(*id),
            ShapeTarget::Detached(_) => None,
        }
    }
}

/// A single `render` call: the shape plus how to wrap and resolve it.
pub struct ShapeRequest {
    pub target: ShapeTarget,
    pub tag: Option<String>,
    pub attributes: IndexMap<String, String>,
    /// Overrides the first template candidate.
    pub shape_name: Option<String>,
    /// Extra payload fields merged over the shape's own for this render only.
    pub params: Map<String, Value>,
    pub(crate) finally: Option<FinallyHook>,
    pub(crate) on_error: Option<ErrorHook>,
}

impl ShapeRequest {
    pub fn new(target: ShapeTarget) -> Self {
        Self {
            target,
            tag: None,
            attributes: IndexMap::new(),
            shape_name: None,
            params: Map::new(),
            finally: None,
            on_error: None,
        }
    }

    pub fn node(id: NodeId) -> Self {
        Self::new(ShapeTarget::Node(id))
    }

    pub fn detached(shape: Shape) -> Self {
        Self::new(ShapeTarget::Detached(Box::new(shape)))
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_shape_name(mut self, name: impl Into<String>) -> Self {
        self.shape_name = Some(name.into());
        self
    }

    /// Route a helper parameter: `class`, `style` and `data-*` decorate the
    /// wrapper tag, anything else becomes a payload field of the shape.
    pub fn with_param(self, name: &str, value: impl Into<Value>) -> Self {
        let value = value.into();
        if name == "class" || name == "style" || name.starts_with("data-") {
            let text = match value {
                Value::String(text) => text,
                other => other.to_string(),
            };
            return self.with_attribute(name, text);
        }

        let mut request = self;
        request.params.insert(name.to_string(), value);
        request
    }

    /// Runs exactly once when the render finishes, whatever the outcome.
    pub fn on_finally(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.finally = Some(Box::new(hook));
        self
    }

    /// Runs before the `finally` hook when the render fails.
    pub fn on_error(mut self, hook: impl FnOnce(&RenderError) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(hook));
        self
    }
}

static EXTERNAL_ASSET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(https?:)?//").expect("external asset pattern compiles"));

/// Where local scripts and stylesheets are served from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetPaths {
    pub script_base: String,
    pub style_base: String,
    pub minify: bool,
}

impl Default for AssetPaths {
    fn default() -> Self {
        Self {
            script_base: "/js".to_string(),
            style_base: "/css".to_string(),
            minify: false,
        }
    }
}

impl AssetPaths {
    pub fn is_external(name: &str) -> bool {
        EXTERNAL_ASSET.is_match(name)
    }

    /// `site` becomes `/js/site.js` (or `/js/site.min.js` when minified);
    /// external URLs pass through untouched.
    pub fn script_url(&self, name: &str) -> String {
        self.resolve(&self.script_base, name, "js")
    }

    pub fn stylesheet_url(&self, name: &str) -> String {
        self.resolve(&self.style_base, name, "css")
    }

    fn resolve(&self, base: &str, name: &str, extension: &str) -> String {
        if Self::is_external(name) {
            return name.to_string();
        }
        let base = base.trim_end_matches('/');
        let name = name.trim_start_matches('/');
        let suffix = if self.minify { ".min" } else { "" };
        format!("{base}/{name}{suffix}.{extension}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// Generic template tried after every shape-specific candidate.
    pub default_template: String,
    /// How many sibling shapes may render at once. Output order is unaffected.
    pub sibling_concurrency: NonZeroUsize,
    pub assets: AssetPaths,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            default_template: "shape".to_string(),
            sibling_concurrency: NonZeroUsize::MIN,
            assets: AssetPaths::default(),
        }
    }
}

/// A fully rendered page and the resources its shapes registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    pub html: String,
    pub resources: PageResources,
}
