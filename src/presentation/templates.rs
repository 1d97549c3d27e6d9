//! Built-in shape templates.

use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::Value;

use crate::application::render::{
    RenderError, Renderer, ShapeRequest, ShapeView, Template, TemplateRegistry,
};
use crate::domain::shape::Shape;
use crate::presentation::markup::{self, DocumentTemplate};

/// Registry holding every built-in template under its conventional name.
pub fn builtin_registry() -> TemplateRegistry {
    TemplateRegistry::new()
        .with("layout", Arc::new(LayoutTemplate))
        .with("zone", Arc::new(ZoneTemplate))
        .with("title", Arc::new(TitleTemplate))
        .with("text", Arc::new(TextTemplate))
        .with("html", Arc::new(HtmlTemplate))
        .with("shape", Arc::new(ShapeTemplate))
}

fn zone_attributes(name: &str) -> IndexMap<String, String> {
    IndexMap::from([("class".to_string(), format!("zone zone-{name}"))])
}

/// Full HTML document.
///
/// The body is rendered first so that the head can list every resource the
/// page's shapes registered; scripts go at the end of the body.
pub struct LayoutTemplate;

#[async_trait]
impl Template for LayoutTemplate {
    async fn render(
        &self,
        view: ShapeView<'_>,
        renderer: &mut Renderer<'_>,
    ) -> Result<(), RenderError> {
        let mut body = renderer.buffer();
        {
            let mut body_renderer = renderer.redirect(&mut body);
            for (name, _) in view.zones() {
                body_renderer
                    .zone_with_tag(view, name, "div", zone_attributes(name))
                    .await?;
            }
            body_renderer.items(view).await?;
        }

        let mut head = renderer.buffer();
        let mut scripts = renderer.buffer();
        {
            let mut head_renderer = renderer.redirect(&mut head);
            head_renderer.render_metas()?;
            head_renderer.render_links()?;
            head_renderer.render_stylesheets()?;
            renderer.redirect(&mut scripts).render_scripts()?;
        }

        let resources = renderer.resources();
        let fallback_title = view.text("title");
        let head = head.into_text();
        let scripts = scripts.into_text();
        let body = body.into_text();

        let html = markup::render_document(DocumentTemplate {
            title: resources.title().or(fallback_title.as_deref()),
            head: &head,
            body: &body,
            scripts: &scripts,
        })?;
        renderer.write(&html)
    }
}

/// Nested zones first, in creation order, then the zone's own items.
pub struct ZoneTemplate;

#[async_trait]
impl Template for ZoneTemplate {
    async fn render(
        &self,
        view: ShapeView<'_>,
        renderer: &mut Renderer<'_>,
    ) -> Result<(), RenderError> {
        for (name, _) in view.zones() {
            renderer
                .zone_with_tag(view, name, "div", zone_attributes(name))
                .await?;
        }
        renderer.items(view).await
    }
}

pub struct TitleTemplate;

#[async_trait]
impl Template for TitleTemplate {
    async fn render(
        &self,
        view: ShapeView<'_>,
        renderer: &mut Renderer<'_>,
    ) -> Result<(), RenderError> {
        renderer.write("<h1>")?;
        renderer.write_encoded(&view.text("text").unwrap_or_default())?;
        renderer.write_line("</h1>")
    }
}

pub struct TextTemplate;

#[async_trait]
impl Template for TextTemplate {
    async fn render(
        &self,
        view: ShapeView<'_>,
        renderer: &mut Renderer<'_>,
    ) -> Result<(), RenderError> {
        let Some(text) = view.text("text") else {
            return Ok(());
        };
        renderer.write("<p>")?;
        renderer.write_encoded(&text)?;
        renderer.write_line("</p>")
    }
}

/// Author-supplied HTML, sanitised before it is written.
pub struct HtmlTemplate;

#[async_trait]
impl Template for HtmlTemplate {
    async fn render(
        &self,
        view: ShapeView<'_>,
        renderer: &mut Renderer<'_>,
    ) -> Result<(), RenderError> {
        match view.text("html") {
            Some(html) => renderer.write(&ammonia::clean(&html)),
            None => Ok(()),
        }
    }
}

/// Generic fallback: a `div` listing the shape's scalar fields and rendering
/// any shape embedded in a field.
pub struct ShapeTemplate;

#[async_trait]
impl Template for ShapeTemplate {
    async fn render(
        &self,
        view: ShapeView<'_>,
        renderer: &mut Renderer<'_>,
    ) -> Result<(), RenderError> {
        let shape = view.shape();
        let class = match shape.shape_type() {
            Some(shape_type) => format!("shape shape-{shape_type}"),
            None => "shape".to_string(),
        };
        renderer.write(&markup::open_tag(
            "div",
            &IndexMap::from([("class".to_string(), class)]),
        ))?;

        for (name, value) in &shape.fields {
            if let Some(embedded) = Shape::from_value(value) {
                renderer.shape(ShapeRequest::detached(embedded)).await?;
                continue;
            }
            let text = match value {
                Value::String(text) => text.clone(),
                Value::Number(number) => number.to_string(),
                Value::Bool(flag) => flag.to_string(),
                _ => continue,
            };
            renderer.write(&markup::open_tag(
                "span",
                &IndexMap::from([("class".to_string(), format!("field field-{name}"))]),
            ))?;
            renderer.write_encoded(&text)?;
            renderer.write("</span>")?;
        }

        renderer.items(view).await?;
        renderer.write_line("</div>")
    }
}
