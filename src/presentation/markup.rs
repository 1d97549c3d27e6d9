//! HTML fragments the dispatcher and the built-in templates emit: the page
//! document, resource tags and wrapper tags.

use askama::Template;
use indexmap::IndexMap;

use crate::application::render::{LinkTag, MetaTag, PageResources, RenderError};

#[derive(Template)]
#[template(path = "document.html")]
pub struct DocumentTemplate<'a> {
    pub title: Option<&'a str>,
    pub head: &'a str,
    pub body: &'a str,
    pub scripts: &'a str,
}

#[derive(Template)]
#[template(path = "scripts.html")]
struct ScriptTags<'a> {
    scripts: Vec<&'a str>,
}

#[derive(Template)]
#[template(path = "stylesheets.html")]
struct StylesheetTags<'a> {
    stylesheets: Vec<&'a str>,
}

#[derive(Template)]
#[template(path = "metas.html")]
struct MetaTags<'a> {
    metas: Vec<&'a MetaTag>,
}

#[derive(Template)]
#[template(path = "links.html")]
struct LinkTags<'a> {
    links: Vec<&'a LinkTag>,
}

fn render<T: Template>(template: T) -> Result<String, RenderError> {
    template
        .render()
        .map_err(|err| RenderError::markup(err.to_string()))
}

pub fn render_document(template: DocumentTemplate<'_>) -> Result<String, RenderError> {
    render(template)
}

pub fn script_tags(resources: &PageResources) -> Result<String, RenderError> {
    render(ScriptTags {
        scripts: resources.scripts().collect(),
    })
}

pub fn stylesheet_tags(resources: &PageResources) -> Result<String, RenderError> {
    render(StylesheetTags {
        stylesheets: resources.stylesheets().collect(),
    })
}

pub fn meta_tags(resources: &PageResources) -> Result<String, RenderError> {
    render(MetaTags {
        metas: resources.metas().collect(),
    })
}

pub fn link_tags(resources: &PageResources) -> Result<String, RenderError> {
    render(LinkTags {
        links: resources.links().collect(),
    })
}

pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '\n' | '\r' | '\t' => escaped.push(' '),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Tag names come from templates; anything outside `[A-Za-z0-9-]` is dropped.
fn tag_name(tag: &str) -> String {
    tag.chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || *ch == '-')
        .collect()
}

pub fn open_tag(tag: &str, attributes: &IndexMap<String, String>) -> String {
    let mut html = format!("<{}", tag_name(tag));
    for (name, value) in attributes {
        html.push(' ');
        html.push_str(&tag_name(name));
        html.push_str("=\"");
        html.push_str(&escape_attribute(value));
        html.push('"');
    }
    html.push('>');
    html
}

pub fn close_tag(tag: &str) -> String {
    format!("</{}>", tag_name(tag))
}
