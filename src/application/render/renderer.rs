//! The handle templates write through.
//!
//! A [`Renderer`] couples the dispatcher, the placed tree and the stream the
//! current template writes to. Nested renders go through it so that they land
//! in the right place of the output and register resources on the page.

use futures::stream::{FuturesOrdered, StreamExt};
use indexmap::IndexMap;

use crate::application::render::{
    dispatcher::RenderDispatcher,
    stream::{LinkTag, MetaTag, PageResources, RenderStream, SharedResources, lock_resources},
    template::ShapeView,
    types::{RenderError, ShapeRequest},
};
use crate::domain::tree::ShapeTree;
use crate::presentation::markup;

pub struct Renderer<'a> {
    dispatcher: &'a RenderDispatcher,
    tree: &'a ShapeTree,
    stream: &'a mut RenderStream,
}

impl<'a> Renderer<'a> {
    pub(crate) fn new(
        dispatcher: &'a RenderDispatcher,
        tree: &'a ShapeTree,
        stream: &'a mut RenderStream,
    ) -> Self {
        Self {
            dispatcher,
            tree,
            stream,
        }
    }

    pub fn tree(&self) -> &'a ShapeTree {
        self.tree
    }

    pub fn write(&mut self, html: &str) -> Result<(), RenderError> {
        self.stream.write(html)
    }

    /// Write `text` HTML-escaped.
    pub fn write_encoded(&mut self, text: &str) -> Result<(), RenderError> {
        self.stream.write(&markup::escape_html(text))
    }

    pub fn write_line(&mut self, html: &str) -> Result<(), RenderError> {
        self.stream.write(html)?;
        self.stream.write("\n")
    }

    /// A fresh buffer sharing this page's resources, for templates that need
    /// to render part of their output before deciding where it goes.
    pub fn buffer(&self) -> RenderStream {
        self.stream.inner()
    }

    /// A renderer writing into `stream` instead of this renderer's output.
    pub fn redirect<'b>(&self, stream: &'b mut RenderStream) -> Renderer<'b>
    where
        'a: 'b,
    {
        Renderer::new(self.dispatcher, self.tree, stream)
    }

    /// Render a nested shape in place.
    pub async fn shape(&mut self, request: ShapeRequest) -> Result<(), RenderError> {
        let text = render_child(
            self.dispatcher,
            self.tree,
            resources_of(self.stream),
            request,
        )
        .await?;
        self.stream.write(&text)
    }

    /// Render the child zone `name` of `view`. A zone that was never created
    /// renders nothing.
    pub async fn zone(&mut self, view: ShapeView<'_>, name: &str) -> Result<(), RenderError> {
        match view.zone(name) {
            Some(zone) => self.shape(ShapeRequest::node(zone)).await,
            None => Ok(()),
        }
    }

    /// Like [`Self::zone`], wrapped in `tag` when the zone has content.
    pub async fn zone_with_tag(
        &mut self,
        view: ShapeView<'_>,
        name: &str,
        tag: &str,
        attributes: IndexMap<String, String>,
    ) -> Result<(), RenderError> {
        let Some(zone) = view.zone(name) else {
            return Ok(());
        };
        let mut request = ShapeRequest::node(zone).with_tag(tag);
        request.attributes = attributes;
        self.shape(request).await
    }

    /// Render the items of a zone in their final order.
    pub async fn items(&mut self, view: ShapeView<'_>) -> Result<(), RenderError> {
        let requests = view.items().iter().copied().map(ShapeRequest::node).collect();
        self.render_all(requests).await
    }

    /// Render sibling shapes, up to the configured number at once, and write
    /// their output in request order.
    ///
    /// After the first failure no further sibling is started. Siblings already
    /// running are awaited and their output discarded before the error is
    /// returned.
    pub async fn render_all(&mut self, requests: Vec<ShapeRequest>) -> Result<(), RenderError> {
        let limit = self.dispatcher.options().sibling_concurrency.get();
        let dispatcher = self.dispatcher;
        let tree = self.tree;
        let resources = resources_of(self.stream);

        let mut pending = requests.into_iter();
        let mut in_flight = FuturesOrdered::new();
        let mut failure: Option<RenderError> = None;

        loop {
            while failure.is_none() && in_flight.len() < limit {
                let Some(request) = pending.next() else {
                    break;
                };
                in_flight.push_back(render_child(
                    dispatcher,
                    tree,
                    SharedResources::clone(&resources),
                    request,
                ));
            }

            let Some(result) = in_flight.next().await else {
                break;
            };
            if failure.is_some() {
                continue;
            }
            match result.and_then(|text| self.stream.write(&text)) {
                Ok(()) => {}
                Err(err) => failure = Some(err),
            }
        }

        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Register a script. Names starting with `//`, `http://` or `https://`
    /// are used verbatim; other names resolve under the script base.
    pub fn add_script(&self, name: &str) {
        let url = self.dispatcher.options().assets.script_url(name);
        lock_resources(self.stream.resources()).add_script(url);
    }

    pub fn add_stylesheet(&self, name: &str) {
        let url = self.dispatcher.options().assets.stylesheet_url(name);
        lock_resources(self.stream.resources()).add_stylesheet(url);
    }

    pub fn add_meta(
        &self,
        name: impl Into<String>,
        content: impl Into<String>,
        attributes: IndexMap<String, String>,
    ) {
        lock_resources(self.stream.resources()).add_meta(MetaTag {
            name: name.into(),
            content: content.into(),
            attributes,
        });
    }

    pub fn add_link(
        &self,
        rel: impl Into<String>,
        mime: impl Into<String>,
        href: impl Into<String>,
        attributes: IndexMap<String, String>,
    ) {
        lock_resources(self.stream.resources()).add_link(LinkTag {
            rel: rel.into(),
            mime: mime.into(),
            href: href.into(),
            attributes,
        });
    }

    pub fn set_title(&self, title: impl Into<String>) {
        lock_resources(self.stream.resources()).set_title(title);
    }

    /// Snapshot of everything registered on the page so far.
    pub fn resources(&self) -> PageResources {
        self.stream.snapshot_resources()
    }

    pub fn render_scripts(&mut self) -> Result<(), RenderError> {
        let html = markup::script_tags(&self.resources())?;
        self.write(&html)
    }

    pub fn render_stylesheets(&mut self) -> Result<(), RenderError> {
        let html = markup::stylesheet_tags(&self.resources())?;
        self.write(&html)
    }

    pub fn render_metas(&mut self) -> Result<(), RenderError> {
        let html = markup::meta_tags(&self.resources())?;
        self.write(&html)
    }

    pub fn render_links(&mut self) -> Result<(), RenderError> {
        let html = markup::link_tags(&self.resources())?;
        self.write(&html)
    }
}

fn resources_of(stream: &RenderStream) -> SharedResources {
    SharedResources::clone(stream.resources())
}

/// Render `request` into its own buffer sharing `resources`.
async fn render_child(
    dispatcher: &RenderDispatcher,
    tree: &ShapeTree,
    resources: SharedResources,
    request: ShapeRequest,
) -> Result<String, RenderError> {
    let mut child = RenderStream::buffered(resources);
    dispatcher.render(tree, request, &mut child).await?;
    Ok(child.into_text())
}
