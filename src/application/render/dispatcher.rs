use std::{borrow::Cow, sync::Arc, time::Instant};

use futures::future::{BoxFuture, FutureExt};
use indexmap::IndexMap;
use metrics::histogram;
use tracing::{debug, warn};

use crate::application::render::{
    hooks::FinallyGuard,
    renderer::Renderer,
    resolver::TemplateResolver,
    stream::{RenderSink, RenderStream},
    template::{ShapeView, Template},
    types::{RenderError, RenderOptions, RenderedPage, ShapeRequest, ShapeTarget},
};
use crate::domain::{shape::Shape, tree::ShapeTree};
use crate::presentation::markup;

const METRIC_RENDER_MS: &str = "placard_render_ms";

/// Walks a placed [`ShapeTree`], resolving a template for every shape and
/// streaming the markup in tree order.
#[derive(Clone)]
pub struct RenderDispatcher {
    resolver: Arc<dyn TemplateResolver>,
    options: RenderOptions,
}

impl RenderDispatcher {
    pub fn new(resolver: Arc<dyn TemplateResolver>, options: RenderOptions) -> Self {
        Self { resolver, options }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Render the whole tree from its root into memory.
    pub async fn render_page(&self, tree: &ShapeTree) -> Result<RenderedPage, RenderError> {
        let started_at = Instant::now();
        let mut stream = RenderStream::new();
        let result = self
            .render(tree, ShapeRequest::node(tree.root()), &mut stream)
            .await;
        record_duration("memory", started_at);
        if let Err(err) = result {
            warn!(error = %err, "page render failed");
            return Err(err);
        }

        let resources = stream.snapshot_resources();
        Ok(RenderedPage {
            html: stream.into_text(),
            resources,
        })
    }

    /// Render the whole tree, handing chunks to `sink` as they are produced.
    ///
    /// A chunk is whatever the root template writes directly: each nested
    /// shape it renders arrives complete. The built-in layout only writes once
    /// its body is done, because the head lists resources registered by the
    /// body, so with it the whole document arrives as a single chunk.
    pub async fn stream_page(
        &self,
        tree: &ShapeTree,
        sink: impl RenderSink + 'static,
    ) -> Result<RenderedPage, RenderError> {
        let started_at = Instant::now();
        let mut stream = RenderStream::with_sink(sink);
        let result = self
            .render(tree, ShapeRequest::node(tree.root()), &mut stream)
            .await;
        record_duration("stream", started_at);
        if let Err(err) = result {
            warn!(error = %err, "streamed page render failed");
            return Err(err);
        }

        Ok(RenderedPage {
            html: String::new(),
            resources: stream.snapshot_resources(),
        })
    }

    /// Render one shape into `stream`.
    ///
    /// The future completes only once every nested render has finished. The
    /// request's `on_error` hook runs first on failure, then its `finally`
    /// hook runs exactly once.
    pub fn render<'a>(
        &'a self,
        tree: &'a ShapeTree,
        request: ShapeRequest,
        stream: &'a mut RenderStream,
    ) -> BoxFuture<'a, Result<(), RenderError>> {
        async move {
            let ShapeRequest {
                target,
                tag,
                attributes,
                shape_name,
                params,
                finally,
                on_error,
            } = request;
            let _finally = FinallyGuard::new(finally);

            let mut shape: Cow<'_, Shape> = match &target {
                ShapeTarget::Node(id) => Cow::Borrowed(tree.shape(*id)),
                ShapeTarget::Detached(shape) => Cow::Borrowed(shape.as_ref()),
            };
            if !params.is_empty() {
                shape.to_mut().fields.extend(params);
            }
            let view = ShapeView::new(tree, target.node(), &shape);

            let result = self
                .render_view(view, shape_name.as_deref(), tag.as_deref(), &attributes, stream)
                .await;

            if let Err(err) = &result {
                debug!(
                    shape_type = shape.shape_type().unwrap_or_default(),
                    error = %err,
                    "shape render failed"
                );
                if let Some(hook) = on_error {
                    hook(err);
                }
            }
            result
        }
        .boxed()
    }

    async fn render_view(
        &self,
        view: ShapeView<'_>,
        shape_name: Option<&str>,
        tag: Option<&str>,
        attributes: &IndexMap<String, String>,
        stream: &mut RenderStream,
    ) -> Result<(), RenderError> {
        let is_zone = view.is_zone();
        if is_zone && !view.has_content() {
            return Ok(());
        }

        let template = self.resolve(view.shape(), shape_name).await?;

        let Some(tag) = tag else {
            let mut renderer = Renderer::new(self, view.tree(), stream);
            return template.render(view, &mut renderer).await;
        };

        let mut body = stream.inner();
        {
            let mut renderer = Renderer::new(self, view.tree(), &mut body);
            template.render(view, &mut renderer).await?;
        }

        if body.is_empty() && !is_zone {
            return Ok(());
        }
        stream.write(&markup::open_tag(tag, attributes))?;
        stream.splice(body)?;
        stream.write(&markup::close_tag(tag))
    }

    /// Template names tried for `shape`, most specific first.
    pub fn candidates(&self, shape: &Shape, shape_name: Option<&str>) -> Vec<String> {
        let mut candidates: Vec<String> = Vec::new();
        let names = shape_name
            .into_iter()
            .chain(shape.meta.alternates.iter().map(String::as_str))
            .chain(shape.shape_type())
            .chain(std::iter::once(self.options.default_template.as_str()));

        for name in names {
            if !name.is_empty() && !candidates.iter().any(|existing| existing == name) {
                candidates.push(name.to_string());
            }
        }
        candidates
    }

    async fn resolve(
        &self,
        shape: &Shape,
        shape_name: Option<&str>,
    ) -> Result<Arc<dyn Template>, RenderError> {
        let candidates = self.candidates(shape, shape_name);
        for candidate in &candidates {
            if let Some(template) = self.resolver.resolve(candidate).await? {
                debug!(template = %candidate, "resolved template");
                return Ok(template);
            }
        }

        Err(RenderError::UnresolvedTemplate {
            shape: shape
                .shape_type()
                .or_else(|| shape.name())
                .unwrap_or("<untyped>")
                .to_string(),
            candidates,
        })
    }
}

fn record_duration(mode: &'static str, started_at: Instant) {
    histogram!(METRIC_RENDER_MS, "mode" => mode)
        .record(started_at.elapsed().as_secs_f64() * 1000.0);
}
