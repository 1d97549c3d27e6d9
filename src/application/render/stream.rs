//! Output streams and the page-level resources they share.
//!
//! A page render starts from one outermost [`RenderStream`] that owns the
//! [`PageResources`]. Every nested render gets an inner stream sharing those
//! resources and writing to its own buffer; the caller splices that buffer
//! back in traversal order.

use std::sync::{Arc, Mutex, MutexGuard};

use indexmap::{IndexMap, IndexSet};
use tokio::sync::mpsc::UnboundedSender;
use tracing::warn;

use crate::application::render::types::RenderError;

/// Destination for rendered chunks.
pub trait RenderSink: Send {
    fn write_chunk(&mut self, chunk: String) -> Result<(), RenderError>;
}

impl RenderSink for String {
    fn write_chunk(&mut self, chunk: String) -> Result<(), RenderError> {
        self.push_str(&chunk);
        Ok(())
    }
}

impl RenderSink for UnboundedSender<String> {
    fn write_chunk(&mut self, chunk: String) -> Result<(), RenderError> {
        self.send(chunk).map_err(|_| RenderError::SinkClosed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaTag {
    pub name: String,
    pub content: String,
    pub attributes: IndexMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTag {
    pub rel: String,
    pub mime: String,
    pub href: String,
    pub attributes: IndexMap<String, String>,
}

/// Resources registered by any shape of the page, in first-registration
/// order and without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageResources {
    scripts: IndexSet<String>,
    stylesheets: IndexSet<String>,
    metas: IndexMap<String, MetaTag>,
    links: IndexMap<String, LinkTag>,
    title: Option<String>,
}

impl PageResources {
    pub fn add_script(&mut self, url: impl Into<String>) -> bool {
        self.scripts.insert(url.into())
    }

    pub fn add_stylesheet(&mut self, url: impl Into<String>) -> bool {
        self.stylesheets.insert(url.into())
    }

    /// Keyed by name; the first registration wins.
    pub fn add_meta(&mut self, meta: MetaTag) -> bool {
        if self.metas.contains_key(&meta.name) {
            return false;
        }
        self.metas.insert(meta.name.clone(), meta);
        true
    }

    /// Keyed by href; the first registration wins.
    pub fn add_link(&mut self, link: LinkTag) -> bool {
        if self.links.contains_key(&link.href) {
            return false;
        }
        self.links.insert(link.href.clone(), link);
        true
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = Some(title.into());
    }

    pub fn scripts(&self) -> impl Iterator<Item = &str> {
        self.scripts.iter().map(String::as_str)
    }

    pub fn stylesheets(&self) -> impl Iterator<Item = &str> {
        self.stylesheets.iter().map(String::as_str)
    }

    pub fn metas(&self) -> impl Iterator<Item = &MetaTag> {
        self.metas.values()
    }

    pub fn links(&self) -> impl Iterator<Item = &LinkTag> {
        self.links.values()
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }
}

pub type SharedResources = Arc<Mutex<PageResources>>;

/// Lock the shared resources. Callers never hold the guard across an await.
pub(crate) fn lock_resources(resources: &SharedResources) -> MutexGuard<'_, PageResources> {
    match resources.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!(
                lock_kind = "mutex.lock",
                result = "poisoned_recovered",
                "Recovered from poisoned page resource lock"
            );
            poisoned.into_inner()
        }
    }
}

enum Output {
    Buffer(String),
    Sink {
        sink: Box<dyn RenderSink>,
        written: usize,
    },
}

pub struct RenderStream {
    resources: SharedResources,
    output: Output,
}

impl Default for RenderStream {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderStream {
    /// Outermost stream buffering into memory.
    pub fn new() -> Self {
        Self::buffered(SharedResources::default())
    }

    /// Outermost stream forwarding every chunk to `sink` as it is written.
    pub fn with_sink(sink: impl RenderSink + 'static) -> Self {
        Self {
            resources: SharedResources::default(),
            output: Output::Sink {
                sink: Box::new(sink),
                written: 0,
            },
        }
    }

    pub fn buffered(resources: SharedResources) -> Self {
        Self {
            resources,
            output: Output::Buffer(String::new()),
        }
    }

    /// A buffered stream sharing this stream's resources.
    pub fn inner(&self) -> Self {
        Self::buffered(Arc::clone(&self.resources))
    }

    pub fn resources(&self) -> &SharedResources {
        &self.resources
    }

    pub fn snapshot_resources(&self) -> PageResources {
        lock_resources(&self.resources).clone()
    }

    pub fn write(&mut self, chunk: &str) -> Result<(), RenderError> {
        if chunk.is_empty() {
            return Ok(());
        }
        match &mut self.output {
            Output::Buffer(buffer) => {
                buffer.push_str(chunk);
                Ok(())
            }
            Output::Sink { sink, written } => {
                *written += chunk.len();
                sink.write_chunk(chunk.to_string())
            }
        }
    }

    /// Append the buffered output of an inner stream.
    pub fn splice(&mut self, inner: RenderStream) -> Result<(), RenderError> {
        let text = inner.into_text();
        self.write(&text)
    }

    pub fn is_empty(&self) -> bool {
        match &self.output {
            Output::Buffer(buffer) => buffer.is_empty(),
            Output::Sink { written, .. } => *written == 0,
        }
    }

    /// Buffered text. Sink-backed streams have already handed theirs off.
    pub fn into_text(self) -> String {
        match self.output {
            Output::Buffer(buffer) => buffer,
            Output::Sink { .. } => String::new(),
        }
    }
}
