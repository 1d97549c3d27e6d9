//! Template lookup by name.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use crate::application::render::{template::Template, types::RenderError};

#[async_trait]
pub trait TemplateResolver: Send + Sync {
    /// `Ok(None)` when no template is registered under `name`.
    async fn resolve(&self, name: &str) -> Result<Option<Arc<dyn Template>>, RenderError>;
}

/// In-memory resolver built from explicit registrations.
#[derive(Clone, Default)]
pub struct TemplateRegistry {
    templates: HashMap<String, Arc<dyn Template>>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `template` under `name`, replacing any earlier registration.
    pub fn register(&mut self, name: impl Into<String>, template: Arc<dyn Template>) -> &mut Self {
        self.templates.insert(name.into(), template);
        self
    }

    pub fn with(mut self, name: impl Into<String>, template: Arc<dyn Template>) -> Self {
        self.register(name, template);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

#[async_trait]
impl TemplateResolver for TemplateRegistry {
    async fn resolve(&self, name: &str) -> Result<Option<Arc<dyn Template>>, RenderError> {
        Ok(self.templates.get(name).cloned())
    }
}

/// Memoises another resolver so each name is looked up once per process.
/// Misses are remembered too.
pub struct CachedResolver<R> {
    inner: R,
    cache: DashMap<String, Option<Arc<dyn Template>>>,
}

impl<R: TemplateResolver> CachedResolver<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            cache: DashMap::new(),
        }
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}

#[async_trait]
impl<R: TemplateResolver> TemplateResolver for CachedResolver<R> {
    async fn resolve(&self, name: &str) -> Result<Option<Arc<dyn Template>>, RenderError> {
        if let Some(entry) = self.cache.get(name) {
            return Ok(entry.value().clone());
        }

        let resolved = self.inner.resolve(name).await?;
        debug!(template = name, found = resolved.is_some(), "caching template lookup");
        self.cache.insert(name.to_string(), resolved.clone());
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::application::render::{renderer::Renderer, template::ShapeView};

    struct Fixed;

    #[async_trait]
    impl Template for Fixed {
        async fn render(
            &self,
            _view: ShapeView<'_>,
            renderer: &mut Renderer<'_>,
        ) -> Result<(), RenderError> {
            renderer.write("fixed")
        }
    }

    struct Counting {
        lookups: AtomicUsize,
        registry: TemplateRegistry,
    }

    #[async_trait]
    impl TemplateResolver for Counting {
        async fn resolve(&self, name: &str) -> Result<Option<Arc<dyn Template>>, RenderError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.registry.resolve(name).await
        }
    }

    #[tokio::test]
    async fn registry_resolves_registered_names() {
        let registry = TemplateRegistry::new().with("fixed", Arc::new(Fixed));
        assert!(registry.resolve("fixed").await.expect("lookup").is_some());
        assert!(registry.resolve("missing").await.expect("lookup").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn cached_resolver_hits_inner_once_per_name() {
        let cached = CachedResolver::new(Counting {
            lookups: AtomicUsize::new(0),
            registry: TemplateRegistry::new().with("fixed", Arc::new(Fixed)),
        });

        for _ in 0..3 {
            assert!(cached.resolve("fixed").await.expect("lookup").is_some());
            assert!(cached.resolve("missing").await.expect("lookup").is_none());
        }

        assert_eq!(cached.inner.lookups.load(Ordering::SeqCst), 2);
        assert_eq!(cached.cached(), 2);
    }
}
