//! Collectors: the sources of fresh records.
//!
//! A collector scrapes its targets and returns every record it currently
//! sees. The pipeline decides what is new. Collector kinds are looked up by
//! name in a [`CollectorRegistry`] when the configuration is loaded:
//!
//! - `listing`: CSS-selector driven listing pages (`ListingSpider`)

mod listing;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::{Config, CrawlerConfig, Record, SpiderConfig};

pub use listing::{FieldConfig, ListingConfig, ListingSpider};

/// A named source of records.
#[async_trait]
pub trait Collector: Send + Sync {
    /// Collector name, used for history files and notification subjects.
    fn name(&self) -> &str;

    /// Fetch the current records. Failures are collection errors.
    async fn collect(&self) -> Result<Vec<Record>>;
}

/// Builds a collector from its name, definition and the shared crawler settings.
pub type CollectorFactory = Box<
    dyn Fn(&str, &SpiderConfig, &CrawlerConfig, &reqwest::Client) -> Result<Box<dyn Collector>>
        + Send
        + Sync,
>;

/// Maps collector kinds to factories.
pub struct CollectorRegistry {
    factories: HashMap<String, CollectorFactory>,
}

impl CollectorRegistry {
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Create a registry with the built-in collector kinds.
    pub fn with_builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(
            "listing",
            Box::new(
                |name: &str,
                 spider: &SpiderConfig,
                 crawler: &CrawlerConfig,
                 client: &reqwest::Client| {
                    let spider = ListingSpider::from_config(name, spider, crawler, client.clone())?;
                    Ok(Box::new(spider) as Box<dyn Collector>)
                },
            ),
        );
        registry
    }

    /// Register (or replace) a collector kind.
    pub fn register(&mut self, kind: impl Into<String>, factory: CollectorFactory) {
        self.factories.insert(kind.into(), factory);
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// Build one collector from its definition.
    pub fn build(
        &self,
        name: &str,
        spider: &SpiderConfig,
        crawler: &CrawlerConfig,
        client: &reqwest::Client,
    ) -> Result<Box<dyn Collector>> {
        let factory = self.factories.get(&spider.kind).ok_or_else(|| {
            AppError::config(format!(
                "spiders.{name}: unknown collector kind '{}'",
                spider.kind
            ))
        })?;
        factory(name, spider, crawler, client)
    }

    /// Build every configured collector, in name order.
    pub fn resolve(&self, config: &Config, client: &reqwest::Client) -> Result<Vec<Box<dyn Collector>>> {
        config
            .spiders
            .iter()
            .map(|(name, spider)| self.build(name, spider, &config.crawler, client))
            .collect()
    }
}

impl Default for CollectorRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}
