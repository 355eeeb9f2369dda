//! Notification transports.
//!
//! A transport delivers one bounded-size text message to one recipient.
//! Channel types are looked up by name in a [`TransportRegistry`] once, when
//! the configuration is loaded:
//!
//! - `pushover`: push notifications, 1024 characters per message
//! - `email`: SMTP mail, unbounded (feature `email`)
//! - `console`: writes notifications to the log

mod console;
#[cfg(feature = "email")]
mod email;
mod pushover;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::{Config, TransportsConfig};

pub use console::ConsoleTransport;
#[cfg(feature = "email")]
pub use email::EmailTransport;
pub use pushover::PushoverTransport;

/// Delivery capability of one channel type.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Channel type name (e.g., "pushover", "email").
    fn channel_name(&self) -> &str;

    /// Largest message body the channel accepts, in characters (0 = unbounded).
    fn max_message_size(&self) -> usize {
        0
    }

    /// Send one message to one recipient.
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()>;
}

/// Transports resolved for a run, keyed by channel type.
pub type Transports = HashMap<String, Arc<dyn Transport>>;

/// Builds a transport from the transport settings and the shared HTTP client.
pub type TransportFactory =
    Box<dyn Fn(&TransportsConfig, &reqwest::Client) -> Result<Arc<dyn Transport>> + Send + Sync>;

/// Maps channel type names to transport factories.
pub struct TransportRegistry {
    factories: HashMap<String, TransportFactory>,
}

impl TransportRegistry {
    /// Create a registry without any channel types.
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Create a registry with the built-in channel types.
    pub fn with_builtin() -> Self {
        let mut registry = Self::empty();

        registry.register(
            "console",
            Box::new(|_: &TransportsConfig, _: &reqwest::Client| {
                Ok(Arc::new(ConsoleTransport::new()) as Arc<dyn Transport>)
            }),
        );

        registry.register(
            "pushover",
            Box::new(|config: &TransportsConfig, client: &reqwest::Client| {
                let settings = config.pushover.as_ref().ok_or_else(|| {
                    AppError::config("channel 'pushover' requires a [transports.pushover] section")
                })?;
                let transport = PushoverTransport::from_config(settings, client.clone())?;
                Ok(Arc::new(transport) as Arc<dyn Transport>)
            }),
        );

        #[cfg(feature = "email")]
        registry.register(
            "email",
            Box::new(|config: &TransportsConfig, _: &reqwest::Client| {
                let settings = config.email.as_ref().ok_or_else(|| {
                    AppError::config("channel 'email' requires a [transports.email] section")
                })?;
                let transport = EmailTransport::from_config(settings)?;
                Ok(Arc::new(transport) as Arc<dyn Transport>)
            }),
        );

        registry
    }

    /// Register (or replace) a channel type.
    pub fn register(&mut self, name: impl Into<String>, factory: TransportFactory) {
        self.factories.insert(name.into(), factory);
    }

    /// Whether a channel type is known.
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Build a single transport.
    pub fn build(
        &self,
        name: &str,
        config: &TransportsConfig,
        client: &reqwest::Client,
    ) -> Result<Arc<dyn Transport>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| AppError::config(format!("unknown notification channel '{name}'")))?;
        factory(config, client)
    }

    /// Build every transport referenced by the configured spiders, once each.
    pub fn resolve(&self, config: &Config, client: &reqwest::Client) -> Result<Transports> {
        let mut transports = Transports::new();
        for spider in config.spiders.values() {
            for name in spider.notifications.keys() {
                if !transports.contains_key(name) {
                    let transport = self.build(name, &config.transports, client)?;
                    transports.insert(name.clone(), transport);
                }
            }
        }
        Ok(transports)
    }
}

impl Default for TransportRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}
