// src/models/mod.rs

//! Domain models for the crawler application.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod record;
mod template;

// Re-export all public types
pub use config::{
    CacheConfig, ChannelConfig, Config, CrawlerConfig, EmailConfig, NotificationConfig,
    PushoverConfig, ScheduleConfig, ScheduleUnit, SpiderConfig, TransportsConfig,
};
pub use record::Record;
pub use template::MessageTemplate;

/// New records per collector name, computed fresh on every run.
pub type Delta = std::collections::BTreeMap<String, Vec<Record>>;
