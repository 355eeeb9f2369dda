//! Application configuration structures.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::MessageTemplate;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Where collector histories are kept
    #[serde(default)]
    pub cache: CacheConfig,

    /// HTTP and crawling behavior settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Delivery settings shared by all channels
    #[serde(default)]
    pub notifications: NotificationConfig,

    /// Optional periodic re-run
    #[serde(default)]
    pub schedule: Option<ScheduleConfig>,

    /// Credentials and endpoints for notification transports
    #[serde(default)]
    pub transports: TransportsConfig,

    /// Collector definitions, keyed by collector name
    #[serde(default)]
    pub spiders: BTreeMap<String, SpiderConfig>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.crawler.max_concurrent == 0 {
            return Err(AppError::validation("crawler.max_concurrent must be > 0"));
        }
        if self.notifications.send_timeout_secs == 0 {
            return Err(AppError::validation(
                "notifications.send_timeout_secs must be > 0",
            ));
        }
        MessageTemplate::parse(&self.notifications.subject)?;
        if let Some(schedule) = &self.schedule {
            if schedule.every == 0 {
                return Err(AppError::validation("schedule.every must be > 0"));
            }
        }
        for (name, spider) in &self.spiders {
            validate_spider_name(name)?;
            spider.validate(name)?;
        }
        Ok(())
    }

    /// Names of all configured spiders, in processing order.
    pub fn spider_names(&self) -> Vec<String> {
        self.spiders.keys().cloned().collect()
    }
}

/// Spider names become cache file names, so keep them path-safe.
fn validate_spider_name(name: &str) -> Result<()> {
    let re = Regex::new(r"^[A-Za-z0-9_-]+$").map_err(|e| AppError::config(e.to_string()))?;
    if re.is_match(name) {
        Ok(())
    } else {
        Err(AppError::validation(format!(
            "spider name '{name}' may only contain letters, digits, '_' and '-'"
        )))
    }
}

/// History cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Directory holding `{spider}_cached.json` files
    #[serde(default = "defaults::cache_dir")]
    pub dir: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: defaults::cache_dir(),
        }
    }
}

/// HTTP client and crawling behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Delay between page requests in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,

    /// Maximum number of spiders processed at the same time
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            request_delay_ms: defaults::request_delay(),
            max_concurrent: defaults::max_concurrent(),
        }
    }
}

/// Settings shared by every notification channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Upper bound for a single transport call
    #[serde(default = "defaults::send_timeout")]
    pub send_timeout_secs: u64,

    /// Default subject; `{collector}` is replaced with the spider name
    #[serde(default = "defaults::subject")]
    pub subject: String,
}

impl NotificationConfig {
    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.send_timeout_secs)
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            send_timeout_secs: defaults::send_timeout(),
            subject: defaults::subject(),
        }
    }
}

/// Interval for scheduled runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    pub every: u64,
    #[serde(default)]
    pub units: ScheduleUnit,
}

impl ScheduleConfig {
    /// Length of one scheduling period.
    pub fn period(&self) -> Duration {
        let secs = match self.units {
            ScheduleUnit::Seconds => 1,
            ScheduleUnit::Minutes => 60,
            ScheduleUnit::Hours => 60 * 60,
            ScheduleUnit::Days => 24 * 60 * 60,
        };
        Duration::from_secs(self.every.saturating_mul(secs))
    }
}

/// Time unit of a schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleUnit {
    Seconds,
    #[default]
    Minutes,
    Hours,
    Days,
}

impl std::str::FromStr for ScheduleUnit {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "second" | "seconds" => Ok(Self::Seconds),
            "minute" | "minutes" => Ok(Self::Minutes),
            "hour" | "hours" => Ok(Self::Hours),
            "day" | "days" => Ok(Self::Days),
            other => Err(AppError::config(format!("unknown schedule unit '{other}'"))),
        }
    }
}

/// Transport settings, one optional section per channel type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransportsConfig {
    #[serde(default)]
    pub pushover: Option<PushoverConfig>,

    #[serde(default)]
    pub email: Option<EmailConfig>,
}

/// Pushover application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushoverConfig {
    /// Application token; `${VAR}` reads it from the environment
    pub app_token: String,

    /// Messages API endpoint
    #[serde(default = "defaults::pushover_url")]
    pub api_url: String,
}

/// SMTP settings for the email channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_host: String,

    /// Defaults to 587
    #[serde(default)]
    pub smtp_port: Option<u16>,

    /// STARTTLS on/off (port 465 always uses TLS)
    #[serde(default = "defaults::enabled")]
    pub tls: bool,

    /// Login user; `${VAR}` reads it from the environment
    #[serde(default)]
    pub username: Option<String>,

    /// Login password; `${VAR}` reads it from the environment
    #[serde(default)]
    pub password: Option<String>,

    /// Sender address; falls back to the login user
    #[serde(default)]
    pub from: Option<String>,
}

/// One collector definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpiderConfig {
    /// Collector implementation to build
    #[serde(default = "defaults::spider_kind")]
    pub kind: String,

    /// Target endpoints, keyed by query label, visited in file order
    #[serde(default)]
    pub urls: IndexMap<String, String>,

    /// Channels to notify, keyed by channel type
    #[serde(default)]
    pub notifications: BTreeMap<String, ChannelConfig>,

    /// Collector-specific settings, interpreted by the collector kind
    #[serde(flatten)]
    pub settings: toml::Table,
}

impl SpiderConfig {
    fn validate(&self, name: &str) -> Result<()> {
        for (channel, config) in &self.notifications {
            config
                .validate()
                .map_err(|e| AppError::validation(format!("spiders.{name}.notifications.{channel}: {e}")))?;
        }
        Ok(())
    }
}

/// Per-channel notification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Recipients understood by the channel (addresses, user keys, ...)
    #[serde(default)]
    pub recipients: Vec<String>,

    /// Template used to render each new record
    pub message_body_format: String,

    /// Deliver every record as its own message
    #[serde(default)]
    pub send_separately: bool,

    /// Overrides the channel's maximum message size (0 = unbounded)
    #[serde(default)]
    pub message_size_limit: Option<usize>,

    /// Overrides the default subject template
    #[serde(default)]
    pub subject: Option<String>,
}

impl ChannelConfig {
    fn validate(&self) -> Result<()> {
        if self.recipients.is_empty() {
            return Err(AppError::validation("at least one recipient is required"));
        }
        if self.message_body_format.is_empty() {
            return Err(AppError::validation("message_body_format is empty"));
        }
        MessageTemplate::parse(&self.message_body_format)?;
        if let Some(subject) = &self.subject {
            MessageTemplate::parse(subject)?;
        }
        Ok(())
    }
}

mod defaults {
    use std::path::PathBuf;

    pub fn cache_dir() -> PathBuf {
        PathBuf::from(".nc_cache")
    }

    // Crawler defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; news-crawler/0.1)".into()
    }
    pub fn timeout() -> u64 {
        10
    }
    pub fn request_delay() -> u64 {
        100
    }
    pub fn max_concurrent() -> usize {
        1
    }

    // Notification defaults
    pub fn send_timeout() -> u64 {
        30
    }
    pub fn subject() -> String {
        "{collector} news".into()
    }
    pub fn pushover_url() -> String {
        "https://api.pushover.net/1/messages.json".into()
    }
    pub fn enabled() -> bool {
        true
    }

    pub fn spider_kind() -> String {
        "listing".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [cache]
        dir = "/tmp/nc"

        [schedule]
        every = 2
        units = "hours"

        [transports.pushover]
        app_token = "${PUSHOVER_APP_TOKEN}"

        [spiders.bolha]
        urls = { bikes = "https://example.com/bikes" }
        row_selector = "li.item"

        [spiders.bolha.fields.url]
        selector = "a"
        attr = "href"

        [spiders.bolha.notifications.pushover]
        recipients = ["user-key"]
        message_body_format = "{query}: {url}\n"
    "#;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn parse_sample_config() {
        let config = Config::parse(SAMPLE).unwrap();
        assert_eq!(config.cache.dir, PathBuf::from("/tmp/nc"));
        assert_eq!(config.crawler.timeout_secs, 10);
        assert_eq!(config.spider_names(), vec!["bolha"]);

        let spider = &config.spiders["bolha"];
        assert_eq!(spider.kind, "listing");
        assert_eq!(spider.urls["bikes"], "https://example.com/bikes");
        assert!(spider.settings.contains_key("row_selector"));
        assert!(spider.settings.contains_key("fields"));
        assert!(!spider.settings.contains_key("notifications"));

        let channel = &spider.notifications["pushover"];
        assert!(!channel.send_separately);
        assert_eq!(channel.message_size_limit, None);

        let schedule = config.schedule.unwrap();
        assert_eq!(schedule.period(), Duration::from_secs(2 * 3600));

        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_user_agent() {
        let mut config = Config::default();
        config.crawler.user_agent = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_concurrency() {
        let mut config = Config::default();
        config.crawler.max_concurrent = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_unsafe_spider_name() {
        let mut config = Config::parse(SAMPLE).unwrap();
        let spider = config.spiders.remove("bolha").unwrap();
        config.spiders.insert("../etc".to_string(), spider);
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_channel_without_recipients() {
        let mut config = Config::parse(SAMPLE).unwrap();
        if let Some(spider) = config.spiders.get_mut("bolha") {
            spider
                .notifications
                .get_mut("pushover")
                .unwrap()
                .recipients
                .clear();
        }
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("recipient"));
    }

    #[test]
    fn validate_rejects_bad_template() {
        let mut config = Config::parse(SAMPLE).unwrap();
        if let Some(spider) = config.spiders.get_mut("bolha") {
            spider
                .notifications
                .get_mut("pushover")
                .unwrap()
                .message_body_format = "{url".to_string();
        }
        assert!(config.validate().is_err());
    }

    #[test]
    fn schedule_unit_from_str() {
        assert_eq!("Minutes".parse::<ScheduleUnit>().unwrap(), ScheduleUnit::Minutes);
        assert_eq!("day".parse::<ScheduleUnit>().unwrap(), ScheduleUnit::Days);
        assert!("fortnights".parse::<ScheduleUnit>().is_err());
    }
}
