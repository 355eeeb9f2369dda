// src/services/listing.rs

//! Listing page spider.
//!
//! Scrapes classified-ad style listing pages: every row matched by
//! `row_selector` becomes one record, with fields extracted by per-field
//! CSS selectors. An optional "next page" link is followed up to
//! `max_pages` pages per query.

use std::collections::HashSet;
use std::time::Duration;

use indexmap::IndexMap;
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::{CrawlerConfig, Record, SpiderConfig};
use crate::services::Collector;
use crate::utils::http::fetch_text;
use crate::utils::{normalize_whitespace, resolve_url};

/// Settings of a `listing` collector, read from its spider table.
#[derive(Debug, Clone, Deserialize)]
pub struct ListingConfig {
    /// Selector matching one listing row
    pub row_selector: String,

    /// Extracted fields, keyed by record field name, in record order
    #[serde(default)]
    pub fields: IndexMap<String, FieldConfig>,

    /// Selector of the "next page" link
    #[serde(default)]
    pub next_page_selector: Option<String>,

    /// Pages visited per query
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
}

/// How to extract one field from a row.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldConfig {
    pub selector: String,

    /// Read this attribute instead of the element text
    #[serde(default)]
    pub attr: Option<String>,

    /// Resolve the value against the page URL
    #[serde(default)]
    pub absolute: bool,

    /// Use an empty string instead of skipping the row when missing
    #[serde(default)]
    pub optional: bool,
}

fn default_max_pages() -> usize {
    10
}

struct FieldRule {
    name: String,
    selector: Selector,
    config: FieldConfig,
}

/// Records and continuation link found on one page.
#[derive(Debug)]
struct Page {
    records: Vec<Record>,
    next: Option<String>,
}

/// Collector for listing pages.
pub struct ListingSpider {
    name: String,
    urls: IndexMap<String, String>,
    row: Selector,
    fields: Vec<FieldRule>,
    next_page: Option<Selector>,
    max_pages: usize,
    delay: Duration,
    client: reqwest::Client,
}

impl ListingSpider {
    /// Build a spider from its definition. Selectors are compiled here, so a
    /// broken selector is reported at configuration time.
    pub fn from_config(
        name: &str,
        spider: &SpiderConfig,
        crawler: &CrawlerConfig,
        client: reqwest::Client,
    ) -> Result<Self> {
        let config: ListingConfig = toml::Value::Table(spider.settings.clone())
            .try_into()
            .map_err(|e| AppError::config(format!("spiders.{name}: {e}")))?;

        let fields = config
            .fields
            .into_iter()
            .map(|(field, field_config)| {
                Ok(FieldRule {
                    selector: parse_selector(&field_config.selector)?,
                    name: field,
                    config: field_config,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            name: name.to_string(),
            urls: spider.urls.clone(),
            row: parse_selector(&config.row_selector)?,
            fields,
            next_page: config
                .next_page_selector
                .as_deref()
                .map(parse_selector)
                .transpose()?,
            max_pages: config.max_pages.max(1),
            delay: Duration::from_millis(crawler.request_delay_ms),
            client,
        })
    }

    /// Scrape all pages of one query.
    async fn collect_query(&self, query: &str, start_url: &str) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        let mut visited = HashSet::new();
        let mut next = Some(start_url.to_string());

        while let Some(page_url) = next.take() {
            if visited.len() >= self.max_pages || !visited.insert(page_url.clone()) {
                break;
            }
            if visited.len() > 1 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            let html = fetch_text(&self.client, &page_url)
                .await
                .map_err(|e| AppError::collection(&self.name, format!("{page_url}: {e}")))?;
            let page = self.parse_page(&html, &page_url, query)?;

            log::debug!(
                "{}: {} rows on {} (query '{}')",
                self.name,
                page.records.len(),
                page_url,
                query
            );

            records.extend(page.records);
            next = page.next;
        }

        Ok(records)
    }

    fn parse_page(&self, html: &str, page_url: &str, query: &str) -> Result<Page> {
        let base = Url::parse(page_url)
            .map_err(|e| AppError::collection(&self.name, format!("{page_url}: {e}")))?;
        let document = Html::parse_document(html);

        let mut records = Vec::new();
        for row in document.select(&self.row) {
            if let Some(record) = self.parse_row(&row, &base, query)? {
                records.push(record);
            }
        }

        let next = self
            .next_page
            .as_ref()
            .and_then(|selector| document.select(selector).next())
            .and_then(|link| link.value().attr("href"))
            .map(|href| resolve_url(&base, href));

        Ok(Page { records, next })
    }

    /// Returns `None` when a required field is missing from the row.
    fn parse_row(&self, row: &ElementRef, base: &Url, query: &str) -> Result<Option<Record>> {
        let mut pairs: Vec<(String, Value)> = Vec::with_capacity(self.fields.len() + 1);
        pairs.push(("query".to_string(), Value::from(query)));

        for rule in &self.fields {
            let value = row.select(&rule.selector).next().and_then(|element| {
                match &rule.config.attr {
                    Some(attr) => element.value().attr(attr).map(str::to_string),
                    None => Some(element.text().collect::<String>()),
                }
            });

            let value = match value {
                Some(raw) => {
                    let text = normalize_whitespace(&raw);
                    if rule.config.absolute && !text.is_empty() {
                        resolve_url(base, &text)
                    } else {
                        text
                    }
                }
                None if rule.config.optional => String::new(),
                None => return Ok(None),
            };
            pairs.push((rule.name.clone(), Value::from(value)));
        }

        Record::from_pairs(pairs).map(Some)
    }
}

#[async_trait]
impl Collector for ListingSpider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn collect(&self) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        for (query, url) in &self.urls {
            records.extend(self.collect_query(query, url).await?);
        }
        log::info!("{}: collected {} records", self.name, records.len());
        Ok(records)
    }
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Config;

    const CONFIG: &str = r#"
        [spiders.bolha]
        urls = { bikes = "https://www.bolha.com/bikes" }
        row_selector = "li.ad"
        next_page_selector = "a.next"

        [spiders.bolha.fields.url]
        selector = "a.title"
        attr = "href"
        absolute = true

        [spiders.bolha.fields.title]
        selector = "a.title"

        [spiders.bolha.fields.price]
        selector = ".price"
        optional = true
    "#;

    const PAGE: &str = r#"
        <html><body>
          <ul>
            <li class="ad">
              <a class="title" href="/oglas/1">  Road   bike
              </a>
              <span class="price">300 €</span>
            </li>
            <li class="ad">
              <a class="title" href="https://www.bolha.com/oglas/2">Gravel bike</a>
            </li>
            <li class="ad"><span class="price">No link</span></li>
          </ul>
          <a class="next" href="?page=2">next</a>
        </body></html>
    "#;

    fn spider() -> ListingSpider {
        let config = Config::parse(CONFIG).unwrap();
        ListingSpider::from_config(
            "bolha",
            &config.spiders["bolha"],
            &config.crawler,
            reqwest::Client::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_parse_rows() {
        let page = spider()
            .parse_page(PAGE, "https://www.bolha.com/bikes", "bikes")
            .unwrap();

        assert_eq!(page.records.len(), 2);
        let first = &page.records[0];
        assert_eq!(first.text("query").as_deref(), Some("bikes"));
        assert_eq!(first.text("url").as_deref(), Some("https://www.bolha.com/oglas/1"));
        assert_eq!(first.text("title").as_deref(), Some("Road bike"));
        assert_eq!(first.text("price").as_deref(), Some("300 €"));
        assert_eq!(page.records[1].text("price").as_deref(), Some(""));
    }

    #[test]
    fn test_query_is_first_field() {
        let page = spider()
            .parse_page(PAGE, "https://www.bolha.com/bikes", "bikes")
            .unwrap();
        let first_field = page.records[0].fields().next().map(|(k, _)| k);
        assert_eq!(first_field, Some("query"));
    }

    #[test]
    fn test_queries_and_fields_keep_file_order() {
        let config = Config::parse(
            r#"
            [spiders.bolha]
            row_selector = "li.ad"

            [spiders.bolha.urls]
            zeta = "https://www.bolha.com/zeta"
            alpha = "https://www.bolha.com/alpha"

            [spiders.bolha.fields.url]
            selector = "a.title"
            attr = "href"

            [spiders.bolha.fields.price]
            selector = ".price"
            "#,
        )
        .unwrap();
        let spider = ListingSpider::from_config(
            "bolha",
            &config.spiders["bolha"],
            &config.crawler,
            reqwest::Client::new(),
        )
        .unwrap();

        let queries: Vec<&str> = spider.urls.keys().map(String::as_str).collect();
        assert_eq!(queries, vec!["zeta", "alpha"]);

        let page = spider
            .parse_page(PAGE, "https://www.bolha.com/zeta", "zeta")
            .unwrap();
        let fields: Vec<&str> = page.records[0].fields().map(|(k, _)| k).collect();
        assert_eq!(fields, vec!["query", "url", "price"]);
    }

    #[test]
    fn test_next_page_resolved() {
        let page = spider()
            .parse_page(PAGE, "https://www.bolha.com/bikes", "bikes")
            .unwrap();
        assert_eq!(page.next.as_deref(), Some("https://www.bolha.com/bikes?page=2"));
    }

    #[test]
    fn test_no_rows_no_next() {
        let page = spider()
            .parse_page("<html><body></body></html>", "https://www.bolha.com/bikes", "bikes")
            .unwrap();
        assert!(page.records.is_empty());
        assert!(page.next.is_none());
    }

    #[test]
    fn test_invalid_selector_rejected() {
        let mut config = Config::parse(CONFIG).unwrap();
        let spider_config = config.spiders.get_mut("bolha").unwrap();
        spider_config.settings.insert(
            "row_selector".to_string(),
            toml::Value::String("[[invalid".to_string()),
        );

        let err = ListingSpider::from_config(
            "bolha",
            spider_config,
            &CrawlerConfig::default(),
            reqwest::Client::new(),
        )
        .err()
        .unwrap();
        assert!(matches!(err, AppError::Selector { .. }));
    }

    #[test]
    fn test_missing_row_selector_rejected() {
        let config = Config::parse(
            r#"
            [spiders.empty]
            urls = { all = "https://example.com" }
            "#,
        )
        .unwrap();

        let err = ListingSpider::from_config(
            "empty",
            &config.spiders["empty"],
            &config.crawler,
            reqwest::Client::new(),
        )
        .err()
        .unwrap();
        assert!(err.to_string().contains("row_selector"));
    }

    #[test]
    fn test_max_pages_default() {
        assert_eq!(spider().max_pages, 10);
    }

    #[tokio::test]
    async fn test_unreachable_page_is_collection_error() {
        let config = Config::parse(
            r#"
            [spiders.down]
            urls = { all = "http://127.0.0.1:9/listing" }
            row_selector = "li"
            "#,
        )
        .unwrap();
        let spider = ListingSpider::from_config(
            "down",
            &config.spiders["down"],
            &config.crawler,
            reqwest::Client::new(),
        )
        .unwrap();

        let err = spider.collect().await.unwrap_err();
        assert!(matches!(err, AppError::Collection { ref collector, .. } if collector == "down"));
    }
}
