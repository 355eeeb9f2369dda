// src/pipeline/orchestrator.rs

//! One scrape run: collect, diff, dispatch and persist per collector.
//!
//! Each collector moves through
//! `Collecting → Diffing → Dispatching → Persisting → Done`, or ends in
//! `Failed` at the stage that broke. Collectors never affect each other.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};

use crate::error::{AppError, Result};
use crate::models::{ChannelConfig, Config, Delta, Record};
use crate::notify::TransportRegistry;
use crate::pipeline::diff::diff;
use crate::pipeline::dispatch::{DispatchResult, NotificationDispatcher};
use crate::services::{Collector, CollectorRegistry};
use crate::storage::{HistoryStore, JsonCacheStore};
use crate::utils::http::create_async_client;

/// Stage of one collector within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorState {
    Collecting,
    Diffing,
    Dispatching,
    Persisting,
    Done,
    Failed,
}

impl CollectorState {
    pub fn is_terminal(self) -> bool {
        matches!(self, CollectorState::Done | CollectorState::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CollectorState::Collecting => "collecting",
            CollectorState::Diffing => "diffing",
            CollectorState::Dispatching => "dispatching",
            CollectorState::Persisting => "persisting",
            CollectorState::Done => "done",
            CollectorState::Failed => "failed",
        }
    }
}

impl fmt::Display for CollectorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to one collector during a run.
#[derive(Debug, Clone)]
pub struct CollectorOutcome {
    pub collector: String,
    pub state: CollectorState,
    /// Stage at which the collector failed
    pub failed_at: Option<CollectorState>,
    pub error: Option<String>,
    /// Records not seen in any earlier run
    pub new_records: Vec<Record>,
    pub deliveries: Vec<DispatchResult>,
    pub persisted: bool,
}

impl CollectorOutcome {
    fn new(collector: &str) -> Self {
        Self {
            collector: collector.to_string(),
            state: CollectorState::Collecting,
            failed_at: None,
            error: None,
            new_records: Vec::new(),
            deliveries: Vec::new(),
            persisted: false,
        }
    }

    fn advance(&mut self, next: CollectorState) {
        log::debug!("{}: {} -> {}", self.collector, self.state, next);
        self.state = next;
    }

    fn fail(mut self, error: impl fmt::Display) -> Self {
        log::warn!("{}: failed while {}: {}", self.collector, self.state, error);
        self.failed_at = Some(self.state);
        self.error = Some(error.to_string());
        self.state = CollectorState::Failed;
        self
    }

    pub fn is_failed(&self) -> bool {
        self.state == CollectorState::Failed
    }
}

/// Result of one run over all selected collectors.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// One outcome per collector, in collector order
    pub outcomes: Vec<CollectorOutcome>,
}

impl RunReport {
    /// New records per collector, including collectors without any.
    pub fn delta(&self) -> Delta {
        self.outcomes
            .iter()
            .map(|o| (o.collector.clone(), o.new_records.clone()))
            .collect()
    }

    /// Names of collectors that ended in `Failed`.
    pub fn failed(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| o.is_failed())
            .map(|o| o.collector.as_str())
            .collect()
    }

    pub fn new_count(&self) -> usize {
        self.outcomes.iter().map(|o| o.new_records.len()).sum()
    }

    pub fn outcome(&self, collector: &str) -> Option<&CollectorOutcome> {
        self.outcomes.iter().find(|o| o.collector == collector)
    }

    pub fn log_summary(&self) {
        let failed = self.failed();
        let elapsed = self.finished_at - self.started_at;
        crate::utils::log::summary(
            "Scrape run complete",
            &[
                ("Collectors", self.outcomes.len().to_string()),
                ("New items", self.new_count().to_string()),
                (
                    "Failed",
                    if failed.is_empty() {
                        "none".to_string()
                    } else {
                        failed.join(", ")
                    },
                ),
                ("Duration", format!("{} ms", elapsed.num_milliseconds())),
            ],
        );
    }
}

/// A collector and the channels its new records go to.
struct Job {
    collector: Box<dyn Collector>,
    channels: BTreeMap<String, ChannelConfig>,
}

/// Drives collectors through one run.
pub struct Orchestrator {
    jobs: Vec<Job>,
    store: Arc<dyn HistoryStore>,
    dispatcher: NotificationDispatcher,
    concurrency: usize,
}

impl Orchestrator {
    /// Create an orchestrator without collectors.
    pub fn new(store: Arc<dyn HistoryStore>, dispatcher: NotificationDispatcher) -> Self {
        Self {
            jobs: Vec::new(),
            store,
            dispatcher,
            concurrency: 1,
        }
    }

    /// Build collectors, transports and the history store from a configuration
    /// using the built-in registries.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::with_registries(
            config,
            &CollectorRegistry::with_builtin(),
            &TransportRegistry::with_builtin(),
        )
    }

    /// Build from a configuration with custom registries.
    pub fn with_registries(
        config: &Config,
        collectors: &CollectorRegistry,
        transports: &TransportRegistry,
    ) -> Result<Self> {
        config.validate()?;
        let client = create_async_client(&config.crawler)?;

        let transports = transports.resolve(config, &client)?;
        let dispatcher = NotificationDispatcher::with_settings(transports, &config.notifications);
        let store: Arc<dyn HistoryStore> = Arc::new(JsonCacheStore::new(&config.cache.dir));

        let mut orchestrator =
            Self::new(store, dispatcher).with_concurrency(config.crawler.max_concurrent);
        for collector in collectors.resolve(config, &client)? {
            let channels = config
                .spiders
                .get(collector.name())
                .map(|spider| spider.notifications.clone())
                .unwrap_or_default();
            orchestrator.add(collector, channels);
        }

        Ok(orchestrator)
    }

    /// Collectors processed at the same time (at least 1).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Add a collector with its notification channels.
    pub fn add(&mut self, collector: Box<dyn Collector>, channels: BTreeMap<String, ChannelConfig>) {
        self.jobs.push(Job {
            collector,
            channels,
        });
    }

    pub fn collector_names(&self) -> Vec<&str> {
        self.jobs.iter().map(|job| job.collector.name()).collect()
    }

    /// Run every collector.
    pub async fn run(&self) -> RunReport {
        let jobs: Vec<&Job> = self.jobs.iter().collect();
        self.run_jobs(jobs).await
    }

    /// Run only the named collectors; an empty selection runs all of them.
    pub async fn run_selected(&self, names: &[String]) -> Result<RunReport> {
        if names.is_empty() {
            return Ok(self.run().await);
        }

        let known = self.collector_names();
        if let Some(unknown) = names.iter().find(|name| !known.contains(&name.as_str())) {
            return Err(AppError::config(format!("unknown spider '{unknown}'")));
        }

        let jobs: Vec<&Job> = self
            .jobs
            .iter()
            .filter(|job| names.iter().any(|name| name == job.collector.name()))
            .collect();
        Ok(self.run_jobs(jobs).await)
    }

    async fn run_jobs(&self, jobs: Vec<&Job>) -> RunReport {
        let started_at = Utc::now();
        log::info!(
            "Running {} collectors (concurrency {})",
            jobs.len(),
            self.concurrency
        );

        let outcomes = stream::iter(jobs)
            .map(|job| self.process(job))
            .buffered(self.concurrency)
            .collect::<Vec<_>>()
            .await;

        RunReport {
            started_at,
            finished_at: Utc::now(),
            outcomes,
        }
    }

    async fn process(&self, job: &Job) -> CollectorOutcome {
        let name = job.collector.name();
        let mut outcome = CollectorOutcome::new(name);

        let fresh = match job.collector.collect().await {
            Ok(records) => records,
            Err(e) => return outcome.fail(e),
        };

        outcome.advance(CollectorState::Diffing);
        let history = match self.store.load(name).await {
            Ok(records) => records,
            Err(e) => return outcome.fail(e),
        };
        outcome.new_records = diff(&history, &fresh);
        log::info!(
            "{}: {} collected, {} new",
            name,
            fresh.len(),
            outcome.new_records.len()
        );
        if outcome.new_records.is_empty() {
            outcome.advance(CollectorState::Done);
            return outcome;
        }

        outcome.advance(CollectorState::Dispatching);
        outcome.deliveries = self
            .dispatcher
            .dispatch(name, &outcome.new_records, &job.channels)
            .await;
        let delivered = outcome.deliveries.is_empty() || outcome.deliveries.iter().any(|d| d.success);
        if !delivered {
            let count = outcome.deliveries.len();
            return outcome.fail(format!("all {count} notification channels failed"));
        }

        outcome.advance(CollectorState::Persisting);
        let mut updated = history;
        updated.extend(outcome.new_records.iter().cloned());
        if let Err(e) = self.store.persist(name, &updated).await {
            return outcome.fail(e);
        }
        outcome.persisted = true;

        outcome.advance(CollectorState::Done);
        outcome
    }
}
