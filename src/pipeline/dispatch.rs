//! Routes new records to the channels configured for a collector.
//!
//! Every channel renders the records with its own template, packs the
//! rendered text under its own size limit and sends the resulting messages
//! to each recipient. Channels are attempted independently: a template or
//! transport failure on one channel never stops the others.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{AppError, Result};
use crate::models::{ChannelConfig, MessageTemplate, NotificationConfig, Record};
use crate::notify::{Transport, Transports};
use crate::pipeline::packetize::Packing;

/// Result of dispatching one collector's records to a single channel.
#[derive(Debug, Clone)]
pub struct DispatchResult {
    pub channel: String,
    pub success: bool,
    pub error: Option<String>,
    /// Transport calls that completed (messages × recipients)
    pub messages_sent: usize,
    pub duration_ms: u64,
}

/// Fans new records out to notification channels.
pub struct NotificationDispatcher {
    transports: Transports,
    subject: String,
    send_timeout: Duration,
}

impl NotificationDispatcher {
    /// Create a dispatcher with default notification settings.
    pub fn new(transports: Transports) -> Self {
        Self::with_settings(transports, &NotificationConfig::default())
    }

    /// Create a dispatcher with explicit notification settings.
    pub fn with_settings(transports: Transports, settings: &NotificationConfig) -> Self {
        Self {
            transports,
            subject: settings.subject.clone(),
            send_timeout: settings.send_timeout(),
        }
    }

    /// Deliver `items` through every channel in `channels`.
    ///
    /// Returns one result per channel, in channel name order.
    pub async fn dispatch(
        &self,
        collector: &str,
        items: &[Record],
        channels: &BTreeMap<String, ChannelConfig>,
    ) -> Vec<DispatchResult> {
        let mut results = Vec::with_capacity(channels.len());

        for (name, config) in channels {
            let start = Instant::now();
            let mut messages_sent = 0;
            let outcome = self
                .deliver(collector, items, name, config, &mut messages_sent)
                .await;
            let duration_ms = start.elapsed().as_millis() as u64;

            let (success, error) = match outcome {
                Ok(()) => {
                    log::info!(
                        "{}: {} new items delivered via {} ({} messages, {} ms)",
                        collector,
                        items.len(),
                        name,
                        messages_sent,
                        duration_ms
                    );
                    (true, None)
                }
                Err(e) => {
                    log::warn!(
                        "{}: delivery via {} failed after {} messages: {}",
                        collector,
                        name,
                        messages_sent,
                        e
                    );
                    (false, Some(e.to_string()))
                }
            };

            results.push(DispatchResult {
                channel: name.clone(),
                success,
                error,
                messages_sent,
                duration_ms,
            });
        }

        results
    }

    async fn deliver(
        &self,
        collector: &str,
        items: &[Record],
        name: &str,
        config: &ChannelConfig,
        messages_sent: &mut usize,
    ) -> Result<()> {
        let transport = self
            .transports
            .get(name)
            .ok_or_else(|| AppError::config(format!("unknown notification channel '{name}'")))?;

        let body = MessageTemplate::parse(&config.message_body_format)?;
        let subject = MessageTemplate::parse(config.subject.as_deref().unwrap_or(&self.subject))?
            .render_subject(collector)?;

        let texts = items
            .iter()
            .map(|record| body.render(record))
            .collect::<Result<Vec<_>>>()?;

        let limit = config
            .message_size_limit
            .unwrap_or_else(|| transport.max_message_size());
        let messages = Packing::for_channel(config.send_separately, limit).pack(&texts);

        log::debug!(
            "{}: {} items packed into {} messages for {} (limit {})",
            collector,
            texts.len(),
            messages.len(),
            name,
            limit
        );

        for message in &messages {
            for recipient in &config.recipients {
                self.send(transport, recipient, &subject, message).await?;
                *messages_sent += 1;
            }
        }

        Ok(())
    }

    async fn send(
        &self,
        transport: &Arc<dyn Transport>,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<()> {
        tokio::time::timeout(self.send_timeout, transport.send(recipient, subject, body))
            .await
            .map_err(|_| {
                AppError::transport(
                    transport.channel_name(),
                    format!("timed out after {:?}", self.send_timeout),
                )
            })?
    }
}
