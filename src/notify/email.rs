//! SMTP email transport via `lettre`.
//!
//! Each message becomes one plain-text mail to one recipient. Mail bodies
//! have no practical size limit, so items are packed into a single message.

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor, message::Mailbox,
    message::header::ContentType, transport::smtp::authentication::Credentials,
};

use crate::error::{AppError, Result};
use crate::models::EmailConfig;
use crate::notify::Transport;
use crate::utils::resolve_env;

/// Sends notifications as emails via SMTP.
#[derive(Debug)]
pub struct EmailTransport {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl EmailTransport {
    /// Build an `EmailTransport` from SMTP settings.
    ///
    /// Port defaults to 587 (STARTTLS); 465 uses implicit TLS. Username and
    /// password may be `${VAR}` references. The sender defaults to the
    /// username when `from` is not set.
    pub fn from_config(config: &EmailConfig) -> Result<Self> {
        let username = config.username.as_deref().map(resolve_env).transpose()?;
        let password = config.password.as_deref().map(resolve_env).transpose()?;

        let from = config
            .from
            .as_deref()
            .map(resolve_env)
            .transpose()?
            .or_else(|| username.clone())
            .ok_or_else(|| AppError::config("email channel needs 'from' or 'username'"))?;
        let from: Mailbox = from
            .parse()
            .map_err(|e: lettre::address::AddressError| AppError::config(e.to_string()))?;

        let port = config.smtp_port.unwrap_or(587);
        let mut builder = if port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
                .map_err(|e| AppError::config(e.to_string()))?
                .port(port)
        } else if config.tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
                .map_err(|e| AppError::config(e.to_string()))?
                .port(port)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host).port(port)
        };

        if let (Some(username), Some(password)) = (username, password) {
            builder = builder.credentials(Credentials::new(username, password));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl Transport for EmailTransport {
    fn channel_name(&self) -> &str {
        "email"
    }

    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()> {
        let to: Mailbox = recipient
            .parse()
            .map_err(|e: lettre::address::AddressError| AppError::transport("email", e))?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| AppError::transport("email", e))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| AppError::transport("email", e))?;

        log::debug!("Email '{}' delivered to {}", subject, recipient);
        Ok(())
    }
}
