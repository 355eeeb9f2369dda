//! Pushover push-notification transport.
//!
//! Each message is a form POST to the Pushover messages API, addressed to
//! one user key. Message bodies are limited to 1024 characters.

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::PushoverConfig;
use crate::notify::Transport;
use crate::utils::resolve_env;

/// Sends notifications through the Pushover API.
#[derive(Debug)]
pub struct PushoverTransport {
    app_token: String,
    api_url: String,
    client: reqwest::Client,
}

impl PushoverTransport {
    /// Maximum message length accepted by Pushover.
    pub const MESSAGE_LIMIT: usize = 1024;

    /// Build from settings; `${VAR}` tokens are resolved from the environment.
    pub fn from_config(config: &PushoverConfig, client: reqwest::Client) -> Result<Self> {
        let app_token = resolve_env(&config.app_token)?;
        if app_token.is_empty() {
            return Err(AppError::config("Pushover app token must not be empty"));
        }

        Ok(Self {
            app_token,
            api_url: config.api_url.clone(),
            client,
        })
    }
}

#[async_trait]
impl Transport for PushoverTransport {
    fn channel_name(&self) -> &str {
        "pushover"
    }

    fn max_message_size(&self) -> usize {
        Self::MESSAGE_LIMIT
    }

    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()> {
        let form = [
            ("token", self.app_token.as_str()),
            ("user", recipient),
            ("title", subject),
            ("message", body),
        ];

        self.client
            .post(&self.api_url)
            .form(&form)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| AppError::transport(self.channel_name(), e))?;

        log::debug!("Pushover message delivered to {}", recipient);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    fn settings(api_url: &str) -> PushoverConfig {
        PushoverConfig {
            app_token: "app-token".to_string(),
            api_url: api_url.to_string(),
        }
    }

    /// Accept one HTTP request, answer with `status`, return the raw request.
    async fn serve_once(status: u16) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&chunk[..n]);

                let text = String::from_utf8_lossy(&request).to_string();
                if let Some(end) = text.find("\r\n\r\n") {
                    let content_length = text[..end]
                        .lines()
                        .find_map(|line| {
                            line.to_ascii_lowercase()
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().to_string())
                        })
                        .and_then(|v| v.parse::<usize>().ok())
                        .unwrap_or(0);
                    if request.len() >= end + 4 + content_length {
                        break;
                    }
                }
            }

            let response = format!(
                "HTTP/1.1 {status} Test\r\ncontent-length: 2\r\nconnection: close\r\n\r\n{{}}"
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            String::from_utf8_lossy(&request).to_string()
        });

        (format!("http://{addr}/1/messages.json"), handle)
    }

    #[test]
    fn test_limit_and_name() {
        let transport =
            PushoverTransport::from_config(&settings("http://localhost"), reqwest::Client::new())
                .unwrap();
        assert_eq!(transport.channel_name(), "pushover");
        assert_eq!(transport.max_message_size(), 1024);
    }

    #[test]
    fn test_empty_token_rejected() {
        let mut config = settings("http://localhost");
        config.app_token = String::new();
        assert!(PushoverTransport::from_config(&config, reqwest::Client::new()).is_err());
    }

    #[tokio::test]
    async fn test_send_posts_form() {
        let (url, server) = serve_once(200).await;
        let transport = PushoverTransport::from_config(&settings(&url), reqwest::Client::new())
            .unwrap();

        transport
            .send("user-key", "bolha news", "new bike")
            .await
            .unwrap();

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /1/messages.json"));
        assert!(request.contains("token=app-token"));
        assert!(request.contains("user=user-key"));
        assert!(request.contains("title=bolha+news"));
        assert!(request.contains("message=new+bike"));
    }

    #[tokio::test]
    async fn test_error_status_is_transport_error() {
        let (url, server) = serve_once(500).await;
        let transport = PushoverTransport::from_config(&settings(&url), reqwest::Client::new())
            .unwrap();

        let err = transport.send("user-key", "s", "b").await.unwrap_err();
        assert!(matches!(err, AppError::Transport { .. }));
        server.await.unwrap();
    }
}
