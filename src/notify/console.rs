//! Log-only transport for dry runs.

use async_trait::async_trait;

use crate::error::Result;
use crate::notify::Transport;

/// Writes every notification to the log instead of delivering it.
#[derive(Debug, Default)]
pub struct ConsoleTransport;

impl ConsoleTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for ConsoleTransport {
    fn channel_name(&self) -> &str {
        "console"
    }

    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()> {
        log::info!("[console] to {}: {}\n{}", recipient, subject, body);
        Ok(())
    }
}
