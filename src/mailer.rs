use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;

/// Outbound email port. The workflow engine never talks to a transport
/// directly; tests inject a recording fake here.
#[async_trait]
pub trait Mailer: Send + Sync + 'static {
    async fn send_email(&self, to: &str, subject: &str, html: &str) -> Result<()>;
}

/// Delivers through an HTTP mail API: one JSON POST per message, optionally
/// authorized with a bearer key.
pub struct HttpMailer {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpMailer {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            api_key,
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send_email(&self, to: &str, subject: &str, html: &str) -> Result<()> {
        let mut request = self.client.post(&self.endpoint).json(&serde_json::json!({
            "to": to,
            "subject": subject,
            "html": html,
        }));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .context("failed to reach mail endpoint")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("mail endpoint returned {status}: {body}");
        }

        Ok(())
    }
}

/// Fallback when no mail endpoint is configured: logs the message instead of
/// delivering it. Useful for local development.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_email(&self, to: &str, subject: &str, _html: &str) -> Result<()> {
        tracing::info!(to = %to, subject = %subject, "mail endpoint not configured, dropping email");
        Ok(())
    }
}
