use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::MailgunConfig;

pub mod templates;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("mail transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("mail provider rejected message ({status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Outbound email delivery.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), MailError>;
}

/// Sends through the Mailgun messages API.
#[derive(Clone)]
pub struct MailgunMailer {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    from: String,
}

#[derive(Debug, Deserialize)]
struct MailgunResponse {
    id: Option<String>,
}

impl MailgunMailer {
    pub fn new(cfg: &MailgunConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: format!(
                "{}/v3/{}/messages",
                cfg.base_url.trim_end_matches('/'),
                cfg.domain
            ),
            api_key: cfg.api_key.clone(),
            from: cfg.from.clone(),
        }
    }
}

#[async_trait]
impl Mailer for MailgunMailer {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), MailError> {
        let form = [
            ("from", self.from.as_str()),
            ("to", to),
            ("subject", subject),
            ("html", html),
        ];
        let res = self
            .client
            .post(&self.endpoint)
            .basic_auth("api", Some(&self.api_key))
            .form(&form)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(MailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        // The status already says the message was queued; the body is only for the log.
        let body = match res.text().await {
            Ok(body) => body,
            Err(e) => {
                debug!(error = %e, "could not read mailgun response body");
                String::new()
            }
        };
        info!(to = %to, id = ?accepted_message_id(&body), "mail accepted by mailgun");
        Ok(())
    }
}

/// Message id from an accepted Mailgun response, if the body carries one.
fn accepted_message_id(body: &str) -> Option<String> {
    match serde_json::from_str::<MailgunResponse>(body) {
        Ok(parsed) => parsed.id,
        Err(e) => {
            debug!(error = %e, "mailgun response body is not JSON");
            None
        }
    }
}

/// Writes messages to the log instead of sending them.
#[derive(Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), MailError> {
        info!(to = %to, subject = %subject, bytes = html.len(), "mail not sent (log backend)");
        Ok(())
    }
}
