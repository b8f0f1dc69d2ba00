//! Zoho Cliq notifications for run results.
//!
//! Messages go to a channel webhook, e.g.
//! `https://cliq.zoho.com/api/v2/channelsbyname/{channel}/message?zapikey=...`.

use chrono::{Local, NaiveDateTime};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;
use tracing::{error, info};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Error type for notification delivery.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Cliq rejected the message with status {status}: {body}")]
    Rejected { status: StatusCode, body: String },
}

/// Extra information appended to a notification.
#[derive(Debug, Clone, PartialEq)]
pub enum Details {
    Text(String),
    /// Rendered as a bulleted `key: value` list.
    Fields(Vec<(String, String)>),
}

/// Notification flavour; decides header, card title, color and footer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Error,
    Success,
    Alert,
}

impl NoticeKind {
    fn header(&self) -> &'static str {
        match self {
            NoticeKind::Error => "🚨 **ERRO**",
            NoticeKind::Success => "✅ **SUCESSO**",
            NoticeKind::Alert => "⚠️ **ALERTA**",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            NoticeKind::Error => "❌ Erro Detectado",
            NoticeKind::Success => "✅ Operação Concluída",
            NoticeKind::Alert => "⚠️ Alerta",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            NoticeKind::Error => "#ff0000",
            NoticeKind::Success => "#00ff00",
            NoticeKind::Alert => "#ffa500",
        }
    }

    fn footer(&self) -> &'static str {
        match self {
            NoticeKind::Error => "Ocorrido em",
            NoticeKind::Success => "Concluído em",
            NoticeKind::Alert => "Gerado em",
        }
    }
}

/// Render the message body of a notification.
pub fn format_notice(
    kind: NoticeKind,
    message: &str,
    details: Option<&Details>,
    at: NaiveDateTime,
) -> String {
    let mut text = format!("{}: {}\n\n", kind.header(), message);

    match details {
        Some(Details::Fields(fields)) if !fields.is_empty() => {
            text.push_str("**Detalhes:**\n");
            for (key, value) in fields {
                text.push_str(&format!("- {}: {}\n", key, value));
            }
        }
        Some(Details::Text(detail)) if !detail.is_empty() => {
            text.push_str(&format!("**Detalhes:** {}", detail));
        }
        _ => {}
    }

    text.push_str(&format!(
        "\n⏰ {}: {}",
        kind.footer(),
        at.format("%Y-%m-%d %H:%M:%S")
    ));
    text
}

#[derive(Debug, Serialize)]
struct Card<'a> {
    title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    theme: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct Payload<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    card: Option<Card<'a>>,
}

fn build_payload<'a>(text: &'a str, title: Option<&'a str>, color: Option<&'a str>) -> Payload<'a> {
    Payload {
        text,
        card: title.map(|title| Card { title, theme: color }),
    }
}

/// Client for a Cliq channel webhook.
#[derive(Clone)]
pub struct CliqNotifier {
    client: Client,
    webhook_url: String,
}

impl CliqNotifier {
    /// Create a notifier for a channel webhook URL.
    pub fn new(webhook_url: &str) -> Result<Self, NotifyError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            webhook_url: webhook_url.to_string(),
        })
    }

    /// Post a message. The card (title and side color) is only sent with a title.
    pub async fn send(
        &self,
        text: &str,
        title: Option<&str>,
        color: Option<&str>,
    ) -> Result<(), NotifyError> {
        let payload = build_payload(text, title, color);
        let response = self
            .client
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            error!("Cliq rejected message. Status: {}, Response: {}", status, body);
            return Err(NotifyError::Rejected { status, body });
        }

        info!("Message sent to Cliq");
        Ok(())
    }

    async fn notify(
        &self,
        kind: NoticeKind,
        message: &str,
        details: Option<&Details>,
    ) -> Result<(), NotifyError> {
        let text = format_notice(kind, message, details, Local::now().naive_local());
        self.send(&text, Some(kind.title()), Some(kind.color())).await
    }

    pub async fn notify_error(
        &self,
        message: &str,
        details: Option<&Details>,
    ) -> Result<(), NotifyError> {
        self.notify(NoticeKind::Error, message, details).await
    }

    pub async fn notify_success(
        &self,
        message: &str,
        details: Option<&Details>,
    ) -> Result<(), NotifyError> {
        self.notify(NoticeKind::Success, message, details).await
    }

    pub async fn notify_alert(
        &self,
        message: &str,
        details: Option<&Details>,
    ) -> Result<(), NotifyError> {
        self.notify(NoticeKind::Alert, message, details).await
    }
}
