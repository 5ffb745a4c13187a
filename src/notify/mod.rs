// src/notify/mod.rs
pub mod email;
pub mod render;

use anyhow::Result;

use crate::config::SmtpConfig;
use crate::ingest::types::Item;

/// Everything a channel needs to describe one qualifying token.
#[derive(Debug, Clone)]
pub struct TokenAlert {
    pub item: Item,
    pub analysis: String,
    pub threshold: f64,
}

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, alert: &TokenAlert) -> Result<()>;
    fn channel_name(&self) -> &'static str;
}

/// Used when no SMTP account is configured: the alert only goes to the log.
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, alert: &TokenAlert) -> Result<()> {
        tracing::info!(
            id = %alert.item.id(),
            subject = %render::subject(alert),
            "email disabled, alert logged only"
        );
        Ok(())
    }

    fn channel_name(&self) -> &'static str {
        "log"
    }
}

/// SMTP when configured, otherwise the log channel.
pub fn build_notifier(cfg: &SmtpConfig) -> Result<Box<dyn Notifier>> {
    if !cfg.is_enabled() {
        tracing::warn!("EMAIL_ADDRESS not set, alerts will only be logged");
        return Ok(Box::new(LogNotifier));
    }
    Ok(Box::new(email::EmailSender::from_config(cfg)?))
}
