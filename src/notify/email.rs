use anyhow::{bail, Context, Result};
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};

use super::{render, Notifier, TokenAlert};
use crate::config::SmtpConfig;

/// One message per alert, addressed to every configured recipient.
pub struct EmailSender {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Vec<Mailbox>,
}

impl EmailSender {
    /// Port 465 uses implicit TLS; anything else uses STARTTLS.
    pub fn from_config(cfg: &SmtpConfig) -> Result<Self> {
        let from: Mailbox = cfg
            .username
            .trim()
            .parse()
            .with_context(|| format!("invalid sender address {:?}", cfg.username))?;
        let to = parse_recipients(&cfg.recipients)?;

        let builder = if cfg.port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.host)
        }
        .with_context(|| format!("invalid SMTP host {:?}", cfg.host))?;

        let mailer = builder
            .port(cfg.port)
            .credentials(Credentials::new(
                cfg.username.trim().to_string(),
                cfg.password.clone(),
            ))
            .build();

        Ok(Self { mailer, from, to })
    }

    pub fn build_message(&self, alert: &TokenAlert) -> Result<Message> {
        let mut b = Message::builder().from(self.from.clone());
        for rcpt in &self.to {
            b = b.to(rcpt.clone());
        }
        b.subject(render::subject(alert))
            .header(header::ContentType::TEXT_PLAIN)
            .body(render::body(alert))
            .context("build email")
    }
}

fn parse_recipients(list: &[String]) -> Result<Vec<Mailbox>> {
    let to = list
        .iter()
        .map(|a| {
            a.trim()
                .parse::<Mailbox>()
                .with_context(|| format!("invalid recipient {a:?}"))
        })
        .collect::<Result<Vec<_>>>()?;
    if to.is_empty() {
        bail!("at least one recipient is required (TO_EMAILS)");
    }
    Ok(to)
}

#[async_trait::async_trait]
impl Notifier for EmailSender {
    async fn send(&self, alert: &TokenAlert) -> Result<()> {
        let msg = self.build_message(alert)?;
        self.mailer.send(msg).await.context("send email")?;
        tracing::info!(
            id = %alert.item.id(),
            recipients = self.to.len(),
            "alert email delivered"
        );
        Ok(())
    }

    fn channel_name(&self) -> &'static str {
        "email"
    }
}
