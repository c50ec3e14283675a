//! Email Service
//!
//! Delivery of rendered emails over SMTP.

use async_trait::async_trait;
use lettre::{
    message::{Mailbox, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use log::{error, info};
use thiserror::Error;

use crate::config::EmailConfig;
use crate::utils::error::{codes, CodedError};

#[derive(Error, Debug)]
pub enum MailError {
    #[error("Invalid email address: {0}")]
    Address(String),

    #[error("Failed to build email message: {0}")]
    Build(String),

    #[error("Failed to send email: {0}")]
    Transport(String),

    #[error("Failed to render email template: {0}")]
    Template(String),
}

impl CodedError for MailError {
    fn code(&self) -> &'static str {
        codes::SERVICE_UNAVAILABLE
    }
}

/// Outgoing mail capability
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), MailError>;
}

/// Mailer backed by an authenticated SMTP relay
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Create a new SMTP mailer
    pub fn new(config: &EmailConfig) -> Result<Self, MailError> {
        let creds = Credentials::new(config.smtp_username.clone(), config.smtp_password.clone());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
            .map_err(|e| MailError::Transport(format!("Failed to configure SMTP relay: {}", e)))?
            .port(config.smtp_port)
            .credentials(creds)
            .build();

        let from = format!("{} <{}>", config.from_name, config.from_email)
            .parse()
            .map_err(|e| MailError::Address(format!("from address: {}", e)))?;

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), MailError> {
        let recipient: Mailbox = to
            .parse()
            .map_err(|e| MailError::Address(format!("recipient: {}", e)))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(recipient)
            .subject(subject)
            .singlepart(SinglePart::html(html_body.to_string()))
            .map_err(|e| MailError::Build(e.to_string()))?;

        match self.transport.send(message).await {
            Ok(_) => {
                info!("Email '{}' sent to {}", subject, to);
                Ok(())
            }
            Err(e) => {
                error!("Failed to send email '{}' to {}: {}", subject, to, e);
                Err(MailError::Transport(e.to_string()))
            }
        }
    }
}

/// Mailer used when SMTP is not configured; logs the envelope and drops
/// the body
#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, _html_body: &str) -> Result<(), MailError> {
        info!("SMTP not configured; email '{}' to {} not delivered", subject, to);
        Ok(())
    }
}
