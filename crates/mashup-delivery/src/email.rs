//! SMTP delivery of finished mashups.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

use crate::artifact::DeliveryArtifact;
use crate::error::{DeliveryError, DeliveryResult};
use crate::transport::Transport;

pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
/// Implicit TLS submission port.
pub const DEFAULT_SMTP_PORT: u16 = 465;

pub const DEFAULT_SUBJECT: &str = "Your Mashup is Ready!";

const DEFAULT_BODY: &str = "Hi!\n\n\
Your mashup has been generated successfully.\n\
Please find the mashup audio attached as a ZIP file.\n\n\
Enjoy listening!\n\
Mashup Generator";

/// SMTP settings.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    /// Sender address, also the SMTP username
    pub address: Option<String>,
    pub password: Option<String>,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub subject: String,
    pub body: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            address: None,
            password: None,
            smtp_host: DEFAULT_SMTP_HOST.to_string(),
            smtp_port: DEFAULT_SMTP_PORT,
            subject: DEFAULT_SUBJECT.to_string(),
            body: DEFAULT_BODY.to_string(),
        }
    }
}

impl EmailConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            address: std::env::var("EMAIL_ADDRESS").ok().filter(|s| !s.trim().is_empty()),
            password: std::env::var("EMAIL_PASSWORD").ok().filter(|s| !s.is_empty()),
            smtp_host: std::env::var("SMTP_HOST").unwrap_or_else(|_| DEFAULT_SMTP_HOST.to_string()),
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            ..Default::default()
        }
    }

    pub fn is_configured(&self) -> bool {
        self.address.is_some() && self.password.is_some()
    }

    /// Port 465 speaks TLS from the first byte; other ports upgrade with STARTTLS.
    pub fn uses_implicit_tls(&self) -> bool {
        self.smtp_port == DEFAULT_SMTP_PORT
    }

    fn credentials(&self) -> DeliveryResult<(&str, &str)> {
        match (self.address.as_deref(), self.password.as_deref()) {
            (Some(address), Some(password)) => Ok((address, password)),
            _ => Err(DeliveryError::not_configured(
                "set EMAIL_ADDRESS and EMAIL_PASSWORD",
            )),
        }
    }
}

/// Sends an artifact as an email attachment.
#[derive(Debug, Clone)]
pub struct EmailTransport {
    config: EmailConfig,
}

impl EmailTransport {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EmailConfig {
        &self.config
    }

    fn mailer(
        &self,
        address: &str,
        password: &str,
    ) -> DeliveryResult<AsyncSmtpTransport<Tokio1Executor>> {
        let host = &self.config.smtp_host;
        let builder = if self.config.uses_implicit_tls() {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
        }
        .map_err(|e| DeliveryError::email(e.to_string()))?;

        Ok(builder
            .port(self.config.smtp_port)
            .credentials(Credentials::new(address.to_string(), password.to_string()))
            .build())
    }

    /// Build the message without sending it.
    pub fn compose(&self, artifact: &DeliveryArtifact, recipient: &str) -> DeliveryResult<Message> {
        let (address, _) = self.config.credentials()?;
        let from: Mailbox = address
            .parse()
            .map_err(|_| DeliveryError::InvalidAddress(address.to_string()))?;
        let to: Mailbox = recipient
            .trim()
            .parse()
            .map_err(|_| DeliveryError::InvalidAddress(recipient.to_string()))?;
        let content_type = ContentType::parse(artifact.content_type())
            .map_err(|e| DeliveryError::email(e.to_string()))?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(self.config.subject.clone())
            .multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::plain(self.config.body.clone()))
                    .singlepart(
                        Attachment::new(artifact.filename().to_string())
                            .body(artifact.bytes().to_vec(), content_type),
                    ),
            )
            .map_err(|e| DeliveryError::email(e.to_string()))
    }
}

#[async_trait]
impl Transport for EmailTransport {
    type Destination = str;

    fn name(&self) -> &'static str {
        "email"
    }

    async fn send(&self, artifact: &DeliveryArtifact, recipient: &str) -> DeliveryResult<()> {
        let message = self.compose(artifact, recipient)?;
        let (address, password) = self.config.credentials()?;

        self.mailer(address, password)?
            .send(message)
            .await
            .map_err(|e| DeliveryError::email(e.to_string()))?;

        info!(
            recipient = %recipient.trim(),
            attachment = %artifact.filename(),
            "Mashup emailed"
        );
        Ok(())
    }
}
