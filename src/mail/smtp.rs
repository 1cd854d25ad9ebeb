use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::{MailError, MailSettings, Mailer, OutboundEmail};

/// Sends mail through a pooled async SMTP transport.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
}

impl SmtpMailer {
    /// Fails when the sender address cannot be parsed.
    pub fn new(settings: &MailSettings) -> Result<Self, MailError> {
        let sender = parse_mailbox(&settings.default_sender)?;

        let builder = if settings.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.server)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(settings.server.as_str())
        };

        let builder = builder.port(settings.port);
        let builder = if settings.username.is_empty() {
            builder
        } else {
            builder.credentials(Credentials::new(
                settings.username.clone(),
                settings.password.clone(),
            ))
        };

        Ok(Self {
            transport: builder.build(),
            sender,
        })
    }

    fn build_message(&self, email: &OutboundEmail) -> Result<Message, MailError> {
        let to = parse_mailbox(&email.to)?;

        let message = Message::builder()
            .from(self.sender.clone())
            .to(to)
            .subject(email.subject.as_str())
            .multipart(MultiPart::alternative_plain_html(
                email.text_body.clone(),
                email.html_body.clone(),
            ))?;

        Ok(message)
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
    address.parse().map_err(|source| MailError::InvalidAddress {
        address: address.to_string(),
        source,
    })
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<(), MailError> {
        let message = self.build_message(email)?;
        self.transport.send(message).await?;
        tracing::debug!(to = %email.to, "email handed to SMTP relay");
        Ok(())
    }
}
