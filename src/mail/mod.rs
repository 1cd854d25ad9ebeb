//! Outbound mail channel.
//!
//! The dispatcher only sees the [`Mailer`] trait; [`SmtpMailer`] is the
//! production transport.

pub mod smtp;

use async_trait::async_trait;
use thiserror::Error;

pub use smtp::SmtpMailer;

/// A single-recipient message carrying both plain-text and HTML bodies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid address '{address}': {source}")]
    InvalidAddress {
        address: String,
        #[source]
        source: lettre::address::AddressError,
    },

    #[error("failed to build email: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutboundEmail) -> Result<(), MailError>;
}

/// SMTP connection settings read at startup.
#[derive(Clone)]
pub struct MailSettings {
    pub server: String,
    pub port: u16,
    pub use_tls: bool,
    pub username: String,
    pub password: String,
    pub default_sender: String,
}
