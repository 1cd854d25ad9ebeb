use anyhow::{anyhow, Context};
use chrono_tz::Tz;
use std::sync::Arc;

use crate::{
    mail::MailSettings,
    notification::{DigestSchedule, NotificationDispatcher},
    task::TaskService,
    user::UserRepository,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub user_repository: UserRepository,
    pub task_service: TaskService,
    pub dispatcher: Arc<NotificationDispatcher>,
}

#[derive(Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub app_url: String,
    pub enable_scheduler: bool,
    pub schedule: DigestSchedule,
    pub mail: MailSettings,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup; missing keys fall back
    /// to the documented defaults.
    pub fn from_vars<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let jwt_secret = var("JWT_SECRET").ok_or_else(|| anyhow!("JWT_SECRET must be set"))?;

        let app_url = var("APP_URL")
            .unwrap_or_else(|| "http://localhost:3000".to_string())
            .trim_end_matches('/')
            .to_string();

        let hour: u32 = var("DIGEST_HOUR")
            .unwrap_or_else(|| "8".to_string())
            .parse()
            .context("DIGEST_HOUR must be a number")?;
        let minute: u32 = var("DIGEST_MINUTE")
            .unwrap_or_else(|| "0".to_string())
            .parse()
            .context("DIGEST_MINUTE must be a number")?;
        let timezone_name = var("DIGEST_TIMEZONE").unwrap_or_else(|| "UTC".to_string());
        let timezone: Tz = timezone_name
            .parse()
            .map_err(|e| anyhow!("DIGEST_TIMEZONE '{}' is not a known zone: {}", timezone_name, e))?;
        let schedule = DigestSchedule::new(hour, minute, timezone)?;

        let username = var("MAIL_USERNAME").unwrap_or_default();
        let mail = MailSettings {
            server: var("MAIL_SERVER").unwrap_or_else(|| "smtp.gmail.com".to_string()),
            port: var("MAIL_PORT")
                .unwrap_or_else(|| "587".to_string())
                .parse()
                .context("MAIL_PORT must be a port number")?,
            use_tls: var("MAIL_USE_TLS").map(|v| is_truthy(&v)).unwrap_or(true),
            password: var("MAIL_PASSWORD").unwrap_or_default(),
            default_sender: var("MAIL_DEFAULT_SENDER").unwrap_or_else(|| username.clone()),
            username,
        };

        Ok(Self {
            jwt_secret,
            app_url,
            enable_scheduler: var("ENABLE_SCHEDULER").map(|v| is_truthy(&v)).unwrap_or(false),
            schedule,
            mail,
        })
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "true" | "on" | "1")
}
