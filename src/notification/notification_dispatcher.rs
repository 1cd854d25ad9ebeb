use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::{
    digest::{digest_render, DigestComposer, DigestStore},
    error::Result,
    mail::{Mailer, OutboundEmail},
};

/// Counts from one dispatch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub users: usize,
    pub sent: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Sends every user the digest of their tasks due today.
pub struct NotificationDispatcher {
    store: Arc<dyn DigestStore>,
    composer: DigestComposer,
    mailer: Arc<dyn Mailer>,
    timezone: Tz,
}

impl NotificationDispatcher {
    pub fn new(
        store: Arc<dyn DigestStore>,
        composer: DigestComposer,
        mailer: Arc<dyn Mailer>,
        timezone: Tz,
    ) -> Self {
        Self {
            store,
            composer,
            mailer,
            timezone,
        }
    }

    /// Current calendar date in the configured zone.
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.timezone).date_naive()
    }

    /// Runs a dispatch for today. Returns `false` only when the run aborted.
    pub async fn run_once(&self) -> bool {
        let today = self.today();
        match self.dispatch(today).await {
            Ok(summary) => {
                info!(
                    date = %today,
                    users = summary.users,
                    sent = summary.sent,
                    skipped = summary.skipped,
                    failed = summary.failed,
                    "Daily task notifications finished"
                );
                true
            }
            Err(e) => {
                error!("Error sending daily notifications: {}", e);
                false
            }
        }
    }

    /// Storage errors abort the run; delivery errors are logged per
    /// recipient and the loop moves on.
    pub async fn dispatch(&self, date: NaiveDate) -> Result<DispatchSummary> {
        let users = self.store.list_users().await?;
        let subject = digest_render::subject(date);
        let mut summary = DispatchSummary {
            users: users.len(),
            ..Default::default()
        };

        for user in &users {
            let Some(rendered) = self.composer.compose(user, date).await? else {
                summary.skipped += 1;
                continue;
            };

            debug!(user_id = %user.id, tasks = rendered.digest.task_count(), "Composed daily digest");

            let email = OutboundEmail {
                to: user.email.clone(),
                subject: subject.clone(),
                text_body: rendered.text,
                html_body: rendered.html,
            };

            match self.mailer.send(&email).await {
                Ok(()) => {
                    summary.sent += 1;
                    info!("Daily notification sent to {}", user.email);
                }
                Err(e) => {
                    summary.failed += 1;
                    warn!(user_id = %user.id, "Failed to send daily notification to {}: {}", user.email, e);
                }
            }
        }

        Ok(summary)
    }
}
