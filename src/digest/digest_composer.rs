use chrono::NaiveDate;
use std::sync::Arc;

use crate::{error::Result, user::User};
use super::{
    digest_models::{Digest, RenderedDigest},
    digest_render,
    digest_store::DigestStore,
};

/// Builds the per-user digest for a given day.
#[derive(Clone)]
pub struct DigestComposer {
    store: Arc<dyn DigestStore>,
    app_url: String,
}

impl DigestComposer {
    pub fn new(store: Arc<dyn DigestStore>, app_url: impl Into<String>) -> Self {
        Self {
            store,
            app_url: app_url.into(),
        }
    }

    /// `Ok(None)` means the user has nothing due and must not be mailed.
    pub async fn compose(&self, user: &User, date: NaiveDate) -> Result<Option<RenderedDigest>> {
        let tasks = self.store.find_due_tasks(user.id, date).await?;

        let Some(digest) = Digest::build(&user.username, date, tasks) else {
            return Ok(None);
        };

        Ok(Some(digest_render::render(digest, &self.app_url)))
    }
}
