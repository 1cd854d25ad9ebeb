use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
    error::Result,
    task::{Task, TaskRepository},
    user::{User, UserRepository},
};

/// Read access the digest pipeline needs from storage.
#[async_trait]
pub trait DigestStore: Send + Sync {
    async fn list_users(&self) -> Result<Vec<User>>;

    /// Tasks owned by `user_id`, due on `date`, not completed.
    async fn find_due_tasks(&self, user_id: Uuid, date: NaiveDate) -> Result<Vec<Task>>;
}

#[derive(Clone)]
pub struct PgDigestStore {
    users: UserRepository,
    tasks: TaskRepository,
}

impl PgDigestStore {
    pub fn new(users: UserRepository, tasks: TaskRepository) -> Self {
        Self { users, tasks }
    }
}

#[async_trait]
impl DigestStore for PgDigestStore {
    async fn list_users(&self) -> Result<Vec<User>> {
        self.users.find_all().await
    }

    async fn find_due_tasks(&self, user_id: Uuid, date: NaiveDate) -> Result<Vec<Task>> {
        self.tasks.find_due_open(user_id, date).await
    }
}
