//! In-memory fakes for the digest pipeline seams.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

use crate::{
    digest::DigestStore,
    error::{AppError, Result},
    mail::{MailError, Mailer, OutboundEmail},
    task::{Task, TaskPriority, TaskStatus},
    user::User,
};

pub fn user(name: &str) -> User {
    User {
        id: Uuid::new_v4(),
        username: name.to_string(),
        email: format!("{}@example.com", name),
        created_at: Utc::now(),
    }
}

pub fn task(
    owner: &User,
    title: &str,
    priority: TaskPriority,
    status: TaskStatus,
    due_date: Option<NaiveDate>,
) -> Task {
    let now = Utc::now();
    Task {
        id: Uuid::new_v4(),
        user_id: owner.id,
        title: title.to_string(),
        description: None,
        status,
        priority,
        due_date,
        created_at: now,
        updated_at: now,
    }
}

/// Returns every task of a user regardless of date or status, so the
/// digest's own filtering is what gets exercised.
#[derive(Default)]
pub struct InMemoryStore {
    users: Vec<User>,
    tasks: Mutex<Vec<Task>>,
    fail_users: AtomicBool,
    fail_tasks: AtomicBool,
}

impl InMemoryStore {
    pub fn new(users: Vec<User>) -> Self {
        Self {
            users,
            ..Default::default()
        }
    }

    pub fn add_task(&self, task: Task) {
        self.tasks.lock().unwrap().push(task);
    }

    pub fn fail_user_listing(&self) {
        self.fail_users.store(true, Ordering::SeqCst);
    }

    pub fn fail_task_queries(&self) {
        self.fail_tasks.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl DigestStore for InMemoryStore {
    async fn list_users(&self) -> Result<Vec<User>> {
        if self.fail_users.load(Ordering::SeqCst) {
            return Err(AppError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(self.users.clone())
    }

    async fn find_due_tasks(&self, user_id: Uuid, _date: NaiveDate) -> Result<Vec<Task>> {
        if self.fail_tasks.load(Ordering::SeqCst) {
            return Err(AppError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(self
            .tasks
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect())
    }
}

/// Records delivered mail; addresses in `failing` are rejected.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutboundEmail>>,
    failing: Mutex<HashSet<String>>,
}

impl RecordingMailer {
    pub fn reject(&self, address: &str) {
        self.failing.lock().unwrap().insert(address.to_string());
    }

    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn recipients(&self) -> Vec<String> {
        self.sent().into_iter().map(|e| e.to).collect()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &OutboundEmail) -> std::result::Result<(), MailError> {
        if self.failing.lock().unwrap().contains(&email.to) {
            return Err(MailError::InvalidAddress {
                address: email.to.clone(),
                source: lettre::address::AddressError::InvalidDomain,
            });
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}
