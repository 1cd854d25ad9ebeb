use crate::error::{AppError, Result};
use crate::task::task_dto::{CreateTaskRequest, UpdateTaskRequest, UpdateTaskStatusRequest};
use crate::task::task_models::{Task, TaskStats, TaskStatus};
use crate::task::task_repository::{TaskFilters, TaskRepository};
use uuid::Uuid;

/// Service layer for task‑related business logic.
#[derive(Clone)]
pub struct TaskService {
    repo: TaskRepository,
}

impl TaskService {
    pub fn new(repo: TaskRepository) -> Self {
        Self { repo }
    }

    pub async fn list_tasks(&self, user_id: Uuid, filters: TaskFilters) -> Result<Vec<Task>> {
        self.repo.find_all(user_id, filters).await
    }

    pub async fn get_stats(&self, user_id: Uuid) -> Result<TaskStats> {
        self.repo.get_stats(user_id).await
    }

    pub async fn get_task(&self, user_id: Uuid, task_id: Uuid) -> Result<Task> {
        self.repo
            .find_by_id(task_id, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Task not found".into()))
    }

    pub async fn create_task(&self, user_id: Uuid, payload: CreateTaskRequest) -> Result<Task> {
        let task = self
            .repo
            .create(
                user_id,
                required_title(&payload.title)?,
                non_blank(payload.description.as_deref()),
                payload.priority.unwrap_or_default(),
                payload.due_date,
            )
            .await?;

        tracing::debug!(task_id = %task.id, %user_id, "task created");
        Ok(task)
    }

    pub async fn update_task(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        payload: UpdateTaskRequest,
    ) -> Result<Task> {
        self.repo
            .update(
                task_id,
                user_id,
                required_title(&payload.title)?,
                non_blank(payload.description.as_deref()),
                payload.status.unwrap_or(TaskStatus::Pending),
                payload.priority.unwrap_or_default(),
                payload.due_date,
            )
            .await?
            .ok_or_else(|| AppError::NotFound("Task not found".into()))
    }

    pub async fn delete_task(&self, user_id: Uuid, task_id: Uuid) -> Result<()> {
        if self.repo.delete(task_id, user_id).await? == 0 {
            return Err(AppError::NotFound("Task not found".into()));
        }
        tracing::debug!(%task_id, %user_id, "task deleted");
        Ok(())
    }

    pub async fn update_status(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        payload: UpdateTaskStatusRequest,
    ) -> Result<Task> {
        let status = parse_status(&payload.status)?;
        self.repo
            .update_status(task_id, user_id, status)
            .await?
            .ok_or_else(|| AppError::NotFound("Task not found".into()))
    }
}

pub(crate) fn parse_status(raw: &str) -> Result<TaskStatus> {
    raw.parse()
        .map_err(|_| AppError::BadRequest("Invalid status".into()))
}

fn required_title(title: &str) -> Result<&str> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::Validation("Task title is required".into()));
    }
    Ok(title)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}
