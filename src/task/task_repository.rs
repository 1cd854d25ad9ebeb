use crate::error::Result;
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;
use super::task_models::{Task, TaskPriority, TaskStats, TaskStatus};

// Text columns sort alphabetically, so priority order is spelled out.
const PRIORITY_RANK: &str =
    "CASE priority WHEN 'high' THEN 3 WHEN 'medium' THEN 2 WHEN 'low' THEN 1 ELSE 0 END";

#[derive(Clone)]
pub struct TaskRepository {
    pool: PgPool,
}

#[derive(Debug, Default)]
pub struct TaskFilters {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
}

impl TaskRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_all(&self, user_id: Uuid, filters: TaskFilters) -> Result<Vec<Task>> {
        let mut query = "SELECT * FROM tasks WHERE user_id = $1".to_string();
        let mut params_count = 1;

        if filters.status.is_some() {
            params_count += 1;
            query.push_str(&format!(" AND status = ${}", params_count));
        }

        if filters.priority.is_some() {
            params_count += 1;
            query.push_str(&format!(" AND priority = ${}", params_count));
        }

        query.push_str(&format!(
            " ORDER BY due_date ASC NULLS LAST, {} DESC, created_at DESC",
            PRIORITY_RANK
        ));

        let mut db_query = sqlx::query_as::<_, Task>(&query).bind(user_id);

        if let Some(status) = filters.status {
            db_query = db_query.bind(status.as_str());
        }

        if let Some(priority) = filters.priority {
            db_query = db_query.bind(priority.as_str());
        }

        let tasks = db_query.fetch_all(&self.pool).await?;
        Ok(tasks)
    }

    /// Open tasks due on `date`, oldest first.
    pub async fn find_due_open(&self, user_id: Uuid, date: NaiveDate) -> Result<Vec<Task>> {
        let tasks = sqlx::query_as::<_, Task>(
            "SELECT * FROM tasks
             WHERE user_id = $1
             AND due_date = $2
             AND status <> 'completed'
             ORDER BY created_at ASC",
        )
        .bind(user_id)
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        Ok(tasks)
    }

    pub async fn find_by_id(&self, id: Uuid, user_id: Uuid) -> Result<Option<Task>> {
        let task = sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(task)
    }

    pub async fn create(
        &self,
        user_id: Uuid,
        title: &str,
        description: Option<&str>,
        priority: TaskPriority,
        due_date: Option<NaiveDate>,
    ) -> Result<Task> {
        let task = sqlx::query_as::<_, Task>(
            "INSERT INTO tasks (user_id, title, description, priority, due_date)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING *"
        )
        .bind(user_id)
        .bind(title)
        .bind(description)
        .bind(priority.as_str())
        .bind(due_date)
        .fetch_one(&self.pool)
        .await?;

        Ok(task)
    }

    pub async fn update(
        &self,
        id: Uuid,
        user_id: Uuid,
        title: &str,
        description: Option<&str>,
        status: TaskStatus,
        priority: TaskPriority,
        due_date: Option<NaiveDate>,
    ) -> Result<Option<Task>> {
        let task = sqlx::query_as::<_, Task>(
            "UPDATE tasks SET
                title = $1,
                description = $2,
                status = $3,
                priority = $4,
                due_date = $5,
                updated_at = NOW()
             WHERE id = $6 AND user_id = $7
             RETURNING *"
        )
        .bind(title)
        .bind(description)
        .bind(status.as_str())
        .bind(priority.as_str())
        .bind(due_date)
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(task)
    }

    pub async fn delete(&self, id: Uuid, user_id: Uuid) -> Result<u64> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn update_status(&self, id: Uuid, user_id: Uuid, status: TaskStatus) -> Result<Option<Task>> {
        let task = sqlx::query_as::<_, Task>(
            "UPDATE tasks SET status = $1, updated_at = NOW()
             WHERE id = $2 AND user_id = $3
             RETURNING *"
        )
        .bind(status.as_str())
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(task)
    }

    pub async fn get_stats(&self, user_id: Uuid) -> Result<TaskStats> {
        let stats = sqlx::query_as::<_, TaskStats>(
            "SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE status = 'pending') AS pending,
                COUNT(*) FILTER (WHERE status = 'in_progress') AS in_progress,
                COUNT(*) FILTER (WHERE status = 'completed') AS completed
             FROM tasks
             WHERE user_id = $1"
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(stats)
    }
}
