use chrono::NaiveDate;

use crate::task::{Task, TaskPriority};

/// Sections are emitted in this order; empty ones are dropped.
pub const BUCKET_ORDER: [TaskPriority; 3] =
    [TaskPriority::High, TaskPriority::Medium, TaskPriority::Low];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestEntry {
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestSection {
    pub priority: TaskPriority,
    pub entries: Vec<DigestEntry>,
}

/// One user's tasks for one day, grouped by priority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    pub recipient_name: String,
    pub date: NaiveDate,
    pub sections: Vec<DigestSection>,
}

impl Digest {
    /// Groups the open tasks due on `date` into priority buckets.
    ///
    /// Tasks due on another day or already completed are ignored, and each
    /// bucket is ordered by creation time, oldest first. Returns `None` when
    /// nothing qualifies.
    pub fn build(recipient_name: &str, date: NaiveDate, tasks: Vec<Task>) -> Option<Self> {
        let mut due: Vec<Task> = tasks
            .into_iter()
            .filter(|task| task.is_due_open_on(date))
            .collect();

        if due.is_empty() {
            return None;
        }

        due.sort_by_key(|task| task.created_at);

        let sections = BUCKET_ORDER
            .iter()
            .filter_map(|&priority| {
                let entries: Vec<DigestEntry> = due
                    .iter()
                    .filter(|task| task.priority == priority)
                    .map(|task| DigestEntry {
                        title: task.title.clone(),
                        description: task.description.clone(),
                    })
                    .collect();

                (!entries.is_empty()).then_some(DigestSection { priority, entries })
            })
            .collect();

        Some(Self {
            recipient_name: recipient_name.to_string(),
            date,
            sections,
        })
    }

    #[cfg(test)]
    pub fn section(&self, priority: TaskPriority) -> Option<&DigestSection> {
        self.sections.iter().find(|s| s.priority == priority)
    }

    pub fn task_count(&self) -> usize {
        self.sections.iter().map(|s| s.entries.len()).sum()
    }
}

/// A digest together with both message bodies.
#[derive(Debug, Clone)]
pub struct RenderedDigest {
    pub digest: Digest,
    pub html: String,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskStatus;
    use chrono::{Duration, TimeZone, Utc};
    use uuid::Uuid;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    fn task(title: &str, priority: TaskPriority, status: TaskStatus, due: Option<NaiveDate>, age_minutes: i64) -> Task {
        let created = Utc.with_ymd_and_hms(2026, 10, 1, 12, 0, 0).unwrap() - Duration::minutes(age_minutes);
        Task {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: title.to_string(),
            description: None,
            status,
            priority,
            due_date: due,
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn test_excludes_other_days_and_completed() {
        let today = date();
        let tasks = vec![
            task("today", TaskPriority::High, TaskStatus::Pending, Some(today), 0),
            task("tomorrow", TaskPriority::High, TaskStatus::Pending, today.succ_opt(), 0),
            task("yesterday", TaskPriority::Low, TaskStatus::InProgress, today.pred_opt(), 0),
            task("undated", TaskPriority::Medium, TaskStatus::Pending, None, 0),
            task("done", TaskPriority::Medium, TaskStatus::Completed, Some(today), 0),
        ];

        let digest = Digest::build("alice", today, tasks).unwrap();
        let titles: Vec<&str> = digest
            .sections
            .iter()
            .flat_map(|s| s.entries.iter().map(|e| e.title.as_str()))
            .collect();

        assert_eq!(titles, vec!["today"]);
    }

    #[test]
    fn test_no_qualifying_tasks_is_none() {
        let today = date();
        let tasks = vec![
            task("done", TaskPriority::High, TaskStatus::Completed, Some(today), 0),
            task("later", TaskPriority::High, TaskStatus::Pending, today.succ_opt(), 0),
        ];
        assert!(Digest::build("alice", today, tasks).is_none());
        assert!(Digest::build("alice", today, Vec::new()).is_none());
    }

    #[test]
    fn test_partition_is_complete() {
        let today = date();
        let priorities = [
            TaskPriority::High,
            TaskPriority::Low,
            TaskPriority::Medium,
            TaskPriority::High,
            TaskPriority::Low,
            TaskPriority::Low,
        ];
        let tasks: Vec<Task> = priorities
            .iter()
            .enumerate()
            .map(|(i, &p)| task(&format!("t{}", i), p, TaskStatus::Pending, Some(today), i as i64))
            .collect();

        let digest = Digest::build("alice", today, tasks).unwrap();

        assert_eq!(digest.task_count(), priorities.len());
        assert_eq!(digest.section(TaskPriority::High).unwrap().entries.len(), 2);
        assert_eq!(digest.section(TaskPriority::Medium).unwrap().entries.len(), 1);
        assert_eq!(digest.section(TaskPriority::Low).unwrap().entries.len(), 3);
    }

    #[test]
    fn test_sections_ordered_high_to_low_and_skip_empty() {
        let today = date();
        let tasks = vec![
            task("low", TaskPriority::Low, TaskStatus::Pending, Some(today), 0),
            task("high", TaskPriority::High, TaskStatus::InProgress, Some(today), 0),
        ];

        let digest = Digest::build("alice", today, tasks).unwrap();
        let order: Vec<TaskPriority> = digest.sections.iter().map(|s| s.priority).collect();

        assert_eq!(order, vec![TaskPriority::High, TaskPriority::Low]);
        assert!(digest.section(TaskPriority::Medium).is_none());
    }

    #[test]
    fn test_bucket_entries_oldest_first() {
        let today = date();
        let tasks = vec![
            task("newest", TaskPriority::High, TaskStatus::Pending, Some(today), 0),
            task("oldest", TaskPriority::High, TaskStatus::Pending, Some(today), 120),
            task("middle", TaskPriority::High, TaskStatus::Pending, Some(today), 60),
        ];

        let digest = Digest::build("alice", today, tasks).unwrap();
        let titles: Vec<&str> = digest.sections[0]
            .entries
            .iter()
            .map(|e| e.title.as_str())
            .collect();

        assert_eq!(titles, vec!["oldest", "middle", "newest"]);
    }
}
