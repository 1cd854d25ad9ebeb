pub mod task_dto;
pub mod task_handlers;
pub mod task_models;
pub mod task_repository;
pub mod task_service;

pub use task_handlers::{
    create_task, delete_task, get_task, get_task_stats, get_tasks, update_task,
    update_task_status,
};
pub use task_models::{Task, TaskPriority, TaskStats, TaskStatus};
pub use task_repository::TaskRepository;
pub use task_service::TaskService;
