use crate::{
    middleware::auth_middleware,
    notification::{self, TriggerResponse},
    state::AppState,
    task::{
        self,
        task_dto::{CreateTaskRequest, UpdateTaskRequest, UpdateTaskStatusRequest},
        Task, TaskPriority, TaskStats, TaskStatus,
    },
    user::{self, User},
};
use axum::{
    middleware,
    routing::{get, patch, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        task::task_handlers::get_tasks,
        task::task_handlers::get_task_stats,
        task::task_handlers::get_task,
        task::task_handlers::create_task,
        task::task_handlers::update_task,
        task::task_handlers::delete_task,
        task::task_handlers::update_task_status,
        user::user_handlers::get_current_user,
        notification::notification_handlers::trigger_digest,
    ),
    components(
        schemas(
            CreateTaskRequest,
            UpdateTaskRequest,
            UpdateTaskStatusRequest,
            User,
            Task,
            TaskStats,
            TaskStatus,
            TaskPriority,
            TriggerResponse,
        )
    ),
    tags(
        (name = "tasks", description = "Task management endpoints"),
        (name = "users", description = "User endpoints"),
        (name = "notifications", description = "Daily digest endpoints")
    ),
    modifiers(&SecurityAddon)
)]
struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::Http::new(
                        utoipa::openapi::security::HttpAuthScheme::Bearer,
                    ),
                ),
            )
        }
    }
}

/// Health check
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up")),
    tag = "notifications"
)]
pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Protected routes (auth required)
    let task_routes = Router::new()
        .route("/", get(task::get_tasks).post(task::create_task))
        .route("/stats", get(task::get_task_stats))
        .route(
            "/:id",
            get(task::get_task)
                .put(task::update_task)
                .delete(task::delete_task),
        )
        .route("/:id/status", patch(task::update_task_status))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let user_routes = Router::new()
        .route("/me", get(user::get_current_user))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let notification_routes =
        Router::new().route("/digest/trigger", post(notification::trigger_digest));

    let api_routes = Router::new()
        .nest("/tasks", task_routes)
        .nest("/users", user_routes)
        .nest("/notifications", notification_routes);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(health_check))
        .route("/test-email", get(notification::trigger_digest))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
