mod auth;
mod db;
mod digest;
mod error;
mod mail;
mod middleware;
mod notification;
mod routes;
mod state;
mod task;
mod user;

#[cfg(test)]
mod testing;

use anyhow::Context;
use db::{create_pool, run_migrations};
use digest::{DigestComposer, PgDigestStore};
use mail::SmtpMailer;
use notification::{DailyTrigger, NotificationDispatcher};
use routes::create_router;
use state::{AppState, Config};
use std::sync::Arc;
use task::{TaskRepository, TaskService};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use user::UserRepository;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,task_digest=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Arc::new(Config::from_env()?);

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

    tracing::info!("Connecting to database...");
    let db = create_pool(&database_url).await?;

    tracing::info!("Running migrations...");
    run_migrations(&db).await?;

    // Create repositories
    let user_repository = UserRepository::new(db.clone());
    let task_repository = TaskRepository::new(db.clone());

    // Digest pipeline
    let store = Arc::new(PgDigestStore::new(
        user_repository.clone(),
        task_repository.clone(),
    ));
    let composer = DigestComposer::new(store.clone(), config.app_url.clone());
    let mailer = Arc::new(SmtpMailer::new(&config.mail).context("Invalid mail configuration")?);
    let dispatcher = Arc::new(NotificationDispatcher::new(
        store,
        composer,
        mailer,
        config.schedule.timezone(),
    ));

    let trigger = if config.enable_scheduler {
        let trigger = DailyTrigger::new().await?;
        trigger
            .register(&config.schedule, dispatcher.clone())
            .await
            .context("Failed to register daily notifications")?;
        trigger.start().await?;
        if let Some(next) = trigger.next_fire().await {
            tracing::info!("Next daily notification run at {}", next);
        }
        Some(trigger)
    } else {
        tracing::info!("Scheduler disabled; daily notifications run only when triggered");
        None
    };

    let state = AppState {
        config: config.clone(),
        user_repository,
        task_service: TaskService::new(task_repository),
        dispatcher,
    };

    let app = create_router(state);

    // Start server
    let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("{}:{}", host, port);

    tracing::info!("Server starting on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(trigger) = trigger {
        trigger.stop().await?;
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutting down");
}
