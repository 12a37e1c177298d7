//! LMS Server - Library Management System
//!
//! REST API server for book lending, ticket visibility and notification routing.

use anyhow::Context;
use axum::{
    routing::{get, post},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lms_server::{
    api,
    config::AppConfig,
    repository::Repository,
    services::{redis::RedisService, Services},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("lms_server={},tower_http=debug", config.logging.level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting LMS Server v{}", env!("CARGO_PKG_VERSION"));

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await
        .context("Failed to connect to database")?;

    tracing::info!("Connected to database");

    if config.database.run_migrations {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run database migrations")?;
        tracing::info!("Database migrations completed");
    }

    // The book cache is optional; without Redis every list hits the database
    let redis_service = match RedisService::new(&config.redis.url).await {
        Ok(service) => {
            tracing::info!("Connected to Redis");
            Some(service)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Redis unavailable, book list cache disabled");
            None
        }
    };

    let addr = SocketAddr::new(
        config.server.host.parse().context("Invalid host address")?,
        config.server.port,
    );

    let repository = Repository::new(pool.clone());
    let services = Services::new(repository, &config, redis_service);

    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
        pool,
    };

    let app = create_router(state);

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes
fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        .route("/ready", get(api::health::readiness_check))
        // Users
        .route("/users/signup", post(api::users::signup))
        .route("/users/login", post(api::users::login))
        .route("/users/refresh", post(api::users::refresh))
        .route("/users/me", get(api::users::me))
        .route("/users/assign-role", post(api::users::assign_role))
        // Authors
        .route(
            "/authors",
            get(api::authors::list_authors).post(api::authors::create_author),
        )
        .route(
            "/authors/:id",
            get(api::authors::get_author)
                .put(api::authors::update_author)
                .delete(api::authors::delete_author),
        )
        // Books
        .route("/books", get(api::books::list_books).post(api::books::create_book))
        .route("/books/search", get(api::books::search_books))
        .route(
            "/books/:id",
            get(api::books::get_book)
                .put(api::books::update_book)
                .delete(api::books::delete_book),
        )
        // Loans
        .route("/books/:id/borrow", post(api::loans::borrow_book))
        .route("/books/:id/return", post(api::loans::return_book))
        .route("/borrowers/me/books", get(api::loans::my_books))
        // Tickets
        .route("/tickets", get(api::tickets::search_tickets))
        .route("/tickets/accessible-ids", get(api::tickets::accessible_ticket_ids))
        // Notifications
        .route("/notifications/rules", get(api::notifications::list_rules))
        .route(
            "/notifications/recipients",
            post(api::notifications::preview_recipients),
        )
        .with_state(state);

    let openapi = api::openapi::create_openapi_router();

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
