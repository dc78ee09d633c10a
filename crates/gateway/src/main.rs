//! CourseHub API Gateway
//!
//! The main entry point for all external API requests.
//! Handles:
//! - Viewer identity extraction (authentication happens upstream)
//! - Request validation and routing
//! - Observability (logging, metrics, tracing)

mod handlers;
mod middleware;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use coursehub_common::{config::AppConfig, db::DbPool, db::Repository, directory, metrics};
use coursehub_forum::{CommentService, DiscussionService};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{info, Level};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DbPool,
    pub discussions: DiscussionService,
    pub comments: CommentService,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(true)
        .json()
        .init();

    info!("Starting CourseHub API Gateway v{}", coursehub_common::VERSION);

    // Load configuration
    let config = AppConfig::load().map_err(|e| {
        tracing::error!(error = %e, "Failed to load configuration");
        e
    })?;

    let config = Arc::new(config);

    // Initialize metrics
    metrics::register_metrics();
    if config.observability.metrics_port > 0 {
        let metrics_addr =
            SocketAddr::from(([0, 0, 0, 0], config.observability.metrics_port));
        PrometheusBuilder::new()
            .with_http_listener(metrics_addr)
            .install()?;
        info!("Prometheus exporter listening on {}", metrics_addr);
    }

    // Initialize database connection
    info!("Connecting to database...");
    let db = DbPool::new(&config.database).await?;

    // Wire the user directory boundary
    let user_directory = directory::create_directory(
        &config.directory.provider,
        config.directory.base_url.clone(),
        config.directory.timeout_secs,
        config.directory.max_retries,
    )?;

    let repo = Repository::new(db.clone());

    // Create app state
    let state = AppState {
        config: config.clone(),
        db,
        discussions: DiscussionService::new(repo.clone(), user_directory.clone()),
        comments: CommentService::new(repo, user_directory),
    };

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    // API routes
    let api_routes = Router::new()
        // Health endpoints
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        // Discussion endpoints
        .route("/discussions", post(handlers::discussions::create_discussion))
        .route("/discussions", get(handlers::discussions::list_discussions))
        .route("/discussions/{id}", get(handlers::discussions::get_discussion))
        .route("/discussions/{id}", put(handlers::discussions::update_discussion))
        .route("/discussions/{id}", delete(handlers::discussions::delete_discussion))
        .route("/discussions/{id}/like", post(handlers::discussions::toggle_like))
        // Comment endpoints
        .route("/discussions/{id}/comments", post(handlers::comments::create_comment))
        .route("/discussions/{id}/comments", get(handlers::comments::list_comments))
        .route("/comments/{id}/replies", get(handlers::comments::list_replies))
        .route("/comments/{id}/like", post(handlers::comments::toggle_like))
        .route("/comments/{id}/report", post(handlers::comments::report_comment))
        .route("/comments/{id}", delete(handlers::comments::delete_comment))
        // Moderation endpoints (reviewer capability enforced upstream)
        .route(
            "/moderation/discussions/{id}/review",
            post(handlers::moderation::review_discussion),
        )
        .route(
            "/moderation/comments/{id}/review",
            post(handlers::moderation::review_comment),
        );

    // Compose the app
    Router::new()
        .nest("/v1", api_routes)
        .layer(axum::middleware::from_fn(middleware::metrics::track_metrics))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
