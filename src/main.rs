use axum::{middleware::from_fn, routing::get, Router};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use teamtrack_api::database::manager::DatabaseManager;
use teamtrack_api::handlers;
use teamtrack_api::middleware::jwt_auth_middleware;

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    let config = teamtrack_api::config::config();
    tracing::info!("Starting TeamTrack API in {:?} mode", config.environment);

    let app = app();

    // Allow tests or deployments to override port via env
    let port = std::env::var("SERVER_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    tracing::info!("TeamTrack API listening on http://{}", bind_addr);

    axum::serve(listener, app).await.expect("server");
}

fn app() -> Router {
    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(public_routes())
        // Protected API behind JWT
        .merge(protected_routes().layer(from_fn(jwt_auth_middleware)))
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn public_routes() -> Router {
    use axum::routing::post;
    use handlers::{auth, users};

    Router::new()
        .route("/api/v1/auth/register-admin", post(auth::register_admin))
        .route("/api/v1/auth/login", post(auth::login))
        .route("/api/v1/auth/refresh", post(auth::refresh))
        .route("/api/v1/users/exists-by-email", get(users::exists_by_email))
}

fn protected_routes() -> Router {
    use axum::routing::{post, put};
    use handlers::{auth, projects, tasks, teams, users};

    Router::new()
        .route("/api/v1/auth/logout", post(auth::logout))
        .route("/api/v1/users", get(users::list).post(users::create))
        .route(
            "/api/v1/users/:id",
            put(users::update).delete(users::delete),
        )
        .route("/api/v1/teams", post(teams::create))
        .route(
            "/api/v1/projects",
            get(projects::list).post(projects::create),
        )
        .route(
            "/api/v1/projects/:id",
            put(projects::update).delete(projects::delete),
        )
        .route("/api/v1/tasks", get(tasks::list).post(tasks::create))
        .route(
            "/api/v1/tasks/:id",
            put(tasks::update).delete(tasks::delete),
        )
}

async fn root() -> axum::Json<Value> {
    axum::Json(json!({
        "name": "teamtrack-api",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn health() -> axum::Json<Value> {
    let database = match DatabaseManager::health_check().await {
        Ok(()) => "up",
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            "down"
        }
    };

    axum::Json(json!({
        "status": if database == "up" { "ok" } else { "degraded" },
        "database": database,
    }))
}
