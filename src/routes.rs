use axum::{
    http::HeaderValue,
    middleware::from_fn,
    routing::{get, patch, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config;
use crate::handlers::{companies, health, jobs, users};
use crate::middleware::{authenticate_jwt, ensure_admin, ensure_admin_or_user, ensure_logged_in};

pub fn app() -> Router {
    let router = Router::new()
        // Public
        .route("/", get(health::root))
        .route("/health", get(health::health))
        .nest("/companies", company_routes())
        .nest("/jobs", job_routes())
        .nest("/users", user_routes())
        // Runs before routing, so every gate sees the principal
        .layer(from_fn(authenticate_jwt))
        .layer(cors_layer());

    if config::config().api.enable_request_logging {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

fn company_routes() -> Router {
    let public = Router::new()
        .route("/", get(companies::list))
        .route("/:handle", get(companies::get));

    let admin = Router::new()
        .route("/", post(companies::create))
        .route("/:handle", patch(companies::update).delete(companies::remove))
        // Last added runs first: login is checked before admin
        .route_layer(from_fn(ensure_admin))
        .route_layer(from_fn(ensure_logged_in));

    public.merge(admin)
}

fn job_routes() -> Router {
    let public = Router::new()
        .route("/", get(jobs::list))
        .route("/:id", get(jobs::get))
        .route("/company/:handle", get(jobs::list_for_company));

    let admin = Router::new()
        .route("/", post(jobs::create))
        .route("/:id", patch(jobs::update).delete(jobs::remove))
        .route_layer(from_fn(ensure_admin));

    public.merge(admin)
}

fn user_routes() -> Router {
    let admin = Router::new()
        .route("/", get(users::list))
        .route_layer(from_fn(ensure_admin));

    let owner = Router::new()
        .route("/:username", get(users::get).patch(users::update).delete(users::remove))
        .route_layer(from_fn(ensure_admin_or_user));

    admin.merge(owner)
}

fn cors_layer() -> CorsLayer {
    let origins: Vec<HeaderValue> = config::config()
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}
