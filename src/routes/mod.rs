use axum::http::HeaderValue;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::{auth::AuthenticatedUser, state::AppState};

pub mod agents;
pub mod auth;
pub mod case_studies;
pub mod documents;
pub mod health;
pub mod renditions;

pub fn create_router(state: AppState) -> Router<()> {
    let cors = if let Some(origins) = state.config.cors_allowed_origin.as_ref() {
        let headers: Vec<HeaderValue> = origins
            .split(',')
            .filter_map(|value| {
                let trimmed = value.trim();
                (!trimmed.is_empty()).then(|| {
                    trimmed
                        .parse::<HeaderValue>()
                        .expect("invalid CORS allowed origin")
                })
            })
            .collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(headers))
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
            .allow_credentials(true)
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::mirror_request())
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
            .allow_credentials(true)
    };

    let auth_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/me", get(auth::me));

    let versions_routes = Router::new()
        .route("/:id/renditions", get(renditions::list_renditions))
        .route(
            "/:id/renditions/:kind",
            get(renditions::get_rendition).post(renditions::trigger_rendition),
        );

    let documents_routes = Router::new()
        .route("/:id/summary", get(documents::get_summary))
        .route("/:id/summary/regenerate", post(documents::regenerate_summary));

    let case_studies_routes = Router::new()
        .route("/generate", post(case_studies::generate))
        .route(
            "/versions/:id/validate",
            post(case_studies::trigger_validation),
        )
        .route(
            "/versions/:id/validation",
            get(case_studies::get_validation),
        );

    let agents_routes = Router::new()
        .route("/", get(agents::list_agents).post(agents::create_agent))
        .route("/active", get(agents::get_active_agent))
        .route("/:id/activate", post(agents::activate_agent))
        .route("/:id/deactivate", post(agents::deactivate_agent));

    let protected_state = state.clone();
    let protected_routes = Router::new()
        .nest("/api/versions", versions_routes)
        .nest("/api/documents", documents_routes)
        .nest("/api/case-studies", case_studies_routes)
        .nest("/api/case-study-agents", agents_routes)
        .layer(middleware::from_extractor_with_state::<AuthenticatedUser, _>(protected_state));

    Router::new()
        .merge(protected_routes)
        .nest("/api/auth", auth_routes)
        .route("/api/health", get(health::health_check))
        .with_state(state)
        .layer(cors)
}
