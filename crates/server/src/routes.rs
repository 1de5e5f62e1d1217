//! Route configuration.

use crate::handlers;
use crate::metrics::metrics_handler;
use crate::state::AppState;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method};
use axum::routing::{MethodRouter, get, post};
use tower_http::cors::{AllowHeaders, Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Room for multipart boundaries and headers on top of the image itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Build the CORS layer.
///
/// An empty origin list allows any origin without credentials. Listed
/// origins may send credentials.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let upload_limit = state
        .config
        .images
        .max_upload_bytes
        .saturating_add(MULTIPART_OVERHEAD);

    let rooms: MethodRouter<AppState> = get(handlers::list_rooms).post(handlers::create_room);
    let room_routes = Router::new()
        // Clients use both spellings of the collection path.
        .route("/rooms", rooms.clone())
        .route("/rooms/", rooms)
        .route(
            "/rooms/generate-pdf",
            post(handlers::generate_room_list_pdf),
        )
        .route(
            "/rooms/{room_id}",
            get(handlers::get_room)
                .patch(handlers::update_room)
                .delete(handlers::delete_room),
        )
        .route(
            "/rooms/{room_id}/generate-pdf",
            post(handlers::generate_room_pdf),
        );

    let upload_routes = Router::new()
        .route(
            "/upload/temp-room-image",
            post(handlers::upload_temp_image).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/upload/finalize-room-image",
            post(handlers::finalize_room_image),
        )
        .route(
            "/upload/cleanup-temp-image",
            post(handlers::cleanup_temp_image),
        );

    let admin_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route(
            "/admin/orphans",
            get(handlers::list_orphans).delete(handlers::sweep_orphans),
        );

    let mut router = Router::new()
        .merge(room_routes)
        .merge(upload_routes)
        .merge(admin_routes);

    // The /metrics endpoint is unauthenticated; restrict it at the network level.
    if state.config.server.metrics_enabled {
        router = router.route("/metrics", get(metrics_handler));
    }

    if state.config.server.serve_uploads {
        let images = &state.config.images;
        router = router
            .nest_service(&images.temp_url_prefix, ServeDir::new(&images.temp_dir))
            .nest_service(
                &images.permanent_url_prefix,
                ServeDir::new(&images.permanent_dir),
            );
    }

    router
        .layer(cors_layer(&state.config.server.allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
