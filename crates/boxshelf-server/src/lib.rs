//! Boxshelf Server - HTTP API for box curation
//!
//! Every route lives under `/api`. All but the health check require a
//! bearer token resolved by the configured identity provider.

pub mod auth;
pub mod config;
pub mod http;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use boxshelf_core::{BoxService, Coordinator, DocumentStore};

use crate::auth::IdentityProvider;

/// Shared application state
pub struct AppState {
    pub boxes: BoxService,
    pub coordinator: Coordinator,
    pub identity: Arc<dyn IdentityProvider>,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            boxes: BoxService::new(store.clone()),
            coordinator: Coordinator::new(store),
            identity,
        }
    }
}

fn box_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/boxes", get(http::fetch_many_boxes).post(http::create_box))
        .route("/boxes/{box_id}", get(http::get_box).put(http::replace_box))
        .route("/boxes/{box_id}/delete", put(http::soft_delete_box))
        .route(
            "/boxes/{box_id}/sectionSorting",
            put(http::update_section_sorting),
        )
        .route(
            "/boxes/{box_id}/sectionVisibility",
            put(http::update_section_visibility),
        )
        .route("/boxes/{box_id}/boxInfo", put(http::update_box_info))
        // Notes
        .route("/boxes/{box_id}/notes", post(http::add_note))
        .route(
            "/boxes/{box_id}/notes/{note_id}",
            put(http::edit_note).delete(http::delete_note),
        )
        // Sub-sections
        .route(
            "/boxes/{box_id}/subsections",
            post(http::create_sub_section).put(http::replace_sub_sections),
        )
        .route(
            "/boxes/{box_id}/subsections/{sub_section_id}",
            put(http::rename_sub_section).delete(http::delete_sub_section),
        )
        .route(
            "/boxes/{box_id}/subsections/{sub_section_id}/reorder",
            put(http::reorder_sub_section),
        )
        // Items
        .route(
            "/boxes/{box_id}/items/{kind}",
            post(http::add_item).put(http::replace_items),
        )
        .route(
            "/boxes/{box_id}/items/{kind}/reorder",
            put(http::reorder_items),
        )
        .route(
            "/boxes/{box_id}/items/{kind}/{item_id}",
            put(http::update_item).delete(http::remove_item),
        )
        .route(
            "/boxes/{box_id}/items/{kind}/{item_id}/subsection",
            put(http::add_item_to_sub_section),
        )
        .route(
            "/boxes/{box_id}/items/{kind}/{item_id}/subsection/remove",
            put(http::remove_item_from_sub_section),
        )
}

fn folder_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/folders",
            get(http::fetch_many_folders).post(http::create_folder),
        )
        .route(
            "/folders/{folder_id}",
            get(http::get_folder).delete(http::delete_folder),
        )
        .route(
            "/folders/{folder_id}/boxes",
            post(http::attach_box).put(http::replace_folder_boxes),
        )
        .route(
            "/folders/{folder_id}/boxes/{box_id}",
            put(http::rename_folder_box).delete(http::detach_box),
        )
        .route(
            "/folders/{folder_id}/boxes/{box_id}/move",
            put(http::move_box),
        )
}

fn user_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", post(http::create_user))
        .route("/users/me", get(http::get_me))
        .route("/users/{user_id}/boxes", get(http::user_boxes))
        .route("/users/{user_id}/folders", get(http::user_folders))
        .route(
            "/users/{user_id}/dashboardBoxes",
            put(http::set_dashboard_boxes),
        )
        .route(
            "/users/{user_id}/dashboardFolders",
            put(http::set_dashboard_folders),
        )
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    let authenticated = Router::new()
        .merge(box_routes())
        .merge(folder_routes())
        .merge(user_routes())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    let api = Router::new()
        .route("/health", get(http::health))
        .merge(authenticated);

    Router::new()
        .nest("/api", api)
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the server, returning once `shutdown` resolves.
pub async fn serve(
    addr: &str,
    state: Arc<AppState>,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Boxshelf server listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
