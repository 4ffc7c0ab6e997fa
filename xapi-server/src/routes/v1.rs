use axum::{Router, middleware, routing::get};

use crate::{AppState, gate::api_key_gate, handlers::assets};

/// Create all v1 API routes
pub fn create_v1_router(state: AppState) -> Router<AppState> {
    let collection = get(assets::list_assets)
        .post(assets::create_asset)
        .delete(assets::delete_assets);

    Router::new()
        .route("/assets", collection.clone())
        .route("/assets/", collection)
        .route("/assets/test-connection", get(assets::test_connection))
        .route_layer(middleware::from_fn_with_state(state, api_key_gate))
}
