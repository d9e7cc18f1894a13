use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use crate::{handlers::*, middleware::auth_middleware, AppState};

pub fn create_api_routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/auth/sign-out", post(sign_out))
        .route("/auth/session", get(current_session))
        .nest("/insights", insights_routes())
        .nest("/records", records_routes())
        .nest("/attachments", attachment_routes())
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        .route("/health/detailed", get(detailed_health_check))
        .route("/auth/sign-in", post(sign_in))
        .merge(protected)
}

fn insights_routes() -> Router<AppState> {
    Router::new()
        .route("/views", post(mount_view))
        .route("/views/:id", get(get_view).delete(unmount_view))
        .route("/views/:id/suppliers", put(set_view_suppliers))
        .route("/views/:id/tests", put(set_view_tests))
        .route("/views/:id/suppliers/toggle", post(toggle_view_supplier))
        .route("/views/:id/tests/toggle", post(toggle_view_test))
        .route("/query", post(query_insights))
}

fn records_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_records))
        .route("/export", get(export_records))
}

fn attachment_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_attachments).post(upload_attachments))
        .route("/:key", delete(delete_attachment))
}
