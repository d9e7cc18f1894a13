//! Insights dashboard endpoints.
//!
//! A mounted view keeps the organization's records and the user's filter
//! selection server-side; every mutation answers with a fresh snapshot.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use clearcoa_database::CoaRepository;
use clearcoa_utils::insights::{InsightsSnapshot, InsightsView};
use clearcoa_utils::CoaResult;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::database_error;
use crate::session::SessionContext;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct MountedView {
    pub view_id: Uuid,
    pub snapshot: InsightsSnapshot,
}

#[derive(Debug, Deserialize)]
pub struct SelectionUpdate {
    #[serde(default)]
    pub values: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    pub value: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct InsightsQuery {
    #[serde(default)]
    pub selected_suppliers: Vec<String>,
    #[serde(default)]
    pub selected_tests: Vec<String>,
}

/// POST /api/v1/insights/views
pub async fn mount_view(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
) -> (StatusCode, Json<MountedView>) {
    let repository = CoaRepository::new(state.pool.clone());
    let records_fetched = state.metrics.records_fetched.clone();

    let (view_id, _load) = state
        .views
        .mount(&session, move |organization_id| async move {
            let records = repository.find_by_organization(organization_id).await?;
            records_fetched.inc_by(records.len() as u64);
            Ok::<_, anyhow::Error>(records)
        })
        .await;
    state.metrics.views_mounted.inc();

    (
        StatusCode::CREATED,
        Json(MountedView {
            view_id,
            snapshot: InsightsSnapshot::loading(),
        }),
    )
}

/// GET /api/v1/insights/views/:id
pub async fn get_view(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path(view_id): Path<Uuid>,
) -> CoaResult<Json<InsightsSnapshot>> {
    let view = state.views.get(&session, view_id).await?;
    let snapshot = view.lock().await.snapshot();
    Ok(Json(snapshot))
}

/// PUT /api/v1/insights/views/:id/suppliers
pub async fn set_view_suppliers(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path(view_id): Path<Uuid>,
    Json(update): Json<SelectionUpdate>,
) -> CoaResult<Json<InsightsSnapshot>> {
    let view = state.views.get(&session, view_id).await?;
    let mut view = view.lock().await;
    view.set_selected_suppliers(update.values);
    Ok(Json(view.snapshot()))
}

/// PUT /api/v1/insights/views/:id/tests
pub async fn set_view_tests(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path(view_id): Path<Uuid>,
    Json(update): Json<SelectionUpdate>,
) -> CoaResult<Json<InsightsSnapshot>> {
    let view = state.views.get(&session, view_id).await?;
    let mut view = view.lock().await;
    view.set_selected_tests(update.values);
    Ok(Json(view.snapshot()))
}

/// POST /api/v1/insights/views/:id/suppliers/toggle
pub async fn toggle_view_supplier(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path(view_id): Path<Uuid>,
    Json(toggle): Json<ToggleRequest>,
) -> CoaResult<Json<InsightsSnapshot>> {
    let view = state.views.get(&session, view_id).await?;
    let mut view = view.lock().await;
    view.toggle_supplier(&toggle.value);
    Ok(Json(view.snapshot()))
}

/// POST /api/v1/insights/views/:id/tests/toggle
pub async fn toggle_view_test(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path(view_id): Path<Uuid>,
    Json(toggle): Json<ToggleRequest>,
) -> CoaResult<Json<InsightsSnapshot>> {
    let view = state.views.get(&session, view_id).await?;
    let mut view = view.lock().await;
    view.toggle_test(&toggle.value);
    Ok(Json(view.snapshot()))
}

/// DELETE /api/v1/insights/views/:id
pub async fn unmount_view(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path(view_id): Path<Uuid>,
) -> CoaResult<StatusCode> {
    state.views.unmount(&session, view_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/insights/query
///
/// One-shot variant: fetch, apply the given selection, return the snapshot.
pub async fn query_insights(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Json(query): Json<InsightsQuery>,
) -> CoaResult<Json<InsightsSnapshot>> {
    let records = CoaRepository::new(state.pool.clone())
        .find_by_organization(session.organization_id)
        .await
        .map_err(database_error)?;
    state.metrics.records_fetched.inc_by(records.len() as u64);

    let mut view = InsightsView::new(session.organization_id);
    let ticket = view.begin_load();
    view.complete_load(ticket, Ok(records));
    view.set_selected_suppliers(query.selected_suppliers);
    view.set_selected_tests(query.selected_tests);

    Ok(Json(view.snapshot()))
}
