//! COA data table: search and spreadsheet export.

use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Json, Response},
    Extension,
};
use clearcoa_database::CoaRepository;
use clearcoa_models::CoaTableRow;
use clearcoa_utils::{rows_to_xlsx, search_rows, CoaResult, EXPORT_FILE_NAME, XLSX_CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use super::database_error;
use crate::session::SessionContext;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct RecordsQuery {
    /// Free-text search over every column
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RecordsResponse {
    pub rows: Vec<CoaTableRow>,
    pub total: usize,
    pub matched: usize,
}

async fn load_rows(state: &AppState, session: &SessionContext) -> CoaResult<Vec<CoaTableRow>> {
    CoaRepository::new(state.pool.clone())
        .find_table_rows(session.organization_id)
        .await
        .map_err(database_error)
}

/// GET /api/v1/records
pub async fn list_records(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Query(query): Query<RecordsQuery>,
) -> CoaResult<Json<RecordsResponse>> {
    let rows = load_rows(&state, &session).await?;
    let matched: Vec<CoaTableRow> = search_rows(&rows, query.q.as_deref().unwrap_or_default())
        .into_iter()
        .cloned()
        .collect();

    Ok(Json(RecordsResponse {
        total: rows.len(),
        matched: matched.len(),
        rows: matched,
    }))
}

/// GET /api/v1/records/export
///
/// Exports exactly the rows the same search would list.
pub async fn export_records(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Query(query): Query<RecordsQuery>,
) -> CoaResult<Response> {
    let rows = load_rows(&state, &session).await?;
    let matched = search_rows(&rows, query.q.as_deref().unwrap_or_default());
    let workbook = rows_to_xlsx(matched.iter().copied())?;

    state.metrics.exports.inc();
    tracing::info!(
        organization_id = %session.organization_id,
        rows = matched.len(),
        bytes = workbook.len(),
        "Exported COA data"
    );

    Ok((
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", EXPORT_FILE_NAME),
            ),
        ],
        workbook,
    )
        .into_response())
}
