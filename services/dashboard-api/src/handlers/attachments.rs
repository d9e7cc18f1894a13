//! Attachment upload, listing and deletion.
//!
//! Files go to object storage first and get a metadata row second; deletes
//! remove the object first and the row second.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use chrono::Utc;
use clearcoa_database::AttachmentRepository;
use clearcoa_models::{storage_object_path, Attachment, NewAttachment};
use clearcoa_utils::{
    log_warn, sanitize_upload_file_name, validate_file_size, validate_uuid, CoaError, CoaResult,
};

use super::{database_error, storage_error};
use crate::session::SessionContext;
use crate::AppState;

const UPLOAD_FIELD: &str = "file";
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// GET /api/v1/attachments
pub async fn list_attachments(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
) -> CoaResult<Json<Vec<Attachment>>> {
    let attachments = AttachmentRepository::new(state.pool.clone())
        .list_for_tenant(session.organization_id, &session.tenant_id)
        .await
        .map_err(database_error)?;
    Ok(Json(attachments))
}

/// A `file` field that passed validation and waits to be stored.
struct PendingUpload {
    file_name: String,
    content_type: String,
    data: Vec<u8>,
}

/// POST /api/v1/attachments
///
/// Every multipart field named `file` is stored as its own attachment. All
/// fields are validated before the first one is stored, and a failure part
/// way through removes what this request already stored.
pub async fn upload_attachments(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    multipart: Multipart,
) -> CoaResult<(StatusCode, Json<Vec<Attachment>>)> {
    let max_size = state.config.server.max_request_size as u64;
    let pending = read_uploads(multipart, max_size).await?;
    if pending.is_empty() {
        return Err(CoaError::validation("file", "No file provided"));
    }

    let repository = AttachmentRepository::new(state.pool.clone());
    let mut stored = Vec::with_capacity(pending.len());

    for upload in pending {
        match store_upload(&state, &repository, &session, upload).await {
            Ok(attachment) => stored.push(attachment),
            Err(e) => {
                roll_back_uploads(&state, &repository, &session, &stored).await;
                return Err(e);
            }
        }
    }

    state.metrics.uploads.inc_by(stored.len() as u64);
    Ok((StatusCode::CREATED, Json(stored)))
}

async fn read_uploads(mut multipart: Multipart, max_size: u64) -> CoaResult<Vec<PendingUpload>> {
    let mut pending = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| CoaError::validation("file", format!("Failed to read upload: {}", e)))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let file_name = sanitize_upload_file_name(field.file_name().unwrap_or_default())?;
        let content_type = field
            .content_type()
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| CoaError::validation("file", format!("Failed to read file data: {}", e)))?;
        validate_file_size(data.len() as u64, max_size)?;

        pending.push(PendingUpload {
            file_name,
            content_type,
            data: data.to_vec(),
        });
    }

    Ok(pending)
}

async fn store_upload(
    state: &AppState,
    repository: &AttachmentRepository,
    session: &SessionContext,
    upload: PendingUpload,
) -> CoaResult<Attachment> {
    let received_at = Utc::now();
    let object_path = storage_object_path(&session.tenant_id, received_at, &upload.file_name);
    let bytes = upload.data.len();
    state
        .storage
        .put(&object_path, upload.data, &upload.content_type)
        .await
        .map_err(storage_error)?;

    let new_attachment = match state.storage.public_url(&object_path) {
        Ok(file_url) => NewAttachment {
            organization_id: session.organization_id,
            tenant_id: session.tenant_id.clone(),
            attachment_file_name: upload.file_name,
            file_url,
            storage_object_id: object_path.clone(),
            received_at,
        },
        Err(e) => {
            remove_object(state, &object_path).await;
            return Err(storage_error(e));
        }
    };

    let attachment = match repository.insert(&new_attachment).await {
        Ok(attachment) => attachment,
        Err(e) => {
            remove_object(state, &object_path).await;
            return Err(database_error(e));
        }
    };

    tracing::info!(
        attachment = %attachment.attachment_surrogate_key,
        object_path = %object_path,
        bytes,
        "Attachment uploaded"
    );
    Ok(attachment)
}

/// Undo the attachments an interrupted request already stored.
async fn roll_back_uploads(
    state: &AppState,
    repository: &AttachmentRepository,
    session: &SessionContext,
    stored: &[Attachment],
) {
    for attachment in stored {
        if let Some(object_path) = attachment.storage_object_id.as_deref() {
            remove_object(state, object_path).await;
        }
        if let Err(e) = repository
            .delete(session.organization_id, attachment.attachment_surrogate_key)
            .await
        {
            log_warn!(
                "Failed to roll back attachment row",
                attachment = %attachment.attachment_surrogate_key,
                error = %e
            );
        }
    }
}

async fn remove_object(state: &AppState, object_path: &str) {
    if let Err(e) = state.storage.remove(object_path).await {
        log_warn!(
            "Failed to remove orphaned upload",
            object_path = %object_path,
            error = %e
        );
    }
}

/// DELETE /api/v1/attachments/:key
pub async fn delete_attachment(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path(key): Path<String>,
) -> CoaResult<StatusCode> {
    let key = validate_uuid("attachment_surrogate_key", &key)?;
    let repository = AttachmentRepository::new(state.pool.clone());

    let attachment = repository
        .find_by_key(session.organization_id, key)
        .await
        .map_err(database_error)?
        .ok_or_else(|| CoaError::not_found(format!("attachment {}", key)))?;

    if let Some(object_path) = attachment.storage_object_id.as_deref() {
        state.storage.remove(object_path).await.map_err(storage_error)?;
    }

    if !repository
        .delete(session.organization_id, key)
        .await
        .map_err(database_error)?
    {
        return Err(CoaError::not_found(format!("attachment {}", key)));
    }

    state.metrics.deletes.inc();
    tracing::info!(attachment = %key, "Attachment deleted");
    Ok(StatusCode::NO_CONTENT)
}
