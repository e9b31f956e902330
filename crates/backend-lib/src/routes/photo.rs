// ============================
// crates/backend-lib/src/routes/photo.rs
// ============================
//! Photo upload and retrieval endpoints.
use super::MAX_UPLOAD_BYTES;
use crate::auth::CurrentPrincipal;
use crate::error::AppError;
use crate::media::{gateway::PRESIGNED_URL_TTL_SECS, upload_extension};
use crate::AppState;
use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, Path, State,
    },
    http::{
        header::{CACHE_CONTROL, CONTENT_TYPE},
        StatusCode,
    },
    response::{IntoResponse, Redirect, Response},
    Json,
};
use bytes::BytesMut;
use easymeal_common::UploadResponse;
use std::sync::Arc;
use tracing::info;

const UPLOAD_FIELD: &str = "file";
const PHOTO_CACHE_CONTROL: &str = "public, max-age=3600";

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge
    } else {
        AppError::InvalidInput(err.body_text())
    }
}

/// `POST /photo`, multipart with an image in field `file`
pub async fn upload_photo(
    State(state): State<Arc<AppState>>,
    CurrentPrincipal(me): CurrentPrincipal,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    let mut multipart = multipart.map_err(|e| AppError::InvalidInput(e.body_text()))?;

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let is_image = field
            .content_type()
            .is_some_and(|ct| ct.starts_with("image/"));
        if !is_image {
            return Err(AppError::UnsupportedMediaType);
        }
        let extension = upload_extension(field.file_name());

        let mut body = BytesMut::new();
        while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
            if body.len() + chunk.len() > MAX_UPLOAD_BYTES {
                return Err(AppError::PayloadTooLarge);
            }
            body.extend_from_slice(&chunk);
        }

        let filename = state.media.upload(body.freeze(), &extension).await?;
        info!(principal = me.id, %filename, "photo stored");
        return Ok(Json(UploadResponse { filename }));
    }

    Err(AppError::InvalidInput(format!(
        "missing multipart field '{UPLOAD_FIELD}'"
    )))
}

/// `GET /photo/{filename}`, bytes straight from the object store
pub async fn serve_photo(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    let (body, content_type) = state.media.fetch_object(&filename).await?;
    Ok((
        [(CONTENT_TYPE, content_type), (CACHE_CONTROL, PHOTO_CACHE_CONTROL)],
        body,
    )
        .into_response())
}

/// `GET /photo/{filename}/url`, redirect to a time-limited link
pub async fn photo_url(
    State(state): State<Arc<AppState>>,
    CurrentPrincipal(_): CurrentPrincipal,
    Path(filename): Path<String>,
) -> Result<Redirect, AppError> {
    let url = state
        .media
        .presigned_url(&filename, PRESIGNED_URL_TTL_SECS)
        .await?;
    Ok(Redirect::temporary(&url))
}
