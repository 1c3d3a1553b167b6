use std::path::PathBuf;

use axum::body::Body;
use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::Json;
use common::storage::BoxReader;
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::instrument;
use uuid::Uuid;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::models::image::{ImageResponse, MessageResponse, UploadResponse, parse_tags};
use crate::service::NewUpload;
use crate::state::AppState;

/// Body limit for the multipart upload route. Slightly above the blob size
/// cap so oversize files get our VALIDATION_ERROR, not a transport 413.
pub fn upload_body_limit() -> DefaultBodyLimit {
    DefaultBodyLimit::max(12 * 1024 * 1024)
}

/// The file part of a multipart upload, buffered to a temp file so it can
/// be handed to the service as an owned reader.
struct BufferedUpload {
    temp_path: PathBuf,
    size: u64,
    original_name: String,
    content_type: String,
}

#[utoipa::path(
    post,
    path = "/api/images/upload",
    tag = "Images",
    operation_id = "uploadImage",
    request_body(
        content_type = "multipart/form-data",
        description = "An `image` file part plus optional `description` and `tags` (comma-separated) text parts",
    ),
    responses(
        (status = 201, description = "Image uploaded", body = UploadResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, multipart), fields(user_id = auth_user.user_id))]
pub async fn upload(
    auth_user: AuthUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let (file, description, tags) =
        read_upload_form(multipart, state.config.storage.max_blob_size).await?;

    let result = async {
        let temp_file = tokio::fs::File::open(&file.temp_path)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to reopen temp file: {e}")))?;
        let reader: BoxReader = Box::new(temp_file);

        state
            .images
            .upload(
                &auth_user,
                NewUpload {
                    data: reader,
                    size: file.size,
                    original_name: file.original_name.clone(),
                    content_type: file.content_type.clone(),
                    description,
                    tags,
                },
            )
            .await
    }
    .await;

    // Best effort.
    let _ = tokio::fs::remove_file(&file.temp_path).await;

    let image = result?;

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            message: "Image uploaded successfully".into(),
            image,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/images",
    tag = "Images",
    operation_id = "listImages",
    responses(
        (status = 200, description = "The caller's images, newest first", body = [ImageResponse]),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn list(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<ImageResponse>>, AppError> {
    Ok(Json(state.images.list(&auth_user).await?))
}

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/images/search",
    tag = "Images",
    operation_id = "searchImages",
    params(("q" = Option<String>, Query, description = "Substring to match against name, description, or tags; empty returns the full list")),
    responses(
        (status = 200, description = "Matching images, newest first", body = [ImageResponse]),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, params), fields(user_id = auth_user.user_id))]
pub async fn search(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<ImageResponse>>, AppError> {
    let query = params.q.unwrap_or_default();
    Ok(Json(state.images.search(&auth_user, &query).await?))
}

#[utoipa::path(
    delete,
    path = "/api/images/{id}",
    tag = "Images",
    operation_id = "deleteImage",
    params(("id" = String, Path, description = "Image record ID (UUID)")),
    responses(
        (status = 200, description = "Image deleted", body = MessageResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Owned by another user (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Image not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id, image_id = %id))]
pub async fn delete(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let record_id =
        Uuid::parse_str(&id).map_err(|_| AppError::Validation("Invalid image ID".into()))?;

    state.images.delete(&auth_user, record_id).await?;

    Ok(Json(MessageResponse {
        message: "Image deleted successfully".into(),
    }))
}

/// Public, unauthenticated blob streaming. The blob id in the URL acts as
/// the capability: possession of a previously issued URL grants read
/// access regardless of the requesting principal.
#[utoipa::path(
    get,
    path = "/files/{blob_id}",
    tag = "Files",
    operation_id = "streamFile",
    params(("blob_id" = String, Path, description = "Blob ID from a previously issued image URL")),
    responses(
        (status = 200, description = "File content"),
        (status = 304, description = "Not Modified (ETag match)"),
        (status = 404, description = "File not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, headers), fields(blob_id = %blob_id))]
pub async fn stream_file(
    State(state): State<AppState>,
    Path(blob_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let (record, reader) = state.images.stream(&blob_id).await?;

    // Blobs are immutable, so the blob id doubles as a strong ETag.
    let etag_value = format!("\"{}\"", record.blob_id.simple());
    if let Some(if_none_match) = headers.get(header::IF_NONE_MATCH)
        && let Ok(val) = if_none_match.to_str()
        && (val == etag_value || val == "*")
    {
        return Ok(StatusCode::NOT_MODIFIED.into_response());
    }

    let stream = ReaderStream::new(reader);
    let body = Body::from_stream(stream);

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, &record.content_type)
        .header(header::CONTENT_LENGTH, record.size.to_string())
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_value(&record.original_name),
        )
        .header(header::ETAG, &etag_value)
        .header(header::CACHE_CONTROL, "private, max-age=3600")
        .body(body)
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))?;

    Ok(response)
}

/// Walk the multipart form, buffering the single `image` part and reading
/// the optional `description` and `tags` text parts.
///
/// Every error exit removes an already-buffered temp file first, so a
/// rejected form never leaves anything on disk.
async fn read_upload_form(
    mut multipart: Multipart,
    max_size: u64,
) -> Result<(BufferedUpload, Option<String>, Vec<String>), AppError> {
    async fn discard(file: &mut Option<BufferedUpload>) {
        if let Some(file) = file.take() {
            let _ = tokio::fs::remove_file(&file.temp_path).await;
        }
    }

    let mut file: Option<BufferedUpload> = None;
    let mut description: Option<String> = None;
    let mut tags: Vec<String> = Vec::new();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                discard(&mut file).await;
                return Err(AppError::Validation(format!("Multipart error: {e}")));
            }
        };

        match field.name() {
            Some("image") => {
                if file.is_some() {
                    discard(&mut file).await;
                    return Err(AppError::Validation(
                        "Only one image file per upload".into(),
                    ));
                }
                file = Some(buffer_upload_field(field, max_size).await?);
            }
            Some("description") => match field.text().await {
                Ok(text) => {
                    if !text.trim().is_empty() {
                        description = Some(text);
                    }
                }
                Err(e) => {
                    discard(&mut file).await;
                    return Err(AppError::Validation(format!(
                        "Failed to read description: {e}"
                    )));
                }
            },
            Some("tags") => match field.text().await {
                Ok(text) => tags = parse_tags(&text),
                Err(e) => {
                    discard(&mut file).await;
                    return Err(AppError::Validation(format!("Failed to read tags: {e}")));
                }
            },
            _ => {} // Ignore unknown fields.
        }
    }

    match file {
        Some(file) => Ok((file, description, tags)),
        None => Err(AppError::Validation("Please upload a file".into())),
    }
}

/// Buffer one multipart file field into a temp file, enforcing the size cap
/// while writing. The caller owns the temp path and removes it when done.
async fn buffer_upload_field(
    mut field: axum::extract::multipart::Field<'_>,
    max_size: u64,
) -> Result<BufferedUpload, AppError> {
    let original_name = field
        .file_name()
        .map(|s| s.to_string())
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| AppError::Validation("File field must have a filename".into()))?;

    // Prefer the declared part content type; fall back to the extension.
    let content_type = field
        .content_type()
        .map(|s| s.to_string())
        .or_else(|| {
            mime_guess::from_path(&original_name)
                .first()
                .map(|m| m.to_string())
        })
        .ok_or_else(|| AppError::Validation("Could not determine file content type".into()))?;

    let temp_path = std::env::temp_dir().join(format!("pixelbin-upload-{}", Uuid::new_v4()));

    let result = async {
        let mut temp_file = tokio::fs::File::create(&temp_path)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to create temp file: {e}")))?;

        let mut total_size: u64 = 0;

        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| AppError::Validation(format!("Upload read error: {e}")))?
        {
            total_size += chunk.len() as u64;
            if total_size > max_size {
                return Err(AppError::Validation(format!(
                    "File exceeds maximum size of {max_size} bytes"
                )));
            }
            temp_file
                .write_all(&chunk)
                .await
                .map_err(|e| AppError::Internal(format!("Temp file write failed: {e}")))?;
        }

        temp_file
            .flush()
            .await
            .map_err(|e| AppError::Internal(format!("Temp file flush failed: {e}")))?;

        Ok(BufferedUpload {
            temp_path: temp_path.clone(),
            size: total_size,
            original_name,
            content_type,
        })
    }
    .await;

    if result.is_err() {
        let _ = tokio::fs::remove_file(&temp_path).await;
    }

    result
}

/// Build a safe `Content-Disposition` header value from an untrusted
/// filename.
fn content_disposition_value(filename: &str) -> String {
    let ascii_safe: String = filename
        .chars()
        .filter(|c| c.is_ascii_graphic() && !matches!(c, '"' | ';' | '\\'))
        .collect();
    let ascii_name = if ascii_safe.is_empty() {
        "download".to_string()
    } else {
        ascii_safe
    };

    // RFC 5987 percent-encoding for filename*.
    let encoded: String = filename
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'!'
            | b'#'
            | b'$'
            | b'&'
            | b'+'
            | b'-'
            | b'.'
            | b'^'
            | b'_'
            | b'`'
            | b'|'
            | b'~' => String::from(b as char),
            _ => format!("%{b:02X}"),
        })
        .collect();

    format!("inline; filename=\"{ascii_name}\"; filename*=UTF-8''{encoded}")
}
