use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::post,
    Json, Router,
};
use bytes::Bytes;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::jwt::AuthUser,
    error::{ApiError, ApiResult},
    state::AppState,
    storage::StorageClient,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/uploads/presigned-url", post(presigned_url))
        .route(
            "/uploads/image",
            post(upload_image).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + 64 * 1024)),
        )
}

const ALLOWED_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/webp"];
const UPLOAD_URL_TTL_SECONDS: u64 = 3600;
const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

fn check_content_type(content_type: &str) -> ApiResult<()> {
    if !ALLOWED_IMAGE_TYPES.contains(&content_type) {
        return Err(ApiError::BadRequest(
            "Content type not allowed, use JPEG, PNG, GIF or WebP".into(),
        ));
    }
    Ok(())
}

/// Strips any path components the client may have sent.
fn sanitize_file_name(raw: &str) -> ApiResult<&str> {
    let name = raw.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("file_name is required".into()));
    }
    Ok(name)
}

fn object_key(user_id: Uuid, file_name: &str) -> String {
    format!("movies/{}/{}-{}", user_id, Uuid::new_v4(), file_name)
}

/// Validates and stores one image, returning the object key and a
/// time-limited download URL.
async fn store_image(
    storage: &dyn StorageClient,
    user_id: Uuid,
    file_name: &str,
    content_type: &str,
    data: Bytes,
) -> ApiResult<(String, String)> {
    check_content_type(content_type)?;
    if data.is_empty() {
        return Err(ApiError::BadRequest("No file was sent".into()));
    }
    if data.len() > MAX_UPLOAD_BYTES {
        return Err(ApiError::BadRequest("File too large, maximum is 5MB".into()));
    }

    let key = object_key(user_id, sanitize_file_name(file_name)?);
    storage.put_object(&key, data, content_type).await?;
    let url = storage.presign_get(&key, UPLOAD_URL_TTL_SECONDS).await?;
    Ok((key, url))
}

#[derive(Debug, Deserialize)]
struct PresignedUrlRequest {
    file_name: String,
    content_type: String,
}

/// Hands the client a presigned S3 PUT URL for a poster image, so the upload
/// itself bypasses this service.
#[instrument(skip(state, payload))]
async fn presigned_url(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<PresignedUrlRequest>,
) -> ApiResult<Json<Value>> {
    check_content_type(&payload.content_type)?;
    let key = object_key(user_id, sanitize_file_name(&payload.file_name)?);

    let url = state
        .storage
        .presign_put(&key, &payload.content_type, UPLOAD_URL_TTL_SECONDS)
        .await?;

    Ok(Json(json!({
        "presigned_url": url,
        "key": key,
        "content_type": payload.content_type,
        "expires_in": UPLOAD_URL_TTL_SECONDS,
    })))
}

/// Direct multipart upload of a poster image, capped at 5MB. Expects the
/// file under the `image` field.
#[instrument(skip(state, multipart))]
async fn upload_image(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mut multipart: Multipart,
) -> ApiResult<Json<Value>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::BadRequest("Malformed multipart body".into()))?
    {
        if field.name() != Some("image") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|_| ApiError::BadRequest("Failed to read uploaded file".into()))?;
        let size = data.len();

        let (key, url) =
            store_image(state.storage.as_ref(), user_id, &file_name, &content_type, data).await?;

        info!(user_id = %user_id, key = %key, size, "image uploaded");
        return Ok(Json(json!({
            "message": "Image uploaded",
            "image_url": url,
            "key": key,
            "file_name": file_name,
            "size": size,
        })));
    }

    Err(ApiError::BadRequest("No file was sent".into()))
}
