use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Extension, Multipart, Path, Query, multipart::MultipartError},
    http::{Method, StatusCode, header},
    response::IntoResponse,
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::errors::{GalleryError, Result};
use crate::metadata::FileRecord;
use crate::service::{DeleteAllReport, GalleryService, Upload};

#[derive(Clone)]
pub struct AppState {
    pub service: GalleryService,
    pub max_file_size_mb: u64,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub id: i64,
    pub filename: String,
    pub descricao: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteAllResponse {
    pub message: String,
    #[serde(flatten)]
    pub report: DeleteAllReport,
}

#[derive(Debug, Deserialize)]
pub struct GalleryQuery {
    pub tipo: Option<String>,
}

pub fn create_router(state: AppState) -> Router {
    let body_limit = usize::try_from(state.max_file_size_mb)
        .unwrap_or(usize::MAX)
        .saturating_mul(1024 * 1024);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/", get(health))
        .route("/upload", post(upload))
        .route("/galeria", get(list_gallery))
        .route("/uploads/{filename}", get(serve_file))
        .route("/delete/{id}", delete(delete_file))
        .route("/delete_all", delete(delete_all))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(Extension(state))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
}

async fn health() -> &'static str {
    "OK"
}

fn multipart_error(e: MultipartError, max_file_size_mb: u64) -> GalleryError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        GalleryError::PayloadTooLarge(max_file_size_mb)
    } else {
        GalleryError::Validation(e.body_text())
    }
}

async fn upload(
    Extension(state): Extension<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    let limit = state.max_file_size_mb;
    let mut file: Option<(String, Option<String>, Vec<u8>)> = None;
    let mut description = String::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(|m| m.to_string());
                let data = field.bytes().await.map_err(|e| multipart_error(e, limit))?;
                file = Some((filename, content_type, data.to_vec()));
            }
            Some("descricao") | Some("description") => {
                description = field.text().await.map_err(|e| multipart_error(e, limit))?;
            }
            _ => {}
        }
    }

    let (original_name, content_type, bytes) =
        file.ok_or_else(|| GalleryError::Validation("No file sent".to_string()))?;

    let mime_type = content_type.unwrap_or_else(|| {
        mime_guess::from_path(&original_name)
            .first_or_octet_stream()
            .to_string()
    });

    let stored = state
        .service
        .upload(Upload {
            original_name,
            mime_type,
            description,
            bytes,
        })
        .await?;

    Ok(Json(UploadResponse {
        message: "File uploaded successfully".to_string(),
        id: stored.id,
        filename: stored.stored_name,
        descricao: stored.description,
    }))
}

async fn list_gallery(
    Extension(state): Extension<AppState>,
    Query(query): Query<GalleryQuery>,
) -> Result<Json<Vec<FileRecord>>> {
    let filter = query.tipo.as_deref().filter(|t| !t.is_empty());
    let records = state.service.list(filter).await?;
    Ok(Json(records))
}

async fn serve_file(
    Path(filename): Path<String>,
    Extension(state): Extension<AppState>,
) -> Result<impl IntoResponse> {
    let bytes = state.service.fetch(&filename).await?;
    let content_type = mime_guess::from_path(&filename).first_or_octet_stream();

    Ok(([(header::CONTENT_TYPE, content_type.to_string())], bytes))
}

async fn delete_file(
    Path(id): Path<i64>,
    Extension(state): Extension<AppState>,
) -> Result<Json<MessageResponse>> {
    state.service.delete_by_id(id).await?;
    Ok(Json(MessageResponse {
        message: "File removed successfully".to_string(),
    }))
}

async fn delete_all(Extension(state): Extension<AppState>) -> Result<Json<DeleteAllResponse>> {
    let report = state.service.delete_all().await?;
    Ok(Json(DeleteAllResponse {
        message: "All files were removed".to_string(),
        report,
    }))
}
