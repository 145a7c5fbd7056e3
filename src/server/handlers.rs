use actix_web::{get, http::StatusCode, post, web, HttpResponse, ResponseError};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::DynamicImage;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    editor::Editor,
    error::{EditError, Result},
    models::{EditParams, EditRequest, EditResponse, ErrorResponse, HealthResponse},
    pipeline::remote::encode_png,
};

const INDEX_HTML: &str = include_str!("index.html");

pub struct AppState {
    pub editor: Arc<Editor>,
    pub defaults: EditParams,
}

impl ResponseError for EditError {
    fn status_code(&self) -> StatusCode {
        if self.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.to_string(),
        })
    }
}

/// Decode an uploaded image given as plain base64 or as a `data:` URL.
pub fn decode_upload(encoded: &str) -> Result<DynamicImage> {
    let encoded = encoded.trim();
    let payload = match encoded.split_once(',') {
        Some((header, data)) if header.starts_with("data:") => data,
        _ => encoded,
    };
    if payload.is_empty() {
        return Err(EditError::invalid("image", "no image uploaded"));
    }

    let bytes = STANDARD
        .decode(payload)
        .map_err(|e| EditError::invalid("image", format!("invalid base64: {}", e)))?;
    image::load_from_memory(&bytes).map_err(EditError::ImageDecode)
}

#[get("/")]
async fn index() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(INDEX_HTML)
}

#[get("/health")]
async fn health(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
        pipeline_loaded: state.editor.pipelines().is_loaded(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[post("/api/edit")]
async fn edit(
    state: web::Data<AppState>,
    body: web::Json<EditRequest>,
) -> std::result::Result<HttpResponse, EditError> {
    let request_id = Uuid::new_v4().to_string();
    let request = body.into_inner();
    let params = request.params(&state.defaults);
    params.validate()?;

    log::info!("📥 [{}] Edit request: {:?}", request_id, request.prompt);
    let source = decode_upload(&request.image)?;

    let outcome = match state.editor.edit(&source, &request.prompt, &params).await {
        Ok(outcome) => outcome,
        Err(e) => {
            log::error!("❌ [{}] Edit failed: {}", request_id, e);
            return Err(e);
        }
    };
    for warning in &outcome.warnings {
        log::warn!("⚠️  [{}] {}", request_id, warning);
    }

    let (width, height) = outcome.image.dimensions();
    let image = outcome.image;
    let encoded = tokio::task::spawn_blocking(move || encode_png(&image)).await??;

    let response = EditResponse {
        request_id,
        image: encoded,
        seed: outcome.seed,
        path: outcome.path.display().to_string(),
        width,
        height,
        warnings: outcome.warnings,
    };
    log::info!("✅ [{}] Edit complete, seed {}", response.request_id, response.seed);

    Ok(HttpResponse::Ok().json(response))
}
