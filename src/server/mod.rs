//! Web UI and JSON API.

mod handlers;

pub use handlers::{decode_upload, AppState};

use actix_web::{web, App, HttpServer};
use std::sync::Arc;

use crate::{config::Config, editor::Editor, models::EditParams};

/// Uploads arrive base64-encoded inside JSON.
pub const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().limit(MAX_BODY_BYTES))
        .service(handlers::index)
        .service(handlers::health)
        .service(handlers::edit);
}

pub fn app_state(editor: Arc<Editor>, config: &Config) -> web::Data<AppState> {
    web::Data::new(AppState {
        editor,
        defaults: EditParams::from_config(config),
    })
}

pub async fn serve(editor: Arc<Editor>, config: &Config) -> std::io::Result<()> {
    let state = app_state(editor, config);
    let bind = (config.host.clone(), config.port());

    HttpServer::new(move || App::new().app_data(state.clone()).configure(configure))
        .bind(bind)?
        .run()
        .await
}
