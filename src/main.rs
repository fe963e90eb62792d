// src/main.rs
use actix_cors::Cors;
use actix_web::{App, HttpResponse, HttpServer, middleware, web};
use log::info;
use std::sync::Arc;

mod config;
mod errors;
mod handlers;
mod models;
mod services;

use crate::config::Settings;
use crate::handlers::{ask, chat, json_config, predict};
use crate::services::{
    AnswerGenerator, ChatService, DetectorService, GeminiAnswerGenerator, GeminiModel,
};

#[derive(Clone)]
pub struct AppState {
    settings: Settings,
    detector: Arc<DetectorService>,
    chat: Arc<ChatService>,
    qa: Arc<dyn AnswerGenerator>,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    info!("Starting medgate service...");

    let settings = Settings::from_env();
    std::fs::create_dir_all(&settings.upload_dir)?;

    let detector = Arc::new(DetectorService::new(&settings));
    let chat_service = Arc::new(ChatService::new(Arc::new(GeminiModel::new(
        settings.gemini_api_url.clone(),
        settings.gemini_api_key.clone(),
        settings.gemini_model.clone(),
    ))));
    let qa: Arc<dyn AnswerGenerator> = Arc::new(GeminiAnswerGenerator::new(
        settings.gemini_api_url.clone(),
        settings.gemini_api_key.clone(),
        settings.gemini_model.clone(),
    ));

    let bind_addr = settings.bind_addr.clone();
    let max_payload = settings.max_upload_bytes;

    let app_state = AppState {
        settings,
        detector,
        chat: chat_service,
        qa,
    };

    info!("Starting HTTP server on {bind_addr}");

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(json_config())
            .app_data(web::PayloadConfig::new(max_payload))
            .wrap(middleware::Logger::default())
            .wrap(Cors::permissive())
            .route("/api", web::post().to(ask))
            .route("/predict/{modality}", web::post().to(predict))
            .route("/chat", web::post().to(chat))
            .route("/health", web::get().to(health_check))
    })
    .bind(bind_addr)?
    .run()
    .await
}

async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "medgate",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
