// src/handlers.rs
use crate::{AppState, errors::GatewayError, models::*};
use actix_multipart::Multipart;
use actix_web::{Error, HttpResponse, web};
use futures_util::TryStreamExt;

/// Replaces actix's default deserialization error with the fixed payload the
/// frontend expects on a malformed body.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let response =
            HttpResponse::BadRequest().json(serde_json::json!({ "error": "Invalid JSON" }));
        actix_web::error::InternalError::from_response(err, response).into()
    })
}

pub async fn ask(
    body: web::Json<AskRequest>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let body = body.into_inner();

    let answer = data
        .qa
        .generate(&body.question, body.user_details.as_ref())
        .await?;

    Ok(HttpResponse::Ok().json(AskResponse {
        question: body.question,
        answer,
    }))
}

pub async fn predict(
    path: web::Path<String>,
    mut payload: Multipart,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let modality = Modality::from_route(&path)
        .ok_or_else(|| GatewayError::NotFound(format!("Unknown modality: {path}")))?;

    let mut filename = String::new();
    let mut file_data = Vec::new();
    let mut file_seen = false;

    while let Some(mut field) = payload.try_next().await? {
        if field.name() != "file" {
            continue;
        }
        file_seen = true;
        filename = field
            .content_disposition()
            .get_filename()
            .unwrap_or_default()
            .to_string();

        while let Some(chunk) = field.try_next().await? {
            if file_data.len() + chunk.len() > data.settings.max_upload_bytes {
                return Err(GatewayError::PayloadTooLarge(format!(
                    "File exceeds the {} byte limit",
                    data.settings.max_upload_bytes
                ))
                .into());
            }
            file_data.extend_from_slice(&chunk);
        }
    }

    if !file_seen {
        return Err(GatewayError::Validation("No file provided".to_string()).into());
    }

    let result = data.detector.detect(&filename, &file_data, modality).await?;
    Ok(HttpResponse::Ok().json(result))
}

pub async fn chat(body: web::Json<ChatRequest>, data: web::Data<AppState>) -> HttpResponse {
    let body = body.into_inner();

    if body.message.is_empty() {
        return HttpResponse::BadRequest().json(ChatResponse {
            reply: "Please enter a message.".to_string(),
        });
    }

    match data.chat.send(body.session_id.as_deref(), &body.message).await {
        Ok(reply) => HttpResponse::Ok().json(ChatResponse { reply }),
        Err(e) => HttpResponse::InternalServerError().json(ChatResponse {
            reply: format!("Error: {e}"),
        }),
    }
}
