// src/errors.rs
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("{0}")]
    Provider(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl ResponseError for GatewayError {
    fn error_response(&self) -> HttpResponse {
        let body = serde_json::json!({ "error": self.to_string() });
        match self {
            GatewayError::Validation(_) => HttpResponse::BadRequest().json(body),
            GatewayError::NotFound(_) => HttpResponse::NotFound().json(body),
            GatewayError::PayloadTooLarge(_) => HttpResponse::PayloadTooLarge().json(body),
            GatewayError::Provider(_) => HttpResponse::InternalServerError().json(body),
            GatewayError::Io(_) => HttpResponse::InternalServerError().json(body),
        }
    }
}

impl From<std::io::Error> for GatewayError {
    fn from(e: std::io::Error) -> Self {
        GatewayError::Io(e.to_string())
    }
}
