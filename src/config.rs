// src/config.rs
use log::warn;
use std::path::PathBuf;

/// Credentials and model selector for one hosted detection model.
#[derive(Debug, Clone)]
pub struct ModelEndpoint {
    pub api_key: String,
    pub model_id: String,
}

/// Everything the gateway reads from the environment, collected once at
/// startup. Missing API keys are tolerated (with a warning) so the service
/// can still boot for local development; calls against them will fail at the
/// provider.
#[derive(Debug, Clone)]
pub struct Settings {
    pub bind_addr: String,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub inference_api_url: String,
    pub brain: ModelEndpoint,
    pub lung: ModelEndpoint,
    pub fracture: ModelEndpoint,
    pub gemini_api_url: String,
    pub gemini_api_key: String,
    pub gemini_model: String,
}

const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024; // 16 MiB

impl Settings {
    pub fn from_env() -> Self {
        let max_upload_bytes = std::env::var("MAX_UPLOAD_BYTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);

        Self {
            bind_addr: env_or("BIND_ADDR", "0.0.0.0:5002"),
            upload_dir: PathBuf::from(env_or("UPLOAD_DIR", "uploads")),
            max_upload_bytes,
            inference_api_url: env_or("INFERENCE_API_URL", "https://detect.roboflow.com"),
            brain: ModelEndpoint {
                api_key: key_or_warn("BRAIN_API_KEY"),
                model_id: env_or("BRAIN_MODEL_ID", "medical-imaging-for-brain-tumor-y8b1a/1"),
            },
            lung: ModelEndpoint {
                api_key: key_or_warn("LUNG_API_KEY"),
                model_id: env_or("LUNG_MODEL_ID", "lung-cancer-pzkbq-m1ocw/1"),
            },
            fracture: ModelEndpoint {
                api_key: key_or_warn("FRACTURE_API_KEY"),
                model_id: env_or("FRACTURE_MODEL_ID", "break-bone/1"),
            },
            gemini_api_url: env_or(
                "GEMINI_API_URL",
                "https://generativelanguage.googleapis.com/v1beta",
            ),
            gemini_api_key: key_or_warn("GEMINI_API_KEY"),
            gemini_model: env_or("GEMINI_MODEL", "gemini-1.5-flash"),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn key_or_warn(key: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| {
        warn!("{key} is not set; requests using it will fail at the provider");
        String::new()
    })
}
