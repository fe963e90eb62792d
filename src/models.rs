// src/models.rs
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of `POST /api`. `userDetails` is an opaque blob the frontend attaches
/// (patient profile, vitals); it is forwarded to the answer generator as-is.
#[derive(Debug, Clone, Deserialize)]
pub struct AskRequest {
    #[serde(default)]
    pub question: String,
    #[serde(rename = "userDetails")]
    pub user_details: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AskResponse {
    pub question: String,
    pub answer: String,
}

/// Body of `POST /chat`. Callers that want an isolated conversation pass a
/// stable `sessionId`; without one they share a single anonymous session.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub reply: String,
}

/// Imaging domain selector. Each modality maps to an independently configured
/// (api_key, model_id) pair on the detection provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modality {
    Brain,
    Lung,
    Fracture,
}

impl Modality {
    /// Maps the public route segment to a modality: the frontend speaks in
    /// scan types (mri/ct/xray), the provider config in body parts.
    pub fn from_route(segment: &str) -> Option<Self> {
        match segment {
            "mri" => Some(Modality::Brain),
            "ct" => Some(Modality::Lung),
            "xray" => Some(Modality::Fracture),
            _ => None,
        }
    }
}

impl std::fmt::Display for Modality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Modality::Brain => "brain",
            Modality::Lung => "lung",
            Modality::Fracture => "fracture",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_segments_map_to_modalities() {
        assert_eq!(Modality::from_route("mri"), Some(Modality::Brain));
        assert_eq!(Modality::from_route("ct"), Some(Modality::Lung));
        assert_eq!(Modality::from_route("xray"), Some(Modality::Fracture));
        assert_eq!(Modality::from_route("pet"), None);
        assert_eq!(Modality::from_route(""), None);
    }

    #[test]
    fn chat_request_defaults_missing_message_to_empty() {
        let req: ChatRequest = serde_json::from_str("{}").unwrap();
        assert!(req.message.is_empty());
        assert!(req.session_id.is_none());
    }
}
