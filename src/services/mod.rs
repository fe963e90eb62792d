// src/services/mod.rs
pub mod chat;
pub mod detector;
pub mod qa;

pub use chat::{ChatModel, ChatService, GeminiModel};
pub use detector::DetectorService;
pub use qa::{AnswerGenerator, GeminiAnswerGenerator};
