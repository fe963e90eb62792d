// src/services/chat.rs
use crate::errors::GatewayError;
use async_trait::async_trait;
use log::{debug, error};
use regex::Regex;
use reqwest::Client;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

const SYSTEM_PROMPT: &str = "You are a concise and friendly AI medical assistant chatbot. \
    Answer in clear bullet points when applicable. \
    Avoid markdown formatting like asterisks or bold symbols. \
    Keep responses short and readable for web chat.";

const TRUNCATION_NOTICE: &str = "...and more. Please ask for specific guidance.";
const MAX_REPLY_LINES: usize = 12;

/// Turns retained per session; older turns are dropped from the front.
const MAX_HISTORY_TURNS: usize = 40;
/// Sessions untouched this long are evicted on the next chat call.
const IDLE_TTL: Duration = Duration::from_secs(30 * 60);

/// Key used when the caller does not supply a sessionId. All anonymous
/// callers share this one conversation.
const ANONYMOUS_SESSION: &str = "anonymous";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Model,
}

impl Role {
    fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

/// Seam to the hosted conversational model. Takes the full retained history
/// (last entry is the pending user message) and returns the raw reply text.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn generate(&self, history: &[Turn]) -> Result<String, GatewayError>;
}

struct Session {
    history: Vec<Turn>,
    last_used: Instant,
}

impl Session {
    fn new() -> Self {
        Self {
            history: Vec::new(),
            last_used: Instant::now(),
        }
    }
}

/// Conversational gateway. Sessions are keyed by caller-supplied id; each
/// session's history is guarded by its own lock, so two requests into the
/// same conversation cannot interleave turns.
pub struct ChatService {
    model: Arc<dyn ChatModel>,
    sessions: Mutex<HashMap<String, Arc<Mutex<Session>>>>,
}

impl ChatService {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self {
            model,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub async fn send(&self, session_id: Option<&str>, message: &str) -> Result<String, GatewayError> {
        let key = session_id.unwrap_or(ANONYMOUS_SESSION);
        let session = self.session_handle(key).await;
        let mut session = session.lock().await;

        session.history.push(Turn {
            role: Role::User,
            text: message.to_string(),
        });

        let raw = match self.model.generate(&session.history).await {
            Ok(text) => text,
            Err(e) => {
                // A failed call must not poison the conversation.
                session.history.pop();
                error!("chat generation failed: {e}");
                return Err(e);
            }
        };

        session.history.push(Turn {
            role: Role::Model,
            text: raw.clone(),
        });
        if session.history.len() > MAX_HISTORY_TURNS {
            let excess = session.history.len() - MAX_HISTORY_TURNS;
            session.history.drain(..excess);
        }
        session.last_used = Instant::now();

        Ok(clean_reply(&raw))
    }

    async fn session_handle(&self, key: &str) -> Arc<Mutex<Session>> {
        let mut sessions = self.sessions.lock().await;
        Self::evict_idle(&mut sessions, IDLE_TTL);
        sessions
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(Session::new())))
            .clone()
    }

    /// Drops sessions idle past `ttl`. A session whose lock is held is in
    /// use and is always kept.
    fn evict_idle(sessions: &mut HashMap<String, Arc<Mutex<Session>>>, ttl: Duration) {
        sessions.retain(|key, session| match session.try_lock() {
            Ok(guard) => {
                let keep = guard.last_used.elapsed() < ttl;
                if !keep {
                    debug!("evicting idle chat session {key}");
                }
                keep
            }
            Err(_) => true,
        });
    }
}

static ASTERISK_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*+").unwrap());
static PADDED_BLANK_LINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\s*\n").unwrap());
static NEWLINE_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{2,}").unwrap());

/// Normalizes a model reply for the web chat widget: strips leftover markdown
/// asterisks, collapses blank lines, trims, and caps the reply at
/// `MAX_REPLY_LINES` lines plus a fixed truncation notice. Idempotent.
pub fn clean_reply(text: &str) -> String {
    let text = ASTERISK_RUNS.replace_all(text, "");
    let text = PADDED_BLANK_LINES.replace_all(&text, "\n");
    let text = NEWLINE_RUNS.replace_all(&text, "\n");
    let text = text.trim();

    let lines: Vec<&str> = text.lines().collect();
    if lines.len() > MAX_REPLY_LINES {
        let mut kept = lines[..MAX_REPLY_LINES].to_vec();
        kept.push(TRUNCATION_NOTICE);
        kept.join("\n")
    } else {
        lines.join("\n")
    }
}

/// Production model: Gemini-style `generateContent` REST endpoint. Stateless
/// on the wire; the full retained history is sent on every call.
pub struct GeminiModel {
    client: Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl GeminiModel {
    pub fn new(api_url: String, api_key: String, model: String) -> Self {
        Self {
            client: Client::new(),
            api_url,
            api_key,
            model,
        }
    }
}

#[async_trait]
impl ChatModel for GeminiModel {
    async fn generate(&self, history: &[Turn]) -> Result<String, GatewayError> {
        let contents: Vec<_> = history
            .iter()
            .map(|turn| {
                json!({
                    "role": turn.role.as_str(),
                    "parts": [{ "text": turn.text }]
                })
            })
            .collect();

        let response = self
            .client
            .post(format!(
                "{}/models/{}:generateContent",
                self.api_url, self.model
            ))
            .query(&[("key", self.api_key.as_str())])
            .json(&json!({
                "systemInstruction": { "parts": [{ "text": SYSTEM_PROMPT }] },
                "contents": contents
            }))
            .send()
            .await
            .map_err(|e| GatewayError::Provider(format!("chat request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(GatewayError::Provider(format!(
                "chat provider returned {status}: {error_text}"
            )));
        }

        let result: serde_json::Value = response
            .json()
            .await
            .map_err(|e| GatewayError::Provider(format!("invalid chat response: {e}")))?;

        result["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| GatewayError::Provider("no text in chat response".to_string()))
    }
}
