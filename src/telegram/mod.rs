use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;

/// What went wrong talking to the Bot API. The publisher branches on this:
/// `Network` defers to the next tick, everything else falls back to a fresh
/// send.
#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("message to edit not found")]
    NotFound,
    #[error("message can no longer be edited")]
    Stale,
    #[error("telegram api error {code}: {description}")]
    Api { code: i64, description: String },
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error_code: Option<i64>,
    #[serde(default)]
    description: Option<String>,
}

/// Thin Bot API client; only the three methods this service needs.
pub struct TelegramApi {
    bot_token: String,
    api_base: String,
    client: reqwest::Client,
}

impl TelegramApi {
    pub fn new(bot_token: String) -> Self {
        Self {
            bot_token,
            api_base: "https://api.telegram.org".into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_api_base(mut self, api_base: String) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_base, self.bot_token)
    }

    async fn call(&self, method: &str, body: Value) -> Result<Value, TelegramError> {
        let response = self
            .client
            .post(self.api_url(method))
            .json(&body)
            .send()
            .await?;

        // A gateway hiccup serving HTML instead of JSON lands in `Network`
        // via the decode error, which is the right retry class for it.
        let parsed: ApiResponse = response.json().await?;
        if parsed.ok {
            Ok(parsed.result.unwrap_or(Value::Null))
        } else {
            Err(classify(parsed.error_code, parsed.description))
        }
    }

    pub async fn send_message(&self, chat_id: &str, html: &str) -> Result<i64, TelegramError> {
        let result = self
            .call(
                "sendMessage",
                json!({
                    "chat_id": chat_id,
                    "text": html,
                    "parse_mode": "HTML",
                    "disable_web_page_preview": true,
                }),
            )
            .await?;
        message_id(&result)
    }

    pub async fn edit_message(
        &self,
        chat_id: &str,
        message_id_to_edit: i64,
        html: &str,
    ) -> Result<i64, TelegramError> {
        let result = self
            .call(
                "editMessageText",
                json!({
                    "chat_id": chat_id,
                    "message_id": message_id_to_edit,
                    "text": html,
                    "parse_mode": "HTML",
                    "disable_web_page_preview": true,
                }),
            )
            .await?;
        message_id(&result)
    }

    /// The bot's own username, as a connectivity check.
    pub async fn get_me(&self) -> Result<String, TelegramError> {
        let result = self.call("getMe", json!({})).await?;
        Ok(result
            .get("username")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string())
    }
}

fn message_id(result: &Value) -> Result<i64, TelegramError> {
    result
        .get("message_id")
        .and_then(Value::as_i64)
        .ok_or_else(|| TelegramError::Api {
            code: 0,
            description: "response missing message_id".into(),
        })
}

fn classify(code: Option<i64>, description: Option<String>) -> TelegramError {
    let description = description.unwrap_or_default();
    let lowered = description.to_lowercase();
    if lowered.contains("message to edit not found") {
        TelegramError::NotFound
    } else if lowered.contains("can't be edited") {
        TelegramError::Stale
    } else {
        TelegramError::Api {
            code: code.unwrap_or(0),
            description,
        }
    }
}
