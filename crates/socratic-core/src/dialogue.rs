use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::state::{ChatMessage, HistoryEntry, MessageMeta};

/// Where the dialogue service listens when nothing else is configured
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";

/// Banner text used when a failure carries no server-supplied detail
pub const FALLBACK_ERROR: &str = "Something went wrong talking to the AI. Please try again.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DialogueRequest {
    pub user_input: String,
    pub conversation_history: Vec<HistoryEntry>,
}

/// Success body as it arrives; optional fields are filled in by `DialogueReply`
#[derive(Deserialize)]
struct RawReply {
    socratic_response: String,
    #[serde(default)]
    processed_input: Option<String>,
    #[serde(default)]
    tokens_used: Option<u64>,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<String>,
}

/// A validated reply from the dialogue endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogueReply {
    pub socratic_response: String,
    pub processed_input: String,
    pub tokens_used: Option<u64>,
}

impl DialogueReply {
    pub fn into_message(self) -> ChatMessage {
        ChatMessage::assistant(
            self.socratic_response,
            Some(MessageMeta {
                processed_input: self.processed_input,
                tokens_used: self.tokens_used.unwrap_or(0),
            }),
        )
    }
}

impl From<RawReply> for DialogueReply {
    fn from(raw: RawReply) -> Self {
        Self {
            socratic_response: raw.socratic_response,
            processed_input: raw.processed_input.unwrap_or_default(),
            tokens_used: raw.tokens_used,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DialogueError {
    /// The service answered with a non-success status
    #[error("dialogue request failed with status {status}")]
    Status { status: u16, detail: Option<String> },

    /// The request never produced a response (connect, DNS, timeout, ...)
    #[error("transport error: {0}")]
    Transport(String),

    /// A success status whose body could not be understood
    #[error("invalid dialogue response: {0}")]
    InvalidResponse(String),
}

impl DialogueError {
    pub fn detail(&self) -> Option<&str> {
        match self {
            DialogueError::Status { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    /// Text shown to the user: the server's detail verbatim, else the fallback
    pub fn user_message(&self) -> String {
        self.detail().unwrap_or(FALLBACK_ERROR).to_string()
    }
}

impl From<reqwest::Error> for DialogueError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DialogueError::Transport(format!("Request timed out: {}", err))
        } else if err.is_connect() {
            DialogueError::Transport(format!("Connection failed: {}", err))
        } else if err.is_decode() {
            DialogueError::InvalidResponse(err.to_string())
        } else {
            DialogueError::Transport(format!("Request failed: {}", err))
        }
    }
}

/// Pull a non-empty string `detail` out of an error body, if there is one
fn parse_detail(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.detail)
        .filter(|d| !d.is_empty())
}

/// The one outbound operation the coordinator depends on
#[async_trait]
pub trait DialogueBackend: Send + Sync {
    async fn dialogue(&self, request: &DialogueRequest) -> Result<DialogueReply, DialogueError>;
}

#[derive(Clone, Debug)]
pub struct DialogueClient {
    client: Client,
    base_url: String,
}

impl DialogueClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, DialogueError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self) -> String {
        format!("{}/dialogue", self.base_url)
    }
}

#[async_trait]
impl DialogueBackend for DialogueClient {
    async fn dialogue(&self, request: &DialogueRequest) -> Result<DialogueReply, DialogueError> {
        let url = self.endpoint();
        debug!(
            %url,
            history_len = request.conversation_history.len(),
            "posting dialogue request"
        );

        let response = self.client.post(&url).json(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = parse_detail(&body);
            warn!(status = status.as_u16(), ?detail, "dialogue request rejected");
            return Err(DialogueError::Status {
                status: status.as_u16(),
                detail,
            });
        }

        let body = response.text().await?;
        let raw: RawReply = serde_json::from_str(&body)
            .map_err(|e| DialogueError::InvalidResponse(e.to_string()))?;
        Ok(raw.into())
    }
}
