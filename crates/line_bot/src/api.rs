use api_types::reply::{ErrorBody, Message, ReplyRequest};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, header};

pub const DEFAULT_API_URL: &str = "https://api.line.me";

/// LINE rejects text messages longer than this.
const MAX_TEXT_CHARS: usize = 5000;

#[derive(Debug, thiserror::Error)]
pub enum ReplyError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("{status}: {message}")]
    Server { status: StatusCode, message: String },
    #[error("invalid channel access token: {0}")]
    InvalidToken(String),
}

/// Sends the answer to one inbound event.
#[async_trait]
pub trait ReplySender: Send + Sync {
    async fn reply(&self, reply_token: &str, text: &str) -> Result<(), ReplyError>;
}

/// Messaging API client authenticated with a channel access token.
#[derive(Clone, Debug)]
pub struct LineClient {
    client: Client,
    base_url: String,
}

impl LineClient {
    pub fn new(access_token: &str) -> Result<Self, ReplyError> {
        Self::with_base_url(access_token, DEFAULT_API_URL)
    }

    pub fn with_base_url(access_token: &str, base_url: &str) -> Result<Self, ReplyError> {
        let mut auth = header::HeaderValue::try_from(format!("Bearer {access_token}"))
            .map_err(|err| ReplyError::InvalidToken(err.to_string()))?;
        auth.set_sensitive(true);

        let mut headers = header::HeaderMap::new();
        headers.insert(header::AUTHORIZATION, auth);

        let client = Client::builder().default_headers(headers).build()?;
        Ok(Self {
            client,
            base_url: base_url.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl ReplySender for LineClient {
    async fn reply(&self, reply_token: &str, text: &str) -> Result<(), ReplyError> {
        let body = ReplyRequest {
            reply_token: reply_token.to_string(),
            messages: vec![Message::Text {
                text: clip(text, MAX_TEXT_CHARS),
            }],
        };

        let resp = self
            .client
            .post(self.url("/v2/bot/message/reply"))
            .json(&body)
            .send()
            .await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }

        let message = match resp.json::<ErrorBody>().await {
            Ok(err) => err.message,
            Err(_) => "line api error".to_string(),
        };
        Err(ReplyError::Server { status, message })
    }
}

fn clip(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
