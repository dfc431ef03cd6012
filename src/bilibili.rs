use crate::error_utils::create_http_client_with_context;
use anyhow::Result;
use reqwest::header::{HeaderMap, HeaderValue, REFERER};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

pub const BILIBILI_API_BASE: &str = "https://api.bilibili.com";

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const CARD_PATH: &str = "/x/web-interface/card";

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
const SPACE_REFERER: &str = "https://space.bilibili.com/";

/// Why a single user card could not be fetched
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Connection failure, timeout, or non-2xx HTTP status
    #[error("网络错误: {message}")]
    Network { message: String },

    /// Body was not JSON, or lacked the fields we read
    #[error("响应解析错误: {message}")]
    MalformedResponse { message: String },

    /// Well-formed response carrying a non-zero `code`
    #[error("API错误 (code {code}): {message}")]
    Api { code: i64, message: String },

    #[error("未知错误: {message}")]
    Unknown { message: String },
}

/// Public profile data for one user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub mid: String,
    pub name: String,
    pub fans: u64,
}

/// Result of one fetch attempt for one identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Fetched(UserRecord),
    Failed { mid: String, error: FetchError },
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Fetched(_))
    }

    /// Identifier this outcome belongs to
    pub fn mid(&self) -> &str {
        match self {
            Self::Fetched(record) => &record.mid,
            Self::Failed { mid, .. } => mid,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CardResponse {
    data: CardData,
}

#[derive(Debug, Deserialize)]
struct CardData {
    card: Card,
}

#[derive(Debug, Deserialize)]
struct Card {
    mid: MidValue,
    name: String,
    fans: u64,
}

/// The API has served `mid` both as a string and as a number
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MidValue {
    Text(String),
    Number(u64),
}

impl fmt::Display for MidValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Number(number) => write!(f, "{number}"),
        }
    }
}

/// Parse a profile-card response body into a user record
pub fn parse_card_response(body: &str) -> Result<UserRecord, FetchError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| FetchError::MalformedResponse {
            message: format!("invalid JSON: {e}"),
        })?;

    let code = value
        .get("code")
        .and_then(Value::as_i64)
        .ok_or_else(|| FetchError::MalformedResponse {
            message: "missing integer field `code`".to_string(),
        })?;

    if code != 0 {
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        return Err(FetchError::Api { code, message });
    }

    let response: CardResponse =
        serde_json::from_value(value).map_err(|e| FetchError::MalformedResponse {
            message: format!("unexpected card layout: {e}"),
        })?;
    let card = response.data.card;

    Ok(UserRecord {
        mid: card.mid.to_string(),
        name: card.name,
        fans: card.fans,
    })
}

/// Map a reqwest failure onto the fetch error taxonomy
fn classify_request_error(err: reqwest::Error) -> FetchError {
    // The request never left the process (e.g. unusable base URL)
    let is_builder = err.is_builder();
    let message = format!("{:#}", anyhow::Error::from(err));
    if is_builder {
        FetchError::Unknown { message }
    } else {
        FetchError::Network { message }
    }
}

/// Client for the Bilibili profile-card endpoint
pub struct BilibiliClient {
    client: Client,
    api_base: String,
}

impl BilibiliClient {
    /// Creates a client against `api_base` (scheme and host, no trailing path)
    pub fn new(api_base: &str, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(REFERER, HeaderValue::from_static(SPACE_REFERER));

        let client = create_http_client_with_context(timeout, BROWSER_USER_AGENT, headers)?;

        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    fn card_url(&self) -> String {
        format!("{base}{CARD_PATH}", base = self.api_base)
    }

    /// Fetches the profile card for `mid`. Every failure is folded into the
    /// returned outcome; this never errors or panics.
    pub async fn fetch_user(&self, mid: &str) -> FetchOutcome {
        match self.try_fetch_user(mid).await {
            Ok(record) => {
                debug!(
                    %mid,
                    name = %record.name,
                    fans = record.fans,
                    "Fetched Bilibili user card"
                );
                FetchOutcome::Fetched(record)
            }
            Err(error) => {
                warn!(%mid, %error, "Failed to fetch Bilibili user card");
                FetchOutcome::Failed {
                    mid: mid.to_string(),
                    error,
                }
            }
        }
    }

    async fn try_fetch_user(&self, mid: &str) -> Result<UserRecord, FetchError> {
        let url = self.card_url();
        debug!(%mid, %url, "Making request to Bilibili API");

        let response = self
            .client
            .get(&url)
            .query(&[("mid", mid), ("photo", "false")])
            .send()
            .await
            .map_err(classify_request_error)?
            .error_for_status()
            .map_err(classify_request_error)?;

        let body = response.text().await.map_err(classify_request_error)?;

        parse_card_response(&body)
    }
}
