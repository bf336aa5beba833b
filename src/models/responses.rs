use serde::Deserialize;
use serde_json::Value;

/// Auth endpoints wrap their payload in `data`
#[derive(Debug, Clone, Deserialize)]
pub struct AuthEnvelope<T> {
    pub data: T,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SendCodeResponse {
    #[serde(default)]
    pub sms_sent: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ValidateCodeResponse {
    #[serde(default)]
    pub validated: bool,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Token triple issued by the login endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(rename = "_id")]
    pub user_id: String,
    pub api_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub is_new_user: bool,
}

/// Recommendation batch; `results` is absent when the feed is exhausted
#[derive(Debug, Clone, Deserialize)]
pub struct RecommendationsResponse {
    #[serde(default)]
    pub results: Option<Vec<Value>>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserResponse {
    pub results: Value,
}

/// Like acknowledgement
///
/// `match` is `false` or a match object, so it stays untyped.
#[derive(Debug, Clone, Deserialize)]
pub struct LikeResponse {
    #[serde(rename = "match", default)]
    pub matched: Value,
    #[serde(default)]
    pub likes_remaining: Option<u32>,
    #[serde(default)]
    pub rate_limited_until: Option<i64>,
}

impl LikeResponse {
    pub fn is_match(&self) -> bool {
        !matches!(self.matched, Value::Null | Value::Bool(false))
    }
}
