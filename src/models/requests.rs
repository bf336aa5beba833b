use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// Description of an authenticated call to the profile API
///
/// The session layer owns the access token, so callers describe the call
/// and let `SessionManager` attach headers, send it and replay it after a
/// reauthentication.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub timeout: Option<Duration>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Ask the API to text a one-time code
#[derive(Debug, Clone, Serialize)]
pub struct SendCodeRequest<'a> {
    pub phone_number: &'a str,
}

/// Exchange a one-time code for a refresh token
#[derive(Debug, Clone, Serialize)]
pub struct ValidateCodeRequest<'a> {
    pub otp_code: &'a str,
    pub phone_number: &'a str,
}

/// Exchange a refresh token for an access token
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub refresh_token: &'a str,
}
