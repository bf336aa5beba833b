use crate::models::{
    ApiRequest, AuthEnvelope, LoginRequest, LoginResponse, SendCodeRequest, SendCodeResponse,
    ValidateCodeRequest, ValidateCodeResponse,
};
use crate::services::credentials::{CredentialError, CredentialStore};
use chrono::{DateTime, Utc};
use reqwest::{header, Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::io::{self, BufRead, Write};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;

/// Reauthenticate-and-retry cycles allowed per call
const MAX_REAUTHENTICATIONS: u32 = 1;

const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";
const APP_VERSION: &str = "3";
const PLATFORM: &str = "ios";
const AUTH_USER_AGENT: &str = "Tinder/11.4.0 (iPhone; iOS 12.4.1; Scale/2.00)";

/// Errors that can occur when talking to the profile API
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Unauthorized: remote returned {0}")]
    Unauthorized(StatusCode),

    #[error("API returned {status}: {body}")]
    Server { status: StatusCode, body: String },

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Out of likes{}", format_until(.until))]
    OutOfLikes { until: Option<DateTime<Utc>> },

    #[error("Reauthentication failed: credentials must be re-issued by the operator")]
    ReauthenticationFailed,

    #[error("Credential issuance failed: {0}")]
    Issuance(String),

    #[error(transparent)]
    Credentials(#[from] CredentialError),

    #[error("Failed to read one-time code: {0}")]
    CodeProvider(#[source] io::Error),
}

fn format_until(until: &Option<DateTime<Utc>>) -> String {
    until
        .map(|u| format!(" until {}", u.format("%Y-%m-%d %H:%M:%S")))
        .unwrap_or_default()
}

impl ApiError {
    /// Errors that end the run instead of only the current profile
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ApiError::ReauthenticationFailed
                | ApiError::Credentials(_)
                | ApiError::Issuance(_)
                | ApiError::CodeProvider(_)
        )
    }
}

/// Source of the one-time code sent to the operator's phone
///
/// Issuing credentials needs a human, so the session only reaches this
/// through `authenticate`, never from the automatic retry path.
pub trait CodeProvider: Send + Sync {
    fn request_code(&self, phone_number: &str) -> io::Result<String>;
}

/// Prompts for the code on the terminal
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleCodeProvider;

impl CodeProvider for ConsoleCodeProvider {
    fn request_code(&self, phone_number: &str) -> io::Result<String> {
        let mut stdout = io::stdout();
        write!(stdout, "Please enter the code you have received by SMS on {}: ", phone_number)?;
        stdout.flush()?;

        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(line.trim().to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticating,
    Authenticated,
    /// Terminal for the run; the operator has to issue new credentials
    ReauthenticationFailed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Unauthenticated => "unauthenticated",
            SessionState::Authenticating => "authenticating",
            SessionState::Authenticated => "authenticated",
            SessionState::ReauthenticationFailed => "reauthentication_failed",
        };
        f.write_str(s)
    }
}

/// Token-lifecycle aware API session
///
/// Tokens live in the credential file only. Each call reads the latest
/// access token from disk and every token exchange is written back before
/// the new token is used.
pub struct SessionManager {
    client: Client,
    base_url: String,
    store: CredentialStore,
    code_provider: Box<dyn CodeProvider>,
    state: Mutex<SessionState>,
}

impl SessionManager {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        store: CredentialStore,
        code_provider: Box<dyn CodeProvider>,
    ) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            store,
            code_provider,
            state: Mutex::new(SessionState::Unauthenticated),
        })
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.store
    }

    /// Perform `request` with the current access token
    ///
    /// Without a stored access token the session authenticates first. An
    /// authorization failure invalidates the token, refreshes it and replays
    /// the request once; a second failure is fatal for the run.
    pub async fn send(&self, request: &ApiRequest) -> Result<Value, ApiError> {
        if self.state() == SessionState::ReauthenticationFailed {
            return Err(ApiError::ReauthenticationFailed);
        }

        let mut token = match self.store.load()?.access_token.filter(|t| !t.is_empty()) {
            Some(token) => token,
            None => self.authenticate().await?,
        };

        let mut reauthentications = 0;
        loop {
            match self.execute(request, &token).await {
                Err(ApiError::Unauthorized(status)) if reauthentications < MAX_REAUTHENTICATIONS => {
                    reauthentications += 1;
                    tracing::warn!(
                        "Authorization failure ({}) on {} {}, reauthenticating",
                        status,
                        request.method,
                        request.path
                    );
                    token = self.reauthenticate().await?;
                }
                Err(ApiError::Unauthorized(status)) => {
                    tracing::error!(
                        "Authorization failure ({}) on {} {} persists after reauthentication",
                        status,
                        request.method,
                        request.path
                    );
                    self.set_state(SessionState::ReauthenticationFailed);
                    return Err(ApiError::ReauthenticationFailed);
                }
                result => {
                    if result.is_ok() {
                        self.set_state(SessionState::Authenticated);
                    }
                    return result;
                }
            }
        }
    }

    /// Obtain a fresh access token, issuing new credentials if needed
    ///
    /// Uses the stored refresh token when there is one. When there is none,
    /// or the remote rejects it, the operator is asked for a one-time code.
    pub async fn authenticate(&self) -> Result<String, ApiError> {
        self.set_state(SessionState::Authenticating);
        let result = self.run_authentication().await;
        self.settle(&result);
        result
    }

    /// Refresh the access token without operator interaction
    pub async fn reauthenticate(&self) -> Result<String, ApiError> {
        self.set_state(SessionState::Authenticating);
        let result = self.refresh().await;
        self.settle(&result);
        result
    }

    async fn run_authentication(&self) -> Result<String, ApiError> {
        // Whatever is stored is unreliable until this finishes
        let credentials = self.store.update(|c| {
            c.user_id = None;
            c.access_token = None;
        })?;

        if let Some(refresh_token) = credentials.refresh_token.filter(|t| !t.is_empty()) {
            match self.exchange_refresh_token(&refresh_token).await {
                Err(ApiError::Unauthorized(status)) => {
                    tracing::warn!("Stored refresh token rejected ({}), issuing new credentials", status);
                    self.store.update(|c| c.refresh_token = None)?;
                }
                other => return other,
            }
        }

        let refresh_token = self.issue_refresh_token().await?;
        match self.exchange_refresh_token(&refresh_token).await {
            Err(ApiError::Unauthorized(status)) => {
                tracing::error!("Freshly issued refresh token rejected ({})", status);
                self.store.update(|c| c.refresh_token = None)?;
                Err(ApiError::ReauthenticationFailed)
            }
            other => other,
        }
    }

    async fn refresh(&self) -> Result<String, ApiError> {
        let credentials = self.store.update(|c| c.access_token = None)?;

        let Some(refresh_token) = credentials.refresh_token.filter(|t| !t.is_empty()) else {
            tracing::error!("No refresh token stored, the operator has to issue new credentials");
            return Err(ApiError::ReauthenticationFailed);
        };

        tracing::info!("Refreshing access token");
        match self.exchange_refresh_token(&refresh_token).await {
            Err(ApiError::Unauthorized(status)) => {
                tracing::error!("Refresh token rejected ({}), discarding it", status);
                self.store.update(|c| c.refresh_token = None)?;
                Err(ApiError::ReauthenticationFailed)
            }
            other => other,
        }
    }

    /// Operator-interactive step: text a code, ask for it, trade it in
    async fn issue_refresh_token(&self) -> Result<String, ApiError> {
        let phone_number = self.store.phone_number()?;

        tracing::info!("Requesting a one-time code for credential issuance");
        let sent: SendCodeResponse = self
            .post_auth(
                "/v2/auth/sms/send",
                &[("auth_type", "sms")],
                &SendCodeRequest {
                    phone_number: &phone_number,
                },
            )
            .await
            .map_err(issuance_error)?;
        if !sent.sms_sent {
            return Err(ApiError::Issuance("one-time code was not sent".to_string()));
        }

        let code = self
            .code_provider
            .request_code(&phone_number)
            .map_err(ApiError::CodeProvider)?;

        let validated: ValidateCodeResponse = self
            .post_auth(
                "/v2/auth/sms/validate",
                &[("auth_type", "sms")],
                &ValidateCodeRequest {
                    otp_code: &code,
                    phone_number: &phone_number,
                },
            )
            .await
            .map_err(issuance_error)?;

        let refresh_token = validated
            .refresh_token
            .filter(|t| validated.validated && !t.is_empty())
            .ok_or_else(|| ApiError::Issuance("one-time code was not accepted".to_string()))?;

        self.store
            .update(|c| c.refresh_token = Some(refresh_token.clone()))?;
        Ok(refresh_token)
    }

    async fn exchange_refresh_token(&self, refresh_token: &str) -> Result<String, ApiError> {
        let login: LoginResponse = self
            .post_auth("/v2/auth/login/sms", &[], &LoginRequest { refresh_token })
            .await?;

        self.store.update(|c| {
            c.user_id = Some(login.user_id.clone());
            c.access_token = Some(login.api_token.clone());
            c.refresh_token = Some(login.refresh_token.clone());
        })?;

        tracing::info!("Obtained new access token for user {}", login.user_id);
        Ok(login.api_token)
    }

    async fn execute(&self, request: &ApiRequest, token: &str) -> Result<Value, ApiError> {
        tracing::debug!("{} {}", request.method, request.path);

        let mut builder = self
            .client
            .request(request.method.clone(), self.url(&request.path))
            .header("app_version", APP_VERSION)
            .header("platform", PLATFORM)
            .header(AUTH_TOKEN_HEADER, token);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        read_response(builder.send().await?).await
    }

    async fn post_auth<B, T>(&self, path: &str, query: &[(&str, &str)], body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut builder = self
            .client
            .post(self.url(path))
            .header(header::USER_AGENT, AUTH_USER_AGENT)
            .json(body);
        if !query.is_empty() {
            builder = builder.query(query);
        }

        let value = read_response(builder.send().await?).await?;
        let envelope: AuthEnvelope<T> = serde_json::from_value(value)
            .map_err(|e| ApiError::InvalidResponse(format!("{}: {}", path, e)))?;
        Ok(envelope.data)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn set_state(&self, state: SessionState) {
        let mut current = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if *current != state {
            tracing::debug!("Session state {} -> {}", *current, state);
            *current = state;
        }
    }

    fn settle(&self, result: &Result<String, ApiError>) {
        let state = match result {
            Ok(_) => SessionState::Authenticated,
            Err(ApiError::ReauthenticationFailed) => SessionState::ReauthenticationFailed,
            Err(_) => SessionState::Unauthenticated,
        };
        self.set_state(state);
    }
}

/// Auth failures while issuing are not token failures; keep them apart
fn issuance_error(err: ApiError) -> ApiError {
    match err {
        ApiError::Unauthorized(status) => {
            ApiError::Issuance(format!("one-time code endpoint returned {}", status))
        }
        other => other,
    }
}

async fn read_response(response: Response) -> Result<Value, ApiError> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(ApiError::Unauthorized(status));
    }

    let body = response.text().await?;
    if !status.is_success() {
        return Err(ApiError::Server { status, body });
    }
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }

    serde_json::from_str(&body).map_err(|e| ApiError::InvalidResponse(e.to_string()))
}
