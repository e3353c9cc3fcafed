use std::sync::Arc;

use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tokio::sync::Mutex;

use crate::config::{ClientConfig, endpoints};
use crate::error::Error;
use crate::store::TokenStore;
use crate::types::AuthTokens;

/// Sink for user-visible notifications (the dashboard's toasts).
pub trait Notifier: Send + Sync + 'static {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
}

/// Default notifier: forwards notifications to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn success(&self, message: &str) {
        tracing::info!(notification = %message, "API success");
    }

    fn error(&self, message: &str) {
        tracing::warn!(notification = %message, "API error");
    }
}

/// HTTP client for the Ambillion API.
///
/// Attaches the stored access token to every request and unwraps the
/// `{ code, message, data }` envelope. A `401` on a request that carried a
/// token triggers one refresh through `auth/refresh-tokens` and one replay
/// of the request; concurrent `401`s share a single refresh.
///
/// Cheap to clone; clones share the token store and the refresh lock.
#[derive(Clone)]
pub struct ApiClient {
    config: Arc<ClientConfig>,
    http: reqwest::Client,
    store: TokenStore,
    notifier: Arc<dyn Notifier>,
    refresh_lock: Arc<Mutex<()>>,
}

impl ApiClient {
    /// Client that reads and rotates tokens in `store`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Network`] if the HTTP client cannot be built (TLS backend).
    pub fn new(config: ClientConfig, store: TokenStore) -> Result<Self, Error> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            config: Arc::new(config),
            http: builder.build()?,
            store,
            notifier: Arc::new(TracingNotifier),
            refresh_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Use a custom HTTP client (for connection pool reuse or testing).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    /// Send user-facing messages to `notifier` instead of the log.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Configuration this client was built with.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Token store shared with the route guard.
    #[must_use]
    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    /// # Errors
    ///
    /// See [`Error`]; every failure has already been reported to the notifier.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        self.execute(ApiRequest::new(Method::GET, path)).await
    }

    /// # Errors
    ///
    /// See [`Error`]; every failure has already been reported to the notifier.
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, Error>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.execute(ApiRequest::new(Method::POST, path).json(body)?)
            .await
    }

    /// # Errors
    ///
    /// See [`Error`]; every failure has already been reported to the notifier.
    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, Error>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.execute(ApiRequest::new(Method::PUT, path).json(body)?)
            .await
    }

    /// # Errors
    ///
    /// See [`Error`]; every failure has already been reported to the notifier.
    pub async fn patch<B, T>(&self, path: &str, body: &B) -> Result<T, Error>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.execute(ApiRequest::new(Method::PATCH, path).json(body)?)
            .await
    }

    /// # Errors
    ///
    /// See [`Error`]; every failure has already been reported to the notifier.
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        self.execute(ApiRequest::new(Method::DELETE, path)).await
    }

    /// POST without a bearer token and without the refresh path
    /// (sign-in and sign-up).
    pub(crate) async fn post_anonymous<B, T>(&self, path: &str, body: &B) -> Result<T, Error>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.execute(ApiRequest::new(Method::POST, path).json(body)?.anonymous())
            .await
    }

    async fn execute<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, Error> {
        let access_token = if request.authorized {
            self.store.load().map(|s| s.access_token)
        } else {
            None
        };

        let response = self.send(&request, access_token.as_deref()).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            if let Some(stale) = access_token {
                tracing::debug!(path = %request.path, "Access token rejected, refreshing");
                let fresh = match self.refresh_access_token(&stale).await {
                    Ok(token) => token,
                    Err(e) => {
                        self.notifier.error(&e.user_message());
                        return Err(e);
                    }
                };
                // Replayed once; a second 401 is reported as-is.
                let replay = self.send(&request, Some(&fresh)).await?;
                return self.read_response(replay).await;
            }
        }

        self.read_response(response).await
    }

    async fn send(
        &self,
        request: &ApiRequest,
        access_token: Option<&str>,
    ) -> Result<reqwest::Response, Error> {
        let url = self.config.endpoint(&request.path)?;
        let mut builder = self.http.request(request.method.clone(), url);
        if let Some(token) = access_token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        builder.send().await.map_err(|e| {
            let err = Error::Network(e);
            tracing::error!(path = %request.path, error = %err, "Request failed");
            self.notifier.error(&err.user_message());
            err
        })
    }

    async fn read_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, Error> {
        let status = response.status();
        let bytes = response.bytes().await?;
        let body: Option<JsonValue> = serde_json::from_slice(&bytes).ok();

        if status.is_success() {
            let envelope = Envelope::from_body(body);
            if let (Some(code), Some(message)) = (envelope.code, envelope.message.as_deref()) {
                if self.config.success_codes.contains(&code) && !message.is_empty() {
                    self.notifier.success(message);
                }
            }
            return serde_json::from_value(envelope.payload)
                .map_err(|e| Error::Decode(e.to_string()));
        }

        let failure = body.map(Failure::from_body).unwrap_or_default();
        let err = Error::from_status(status.as_u16(), failure.code, failure.message);
        tracing::warn!(status = status.as_u16(), error = %err, "API request rejected");
        self.notifier.error(&err.user_message());
        Err(err)
    }

    /// Exchange the stored refresh token for a new access token.
    ///
    /// `stale` is the token the caller was rejected with. Callers queue on
    /// the refresh lock; whoever finds the stored token already different
    /// from `stale` reuses it instead of refreshing again. A failed refresh
    /// clears the store, so queued callers fail without another attempt.
    async fn refresh_access_token(&self, stale: &str) -> Result<String, Error> {
        let _guard = self.refresh_lock.lock().await;

        let current = self.store.load().ok_or(Error::ReauthenticationRequired)?;
        if current.access_token != stale {
            tracing::debug!("Access token already refreshed");
            return Ok(current.access_token);
        }
        let Some(refresh_token) = current.refresh_token else {
            tracing::info!("No refresh token stored, re-authentication required");
            return Err(Error::ReauthenticationRequired);
        };

        match self.request_refresh(&refresh_token).await {
            Ok(tokens) => {
                let session = self.store.update_tokens(tokens)?;
                tracing::info!("Access token refreshed");
                Ok(session.access_token)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Token refresh failed, clearing session");
                if let Err(e) = self.store.clear() {
                    tracing::warn!(error = %e, "Failed to clear session storage");
                }
                Err(Error::ReauthenticationRequired)
            }
        }
    }

    async fn request_refresh(&self, refresh_token: &str) -> Result<AuthTokens, Error> {
        let url = self.config.endpoint(endpoints::REFRESH_TOKENS)?;
        let response = self
            .http
            .post(url)
            .query(&[("refreshToken", refresh_token)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::from_status(status.as_u16(), None, Some(detail)));
        }

        let body: JsonValue = response.json().await?;
        let payload = Envelope::from_body(Some(body)).payload;
        // `{ tokens: { access, refresh } }` or the tokens object itself
        let tokens = match payload.get("tokens") {
            Some(tokens) => tokens.clone(),
            None => payload,
        };
        serde_json::from_value(tokens).map_err(|e| Error::Decode(format!("refresh response: {e}")))
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.config.base_url.as_str())
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

/// A request that can be sent twice (original + replay after refresh).
#[derive(Debug, Clone)]
struct ApiRequest {
    method: Method,
    path: String,
    body: Option<JsonValue>,
    authorized: bool,
}

impl ApiRequest {
    fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            path: path.to_owned(),
            body: None,
            authorized: true,
        }
    }

    fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, Error> {
        let body = serde_json::to_value(body)
            .map_err(|e| Error::Decode(format!("request body: {e}")))?;
        self.body = Some(body);
        Ok(self)
    }

    fn anonymous(mut self) -> Self {
        self.authorized = false;
        self
    }
}

/// Success body. The payload is `data` when the body is an envelope,
/// otherwise the body itself.
struct Envelope {
    code: Option<u16>,
    message: Option<String>,
    payload: JsonValue,
}

impl Envelope {
    fn from_body(body: Option<JsonValue>) -> Self {
        let Some(body) = body else {
            return Self {
                code: None,
                message: None,
                payload: JsonValue::Null,
            };
        };

        let code = body
            .get("code")
            .and_then(JsonValue::as_u64)
            .and_then(|c| u16::try_from(c).ok());
        let message = body
            .get("message")
            .and_then(JsonValue::as_str)
            .map(str::to_owned);

        let payload = match body {
            JsonValue::Object(mut map) if map.contains_key("data") => {
                map.remove("data").unwrap_or(JsonValue::Null)
            }
            other => other,
        };

        Self {
            code,
            message,
            payload,
        }
    }
}

/// Failure body `{ error, message }`.
#[derive(Debug, Default)]
struct Failure {
    code: Option<String>,
    message: Option<String>,
}

impl Failure {
    fn from_body(body: JsonValue) -> Self {
        let text = |key: &str| {
            body.get(key)
                .and_then(JsonValue::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
        };
        Self {
            code: text("error").or_else(|| text("code")),
            message: text("message"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_unwraps_data() {
        let env = Envelope::from_body(Some(json!({
            "code": 201,
            "message": "Category created",
            "data": { "category_id": 3 }
        })));
        assert_eq!(env.code, Some(201));
        assert_eq!(env.message.as_deref(), Some("Category created"));
        assert_eq!(env.payload, json!({ "category_id": 3 }));
    }

    #[test]
    fn bare_body_is_the_payload() {
        let body = json!({ "tokens": { "access": "T1" }, "user": { "role_name": "OFFICER" } });
        let env = Envelope::from_body(Some(body.clone()));
        assert_eq!(env.code, None);
        assert_eq!(env.payload, body);
    }

    #[test]
    fn empty_body_is_null() {
        assert_eq!(Envelope::from_body(None).payload, JsonValue::Null);
    }

    #[test]
    fn failure_reads_error_code() {
        let failure = Failure::from_body(json!({ "error": "UM_EA_4002", "message": "dup" }));
        assert_eq!(failure.code.as_deref(), Some("UM_EA_4002"));
        assert_eq!(failure.message.as_deref(), Some("dup"));

        let failure = Failure::from_body(json!({ "error": true }));
        assert_eq!(failure.code, None);
        assert_eq!(failure.message, None);
    }

    #[test]
    fn request_body_is_captured_for_replay() {
        let request = ApiRequest::new(Method::PATCH, "users")
            .json(&json!({ "userId": 1, "status": "ACCEPTED" }))
            .unwrap();
        let replay = request.clone();
        assert_eq!(replay.body, request.body);
        assert!(replay.authorized);
        assert!(!replay.anonymous().authorized);
    }
}
