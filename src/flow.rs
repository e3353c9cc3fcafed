//! Sign-up, sign-in and logout.
//!
//! Each flow moves `Idle -> Pending -> Succeeded | Failed(message)`. Errors
//! stop here: the controller stores the user-facing message in the flow
//! state and leaves it re-submittable. State changes are published on a
//! `tokio::sync::watch` channel.

use std::sync::Arc;
use std::time::Duration;

use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinHandle};

use crate::client::ApiClient;
use crate::config::endpoints;
use crate::error::Error;
use crate::resources::Category;
use crate::routes::{Route, landing_route};
use crate::types::{AuthTokens, UserProfile};

/// Delay between navigating to the login page and clearing the store.
pub const LOGOUT_CLEAR_DELAY: Duration = Duration::from_millis(5);

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FlowState {
    #[default]
    Idle,
    Pending,
    Succeeded,
    /// Carries the message to show the user.
    Failed(String),
}

impl FlowState {
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed(message) => Some(message),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuthState {
    pub sign_up: FlowState,
    pub sign_in: FlowState,
    /// Profile of the signed-in user.
    pub user: Option<UserProfile>,
}

/// Consumer-provided navigation.
pub trait Navigator: Send + Sync + 'static {
    fn navigate(&self, route: Route);
}

impl<F> Navigator for F
where
    F: Fn(Route) + Send + Sync + 'static,
{
    fn navigate(&self, route: Route) {
        self(route);
    }
}

/// Body of `POST auth/register`.
#[derive(Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    /// Checked against `password` locally, never sent.
    #[serde(skip)]
    pub confirm_password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    pub mobile_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_role_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
}

impl SignUpRequest {
    /// # Errors
    ///
    /// Returns [`Error::Validation`] naming the first invalid field.
    pub fn validate(&self) -> Result<(), Error> {
        validate_credentials(&self.email, &self.password)?;
        if self.password != self.confirm_password {
            return Err(Error::Validation("Passwords do not match".into()));
        }
        if self.first_name.trim().is_empty() {
            return Err(Error::Validation("First name is required".into()));
        }
        if self.last_name.trim().is_empty() {
            return Err(Error::Validation("Last name is required".into()));
        }
        Ok(())
    }
}

impl std::fmt::Debug for SignUpRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignUpRequest")
            .field("email", &self.email)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("company_name", &self.company_name)
            .finish_non_exhaustive()
    }
}

/// Body of `POST auth/login`.
#[derive(Clone, Serialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

impl SignInRequest {
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// # Errors
    ///
    /// Returns [`Error::Validation`] for an empty or malformed email or an
    /// empty password.
    pub fn validate(&self) -> Result<(), Error> {
        validate_credentials(&self.email, &self.password)
    }
}

impl std::fmt::Debug for SignInRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignInRequest")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

fn validate_credentials(email: &str, password: &str) -> Result<(), Error> {
    let email = email.trim();
    if email.is_empty() {
        return Err(Error::Validation("Email is required".into()));
    }
    if !email.contains('@') {
        return Err(Error::Validation("Enter a valid email address".into()));
    }
    if password.is_empty() {
        return Err(Error::Validation("Password is required".into()));
    }
    Ok(())
}

/// Payload of a successful sign-in.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInResponse {
    pub tokens: AuthTokens,
    pub user: UserProfile,
    #[serde(default)]
    pub product_categories: Option<Vec<Category>>,
}

/// Drives the auth flows against an [`ApiClient`] and its token store.
#[derive(Clone)]
pub struct AuthController {
    client: ApiClient,
    navigator: Arc<dyn Navigator>,
    state: Arc<watch::Sender<AuthState>>,
    /// Delayed clear scheduled by the last `logout`.
    pending_clear: Arc<Mutex<Option<AbortHandle>>>,
}

impl AuthController {
    /// The initial state carries the profile already in the store, if any.
    #[must_use]
    pub fn new(client: ApiClient, navigator: Arc<dyn Navigator>) -> Self {
        let initial = AuthState {
            user: client.store().load_profile(),
            ..AuthState::default()
        };
        let (state, _) = watch::channel(initial);
        Self {
            client,
            navigator,
            state: Arc::new(state),
            pending_clear: Arc::new(Mutex::new(None)),
        }
    }

    #[must_use]
    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    /// Register an account, then navigate to the login page.
    pub async fn sign_up(&self, request: &SignUpRequest) -> FlowState {
        let outcome = match request.validate() {
            Ok(()) => {
                self.update(|s| s.sign_up = FlowState::Pending);
                self.client
                    .post_anonymous::<_, IgnoredAny>(endpoints::SIGN_UP, request)
                    .await
                    .map(|_| ())
            }
            Err(e) => Err(e),
        };

        let next = match outcome {
            Ok(()) => {
                tracing::info!(email = %request.email, "Account registered");
                FlowState::Succeeded
            }
            Err(e) => {
                tracing::warn!(error = %e, "Sign-up failed");
                FlowState::Failed(e.user_message())
            }
        };
        self.update(|s| s.sign_up = next.clone());

        if next == FlowState::Succeeded {
            self.navigator.navigate(Route::Login);
        }
        next
    }

    /// Sign in, persist the session, then navigate to the role's landing route.
    ///
    /// Nothing is written to the store unless the server accepted the
    /// credentials; navigation happens only after the store holds the session.
    pub async fn sign_in(&self, request: &SignInRequest) -> FlowState {
        let outcome = match request.validate() {
            Ok(()) => {
                self.update(|s| s.sign_in = FlowState::Pending);
                self.authenticate(request).await
            }
            Err(e) => Err(e),
        };

        match outcome {
            Ok(profile) => {
                let landing = landing_route(profile.role());
                tracing::info!(role = %profile.role_name, landing = %landing, "Signed in");
                self.update(|s| {
                    s.sign_in = FlowState::Succeeded;
                    s.user = Some(profile);
                });
                self.navigator.navigate(landing);
                FlowState::Succeeded
            }
            Err(e) => {
                tracing::warn!(error = %e, "Sign-in failed");
                let failed = FlowState::Failed(e.user_message());
                self.update(|s| s.sign_in = failed.clone());
                failed
            }
        }
    }

    async fn authenticate(&self, request: &SignInRequest) -> Result<UserProfile, Error> {
        let response: SignInResponse = self
            .client
            .post_anonymous(endpoints::SIGN_IN, request)
            .await?;

        self.cancel_pending_clear();
        let store = self.client.store();
        store.save(&response.tokens.into_session(), &response.user)?;
        if let Some(categories) = &response.product_categories {
            if let Err(e) = store.save_categories(categories) {
                tracing::warn!(error = %e, "Failed to cache product categories");
            }
        }
        Ok(response.user)
    }

    /// Navigate to the login page and clear the store shortly after.
    ///
    /// Returns the handle of the delayed clear. The clear is cancelled by a
    /// sign-in through this controller, and skipped if the stored session
    /// changed in the meantime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn logout(&self) -> JoinHandle<()> {
        self.update(|s| *s = AuthState::default());
        self.navigator.navigate(Route::Login);

        let store = self.client.store().clone();
        let signed_out = store.load();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(LOGOUT_CLEAR_DELAY).await;
            if store.load() != signed_out {
                tracing::debug!("Session replaced since logout, keeping it");
                return;
            }
            match store.clear() {
                Ok(()) => tracing::info!("Signed out"),
                Err(e) => tracing::warn!(error = %e, "Failed to clear session storage"),
            }
        });

        if let Some(previous) = self.pending_clear.lock().replace(handle.abort_handle()) {
            previous.abort();
        }
        handle
    }

    fn cancel_pending_clear(&self) {
        if let Some(pending) = self.pending_clear.lock().take() {
            pending.abort();
        }
    }

    fn update(&self, apply: impl FnOnce(&mut AuthState)) {
        self.state.send_modify(apply);
    }
}

impl std::fmt::Debug for AuthController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthController")
            .field("client", &self.client)
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}
