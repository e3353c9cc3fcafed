//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use wiremock::MockServer;

use ambillion_client::storage::{MemoryStorage, Storage};
use ambillion_client::{
    ApiClient, AuthController, ClientConfig, Error, Notifier, Role, Route, Session, TokenStore,
    UserProfile,
};

/// Comfortably longer than the logout clear delay.
pub const LOGOUT_SETTLE: Duration = Duration::from_millis(50);

/// Notifier that keeps every notification.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    successes: Mutex<Vec<String>>,
    errors: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn successes(&self) -> Vec<String> {
        self.successes.lock().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn success(&self, message: &str) {
        self.successes.lock().push(message.to_owned());
    }

    fn error(&self, message: &str) {
        self.errors.lock().push(message.to_owned());
    }
}

/// Memory storage that counts writes.
#[derive(Debug, Default)]
pub struct CountingStorage {
    inner: MemoryStorage,
    writes: AtomicUsize,
}

impl CountingStorage {
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl Storage for CountingStorage {
    fn get(&self, key: &str) -> Result<Option<String>, Error> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), Error> {
        self.inner.remove(key)
    }
}

/// Navigation log shared with an [`AuthController`].
#[derive(Debug, Clone, Default)]
pub struct Navigations(Arc<Mutex<Vec<Route>>>);

impl Navigations {
    pub fn routes(&self) -> Vec<Route> {
        self.0.lock().clone()
    }

    pub fn push(&self, route: Route) {
        self.0.lock().push(route);
    }
}

pub fn config_for(server: &MockServer) -> ClientConfig {
    ClientConfig::new(server.uri().parse().expect("mock server uri"))
}

pub fn client_for(server: &MockServer, store: TokenStore) -> (ApiClient, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::default());
    let client = ApiClient::new(config_for(server), store)
        .expect("build client")
        .with_notifier(notifier.clone());
    (client, notifier)
}

/// Controller whose navigator records routes.
pub fn controller(client: ApiClient) -> (AuthController, Navigations) {
    let navigations = Navigations::default();
    let log = navigations.clone();
    let controller = AuthController::new(client, Arc::new(move |route: Route| log.push(route)));
    (controller, navigations)
}

/// Store already holding `access`/`refresh` for a signed-in user of `role`.
pub fn signed_in_store(access: &str, refresh: Option<&str>, role: Role) -> TokenStore {
    let store = TokenStore::in_memory();
    store
        .save(
            &Session::new(access, refresh.map(str::to_owned)),
            &UserProfile::new("user@example.com", role),
        )
        .expect("seed store");
    store
}
