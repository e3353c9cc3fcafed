use time::OffsetDateTime;

use crate::routes::Route;
use crate::store::TokenStore;
use crate::types::{Role, Session, UserProfile};

/// Outcome of a navigation check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Admit,
    /// No session stored.
    RedirectToLogin,
    /// Session expired or unusable: clear the store, then go to login.
    ForceLogout,
    /// Signed in, but the role may not enter this route.
    NotAuthorized,
}

impl Decision {
    /// Where to navigate instead of rendering, `None` for [`Decision::Admit`].
    #[must_use]
    pub fn redirect(&self) -> Option<Route> {
        match self {
            Self::Admit => None,
            Self::RedirectToLogin | Self::ForceLogout => Some(Route::Login),
            Self::NotAuthorized => Some(Route::NotAuthorized),
        }
    }
}

/// Admission decision for a role-gated route.
///
/// Order: no session, then expiry (`expires_at <= now`), then a missing
/// profile, then the role check. A role the client does not recognize is
/// never admitted.
#[must_use]
pub fn authorize(
    session: Option<&Session>,
    profile: Option<&UserProfile>,
    required: &[Role],
    now: OffsetDateTime,
) -> Decision {
    let Some(session) = session else {
        return Decision::RedirectToLogin;
    };
    if session.is_expired_at(now) {
        return Decision::ForceLogout;
    }
    let Some(profile) = profile else {
        return Decision::ForceLogout;
    };
    match profile.role() {
        Some(role) if required.contains(&role) => Decision::Admit,
        _ => Decision::NotAuthorized,
    }
}

/// [`authorize`] against the sessions in a [`TokenStore`].
///
/// Public routes are always admitted. A [`Decision::ForceLogout`] clears the
/// store before it is returned.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    store: TokenStore,
}

impl RouteGuard {
    #[must_use]
    pub fn new(store: TokenStore) -> Self {
        Self { store }
    }

    #[must_use]
    pub fn check(&self, route: &Route) -> Decision {
        self.check_at(route, OffsetDateTime::now_utc())
    }

    #[must_use]
    pub fn check_at(&self, route: &Route, now: OffsetDateTime) -> Decision {
        let Some(required) = route.allowed_roles() else {
            return Decision::Admit;
        };

        let session = self.store.load();
        let profile = self.store.load_profile();
        let decision = authorize(session.as_ref(), profile.as_ref(), required, now);

        match decision {
            Decision::ForceLogout => {
                tracing::info!(route = %route, "Session no longer valid, logging out");
                if let Err(e) = self.store.clear() {
                    tracing::warn!(error = %e, "Failed to clear session storage");
                }
            }
            Decision::NotAuthorized => {
                tracing::debug!(route = %route, role = ?profile.map(|p| p.role_name), "Role not admitted");
            }
            Decision::Admit | Decision::RedirectToLogin => {}
        }
        decision
    }
}
