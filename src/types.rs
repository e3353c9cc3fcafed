use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::Error;
use crate::token;

/// Server-assigned user profile identifier (`userprofile_id`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into,
)]
#[serde(transparent)]
pub struct UserId(pub i64);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into,
)]
#[serde(transparent)]
pub struct ProductId(pub i64);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into,
)]
#[serde(transparent)]
pub struct CategoryId(pub i64);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into,
)]
#[serde(transparent)]
pub struct DocumentTypeId(pub i64);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into,
)]
#[serde(transparent)]
pub struct CountryId(pub i64);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into,
)]
#[serde(transparent)]
pub struct HsnCodeId(pub i64);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into,
)]
#[serde(transparent)]
pub struct UserDocumentId(pub i64);

/// Role of a signed-in user.
///
/// Closed set: every place that branches on a role matches exhaustively.
/// The API also reports `EXPORT_OFFICER` / `IMPORT_OFFICER`; both are
/// [`Role::Officer`] here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Role {
    Admin,
    Manufacturer,
    Officer,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Manufacturer, Role::Officer];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::Manufacturer => "MANUFACTURER",
            Self::Officer => "OFFICER",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ADMIN" => Ok(Self::Admin),
            "MANUFACTURER" => Ok(Self::Manufacturer),
            "OFFICER" | "EXPORT_OFFICER" | "IMPORT_OFFICER" => Ok(Self::Officer),
            _ => Err(Error::Decode(format!("unrecognized role: {s}"))),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Role> for String {
    fn from(r: Role) -> Self {
        r.as_str().to_owned()
    }
}

/// Account approval state, set by an administrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
    Accepted,
    Rejected,
    Pending,
}

/// Product approval workflow state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductStatus {
    Pending,
    UnderVerification,
    Verified,
    InfoNeeded,
    SentForExportApproval,
    UnderExportApproval,
    ExportInfoNeeded,
    ExportApproved,
    SentForImportApproval,
    UnderImportApproval,
    ImportInfoNeeded,
    ImportApproved,
    ImportRejected,
}

/// Identity and role cached alongside a [`Session`].
///
/// Field names follow the API's user object. The role is kept as the raw
/// string the server sent; [`UserProfile::role`] parses it, so a profile with
/// an unrecognized role still round-trips through storage but is admitted to
/// no role-gated route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default, rename = "userprofile_id", alias = "id")]
    pub id: Option<UserId>,
    #[serde(default)]
    pub email: String,
    #[serde(rename = "role_name", alias = "role")]
    pub role_name: String,
    #[serde(default, alias = "display_name")]
    pub name: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub status: Option<UserStatus>,
}

impl UserProfile {
    #[must_use]
    pub fn new(email: impl Into<String>, role: Role) -> Self {
        Self {
            id: None,
            email: email.into(),
            role_name: role.to_string(),
            name: None,
            first_name: None,
            last_name: None,
            company_name: None,
            status: None,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: UserId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: UserStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Parsed role, `None` when the server sent a role outside [`Role`].
    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.role_name.parse().ok()
    }

    /// `name`, else `first_name last_name`, else the email address.
    #[must_use]
    pub fn display_name(&self) -> String {
        if let Some(name) = self.name.as_deref().filter(|n| !n.trim().is_empty()) {
            return name.to_owned();
        }
        let full = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if full.is_empty() {
            self.email.clone()
        } else {
            full
        }
    }
}

/// Access/refresh token pair of a signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// From the access token's `exp` claim; `None` when the token carries none.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub expires_at: Option<OffsetDateTime>,
}

impl Session {
    /// Create a session, deriving the expiry from the access token's claims.
    #[must_use]
    pub fn new(access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
        let access_token = access_token.into();
        let expires_at = token::access_token_expiry(&access_token);
        Self {
            access_token,
            refresh_token,
            expires_at,
        }
    }

    /// Override the expiry (used when the token itself carries no `exp`).
    #[must_use]
    pub fn with_expires_at(mut self, expires_at: OffsetDateTime) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// A session expires when `expires_at <= now`. Unknown expiry never expires.
    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }
}

/// A token as the API returns it: either bare or with its own expiry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum TokenGrant {
    Bare(String),
    Detailed {
        token: String,
        #[serde(default, with = "time::serde::rfc3339::option")]
        expires: Option<OffsetDateTime>,
    },
}

impl TokenGrant {
    #[must_use]
    pub fn token(&self) -> &str {
        match self {
            Self::Bare(token) | Self::Detailed { token, .. } => token,
        }
    }

    #[must_use]
    pub fn expires(&self) -> Option<OffsetDateTime> {
        match self {
            Self::Bare(_) => None,
            Self::Detailed { expires, .. } => *expires,
        }
    }
}

/// `tokens` object of the login and refresh responses.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthTokens {
    pub access: TokenGrant,
    #[serde(default)]
    pub refresh: Option<TokenGrant>,
}

impl AuthTokens {
    /// Build the session these tokens describe.
    ///
    /// The access token's own `exp` claim takes precedence over the grant's
    /// `expires` field.
    #[must_use]
    pub fn into_session(self) -> Session {
        let mut session = Session::new(
            self.access.token(),
            self.refresh.as_ref().map(|r| r.token().to_owned()),
        );
        if session.expires_at.is_none() {
            session.expires_at = self.access.expires();
        }
        session
    }
}
