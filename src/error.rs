use crate::messages;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// No response was received (connection, TLS, timeout).
    #[error("HTTP error: {0}")]
    Network(#[from] reqwest::Error),

    /// The API rejected the credentials or token (401/403).
    #[error("Authentication error ({status}): {message}")]
    Auth {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// A 401 could not be recovered by refreshing the access token.
    #[error("Re-authentication required")]
    ReauthenticationRequired,

    /// Form input rejected before anything was sent.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Any other non-success response, including business error codes.
    #[error("Server error ({status}): {message}")]
    Server {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// The response body did not have the expected shape.
    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Build the error for a non-success response.
    ///
    /// `code` is the `error` field of the failure body, `message` its
    /// `message` field.
    pub(crate) fn from_status(status: u16, code: Option<String>, message: Option<String>) -> Self {
        let message = message.unwrap_or_default();
        match status {
            401 | 403 => Self::Auth {
                status,
                code,
                message,
            },
            _ => Self::Server {
                status,
                code,
                message,
            },
        }
    }

    /// True for errors that mean the stored session cannot be used.
    #[must_use]
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth { .. } | Self::ReauthenticationRequired)
    }

    /// Message suitable for showing to the user.
    ///
    /// Business codes win over the server's free-text message, which wins
    /// over the status table. Anything unrecognized gets [`messages::GENERIC`].
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Network(e) if e.is_timeout() => messages::TIMEOUT.to_owned(),
            Self::Network(_) => messages::NETWORK.to_owned(),
            Self::ReauthenticationRequired => messages::SESSION_EXPIRED.to_owned(),
            Self::Validation(msg) => msg.clone(),
            Self::Auth {
                status,
                code,
                message,
            }
            | Self::Server {
                status,
                code,
                message,
            } => code
                .as_deref()
                .and_then(messages::business_message)
                .map(str::to_owned)
                .or_else(|| (!message.is_empty()).then(|| message.clone()))
                .or_else(|| messages::status_message(*status).map(str::to_owned))
                .unwrap_or_else(|| messages::GENERIC.to_owned()),
            Self::Decode(_) | Self::Storage(_) | Self::Config(_) => messages::GENERIC.to_owned(),
        }
    }
}
