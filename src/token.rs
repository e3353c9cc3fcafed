use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::Value as JsonValue;
use time::OffsetDateTime;

use crate::error::Error;

/// Claims read from a JWT access token.
///
/// The signature is **not** checked: the client only needs the expiry to
/// decide whether to bother sending the token. The API remains the authority.
///
/// Claims are kept as raw JSON so a claim of an unexpected type never hides
/// the others. NumericDate claims may be fractional and are floored.
#[derive(Debug, Clone)]
pub struct UnverifiedClaims {
    claims: serde_json::Map<String, JsonValue>,
}

impl UnverifiedClaims {
    #[must_use]
    pub fn sub(&self) -> Option<&JsonValue> {
        self.claims.get("sub")
    }

    /// `exp` in whole seconds.
    #[must_use]
    pub fn exp(&self) -> Option<i64> {
        self.numeric_date("exp")
    }

    /// `iat` in whole seconds.
    #[must_use]
    pub fn iat(&self) -> Option<i64> {
        self.numeric_date("iat")
    }

    /// `exp` as a timestamp.
    #[must_use]
    pub fn expires_at(&self) -> Option<OffsetDateTime> {
        self.exp()
            .and_then(|exp| OffsetDateTime::from_unix_timestamp(exp).ok())
    }

    /// Gets any claim by key.
    #[must_use]
    pub fn get_claim(&self, key: &str) -> Option<&JsonValue> {
        self.claims.get(key)
    }

    fn numeric_date(&self, key: &str) -> Option<i64> {
        let value = self.claims.get(key)?;
        value.as_i64().or_else(|| {
            value
                .as_f64()
                .filter(|secs| secs.is_finite())
                .map(|secs| secs.floor() as i64)
        })
    }
}

/// Decodes the payload segment of a JWT without verifying it.
///
/// # Errors
///
/// Returns `Error::Decode` if the token is not three dot-separated segments
/// or the payload is not base64url-encoded JSON.
pub fn decode_unverified(token_str: &str) -> Result<UnverifiedClaims, Error> {
    let parts: Vec<&str> = token_str.split('.').collect();
    if parts.len() != 3 {
        return Err(Error::Decode("invalid token format".into()));
    }

    // Some issuers pad the segments; base64url-no-pad rejects that.
    let payload_b64 = parts[1].trim_end_matches('=');
    let payload = URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| Error::Decode("invalid token payload".into()))?;

    let claims = serde_json::from_slice(&payload)
        .map_err(|e| Error::Decode(format!("invalid token claims: {e}")))?;
    Ok(UnverifiedClaims { claims })
}

/// Expiry of an access token, `None` for opaque tokens or tokens without `exp`.
#[must_use]
pub fn access_token_expiry(token_str: &str) -> Option<OffsetDateTime> {
    decode_unverified(token_str)
        .ok()
        .and_then(|claims| claims.expires_at())
}

#[cfg(test)]
pub(crate) fn jwt_with_claims(claims: &JsonValue) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.c2lnbmF0dXJl")
}
