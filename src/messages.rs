//! User-facing strings for errors the API reports.
//!
//! Business error codes come back in the `error` field of a failure body;
//! anything not listed falls back to the HTTP status table and finally to
//! [`GENERIC`].

/// Fallback when the error shape is not recognized.
pub const GENERIC: &str = "An unknown error occurred.";

/// No response was received.
pub const NETWORK: &str =
    "We are experiencing internet challenges with your connection. Please check your internet connection.";

/// The request timed out before the server answered.
pub const TIMEOUT: &str =
    "We are not able to reach our servers. Please check your internet connection.";

/// The refresh token was rejected; the user must sign in again.
pub const SESSION_EXPIRED: &str = "Your session has expired. Please log in again.";

/// Message for a documented business error code.
#[must_use]
pub fn business_message(code: &str) -> Option<&'static str> {
    let message = match code {
        "UM_EA_4002" => "Email already exist.",
        "UM_MA_4003" => "Mobile number already exist.",
        "UM_INV_4004" => {
            "This user does not exist. Please try again with the correct Email ID/Password."
        }
        "US_SAE_2002" | "US_CSE_2003" | "MT_AE_2002" | "PW_SAE_2002" | "MKT_PG_1004"
        | "WEB_SLGE_2002" | "EV_SAE_2002" | "CO_SlUG_2002" => "Slug already present.",
        "MTS_UW_2001" => "Invalid URL",
        _ => return None,
    };
    Some(message)
}

/// Message for an HTTP (or gateway-specific) status code.
#[must_use]
pub fn status_message(status: u16) -> Option<&'static str> {
    const RETRY_LATER: &str = "Apologies! Something has gone wrong at our end and we are trying to fix it. Please retry after sometime.";
    const NO_PERMISSION: &str = "You currently do not have permissions to access this page or feature.";

    match status {
        201 => Some("Document upload successfully"),
        400 | 404 | 409 | 500 | 701 | 702 | 801 => Some(RETRY_LATER),
        401 | 403 | 503 => Some(NO_PERMISSION),
        _ => None,
    }
}
