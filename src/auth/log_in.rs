//! Handles log-in requests.

use axum::{
    Json,
    extract::{FromRef, State, rejection::JsonRejection},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use serde::Deserialize;
use time::Duration;

use crate::{
    AppState, Error, Ledger, UserProfile, auth::cookie::set_auth_cookie, validation::parse_email,
};

/// The state needed to perform a log-in.
#[derive(Debug, Clone)]
pub struct LogInState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
    /// The store holding registered users.
    pub ledger: Ledger,
}

impl FromRef<AppState> for LogInState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            ledger: state.ledger.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<LogInState> for Key {
    fn from_ref(state: &LogInState) -> Self {
        state.cookie_key.clone()
    }
}

/// The credentials sent by the client to log in.
///
/// The password is a plain string. There is no need for validation here since
/// it will be compared against the password hash in the database.
#[derive(Deserialize)]
pub struct LogInRequest {
    /// The email the user registered with.
    pub email: String,
    /// The user's password.
    pub password: String,
}

/// Handler for log-in requests.
///
/// On success the session cookie is set and the user's profile is returned.
///
/// # Errors
///
/// This function will return an error in a few situations.
/// - The email or password is incorrect; the response does not say which.
/// - An internal error occurred when verifying the password.
pub async fn post_log_in(
    State(state): State<LogInState>,
    jar: PrivateCookieJar,
    request: Result<Json<LogInRequest>, JsonRejection>,
) -> Result<(PrivateCookieJar, Json<UserProfile>), Error> {
    let Json(request) = request?;
    let email = parse_email(&request.email)?;

    let user = state
        .ledger
        .authenticate(&email, &request.password)
        .inspect_err(|error| tracing::info!("Failed log-in attempt for {email}: {error}"))?;

    let jar = set_auth_cookie(jar, user.id, state.cookie_duration)?;

    Ok((jar, Json(UserProfile::from(&user))))
}
