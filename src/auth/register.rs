//! Handles registering new users.

use axum::{
    Json,
    extract::{FromRef, State, rejection::JsonRejection},
    http::StatusCode,
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use serde::Deserialize;
use time::Duration;

use crate::{
    AppState, Error, Ledger, PasswordHash, UserProfile, ValidatedPassword,
    auth::cookie::set_auth_cookie,
    validation::{parse_email, required},
};

/// The state needed to register a new user.
#[derive(Debug, Clone)]
pub struct RegistrationState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
    /// The bcrypt cost used when hashing new passwords.
    pub password_cost: u32,
    /// The store holding registered users.
    pub ledger: Ledger,
}

impl FromRef<AppState> for RegistrationState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            password_cost: state.password_cost,
            ledger: state.ledger.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<RegistrationState> for Key {
    fn from_ref(state: &RegistrationState) -> Self {
        state.cookie_key.clone()
    }
}

/// The details sent by the client to register.
#[derive(Deserialize)]
pub struct RegisterRequest {
    /// The user's display name.
    pub name: String,
    /// The email the user will log in with.
    pub email: String,
    /// The user's chosen password.
    pub password: String,
}

/// Register a new user and log them in.
///
/// On success the session cookie is set and the new user's profile is
/// returned with the status 201 Created.
///
/// # Errors
///
/// This function will return an error if:
/// - a field is missing or invalid,
/// - the password is too weak,
/// - or the email is already registered.
pub async fn register_user(
    State(state): State<RegistrationState>,
    jar: PrivateCookieJar,
    request: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, PrivateCookieJar, Json<UserProfile>), Error> {
    let Json(request) = request?;
    let name = required("name", &request.name)?;
    let email = parse_email(&request.email)?;
    required("password", &request.password)?;

    // The password should not be guessable from the user's other details.
    let validated_password = ValidatedPassword::new(&request.password, &[name, email.as_str()])?;
    let password_hash =
        PasswordHash::new(validated_password, state.password_cost).inspect_err(|error| {
            tracing::error!("an error occurred while hashing a password: {error}")
        })?;

    let user = state.ledger.register(name, &email, password_hash)?;
    let jar = set_auth_cookie(jar, user.id, state.cookie_duration)?;

    Ok((StatusCode::CREATED, jar, Json(UserProfile::from(&user))))
}
