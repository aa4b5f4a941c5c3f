//! Log-out route handler that invalidates the session cookies.

use axum::http::StatusCode;
use axum_extra::extract::PrivateCookieJar;

use crate::auth::cookie::invalidate_auth_cookie;

/// Invalidate the session cookies.
///
/// Logging out without a session is not an error.
pub async fn post_log_out(jar: PrivateCookieJar) -> (StatusCode, PrivateCookieJar) {
    (StatusCode::OK, invalidate_auth_cookie(jar))
}
