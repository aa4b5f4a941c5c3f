//! Functions for managing the private session cookie of a logged in user.
//!
//! The session is two encrypted cookies: one holding the user ID and one
//! holding the session's expiry. The expiry is checked on the server since
//! clients are free to ignore a cookie's expires attribute.

use std::cmp::max;

use axum_extra::extract::{
    PrivateCookieJar,
    cookie::{Cookie, SameSite},
};
use time::{
    Duration, OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description,
};

use crate::{Error, UserID};

pub(crate) const COOKIE_USER_ID: &str = "user_id";
pub(crate) const COOKIE_EXPIRY: &str = "expiry";
/// The default duration for which auth cookies are valid.
pub const DEFAULT_COOKIE_DURATION: Duration = Duration::minutes(15);

/// Date time format for the cookie expiry, e.g. "2021-01-01 00:00:00.000000 +00:00:00".
const DATE_TIME_FORMAT: &[BorrowedFormatItem] = format_description!(
    "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond] [offset_hour \
         sign:mandatory]:[offset_minute]:[offset_second]"
);

fn build_cookie(name: &'static str, value: String, expiry: OffsetDateTime) -> Cookie<'static> {
    Cookie::build((name, value))
        .expires(expiry)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(true)
        .build()
}

/// Add the session cookies for `user_id` to the cookie jar, expiring
/// `duration` from now.
///
/// # Errors
/// Returns [Error::CookieError] if the expiry overflows or cannot be formatted.
pub fn set_auth_cookie(
    jar: PrivateCookieJar,
    user_id: UserID,
    duration: Duration,
) -> Result<PrivateCookieJar, Error> {
    let expiry = OffsetDateTime::now_utc()
        .checked_add(duration)
        .ok_or_else(|| Error::CookieError(format!("cookie duration {duration} is too long")))?;

    set_auth_cookie_expiry(jar, user_id, expiry)
}

fn set_auth_cookie_expiry(
    jar: PrivateCookieJar,
    user_id: UserID,
    expiry: OffsetDateTime,
) -> Result<PrivateCookieJar, Error> {
    // Use format instead of to_string so the hour is always two digits.
    let expiry_string = expiry
        .format(DATE_TIME_FORMAT)
        .map_err(|error| Error::CookieError(error.to_string()))?;

    Ok(jar
        .add(build_cookie(
            COOKIE_USER_ID,
            user_id.as_i64().to_string(),
            expiry,
        ))
        .add(build_cookie(COOKIE_EXPIRY, expiry_string, expiry)))
}

/// Overwrite the session cookies with expired ones, which should delete
/// them on the client side.
pub fn invalidate_auth_cookie(jar: PrivateCookieJar) -> PrivateCookieJar {
    let expire = |name: &'static str| {
        let mut cookie = build_cookie(name, "deleted".to_owned(), OffsetDateTime::UNIX_EPOCH);
        cookie.set_max_age(Duration::ZERO);
        cookie
    };

    jar.add(expire(COOKIE_USER_ID)).add(expire(COOKIE_EXPIRY))
}

/// Get the logged in user's ID from the session cookies.
///
/// # Errors
/// Returns [Error::Unauthenticated] if either cookie is missing, malformed or
/// the session has expired.
pub fn get_user_id_from_auth_cookie(jar: &PrivateCookieJar) -> Result<UserID, Error> {
    let expiry = get_expiry(jar)?;

    if expiry <= OffsetDateTime::now_utc() {
        tracing::debug!("Session expired at {expiry}");
        return Err(Error::Unauthenticated);
    }

    let user_id = jar
        .get(COOKIE_USER_ID)
        .ok_or(Error::Unauthenticated)?
        .value_trimmed()
        .parse()
        .map_err(|_| Error::Unauthenticated)?;

    Ok(UserID::new(user_id))
}

fn get_expiry(jar: &PrivateCookieJar) -> Result<OffsetDateTime, Error> {
    let cookie = jar.get(COOKIE_EXPIRY).ok_or(Error::Unauthenticated)?;

    OffsetDateTime::parse(cookie.value_trimmed(), DATE_TIME_FORMAT)
        .map_err(|_| Error::Unauthenticated)
}

/// Push the session's expiry out to `duration` from now, keeping the current
/// expiry if it is later.
///
/// # Errors
/// Returns [Error::Unauthenticated] if the session cookies are missing or
/// invalid, or [Error::CookieError] if the new expiry cannot be created.
pub fn extend_auth_cookie(
    jar: PrivateCookieJar,
    duration: Duration,
) -> Result<PrivateCookieJar, Error> {
    let user_id = get_user_id_from_auth_cookie(&jar)?;
    let current_expiry = get_expiry(&jar)?;
    let new_expiry = OffsetDateTime::now_utc()
        .checked_add(duration)
        .ok_or_else(|| Error::CookieError(format!("cookie duration {duration} is too long")))?;

    set_auth_cookie_expiry(jar, user_id, max(current_expiry, new_expiry))
}
