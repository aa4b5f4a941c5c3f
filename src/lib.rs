//! A personal finance tracker for logging income and expenses, saving toward
//! targets, and reporting on where the money went.
//!
//! This library provides a JSON API over a SQLite backed ledger. The
//! [Ledger] is the single entry point for reading and mutating a user's
//! savings targets and transactions; every mutation runs as one atomic unit
//! of work so that a target's saved amount never drifts from the income
//! linked to it.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde_json::json;
use tokio::signal;

mod app_state;
mod auth;
mod database_id;
mod db;
pub mod endpoints;
mod ledger;
mod logging;
mod money;
mod password;
mod routing;
mod stats;
mod target;
mod timezone;
mod transaction;
mod user;
mod validation;

pub use app_state::AppState;
pub use database_id::{TargetId, TransactionId};
pub use db::initialize as initialize_db;
pub use ledger::Ledger;
pub use logging::logging_middleware;
pub use money::Amount;
pub use password::{PasswordHash, ValidatedPassword};
pub use routing::build_router;
pub use stats::{CategoryTotal, MonthlySummary, Stats};
pub use target::{
    LinkOutcome, NewTarget, SavingsTarget, TargetDeletePolicy, TargetStatus, TargetUpdate,
};
pub use timezone::{get_local_offset, local_today};
pub use transaction::{NewTransaction, Transaction, TransactionKind};
pub use user::{User, UserID, UserProfile};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The request was malformed or a field failed validation.
    ///
    /// These errors are raised before the ledger is touched.
    #[error("{0}")]
    Validation(String),

    /// The email used to register is already in use. The client should try
    /// again with a different email address.
    #[error("the email is already in use")]
    DuplicateEmail,

    /// The email and password combination did not match a registered user.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// The request requires a logged in user but the session cookie was
    /// missing, invalid or expired.
    #[error("you must be logged in to do that")]
    Unauthenticated,

    /// The user provided a password that is too easy to guess.
    #[error("password is too weak: {0}")]
    TooWeak(String),

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// The requested resource was not found, or belongs to another user.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An amount or a total of amounts grew too large to be represented.
    #[error("the amount is too large to be recorded")]
    AmountOverflow,

    /// A savings target could not be deleted because transactions still
    /// reference it.
    #[error("the target is still referenced by {0} transaction(s)")]
    TargetInUse(usize),

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// The configured timezone is not a valid, canonical timezone name.
    #[error("invalid timezone {0}")]
    InvalidTimezone(String),

    /// Could not acquire the database lock.
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// The session cookie could not be created.
    #[error("could not create the session cookie: {0}")]
    CookieError(String),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    && desc.ends_with("user.email") =>
            {
                Error::DuplicateEmail
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::Validation(rejection.body_text())
    }
}

impl Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation(_) | Error::TooWeak(_) | Error::AmountOverflow => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Error::DuplicateEmail | Error::TargetInUse(_) => StatusCode::CONFLICT,
            Error::InvalidCredentials | Error::Unauthenticated => StatusCode::UNAUTHORIZED,
            Error::NotFound => StatusCode::NOT_FOUND,
            Error::HashingError(_)
            | Error::SqlError(_)
            | Error::InvalidTimezone(_)
            | Error::DatabaseLockError
            | Error::CookieError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            // Internal details are for the server logs, not the client.
            tracing::error!("An unexpected error occurred: {}", self);
            "An unexpected error occurred, check the server logs for more details.".to_owned()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
