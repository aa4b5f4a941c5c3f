//! Route handlers for reading a user's statistics.

use axum::{
    Extension, Json,
    extract::{FromRef, State},
};

use crate::{AppState, Error, Ledger, UserID, timezone::local_today};

use super::{MonthlySummary, Stats};

/// The state needed for computing statistics.
#[derive(Debug, Clone)]
pub struct StatsState {
    /// The store holding the user's transactions.
    pub ledger: Ledger,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for StatsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            ledger: state.ledger.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Get the balance, totals, this month's totals and category breakdown for
/// the logged in user.
///
/// The current month is determined from the server's local timezone.
pub async fn get_stats_endpoint(
    State(state): State<StatsState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<Stats>, Error> {
    let today = local_today(&state.local_timezone)?;
    let stats = state.ledger.stats(user_id, today)?;

    Ok(Json(stats))
}

/// Get income and expense totals for each month the logged in user has
/// transactions in.
pub async fn get_monthly_summary_endpoint(
    State(state): State<StatsState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<Vec<MonthlySummary>>, Error> {
    state.ledger.monthly_summary(user_id).map(Json)
}

#[cfg(test)]
mod stats_endpoint_tests {
    use axum::{Extension, Router, http::StatusCode, routing::get};
    use axum_test::TestServer;
    use time::OffsetDateTime;

    use crate::{
        Amount, MonthlySummary, Stats, TargetDeletePolicy, Transaction, TransactionKind, UserID,
        ledger::test_utils::{get_test_ledger, register_test_user},
    };

    use super::{StatsState, get_monthly_summary_endpoint, get_stats_endpoint};

    fn get_test_server(state: StatsState, user_id: UserID) -> TestServer {
        let app = Router::new()
            .route("/stats", get(get_stats_endpoint))
            .route("/stats/monthly", get(get_monthly_summary_endpoint))
            .layer(Extension(user_id))
            .with_state(state);

        TestServer::try_new(app).expect("Could not create test server.")
    }

    #[tokio::test]
    async fn returns_stats_for_current_user() {
        let ledger = get_test_ledger(TargetDeletePolicy::Reject);
        let user_id = register_test_user(&ledger, "saver@example.com").id;
        let other_user = register_test_user(&ledger, "other@example.com").id;
        let today = OffsetDateTime::now_utc().date();
        ledger
            .create_transaction(
                user_id,
                Transaction::build(
                    TransactionKind::Income,
                    "Salary",
                    Amount::new(10_000),
                    today,
                ),
            )
            .unwrap();
        ledger
            .create_transaction(
                user_id,
                Transaction::build(TransactionKind::Expense, "Food", Amount::new(2_550), today),
            )
            .unwrap();
        ledger
            .create_transaction(
                other_user,
                Transaction::build(
                    TransactionKind::Income,
                    "Salary",
                    Amount::new(99_999),
                    today,
                ),
            )
            .unwrap();
        let server = get_test_server(
            StatsState {
                ledger,
                local_timezone: "Etc/UTC".to_owned(),
            },
            user_id,
        );

        let response = server.get("/stats").await;

        response.assert_status_ok();
        let stats = response.json::<Stats>();
        assert_eq!(stats.balance, Amount::new(7_450));
        assert_eq!(stats.monthly_income, Amount::new(10_000));
        assert_eq!(stats.monthly_expense, Amount::new(2_550));
        assert_eq!(stats.category_breakdown.len(), 1);
    }

    #[tokio::test]
    async fn serializes_amounts_as_decimal_strings() {
        let ledger = get_test_ledger(TargetDeletePolicy::Reject);
        let user_id = register_test_user(&ledger, "saver@example.com").id;
        let server = get_test_server(
            StatsState {
                ledger,
                local_timezone: "Etc/UTC".to_owned(),
            },
            user_id,
        );

        let response = server.get("/stats").await;

        response.assert_status_ok();
        response.assert_json(&serde_json::json!({
            "balance": "0.00",
            "monthly_income": "0.00",
            "monthly_expense": "0.00",
            "total_income": "0.00",
            "total_expense": "0.00",
            "category_breakdown": [],
        }));
    }

    #[tokio::test]
    async fn invalid_timezone_is_internal_error() {
        let ledger = get_test_ledger(TargetDeletePolicy::Reject);
        let user_id = register_test_user(&ledger, "saver@example.com").id;
        let server = get_test_server(
            StatsState {
                ledger,
                local_timezone: "Not/A_Timezone".to_owned(),
            },
            user_id,
        );

        let response = server.get("/stats").await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn returns_monthly_summary() {
        let ledger = get_test_ledger(TargetDeletePolicy::Reject);
        let user_id = register_test_user(&ledger, "saver@example.com").id;
        ledger
            .create_transaction(
                user_id,
                Transaction::build(
                    TransactionKind::Income,
                    "Salary",
                    Amount::new(10_000),
                    time::macros::date!(2025 - 03 - 14),
                ),
            )
            .unwrap();
        let server = get_test_server(
            StatsState {
                ledger,
                local_timezone: "Etc/UTC".to_owned(),
            },
            user_id,
        );

        let response = server.get("/stats/monthly").await;

        response.assert_status_ok();
        assert_eq!(
            response.json::<Vec<MonthlySummary>>(),
            vec![MonthlySummary {
                month: "2025-03".to_owned(),
                income: Amount::new(10_000),
                expense: Amount::ZERO,
                net: Amount::new(10_000),
            }]
        );
    }
}
