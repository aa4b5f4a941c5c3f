//! Route handlers for listing, creating and deleting transactions.

use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
    Amount, Error, Ledger, LinkOutcome, UserID,
    database_id::{TargetId, TransactionId},
    transaction::{NewTransaction, Transaction, TransactionKind},
    validation::{parse_date, required},
};

/// The request body for creating a transaction.
///
/// Fields are kept as text so that each one can be validated and reported
/// individually.
#[derive(Debug, Deserialize)]
pub struct CreateTransactionRequest {
    /// Either "income" or "expense".
    #[serde(rename = "type")]
    pub kind: String,
    /// A free text category.
    pub category: String,
    /// A positive decimal amount with at most two decimal places, e.g. "12.30".
    pub amount: String,
    /// The date of the transaction as `YYYY-MM-DD`.
    pub date: String,
    /// Text detailing the transaction.
    #[serde(default)]
    pub description: Option<String>,
    /// The savings target this income contributes to.
    #[serde(default)]
    pub target_id: Option<TargetId>,
}

impl CreateTransactionRequest {
    fn validate(self) -> Result<NewTransaction, Error> {
        let kind = TransactionKind::parse(&self.kind)?;
        let category = required("category", &self.category)?;
        let amount = Amount::parse_positive(&self.amount)?;
        let date = parse_date("date", &self.date)?;

        let mut new_transaction =
            Transaction::build(kind, category, amount, date).target_id(self.target_id);
        if let Some(description) = &self.description {
            new_transaction = new_transaction.description(description.trim());
        }

        Ok(new_transaction)
    }
}

/// List the logged in user's transactions, most recent first.
pub async fn list_transactions_endpoint(
    State(ledger): State<Ledger>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<Vec<Transaction>>, Error> {
    ledger.list_transactions(user_id).map(Json)
}

/// Create a transaction for the logged in user.
///
/// Income linked to a savings target is added to the target's saved amount.
/// Responds with the ID of the new transaction.
pub async fn create_transaction_endpoint(
    State(ledger): State<Ledger>,
    Extension(user_id): Extension<UserID>,
    request: Result<Json<CreateTransactionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), Error> {
    let Json(request) = request?;
    let new_transaction = request.validate()?;

    let transaction = ledger
        .create_transaction(user_id, new_transaction)
        .inspect_err(|error| tracing::debug!("could not create transaction: {error}"))?;

    Ok((StatusCode::CREATED, Json(json!({ "id": transaction.id }))))
}

/// Delete one of the logged in user's transactions.
///
/// Income linked to a savings target is removed from the target's saved
/// amount. Responds with the effect the delete had on the target.
pub async fn delete_transaction_endpoint(
    State(ledger): State<Ledger>,
    Extension(user_id): Extension<UserID>,
    Path(transaction_id): Path<TransactionId>,
) -> Result<Json<LinkOutcome>, Error> {
    ledger.delete_transaction(user_id, transaction_id).map(Json)
}
