//! Route handlers for managing savings targets.

use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
    Amount, Error, Ledger, UserID,
    database_id::TargetId,
    target::{NewTarget, SavingsTarget, TargetStatus, TargetUpdate},
    validation::{optional_date, required},
};

/// The request body for creating a savings target.
#[derive(Debug, Deserialize)]
pub struct CreateTargetRequest {
    /// What the user is saving for.
    pub name: String,
    /// The amount to save as a positive decimal, e.g. "10000.00".
    pub amount: String,
    /// An optional deadline as `YYYY-MM-DD`.
    #[serde(default)]
    pub deadline: Option<String>,
    /// Free text notes about the target.
    #[serde(default)]
    pub description: Option<String>,
}

impl CreateTargetRequest {
    fn validate(self) -> Result<NewTarget, Error> {
        let name = required("name", &self.name)?;
        let amount = Amount::parse_positive(&self.amount)?;
        let deadline = optional_date("deadline", self.deadline.as_deref())?;

        let new_target = SavingsTarget::build(name, amount).deadline(deadline);

        Ok(match &self.description {
            Some(description) => new_target.description(description.trim()),
            None => new_target,
        })
    }
}

/// The request body for updating a savings target.
///
/// Omitted fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTargetRequest {
    /// Overwrite the saved amount, e.g. to record savings made outside the ledger.
    #[serde(default)]
    pub saved_amount: Option<String>,
    /// Either "active" or "completed".
    #[serde(default)]
    pub status: Option<String>,
}

impl UpdateTargetRequest {
    fn validate(self) -> Result<TargetUpdate, Error> {
        let saved_amount = self
            .saved_amount
            .as_deref()
            .map(str::parse::<Amount>)
            .transpose()?;
        let status = self
            .status
            .as_deref()
            .map(TargetStatus::parse)
            .transpose()?;

        Ok(TargetUpdate {
            saved_amount,
            status,
        })
    }
}

/// List the logged in user's savings targets, newest first.
pub async fn list_targets_endpoint(
    State(ledger): State<Ledger>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<Vec<SavingsTarget>>, Error> {
    ledger.list_targets(user_id).map(Json)
}

/// Get one of the logged in user's savings targets.
pub async fn get_target_endpoint(
    State(ledger): State<Ledger>,
    Extension(user_id): Extension<UserID>,
    Path(target_id): Path<TargetId>,
) -> Result<Json<SavingsTarget>, Error> {
    ledger.get_target(user_id, target_id).map(Json)
}

/// Create a savings target for the logged in user.
///
/// Responds with the ID of the new target.
pub async fn create_target_endpoint(
    State(ledger): State<Ledger>,
    Extension(user_id): Extension<UserID>,
    request: Result<Json<CreateTargetRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), Error> {
    let Json(request) = request?;
    let target = ledger.create_target(user_id, request.validate()?)?;

    Ok((StatusCode::CREATED, Json(json!({ "id": target.id }))))
}

/// Directly adjust the saved amount or status of one of the logged in
/// user's savings targets.
///
/// Responds with the updated target.
pub async fn update_target_endpoint(
    State(ledger): State<Ledger>,
    Extension(user_id): Extension<UserID>,
    Path(target_id): Path<TargetId>,
    request: Result<Json<UpdateTargetRequest>, JsonRejection>,
) -> Result<Json<SavingsTarget>, Error> {
    let Json(request) = request?;
    let update = request.validate()?;

    if update.saved_amount.is_some() {
        tracing::info!("Saved amount of target {target_id} set directly to a new value");
    }

    ledger.update_target(user_id, target_id, update).map(Json)
}

/// Delete one of the logged in user's savings targets.
///
/// What happens to transactions linked to the target depends on the
/// server's target delete policy.
pub async fn delete_target_endpoint(
    State(ledger): State<Ledger>,
    Extension(user_id): Extension<UserID>,
    Path(target_id): Path<TargetId>,
) -> Result<StatusCode, Error> {
    ledger.delete_target(user_id, target_id)?;

    Ok(StatusCode::OK)
}
