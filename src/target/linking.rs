//! Keeps a target's saved amount in step with the income linked to it.
//!
//! Both functions must run inside the same unit of work as the transaction
//! insert or delete they belong to, otherwise the saved amount can drift.

use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;

use crate::{
    Amount, Error, UserID,
    database_id::TargetId,
    transaction::{Transaction, TransactionKind},
};

/// The effect a transaction write had on a savings target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "link", rename_all = "snake_case")]
pub enum LinkOutcome {
    /// The transaction does not contribute to any target.
    Unlinked,
    /// The target's saved amount was adjusted.
    Applied {
        /// The target that was adjusted.
        target_id: TargetId,
        /// The target's saved amount after the adjustment.
        saved_amount: Amount,
    },
    /// Reversing the transaction would have taken the saved amount below
    /// zero, so it was set to zero instead.
    ///
    /// This means the saved amount had already drifted from the linked
    /// income, e.g. after a direct adjustment.
    Clamped {
        /// The target that was adjusted.
        target_id: TargetId,
        /// How far below zero the saved amount would have gone.
        shortfall: Amount,
    },
}

/// The target a transaction contributes to, if any.
///
/// Only income can contribute to a target.
fn linked_target(transaction: &Transaction) -> Option<TargetId> {
    match transaction.kind {
        TransactionKind::Income => transaction.target_id,
        TransactionKind::Expense => None,
    }
}

/// Add a newly created income transaction to its target's saved amount.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if the target does not exist or is not owned by `owner`,
/// - [Error::AmountOverflow] if the new saved amount would be too large to represent,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn apply_link(
    owner: UserID,
    transaction: &Transaction,
    connection: &Connection,
) -> Result<LinkOutcome, Error> {
    let Some(target_id) = linked_target(transaction) else {
        return Ok(LinkOutcome::Unlinked);
    };

    let current: Amount = connection.query_row(
        "SELECT saved_amount FROM target WHERE id = ?1 AND user_id = ?2",
        (target_id, owner.as_i64()),
        |row| row.get(0),
    )?;
    current.checked_add(transaction.amount).inspect_err(|_| {
        tracing::warn!(
            "Adding {} from transaction {} to target {target_id} would overflow its saved amount of {current}",
            transaction.amount,
            transaction.id
        );
    })?;

    // A relative update so concurrent increments cannot overwrite each other.
    let saved_amount: Amount = connection
        .prepare(
            "UPDATE target SET saved_amount = saved_amount + ?1
             WHERE id = ?2 AND user_id = ?3
             RETURNING saved_amount",
        )?
        .query_row((transaction.amount, target_id, owner.as_i64()), |row| {
            row.get(0)
        })?;

    tracing::debug!(
        "Added {} from transaction {} to target {target_id}",
        transaction.amount,
        transaction.id
    );

    Ok(LinkOutcome::Applied {
        target_id,
        saved_amount,
    })
}

/// Subtract a deleted income transaction from its target's saved amount.
///
/// The saved amount never goes below zero. If it would, it is set to zero,
/// the fault is logged, and [LinkOutcome::Clamped] is returned; the caller
/// should still commit the delete.
///
/// If the target no longer exists there is nothing to reverse.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn reverse_link(
    owner: UserID,
    transaction: &Transaction,
    connection: &Connection,
) -> Result<LinkOutcome, Error> {
    let Some(target_id) = linked_target(transaction) else {
        return Ok(LinkOutcome::Unlinked);
    };

    let current: Option<Amount> = connection
        .query_row(
            "SELECT saved_amount FROM target WHERE id = ?1 AND user_id = ?2",
            (target_id, owner.as_i64()),
            |row| row.get(0),
        )
        .optional()?;

    let Some(current) = current else {
        tracing::warn!(
            "Transaction {} referenced target {target_id} which no longer exists",
            transaction.id
        );
        return Ok(LinkOutcome::Unlinked);
    };

    let remaining = current.checked_sub(transaction.amount)?;
    let (saved_amount, outcome) = if remaining.is_negative() {
        let shortfall = transaction.amount.checked_sub(current)?;
        tracing::error!(
            "Consistency fault: removing transaction {} ({}) from target {target_id} \
            would leave a saved amount of {remaining}, clamping to zero",
            transaction.id,
            transaction.amount,
        );
        (
            Amount::ZERO,
            LinkOutcome::Clamped {
                target_id,
                shortfall,
            },
        )
    } else {
        (
            remaining,
            LinkOutcome::Applied {
                target_id,
                saved_amount: remaining,
            },
        )
    };

    connection.execute(
        "UPDATE target SET saved_amount = ?1 WHERE id = ?2 AND user_id = ?3",
        (saved_amount, target_id, owner.as_i64()),
    )?;

    Ok(outcome)
}
