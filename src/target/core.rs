//! Defines the savings target model and its database queries.

use std::fmt::Display;

use rusqlite::{
    Connection, Row, ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{Amount, Error, UserID, database_id::TargetId};

// ============================================================================
// MODELS
// ============================================================================

/// Whether a savings target is still being saved toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TargetStatus {
    /// The target is still being saved toward.
    #[default]
    Active,
    /// The user has marked the target as reached.
    Completed,
}

impl TargetStatus {
    fn as_str(&self) -> &'static str {
        match self {
            TargetStatus::Active => "active",
            TargetStatus::Completed => "completed",
        }
    }

    /// Parse a status from its lowercase name.
    ///
    /// # Errors
    /// Returns [Error::Validation] if `text` is not `active` or `completed`.
    pub fn parse(text: &str) -> Result<Self, Error> {
        match text.trim() {
            "active" => Ok(TargetStatus::Active),
            "completed" => Ok(TargetStatus::Completed),
            other => Err(Error::Validation(format!(
                "status must be \"active\" or \"completed\", got \"{other}\""
            ))),
        }
    }
}

impl Display for TargetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for TargetStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TargetStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        TargetStatus::parse(text).map_err(|error| FromSqlError::Other(error.to_string().into()))
    }
}

/// An amount of money a user is saving toward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavingsTarget {
    /// The ID of the target.
    pub id: TargetId,
    /// The user that owns the target.
    pub user_id: UserID,
    /// What the user is saving for.
    pub name: String,
    /// The amount the user wants to save.
    pub target_amount: Amount,
    /// The sum of the income linked to this target.
    pub saved_amount: Amount,
    /// When the user wants to reach the target by.
    pub deadline: Option<Date>,
    /// Free text notes about the target.
    pub description: String,
    /// Whether the target is still being saved toward.
    pub status: TargetStatus,
    /// When the target was created.
    pub created_at: OffsetDateTime,
}

impl SavingsTarget {
    /// Create a new target.
    ///
    /// Shortcut for [NewTarget] for discoverability.
    pub fn build(name: &str, target_amount: Amount) -> NewTarget {
        NewTarget {
            name: name.to_owned(),
            target_amount,
            deadline: None,
            description: String::new(),
        }
    }
}

/// The details needed to create a [SavingsTarget].
#[derive(Debug, Clone, PartialEq)]
pub struct NewTarget {
    /// What the user is saving for.
    pub name: String,
    /// The amount the user wants to save, must be greater than zero.
    pub target_amount: Amount,
    /// When the user wants to reach the target by.
    pub deadline: Option<Date>,
    /// Free text notes about the target.
    pub description: String,
}

impl NewTarget {
    /// Set the deadline for the target.
    pub fn deadline(mut self, deadline: Option<Date>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Set the description for the target.
    pub fn description(mut self, description: &str) -> Self {
        description.clone_into(&mut self.description);
        self
    }
}

/// A partial update to a [SavingsTarget]. Fields set to `None` are left unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TargetUpdate {
    /// Overwrite the saved amount, must not be negative.
    pub saved_amount: Option<Amount>,
    /// Change the status of the target.
    pub status: Option<TargetStatus>,
}

impl TargetUpdate {
    /// Whether the update would change nothing.
    pub fn is_empty(&self) -> bool {
        self.saved_amount.is_none() && self.status.is_none()
    }
}

/// What to do with transactions that reference a target when it is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum TargetDeletePolicy {
    /// Refuse to delete a target while any transaction references it.
    #[default]
    Reject,
    /// Clear the target from referencing transactions, then delete it.
    Unlink,
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

const TARGET_COLUMNS: &str =
    "id, user_id, name, target_amount, saved_amount, deadline, description, status, created_at";

/// Create the target table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_target_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS target (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                target_amount INTEGER NOT NULL CHECK (target_amount > 0),
                saved_amount INTEGER NOT NULL DEFAULT 0 CHECK (saved_amount >= 0),
                deadline TEXT,
                description TEXT NOT NULL DEFAULT '',
                status TEXT NOT NULL DEFAULT 'active' CHECK (status IN ('active', 'completed')),
                created_at TEXT NOT NULL,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_target_user ON target(user_id);",
        (),
    )?;

    Ok(())
}

/// Create a new savings target owned by `owner`.
///
/// The saved amount starts at zero and the status starts as active.
///
/// # Errors
/// This function will return a:
/// - [Error::Validation] if the name is empty or the target amount is not positive,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_target(
    owner: UserID,
    new_target: NewTarget,
    connection: &Connection,
) -> Result<SavingsTarget, Error> {
    if new_target.name.trim().is_empty() {
        return Err(Error::Validation("target name cannot be empty".to_owned()));
    }

    if !new_target.target_amount.is_positive() {
        return Err(Error::Validation(
            "target amount must be greater than zero".to_owned(),
        ));
    }

    let target = connection
        .prepare(&format!(
            "INSERT INTO target (user_id, name, target_amount, saved_amount, deadline, description, status, created_at)
             VALUES (?1, ?2, ?3, 0, ?4, ?5, ?6, ?7)
             RETURNING {TARGET_COLUMNS}"
        ))?
        .query_row(
            (
                owner.as_i64(),
                new_target.name.trim(),
                new_target.target_amount,
                new_target.deadline,
                new_target.description,
                TargetStatus::Active,
                OffsetDateTime::now_utc(),
            ),
            map_target_row,
        )?;

    Ok(target)
}

/// Retrieve the target `id` owned by `owner`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a target owned by `owner`,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_target(
    owner: UserID,
    id: TargetId,
    connection: &Connection,
) -> Result<SavingsTarget, Error> {
    let target = connection
        .prepare(&format!(
            "SELECT {TARGET_COLUMNS} FROM target WHERE id = :id AND user_id = :user_id"
        ))?
        .query_row(
            &[(":id", &id), (":user_id", &owner.as_i64())],
            map_target_row,
        )?;

    Ok(target)
}

/// Get all targets owned by `owner`, most recently created first.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn list_targets(owner: UserID, connection: &Connection) -> Result<Vec<SavingsTarget>, Error> {
    connection
        .prepare(&format!(
            "SELECT {TARGET_COLUMNS} FROM target WHERE user_id = :user_id
             ORDER BY created_at DESC, id DESC"
        ))?
        .query_map(&[(":user_id", &owner.as_i64())], map_target_row)?
        .map(|maybe_target| maybe_target.map_err(Error::from))
        .collect()
}

/// Apply a partial update to the target `id` owned by `owner`.
///
/// An empty update returns the target unchanged.
///
/// # Errors
/// This function will return a:
/// - [Error::Validation] if the new saved amount is negative,
/// - [Error::NotFound] if `id` does not refer to a target owned by `owner`,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_target(
    owner: UserID,
    id: TargetId,
    update: TargetUpdate,
    connection: &Connection,
) -> Result<SavingsTarget, Error> {
    if update.saved_amount.is_some_and(Amount::is_negative) {
        return Err(Error::Validation(
            "saved amount cannot be negative".to_owned(),
        ));
    }

    if update.is_empty() {
        return get_target(owner, id, connection);
    }

    let target = connection
        .prepare(&format!(
            "UPDATE target
             SET saved_amount = COALESCE(?1, saved_amount), status = COALESCE(?2, status)
             WHERE id = ?3 AND user_id = ?4
             RETURNING {TARGET_COLUMNS}"
        ))?
        .query_row(
            (update.saved_amount, update.status, id, owner.as_i64()),
            map_target_row,
        )?;

    Ok(target)
}

/// Count the transactions that reference the target `id`.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn count_linked_transactions(id: TargetId, connection: &Connection) -> Result<usize, Error> {
    connection
        .query_row(
            "SELECT COUNT(id) FROM \"transaction\" WHERE target_id = :target_id",
            &[(":target_id", &id)],
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}

/// Delete the target `id` owned by `owner`, resolving transactions that
/// reference it according to `policy`.
///
/// Returns the number of transactions that were unlinked from the target.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a target owned by `owner`,
/// - [Error::TargetInUse] if `policy` is [TargetDeletePolicy::Reject] and
///   transactions still reference the target,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn delete_target(
    owner: UserID,
    id: TargetId,
    policy: TargetDeletePolicy,
    connection: &Connection,
) -> Result<usize, Error> {
    // Confirms ownership before anything is touched.
    get_target(owner, id, connection)?;

    let linked_count = count_linked_transactions(id, connection)?;

    let unlinked_count = match policy {
        TargetDeletePolicy::Reject if linked_count > 0 => {
            return Err(Error::TargetInUse(linked_count));
        }
        TargetDeletePolicy::Reject => 0,
        TargetDeletePolicy::Unlink => connection.execute(
            "UPDATE \"transaction\" SET target_id = NULL WHERE target_id = ?1 AND user_id = ?2",
            (id, owner.as_i64()),
        )?,
    };

    connection.execute(
        "DELETE FROM target WHERE id = ?1 AND user_id = ?2",
        (id, owner.as_i64()),
    )?;

    Ok(unlinked_count)
}

/// Map a database row to a [SavingsTarget].
fn map_target_row(row: &Row) -> Result<SavingsTarget, rusqlite::Error> {
    Ok(SavingsTarget {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        name: row.get(2)?,
        target_amount: row.get(3)?,
        saved_amount: row.get(4)?,
        deadline: row.get(5)?,
        description: row.get(6)?,
        status: row.get(7)?,
        created_at: row.get(8)?,
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod database_tests {
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        Amount, Error, PasswordHash, UserID,
        db::initialize,
        target::{
            SavingsTarget, TargetDeletePolicy, TargetStatus, TargetUpdate, create_target,
            delete_target, get_target, list_targets, update_target,
        },
        transaction::{Transaction, TransactionKind, create_transaction},
        user::create_user,
    };

    fn get_test_connection() -> (Connection, UserID, UserID) {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        let owner = create_user(
            "Owner",
            &"owner@example.com".parse().unwrap(),
            PasswordHash::new_unchecked("hunter2"),
            &conn,
        )
        .unwrap()
        .id;
        let other = create_user(
            "Other",
            &"other@example.com".parse().unwrap(),
            PasswordHash::new_unchecked("hunter3"),
            &conn,
        )
        .unwrap()
        .id;

        (conn, owner, other)
    }

    #[test]
    fn create_succeeds_with_defaults() {
        let (conn, owner, _) = get_test_connection();

        let target = create_target(
            owner,
            SavingsTarget::build("Holiday", Amount::new(1_000_000))
                .deadline(Some(date!(2026 - 12 - 01)))
                .description("Japan"),
            &conn,
        )
        .unwrap();

        assert!(target.id > 0);
        assert_eq!(target.user_id, owner);
        assert_eq!(target.name, "Holiday");
        assert_eq!(target.target_amount, Amount::new(1_000_000));
        assert_eq!(target.saved_amount, Amount::ZERO);
        assert_eq!(target.deadline, Some(date!(2026 - 12 - 01)));
        assert_eq!(target.description, "Japan");
        assert_eq!(target.status, TargetStatus::Active);
    }

    #[test]
    fn create_fails_on_non_positive_amount() {
        let (conn, owner, _) = get_test_connection();

        let result = create_target(owner, SavingsTarget::build("Car", Amount::ZERO), &conn);

        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn create_fails_on_empty_name() {
        let (conn, owner, _) = get_test_connection();

        let result = create_target(owner, SavingsTarget::build("  ", Amount::new(100)), &conn);

        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn get_fails_for_other_users_target() {
        let (conn, owner, other) = get_test_connection();
        let target =
            create_target(owner, SavingsTarget::build("Car", Amount::new(500)), &conn).unwrap();

        assert_eq!(get_target(other, target.id, &conn), Err(Error::NotFound));
        assert_eq!(get_target(owner, target.id, &conn), Ok(target));
    }

    #[test]
    fn list_returns_newest_first_and_only_own_targets() {
        let (conn, owner, other) = get_test_connection();
        let first = create_target(
            owner,
            SavingsTarget::build("First", Amount::new(100)),
            &conn,
        )
        .unwrap();
        let second = create_target(
            owner,
            SavingsTarget::build("Second", Amount::new(200)),
            &conn,
        )
        .unwrap();
        create_target(
            other,
            SavingsTarget::build("Theirs", Amount::new(300)),
            &conn,
        )
        .unwrap();

        let got = list_targets(owner, &conn).unwrap();

        assert_eq!(got, vec![second, first]);
    }

    #[test]
    fn update_applies_partial_changes() {
        let (conn, owner, _) = get_test_connection();
        let target =
            create_target(owner, SavingsTarget::build("Car", Amount::new(500)), &conn).unwrap();

        let updated = update_target(
            owner,
            target.id,
            TargetUpdate {
                status: Some(TargetStatus::Completed),
                ..Default::default()
            },
            &conn,
        )
        .unwrap();
        assert_eq!(updated.status, TargetStatus::Completed);
        assert_eq!(updated.saved_amount, Amount::ZERO);

        let updated = update_target(
            owner,
            target.id,
            TargetUpdate {
                saved_amount: Some(Amount::new(250)),
                ..Default::default()
            },
            &conn,
        )
        .unwrap();
        assert_eq!(updated.status, TargetStatus::Completed);
        assert_eq!(updated.saved_amount, Amount::new(250));
    }

    #[test]
    fn update_fails_for_missing_or_foreign_target() {
        let (conn, owner, other) = get_test_connection();
        let target =
            create_target(owner, SavingsTarget::build("Car", Amount::new(500)), &conn).unwrap();
        let update = TargetUpdate {
            saved_amount: Some(Amount::new(1)),
            status: None,
        };

        assert_eq!(
            update_target(other, target.id, update, &conn),
            Err(Error::NotFound)
        );
        assert_eq!(
            update_target(owner, target.id + 1, update, &conn),
            Err(Error::NotFound)
        );
        assert_eq!(
            update_target(other, target.id, TargetUpdate::default(), &conn),
            Err(Error::NotFound)
        );
        assert_eq!(
            get_target(owner, target.id, &conn).unwrap().saved_amount,
            Amount::ZERO
        );
    }

    #[test]
    fn update_rejects_negative_saved_amount() {
        let (conn, owner, _) = get_test_connection();
        let target =
            create_target(owner, SavingsTarget::build("Car", Amount::new(500)), &conn).unwrap();

        let result = update_target(
            owner,
            target.id,
            TargetUpdate {
                saved_amount: Some(Amount::new(-1)),
                status: None,
            },
            &conn,
        );

        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn delete_with_reject_policy_fails_while_linked() {
        let (conn, owner, _) = get_test_connection();
        let target =
            create_target(owner, SavingsTarget::build("Car", Amount::new(500)), &conn).unwrap();
        create_transaction(
            owner,
            Transaction::build(
                TransactionKind::Income,
                "Salary",
                Amount::new(100),
                date!(2025 - 10 - 01),
            )
            .target_id(Some(target.id)),
            &conn,
        )
        .unwrap();

        let result = delete_target(owner, target.id, TargetDeletePolicy::Reject, &conn);

        assert_eq!(result, Err(Error::TargetInUse(1)));
        assert!(get_target(owner, target.id, &conn).is_ok());
    }

    #[test]
    fn delete_with_reject_policy_succeeds_when_unlinked() {
        let (conn, owner, _) = get_test_connection();
        let target =
            create_target(owner, SavingsTarget::build("Car", Amount::new(500)), &conn).unwrap();

        let result = delete_target(owner, target.id, TargetDeletePolicy::Reject, &conn);

        assert_eq!(result, Ok(0));
        assert_eq!(get_target(owner, target.id, &conn), Err(Error::NotFound));
    }

    #[test]
    fn delete_with_unlink_policy_clears_references() {
        let (conn, owner, _) = get_test_connection();
        let target =
            create_target(owner, SavingsTarget::build("Car", Amount::new(500)), &conn).unwrap();
        let transaction = create_transaction(
            owner,
            Transaction::build(
                TransactionKind::Income,
                "Salary",
                Amount::new(100),
                date!(2025 - 10 - 01),
            )
            .target_id(Some(target.id)),
            &conn,
        )
        .unwrap();

        let result = delete_target(owner, target.id, TargetDeletePolicy::Unlink, &conn);

        assert_eq!(result, Ok(1));
        assert_eq!(get_target(owner, target.id, &conn), Err(Error::NotFound));
        let target_id: Option<i64> = conn
            .query_row(
                "SELECT target_id FROM \"transaction\" WHERE id = ?1",
                (transaction.id,),
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(target_id, None);
    }

    #[test]
    fn delete_fails_for_other_users_target() {
        let (conn, owner, other) = get_test_connection();
        let target =
            create_target(owner, SavingsTarget::build("Car", Amount::new(500)), &conn).unwrap();

        let result = delete_target(other, target.id, TargetDeletePolicy::Unlink, &conn);

        assert_eq!(result, Err(Error::NotFound));
        assert!(get_target(owner, target.id, &conn).is_ok());
    }
}
