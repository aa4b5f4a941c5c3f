//! Defines the core data models and database queries for transactions.

use std::fmt::Display;

use rusqlite::{
    Connection, Row, ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Amount, Error, UserID,
    database_id::{TargetId, TransactionId},
    target::get_target,
};

// ============================================================================
// MODELS
// ============================================================================

/// Whether money was earned or spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Money was earned.
    Income,
    /// Money was spent.
    Expense,
}

impl TransactionKind {
    fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Income => "income",
            TransactionKind::Expense => "expense",
        }
    }

    /// Parse a transaction kind from its lowercase name.
    ///
    /// # Errors
    /// Returns [Error::Validation] if `text` is not `income` or `expense`.
    pub fn parse(text: &str) -> Result<Self, Error> {
        match text.trim() {
            "income" => Ok(TransactionKind::Income),
            "expense" => Ok(TransactionKind::Expense),
            other => Err(Error::Validation(format!(
                "type must be \"income\" or \"expense\", got \"{other}\""
            ))),
        }
    }
}

impl Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for TransactionKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TransactionKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        TransactionKind::parse(text).map_err(|error| FromSqlError::Other(error.to_string().into()))
    }
}

/// An expense or income, i.e. an event where money was either spent or earned.
///
/// To create a new `Transaction`, use [Transaction::build].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The user that owns the transaction.
    pub user_id: UserID,
    /// Whether money was earned or spent.
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    /// A free text category, e.g. "Groceries", "Rent".
    pub category: String,
    /// The amount of money spent or earned, always greater than zero.
    pub amount: Amount,
    /// A text description of what the transaction was for.
    pub description: String,
    /// When the transaction happened.
    pub date: Date,
    /// The savings target this income contributes to.
    pub target_id: Option<TargetId>,
}

impl Transaction {
    /// Create a new transaction.
    ///
    /// Shortcut for [NewTransaction] for discoverability.
    pub fn build(
        kind: TransactionKind,
        category: &str,
        amount: Amount,
        date: Date,
    ) -> NewTransaction {
        NewTransaction {
            kind,
            category: category.to_owned(),
            amount,
            date,
            description: String::new(),
            target_id: None,
        }
    }
}

/// A builder for creating [Transaction] instances.
///
/// # Examples
///
/// ```ignore
/// use time::macros::date;
///
/// let paycheck = Transaction::build(
///         TransactionKind::Income,
///         "Salary",
///         Amount::new(400_000),
///         date!(2025 - 10 - 01),
///     )
///     .description("October pay")
///     .target_id(Some(holiday_target.id));
/// ```
#[derive(Debug, PartialEq, Clone)]
pub struct NewTransaction {
    /// Whether money was earned or spent.
    pub kind: TransactionKind,
    /// A free text category, must not be empty.
    pub category: String,
    /// The amount of money spent or earned, must be greater than zero.
    pub amount: Amount,
    /// When the transaction happened.
    pub date: Date,
    /// A text description of what the transaction was for.
    pub description: String,
    /// The savings target this income contributes to.
    ///
    /// Only income may be linked to a target.
    pub target_id: Option<TargetId>,
}

impl NewTransaction {
    /// Set the description for the transaction.
    pub fn description(mut self, description: &str) -> Self {
        description.clone_into(&mut self.description);
        self
    }

    /// Set the savings target for the transaction.
    pub fn target_id(mut self, target_id: Option<TargetId>) -> Self {
        self.target_id = target_id;
        self
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

const TRANSACTION_COLUMNS: &str =
    "id, user_id, kind, category, amount, description, date, target_id";

/// Create the transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                kind TEXT NOT NULL CHECK (kind IN ('income', 'expense')),
                category TEXT NOT NULL,
                amount INTEGER NOT NULL CHECK (amount > 0),
                description TEXT NOT NULL DEFAULT '',
                date TEXT NOT NULL,
                target_id INTEGER,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE,
                FOREIGN KEY(target_id) REFERENCES target(id) ON UPDATE CASCADE
                )",
        (),
    )?;

    // Used by the transaction list and the monthly statistics.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_user_date ON \"transaction\"(user_id, date);",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_target ON \"transaction\"(target_id);",
        (),
    )?;

    Ok(())
}

/// Insert a new transaction owned by `owner`.
///
/// This only writes the transaction row. Use [crate::Ledger::create_transaction]
/// to also credit the linked savings target in the same unit of work.
///
/// # Errors
/// This function will return a:
/// - [Error::Validation] if the category is empty, the amount is not positive,
///   or an expense is linked to a target,
/// - [Error::NotFound] if the target does not exist or is owned by another user,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_transaction(
    owner: UserID,
    new_transaction: NewTransaction,
    connection: &Connection,
) -> Result<Transaction, Error> {
    if new_transaction.category.trim().is_empty() {
        return Err(Error::Validation("category cannot be empty".to_owned()));
    }

    if !new_transaction.amount.is_positive() {
        return Err(Error::Validation(
            "amount must be greater than zero".to_owned(),
        ));
    }

    if let Some(target_id) = new_transaction.target_id {
        if new_transaction.kind == TransactionKind::Expense {
            return Err(Error::Validation(
                "only income can be linked to a savings target".to_owned(),
            ));
        }

        get_target(owner, target_id, connection)?;
    }

    let transaction = connection
        .prepare(&format!(
            "INSERT INTO \"transaction\" (user_id, kind, category, amount, description, date, target_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             RETURNING {TRANSACTION_COLUMNS}"
        ))?
        .query_row(
            (
                owner.as_i64(),
                new_transaction.kind,
                new_transaction.category.trim(),
                new_transaction.amount,
                new_transaction.description,
                new_transaction.date,
                new_transaction.target_id,
            ),
            map_transaction_row,
        )?;

    Ok(transaction)
}

/// Retrieve the transaction `id` owned by `owner`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a transaction owned by `owner`,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_transaction(
    owner: UserID,
    id: TransactionId,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" WHERE id = :id AND user_id = :user_id"
        ))?
        .query_row(
            &[(":id", &id), (":user_id", &owner.as_i64())],
            map_transaction_row,
        )?;

    Ok(transaction)
}

/// Get all transactions owned by `owner`, most recent date first.
///
/// Transactions on the same date are ordered most recently created first.
///
/// # Errors
/// This function will return a [Error::SqlError] there is an SQL error.
pub fn list_transactions(
    owner: UserID,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" WHERE user_id = :user_id
             ORDER BY date DESC, id DESC"
        ))?
        .query_map(&[(":user_id", &owner.as_i64())], map_transaction_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(Error::from))
        .collect()
}

/// Delete the transaction `id` owned by `owner` and return the deleted row.
///
/// This only removes the transaction row. Use [crate::Ledger::delete_transaction]
/// to also reverse the effect on the linked savings target.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a transaction owned by `owner`,
/// - or [Error::SqlError] there is some other SQL error.
pub fn delete_transaction(
    owner: UserID,
    id: TransactionId,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(&format!(
            "DELETE FROM \"transaction\" WHERE id = :id AND user_id = :user_id
             RETURNING {TRANSACTION_COLUMNS}"
        ))?
        .query_row(
            &[(":id", &id), (":user_id", &owner.as_i64())],
            map_transaction_row,
        )?;

    Ok(transaction)
}

/// Get the number of transactions owned by `owner`.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
#[cfg(test)]
pub fn count_transactions(owner: UserID, connection: &Connection) -> Result<usize, Error> {
    connection
        .query_row(
            "SELECT COUNT(id) FROM \"transaction\" WHERE user_id = :user_id",
            &[(":user_id", &owner.as_i64())],
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}

/// Map a database row to a Transaction.
fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    Ok(Transaction {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        kind: row.get(2)?,
        category: row.get(3)?,
        amount: row.get(4)?,
        description: row.get(5)?,
        date: row.get(6)?,
        target_id: row.get(7)?,
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
        target::{SavingsTarget, create_target},
        transaction::{
            Transaction, TransactionKind, count_transactions, create_transaction,
            delete_transaction, get_transaction, list_transactions,
        },
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
    fn create_succeeds() {
        let (conn, owner, _) = get_test_connection();

        let transaction = create_transaction(
            owner,
            Transaction::build(
                TransactionKind::Expense,
                " Groceries ",
                Amount::new(1_230),
                date!(2025 - 10 - 05),
            )
            .description("Weekly shop"),
            &conn,
        )
        .unwrap();

        assert!(transaction.id > 0);
        assert_eq!(transaction.user_id, owner);
        assert_eq!(transaction.kind, TransactionKind::Expense);
        assert_eq!(transaction.category, "Groceries");
        assert_eq!(transaction.amount, Amount::new(1_230));
        assert_eq!(transaction.description, "Weekly shop");
        assert_eq!(transaction.date, date!(2025 - 10 - 05));
        assert_eq!(transaction.target_id, None);
    }

    #[test]
    fn create_fails_on_non_positive_amount() {
        let (conn, owner, _) = get_test_connection();

        for amount in [0, -100] {
            let result = create_transaction(
                owner,
                Transaction::build(
                    TransactionKind::Income,
                    "Salary",
                    Amount::new(amount),
                    date!(2025 - 10 - 05),
                ),
                &conn,
            );

            assert!(
                matches!(result, Err(Error::Validation(_))),
                "amount {amount}"
            );
        }
    }

    #[test]
    fn create_fails_on_empty_category() {
        let (conn, owner, _) = get_test_connection();

        let result = create_transaction(
            owner,
            Transaction::build(
                TransactionKind::Income,
                "",
                Amount::new(1),
                date!(2025 - 10 - 05),
            ),
            &conn,
        );

        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn create_fails_on_expense_linked_to_target() {
        let (conn, owner, _) = get_test_connection();
        let target =
            create_target(owner, SavingsTarget::build("Car", Amount::new(500)), &conn).unwrap();

        let result = create_transaction(
            owner,
            Transaction::build(
                TransactionKind::Expense,
                "Fuel",
                Amount::new(1),
                date!(2025 - 10 - 05),
            )
            .target_id(Some(target.id)),
            &conn,
        );

        assert!(matches!(result, Err(Error::Validation(_))));
        assert_eq!(count_transactions(owner, &conn), Ok(0));
    }

    #[test]
    fn create_fails_on_missing_or_foreign_target() {
        let (conn, owner, other) = get_test_connection();
        let theirs =
            create_target(other, SavingsTarget::build("Boat", Amount::new(500)), &conn).unwrap();

        for target_id in [theirs.id, theirs.id + 42] {
            let result = create_transaction(
                owner,
                Transaction::build(
                    TransactionKind::Income,
                    "Salary",
                    Amount::new(1),
                    date!(2025 - 10 - 05),
                )
                .target_id(Some(target_id)),
                &conn,
            );

            assert_eq!(result, Err(Error::NotFound));
        }

        assert_eq!(count_transactions(owner, &conn), Ok(0));
    }

    #[test]
    fn get_fails_for_other_users_transaction() {
        let (conn, owner, other) = get_test_connection();
        let transaction = create_transaction(
            owner,
            Transaction::build(
                TransactionKind::Income,
                "Salary",
                Amount::new(1),
                date!(2025 - 10 - 05),
            ),
            &conn,
        )
        .unwrap();

        assert_eq!(
            get_transaction(other, transaction.id, &conn),
            Err(Error::NotFound)
        );
        assert_eq!(
            get_transaction(owner, transaction.id, &conn),
            Ok(transaction)
        );
    }

    #[test]
    fn list_orders_by_date_descending() {
        let (conn, owner, other) = get_test_connection();
        let dates = [
            date!(2025 - 10 - 02),
            date!(2025 - 10 - 09),
            date!(2025 - 09 - 30),
            date!(2025 - 10 - 09),
        ];
        let mut created = Vec::new();
        for (i, date) in dates.into_iter().enumerate() {
            created.push(
                create_transaction(
                    owner,
                    Transaction::build(
                        TransactionKind::Expense,
                        "Misc",
                        Amount::new(i as i64 + 1),
                        date,
                    ),
                    &conn,
                )
                .unwrap(),
            );
        }
        create_transaction(
            other,
            Transaction::build(
                TransactionKind::Expense,
                "Misc",
                Amount::new(99),
                date!(2025 - 10 - 10),
            ),
            &conn,
        )
        .unwrap();

        let got = list_transactions(owner, &conn).unwrap();

        let want = vec![
            created[3].clone(),
            created[1].clone(),
            created[0].clone(),
            created[2].clone(),
        ];
        assert_eq!(got, want);
    }

    #[test]
    fn delete_returns_removed_transaction() {
        let (conn, owner, _) = get_test_connection();
        let transaction = create_transaction(
            owner,
            Transaction::build(
                TransactionKind::Income,
                "Salary",
                Amount::new(1),
                date!(2025 - 10 - 05),
            ),
            &conn,
        )
        .unwrap();

        let deleted = delete_transaction(owner, transaction.id, &conn);

        assert_eq!(deleted, Ok(transaction.clone()));
        assert_eq!(
            get_transaction(owner, transaction.id, &conn),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn delete_fails_for_other_users_transaction() {
        let (conn, owner, other) = get_test_connection();
        let transaction = create_transaction(
            owner,
            Transaction::build(
                TransactionKind::Income,
                "Salary",
                Amount::new(1),
                date!(2025 - 10 - 05),
            ),
            &conn,
        )
        .unwrap();

        assert_eq!(
            delete_transaction(other, transaction.id, &conn),
            Err(Error::NotFound)
        );
        assert_eq!(count_transactions(owner, &conn), Ok(1));
    }
}
