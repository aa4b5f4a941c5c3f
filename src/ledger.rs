//! The ledger store: the single entry point for reading and mutating users,
//! savings targets and transactions.
//!
//! Every operation locks the shared connection once. Mutations run inside
//! one SQLite transaction, so a transaction row and the saved amount of the
//! target it is linked to are always written together or not at all.

use std::sync::{Arc, Mutex, MutexGuard};

use email_address::EmailAddress;
use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};
use time::Date;

use crate::{
    Error, PasswordHash,
    database_id::{TargetId, TransactionId},
    db::initialize,
    stats::{MonthlySummary, Stats, compute_stats, monthly_summary},
    target::{
        self, LinkOutcome, NewTarget, SavingsTarget, TargetDeletePolicy, TargetUpdate, apply_link,
        reverse_link,
    },
    transaction::{self, NewTransaction, Transaction},
    user::{User, UserID, create_user, get_user_by_email, get_user_by_id},
};

/// A SQLite backed store for users' ledgers.
///
/// Cloning a `Ledger` is cheap and every clone shares the same connection.
#[derive(Debug, Clone)]
pub struct Ledger {
    connection: Arc<Mutex<Connection>>,
    target_delete_policy: TargetDeletePolicy,
}

impl Ledger {
    /// Create a ledger backed by `connection`.
    ///
    /// This function will initialize the database by adding the tables for the domain models.
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn new(
        connection: Connection,
        target_delete_policy: TargetDeletePolicy,
    ) -> Result<Self, Error> {
        initialize(&connection)?;

        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
            target_delete_policy,
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, Error> {
        self.connection.lock().map_err(|error| {
            tracing::error!("Could not acquire the database lock: {error}");
            Error::DatabaseLockError
        })
    }

    /// Run a read-only query against the store.
    fn read<T>(&self, query: impl FnOnce(&Connection) -> Result<T, Error>) -> Result<T, Error> {
        let connection = self.lock()?;
        query(&connection)
    }

    /// Run `work` as one atomic unit.
    ///
    /// The changes made by `work` are committed only if it returns `Ok`,
    /// otherwise they are rolled back when the SQL transaction is dropped.
    fn unit_of_work<T>(
        &self,
        work: impl FnOnce(&SqlTransaction) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let mut connection = self.lock()?;
        let sql_transaction =
            connection.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let result = work(&sql_transaction)?;
        sql_transaction.commit()?;

        Ok(result)
    }

    // ========================================================================
    // USERS
    // ========================================================================

    /// Register a new user.
    ///
    /// # Errors
    /// Returns [Error::DuplicateEmail] if `email` is already registered.
    pub fn register(
        &self,
        name: &str,
        email: &EmailAddress,
        password_hash: PasswordHash,
    ) -> Result<User, Error> {
        let user = self.unit_of_work(|tx| create_user(name, email, password_hash, tx))?;
        tracing::info!("Registered user {}", user.id);

        Ok(user)
    }

    /// Find the user registered with `email` and check their password.
    ///
    /// # Errors
    /// Returns [Error::InvalidCredentials] if the email is not registered or
    /// the password is wrong; the two cases are not distinguished.
    pub fn authenticate(&self, email: &EmailAddress, raw_password: &str) -> Result<User, Error> {
        // The lock is released before verifying since bcrypt is slow.
        let user = self
            .read(|connection| get_user_by_email(email, connection))
            .map_err(|error| match error {
                Error::NotFound => Error::InvalidCredentials,
                error => error,
            })?;

        match user.password_hash.verify(raw_password) {
            Ok(true) => Ok(user),
            Ok(false) => Err(Error::InvalidCredentials),
            Err(error) => Err(Error::HashingError(error.to_string())),
        }
    }

    /// Get a registered user by their ID.
    ///
    /// # Errors
    /// Returns [Error::NotFound] if no user has the ID `id`.
    pub fn get_user(&self, id: UserID) -> Result<User, Error> {
        self.read(|connection| get_user_by_id(id, connection))
    }

    // ========================================================================
    // TARGETS
    // ========================================================================

    /// Create a savings target owned by `owner`.
    ///
    /// # Errors
    /// Returns [Error::Validation] if the target is invalid.
    pub fn create_target(
        &self,
        owner: UserID,
        new_target: NewTarget,
    ) -> Result<SavingsTarget, Error> {
        self.unit_of_work(|tx| target::create_target(owner, new_target, tx))
    }

    /// Get the target `id` owned by `owner`.
    ///
    /// # Errors
    /// Returns [Error::NotFound] if `owner` has no target `id`.
    pub fn get_target(&self, owner: UserID, id: TargetId) -> Result<SavingsTarget, Error> {
        self.read(|connection| target::get_target(owner, id, connection))
    }

    /// List the targets owned by `owner`, most recently created first.
    ///
    /// # Errors
    /// Returns an error if the query failed.
    pub fn list_targets(&self, owner: UserID) -> Result<Vec<SavingsTarget>, Error> {
        self.read(|connection| target::list_targets(owner, connection))
    }

    /// Apply a partial update to the target `id` owned by `owner`.
    ///
    /// # Errors
    /// Returns [Error::NotFound] if `owner` has no target `id`.
    pub fn update_target(
        &self,
        owner: UserID,
        id: TargetId,
        update: TargetUpdate,
    ) -> Result<SavingsTarget, Error> {
        self.unit_of_work(|tx| target::update_target(owner, id, update, tx))
    }

    /// Delete the target `id` owned by `owner` using the configured
    /// [TargetDeletePolicy].
    ///
    /// # Errors
    /// Returns [Error::NotFound] if `owner` has no target `id`, or
    /// [Error::TargetInUse] if the policy rejects deleting a referenced target.
    pub fn delete_target(&self, owner: UserID, id: TargetId) -> Result<(), Error> {
        let unlinked_count = self
            .unit_of_work(|tx| target::delete_target(owner, id, self.target_delete_policy, tx))?;

        tracing::info!("Deleted target {id}, unlinked {unlinked_count} transaction(s)");

        Ok(())
    }

    // ========================================================================
    // TRANSACTIONS
    // ========================================================================

    /// Record a transaction for `owner`, crediting the linked savings target
    /// in the same unit of work.
    ///
    /// # Errors
    /// Returns [Error::Validation] if the transaction is invalid, or
    /// [Error::NotFound] if it links to a target `owner` does not own. Nothing
    /// is written on error.
    pub fn create_transaction(
        &self,
        owner: UserID,
        new_transaction: NewTransaction,
    ) -> Result<Transaction, Error> {
        self.unit_of_work(|tx| {
            let transaction = transaction::create_transaction(owner, new_transaction, tx)?;
            apply_link(owner, &transaction, tx)?;

            Ok(transaction)
        })
    }

    /// Get the transaction `id` owned by `owner`.
    ///
    /// # Errors
    /// Returns [Error::NotFound] if `owner` has no transaction `id`.
    pub fn get_transaction(&self, owner: UserID, id: TransactionId) -> Result<Transaction, Error> {
        self.read(|connection| transaction::get_transaction(owner, id, connection))
    }

    /// List the transactions owned by `owner`, most recent date first.
    ///
    /// # Errors
    /// Returns an error if the query failed.
    pub fn list_transactions(&self, owner: UserID) -> Result<Vec<Transaction>, Error> {
        self.read(|connection| transaction::list_transactions(owner, connection))
    }

    /// Delete the transaction `id` owned by `owner`, reversing its effect on
    /// the linked savings target in the same unit of work.
    ///
    /// A saved amount that would go below zero is clamped and reported as
    /// [LinkOutcome::Clamped]; the delete still succeeds.
    ///
    /// # Errors
    /// Returns [Error::NotFound] if `owner` has no transaction `id`.
    pub fn delete_transaction(
        &self,
        owner: UserID,
        id: TransactionId,
    ) -> Result<LinkOutcome, Error> {
        self.unit_of_work(|tx| {
            let transaction = transaction::delete_transaction(owner, id, tx)?;
            reverse_link(owner, &transaction, tx)
        })
    }

    // ========================================================================
    // STATISTICS
    // ========================================================================

    /// Compute the summary statistics for `owner` as of `today`.
    ///
    /// # Errors
    /// Returns an error if the transactions could not be loaded or a total
    /// is too large to represent.
    pub fn stats(&self, owner: UserID, today: Date) -> Result<Stats, Error> {
        let transactions = self.list_transactions(owner)?;

        compute_stats(&transactions, today)
    }

    /// Compute income and expense totals for each month `owner` has
    /// transactions in.
    ///
    /// # Errors
    /// Returns an error if the transactions could not be loaded or a total
    /// is too large to represent.
    pub fn monthly_summary(&self, owner: UserID) -> Result<Vec<MonthlySummary>, Error> {
        let transactions = self.list_transactions(owner)?;

        monthly_summary(&transactions)
    }
}
