//! Transaction management for the ledger.
//!
//! This module contains everything related to transactions:
//! - The `Transaction` model and `NewTransaction` builder for creating transactions
//! - Database functions for storing, querying, and deleting transactions
//! - Route handlers for the transaction endpoints

mod core;
mod endpoints;

#[cfg(test)]
pub use core::count_transactions;
pub use core::{
    NewTransaction, Transaction, TransactionKind, create_transaction, create_transaction_table,
    delete_transaction, get_transaction, list_transactions,
};
pub use endpoints::{
    create_transaction_endpoint, delete_transaction_endpoint, list_transactions_endpoint,
};
