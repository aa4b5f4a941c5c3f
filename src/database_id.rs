//! Database ID type definitions.

/// The ID of a savings target.
pub type TargetId = i64;
/// The ID of a transaction.
pub type TransactionId = i64;
