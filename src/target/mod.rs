//! Savings targets: what users are saving toward and how much of their
//! income has been put toward each one.
//!
//! This module contains:
//! - The `SavingsTarget` model and database functions for managing targets
//! - The linking rule that keeps a target's saved amount in step with linked income
//! - Route handlers for the target endpoints

mod core;
mod endpoints;
mod linking;

pub use core::{
    NewTarget, SavingsTarget, TargetDeletePolicy, TargetStatus, TargetUpdate, create_target,
    create_target_table, delete_target, get_target, list_targets, update_target,
};
pub use endpoints::{
    create_target_endpoint, delete_target_endpoint, get_target_endpoint, list_targets_endpoint,
    update_target_endpoint,
};
pub use linking::{LinkOutcome, apply_link, reverse_link};
