//! Statistics derived from a user's transactions.
//!
//! This module contains:
//! - Pure aggregation functions for balances, monthly totals and category breakdowns
//! - Route handlers for the statistics endpoints

mod core;
mod endpoint;

pub use core::{CategoryTotal, MonthlySummary, Stats, compute_stats, monthly_summary};
pub use endpoint::{get_monthly_summary_endpoint, get_stats_endpoint};
