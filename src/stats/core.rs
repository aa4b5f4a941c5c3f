//! Aggregates a user's transactions into balances and reports.
//!
//! Everything here is a pure function over a slice of transactions, computed
//! on read with exact integer arithmetic. Totals that do not fit in an
//! [Amount] are reported as [Error::AmountOverflow].

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use time::Date;

use crate::{Amount, Error, Transaction, TransactionKind};

/// The total spent in one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTotal {
    /// The expense category.
    pub category: String,
    /// The sum of the expenses in the category.
    pub total: Amount,
}

/// A user's summary statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    /// All-time income minus all-time expenses.
    pub balance: Amount,
    /// Income dated from the first of the current month up to today.
    pub monthly_income: Amount,
    /// Expenses dated from the first of the current month up to today.
    pub monthly_expense: Amount,
    /// All-time income.
    pub total_income: Amount,
    /// All-time expenses.
    pub total_expense: Amount,
    /// All-time expenses per category, largest first.
    pub category_breakdown: Vec<CategoryTotal>,
}

/// Income and expenses for one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlySummary {
    /// The month formatted as `YYYY-MM`.
    pub month: String,
    /// The income dated in the month.
    pub income: Amount,
    /// The expenses dated in the month.
    pub expense: Amount,
    /// Income minus expenses.
    pub net: Amount,
}

/// Whether `date` falls between the first of `today`'s month and `today`, inclusive.
fn in_monthly_window(date: Date, today: Date) -> bool {
    date.year() == today.year() && date.month() == today.month() && date <= today
}

/// Add `amount` to the running `total`.
fn accumulate(total: &mut Amount, amount: Amount) -> Result<(), Error> {
    *total = total.checked_add(amount)?;
    Ok(())
}

/// Compute the summary statistics for `transactions` as of `today`.
///
/// # Errors
/// Returns [Error::AmountOverflow] if any total is too large to represent.
pub fn compute_stats(transactions: &[Transaction], today: Date) -> Result<Stats, Error> {
    let mut total_income = Amount::ZERO;
    let mut total_expense = Amount::ZERO;
    let mut monthly_income = Amount::ZERO;
    let mut monthly_expense = Amount::ZERO;

    for transaction in transactions {
        let this_month = in_monthly_window(transaction.date, today);

        match transaction.kind {
            TransactionKind::Income => {
                accumulate(&mut total_income, transaction.amount)?;
                if this_month {
                    accumulate(&mut monthly_income, transaction.amount)?;
                }
            }
            TransactionKind::Expense => {
                accumulate(&mut total_expense, transaction.amount)?;
                if this_month {
                    accumulate(&mut monthly_expense, transaction.amount)?;
                }
            }
        }
    }

    Ok(Stats {
        balance: total_income.checked_sub(total_expense)?,
        monthly_income,
        monthly_expense,
        total_income,
        total_expense,
        category_breakdown: category_breakdown(transactions)?,
    })
}

/// Sum expenses by category.
///
/// The result is sorted by descending total, then by category name.
///
/// # Errors
/// Returns [Error::AmountOverflow] if a category total is too large to represent.
pub fn category_breakdown(transactions: &[Transaction]) -> Result<Vec<CategoryTotal>, Error> {
    let mut totals: HashMap<&str, Amount> = HashMap::new();

    for transaction in transactions
        .iter()
        .filter(|t| t.kind == TransactionKind::Expense)
    {
        accumulate(
            totals.entry(transaction.category.as_str()).or_default(),
            transaction.amount,
        )?;
    }

    let mut breakdown: Vec<CategoryTotal> = totals
        .into_iter()
        .map(|(category, total)| CategoryTotal {
            category: category.to_owned(),
            total,
        })
        .collect();

    breakdown.sort_by(|a, b| {
        b.total
            .cmp(&a.total)
            .then_with(|| a.category.cmp(&b.category))
    });
    Ok(breakdown)
}

/// Sum income and expenses for each month that has transactions.
///
/// The result is in chronological order.
///
/// # Errors
/// Returns [Error::AmountOverflow] if a monthly total is too large to represent.
pub fn monthly_summary(transactions: &[Transaction]) -> Result<Vec<MonthlySummary>, Error> {
    // Keyed on (year, month number) so the map iterates chronologically.
    let mut months: BTreeMap<(i32, u8), (Amount, Amount)> = BTreeMap::new();

    for transaction in transactions {
        let key = (transaction.date.year(), u8::from(transaction.date.month()));
        let (income, expense) = months.entry(key).or_default();

        match transaction.kind {
            TransactionKind::Income => accumulate(income, transaction.amount)?,
            TransactionKind::Expense => accumulate(expense, transaction.amount)?,
        }
    }

    months
        .into_iter()
        .map(|((year, month), (income, expense))| {
            Ok(MonthlySummary {
                month: format!("{year:04}-{month:02}"),
                income,
                expense,
                net: income.checked_sub(expense)?,
            })
        })
        .collect()
}
