//! Lending policy knobs.
//!
//! Every tunable the lifecycle and fine engines depend on lives here, so a
//! deployment can override them through [`EngineBuilder::policy`] instead of
//! editing constants scattered through the code.
//!
//! [`EngineBuilder::policy`]: crate::EngineBuilder::policy

/// Configuration for the lending rules and fine rates.
///
/// Monetary values are integer minor units (cents): a daily rate of
/// `50` reads as 0.50 in display currency.
#[derive(Clone, Copy, Debug)]
pub struct LendingPolicy {
    /// How many open loans a single user may hold.
    pub max_borrowings_per_user: u32,
    /// Loan length applied when the borrower does not ask for one.
    pub default_borrow_days: u32,
    /// Fine accrued per whole day past the due date.
    pub daily_fine_rate_minor: i64,
    /// Cumulative cap on extension days over the life of a loan.
    pub max_extension_days: u32,
    /// Minimum borrower age.
    pub min_user_age: u32,
    /// Flat fine charged when a loan is marked lost.
    pub lost_book_fine_minor: i64,
}

impl Default for LendingPolicy {
    fn default() -> Self {
        Self {
            max_borrowings_per_user: 5,
            default_borrow_days: 14,
            daily_fine_rate_minor: 50,
            max_extension_days: 7,
            min_user_age: 16,
            lost_book_fine_minor: 1_000_000,
        }
    }
}
