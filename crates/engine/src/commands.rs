//! Commands accepted by the engine operations.
//!
//! Each command carries the caller-supplied inputs for one write operation,
//! including the observation date, so the engine itself never reads the
//! clock. Optional fields are set through builder methods.

use chrono::NaiveDate;
use uuid::Uuid;

/// Check a book out to a user.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BorrowCmd {
    pub user_id: Uuid,
    pub book_id: Uuid,
    pub today: NaiveDate,
    /// Loan length in days; the policy default applies when unset.
    pub requested_days: Option<u32>,
}

impl BorrowCmd {
    pub fn new(user_id: Uuid, book_id: Uuid, today: NaiveDate) -> Self {
        Self {
            user_id,
            book_id,
            today,
            requested_days: None,
        }
    }

    #[must_use]
    pub fn days(mut self, days: u32) -> Self {
        self.requested_days = Some(days);
        self
    }
}

/// Bring a borrowed book back.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReturnCmd {
    pub loan_id: Uuid,
    pub today: NaiveDate,
    /// Reader rating in `0.0..=5.0`; values outside the range are ignored.
    pub rating: Option<f64>,
}

impl ReturnCmd {
    pub fn new(loan_id: Uuid, today: NaiveDate) -> Self {
        Self {
            loan_id,
            today,
            rating: None,
        }
    }

    #[must_use]
    pub fn rating(mut self, rating: f64) -> Self {
        self.rating = Some(rating);
        self
    }
}

/// Push a loan's due date out.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExtendCmd {
    pub loan_id: Uuid,
    pub additional_days: u32,
    pub today: NaiveDate,
}

impl ExtendCmd {
    pub fn new(loan_id: Uuid, additional_days: u32, today: NaiveDate) -> Self {
        Self {
            loan_id,
            additional_days,
            today,
        }
    }
}

/// Settle the fine on a loan in full.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PayFineCmd {
    pub loan_id: Uuid,
    pub amount_minor: i64,
}

impl PayFineCmd {
    pub fn new(loan_id: Uuid, amount_minor: i64) -> Self {
        Self {
            loan_id,
            amount_minor,
        }
    }
}

/// Write a loan off as lost.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MarkLostCmd {
    pub loan_id: Uuid,
    /// Fine to charge; the policy's flat lost-book fine applies when unset.
    pub fine_minor: Option<i64>,
}

impl MarkLostCmd {
    pub fn new(loan_id: Uuid) -> Self {
        Self {
            loan_id,
            fine_minor: None,
        }
    }

    #[must_use]
    pub fn fine(mut self, fine_minor: i64) -> Self {
        self.fine_minor = Some(fine_minor);
        self
    }
}
