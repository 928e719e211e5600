//! The borrowing lifecycle: checkout, return, extension and loss.
//!
//! Every operation runs in a single DB transaction. Copy counters on `books`
//! are mutated through guarded `UPDATE` statements so two concurrent
//! checkouts of the last copy cannot both succeed.

use sea_orm::{ActiveValue, QueryFilter, TransactionTrait, prelude::*, sea_query::Expr};

use crate::{
    BorrowCmd, EngineError, ExtendCmd, Loan, MarkLostCmd, ResultEngine, ReturnCmd, books, loans,
    users,
};

use super::{Engine, with_tx};

/// The loan created by a checkout, plus a warning surface for unpaid fines.
#[derive(Clone, Debug, PartialEq)]
pub struct BorrowOutcome {
    pub loan: Loan,
    /// `Some` when the borrower has an unpaid fine balance. Outstanding fines
    /// do not block a checkout; they are reported so the caller can warn.
    pub outstanding_fines_minor: Option<i64>,
}

/// The closed loan and the fine assessed at return time.
#[derive(Clone, Debug, PartialEq)]
pub struct ReturnOutcome {
    pub loan: Loan,
    /// Zero when the book came back on time.
    pub fine_minor: i64,
}

impl Engine {
    /// Check a book out to a user.
    ///
    /// Preconditions, checked in order: the user exists and is active, meets
    /// the minimum age, is under the borrowing limit; the book exists and has
    /// a copy on the shelf; the user does not already hold this book.
    pub async fn borrow_book(&self, cmd: BorrowCmd) -> ResultEngine<BorrowOutcome> {
        with_tx!(self, |tx| {
            async {
                let user = self.require_user(&tx, cmd.user_id).await?;
                if !user.active {
                    return Err(EngineError::InvalidState("user is not active".to_string()));
                }
                if user.age < self.policy.min_user_age as i32 {
                    return Err(EngineError::InvalidState(format!(
                        "user must be at least {} years old",
                        self.policy.min_user_age
                    )));
                }
                if !user.can_borrow_more(self.policy.max_borrowings_per_user) {
                    return Err(EngineError::InvalidState(format!(
                        "user has reached the limit of {} borrowings",
                        self.policy.max_borrowings_per_user
                    )));
                }

                let book = self.require_book(&tx, cmd.book_id).await?;
                if !book.is_available() {
                    return Err(EngineError::InvalidState(
                        "book is not available for borrowing".to_string(),
                    ));
                }
                if self.book_held_by_user(&tx, cmd.user_id, cmd.book_id).await? {
                    return Err(EngineError::InvalidState(
                        "user already has this book on loan".to_string(),
                    ));
                }

                let borrow_days = match cmd.requested_days {
                    Some(0) => {
                        return Err(EngineError::InvalidState(
                            "borrow length must be at least one day".to_string(),
                        ));
                    }
                    Some(days) => days,
                    None => self.policy.default_borrow_days,
                };

                let loan = Loan::new(cmd.book_id, cmd.user_id, cmd.today, borrow_days)?;
                loans::ActiveModel::from(&loan).insert(&tx).await?;

                // Guarded decrement: loses the race instead of going negative.
                let claimed = books::Entity::update_many()
                    .col_expr(
                        books::Column::AvailableCopies,
                        Expr::col(books::Column::AvailableCopies).sub(1),
                    )
                    .col_expr(
                        books::Column::TimesBorrowed,
                        Expr::col(books::Column::TimesBorrowed).add(1),
                    )
                    .filter(books::Column::Id.eq(cmd.book_id.to_string()))
                    .filter(books::Column::AvailableCopies.gt(0))
                    .exec(&tx)
                    .await?;
                if claimed.rows_affected == 0 {
                    return Err(EngineError::InvalidState(
                        "book is not available for borrowing".to_string(),
                    ));
                }

                let user_model = users::ActiveModel {
                    id: ActiveValue::Set(user.id.to_string()),
                    current_borrowings: ActiveValue::Set(user.current_borrowings + 1),
                    total_borrowed: ActiveValue::Set(user.total_borrowed + 1),
                    ..Default::default()
                };
                user_model.update(&tx).await?;

                Ok(BorrowOutcome {
                    loan,
                    outstanding_fines_minor: user
                        .has_unpaid_fines()
                        .then_some(user.total_fines_minor),
                })
            }
            .await
        })
    }

    /// Bring a book back, assessing a late fine when past the due date.
    ///
    /// The fine is `days late x daily rate` and is added to the borrower's
    /// balance; settling it goes through [`Engine::pay_fine`]. An optional
    /// reader rating is folded into the book's running average.
    pub async fn return_book(&self, cmd: ReturnCmd) -> ResultEngine<ReturnOutcome> {
        with_tx!(self, |tx| {
            async {
                let mut loan = self.require_loan(&tx, cmd.loan_id).await?;
                let fine_minor = loan.days_late(cmd.today) * self.policy.daily_fine_rate_minor;
                loan.mark_returned(cmd.today)?;
                loan.fine_amount_minor = fine_minor;
                loan.fine_paid = false;
                loans::ActiveModel::from(&loan).update(&tx).await?;

                let user = self.require_user(&tx, loan.user_id).await?;
                let user_model = users::ActiveModel {
                    id: ActiveValue::Set(user.id.to_string()),
                    current_borrowings: ActiveValue::Set((user.current_borrowings - 1).max(0)),
                    total_fines_minor: ActiveValue::Set(user.total_fines_minor + fine_minor),
                    ..Default::default()
                };
                user_model.update(&tx).await?;

                // Bounded increment: a stray double return cannot push the
                // shelf count past the copies the library owns.
                books::Entity::update_many()
                    .col_expr(
                        books::Column::AvailableCopies,
                        Expr::col(books::Column::AvailableCopies).add(1),
                    )
                    .filter(books::Column::Id.eq(loan.book_id.to_string()))
                    .filter(
                        Expr::col(books::Column::AvailableCopies)
                            .lt(Expr::col(books::Column::TotalCopies)),
                    )
                    .exec(&tx)
                    .await?;

                if let Some(rating) = cmd.rating.filter(|r| (0.0..=5.0).contains(r)) {
                    let mut book = self.require_book(&tx, loan.book_id).await?;
                    book.update_rating(rating);
                    let book_model = books::ActiveModel {
                        id: ActiveValue::Set(book.id.to_string()),
                        rating: ActiveValue::Set(book.rating),
                        ..Default::default()
                    };
                    book_model.update(&tx).await?;
                }

                Ok(ReturnOutcome { loan, fine_minor })
            }
            .await
        })
    }

    /// Push a loan's due date out, within the cumulative extension cap.
    pub async fn extend_loan(&self, cmd: ExtendCmd) -> ResultEngine<Loan> {
        with_tx!(self, |tx| {
            async {
                let mut loan = self.require_loan(&tx, cmd.loan_id).await?;
                loan.extend(cmd.additional_days, self.policy.max_extension_days, cmd.today)?;
                loans::ActiveModel::from(&loan).update(&tx).await?;
                Ok(loan)
            }
            .await
        })
    }

    /// Write a loan off as lost.
    ///
    /// Charges the flat lost-book fine (or an operator-supplied one) to the
    /// borrower and frees their borrowing slot. The copy is gone, so the
    /// shelf count is not restored.
    pub async fn mark_lost(&self, cmd: MarkLostCmd) -> ResultEngine<Loan> {
        with_tx!(self, |tx| {
            async {
                let mut loan = self.require_loan(&tx, cmd.loan_id).await?;
                let fine_minor = cmd.fine_minor.unwrap_or(self.policy.lost_book_fine_minor);
                loan.mark_lost(fine_minor)?;
                loans::ActiveModel::from(&loan).update(&tx).await?;

                let user = self.require_user(&tx, loan.user_id).await?;
                let user_model = users::ActiveModel {
                    id: ActiveValue::Set(user.id.to_string()),
                    current_borrowings: ActiveValue::Set((user.current_borrowings - 1).max(0)),
                    total_fines_minor: ActiveValue::Set(user.total_fines_minor + fine_minor),
                    ..Default::default()
                };
                user_model.update(&tx).await?;

                Ok(loan)
            }
            .await
        })
    }
}
