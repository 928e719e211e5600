//! Fine settlement and reconciliation.
//!
//! `users.total_fines_minor` is a denormalized balance: returns and
//! write-offs add to it, payments subtract from it, and
//! [`Engine::recompute_fines`] rebuilds it from the loan rows when the two
//! drift apart.

use chrono::NaiveDate;
use sea_orm::{ActiveValue, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{EngineError, Loan, LoanStatus, PayFineCmd, ResultEngine, loans, users};

use super::{Engine, with_tx};

/// One line of a user's fine statement.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FineLine {
    pub loan_id: Uuid,
    pub status: LoanStatus,
    pub fine_minor: i64,
    pub fine_paid: bool,
}

/// A user's fine position at a point in time.
#[derive(Clone, Debug, PartialEq)]
pub struct FineStatement {
    /// The user's stored fine balance.
    pub total_minor: i64,
    /// Every loan that ever carried a fine, paid ones included.
    pub lines: Vec<FineLine>,
}

/// Result of rebuilding a user's fine balance from the loan rows.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FineReconciliation {
    /// The recomputed balance now stored on the user.
    pub total_minor: i64,
    /// Loan rows whose recorded fine was corrected.
    pub loans_updated: u64,
}

impl Engine {
    /// Settle the fine on a loan, in full.
    ///
    /// Partial and excess payments are rejected; the amount must match the
    /// recorded fine exactly.
    pub async fn pay_fine(&self, cmd: PayFineCmd) -> ResultEngine<Loan> {
        with_tx!(self, |tx| {
            async {
                let mut loan = self.require_loan(&tx, cmd.loan_id).await?;
                if loan.fine_amount_minor == 0 {
                    return Err(EngineError::InvalidState(
                        "loan has no fine to pay".to_string(),
                    ));
                }
                if loan.fine_paid {
                    return Err(EngineError::InvalidState(
                        "fine is already paid".to_string(),
                    ));
                }
                if cmd.amount_minor <= 0 {
                    return Err(EngineError::InvalidState(
                        "payment must be positive".to_string(),
                    ));
                }
                if cmd.amount_minor != loan.fine_amount_minor {
                    return Err(EngineError::InvalidState(format!(
                        "payment of {} does not match the fine of {}",
                        cmd.amount_minor, loan.fine_amount_minor
                    )));
                }

                loan.fine_paid = true;
                let loan_model = loans::ActiveModel {
                    id: ActiveValue::Set(loan.id.to_string()),
                    fine_paid: ActiveValue::Set(true),
                    ..Default::default()
                };
                loan_model.update(&tx).await?;

                let user = self.require_user(&tx, loan.user_id).await?;
                let user_model = users::ActiveModel {
                    id: ActiveValue::Set(user.id.to_string()),
                    total_fines_minor: ActiveValue::Set(
                        (user.total_fines_minor - loan.fine_amount_minor).max(0),
                    ),
                    ..Default::default()
                };
                user_model.update(&tx).await?;

                Ok(loan)
            }
            .await
        })
    }

    /// Rebuild a user's fine balance from their loan rows.
    ///
    /// For each unpaid loan the authoritative fine is recomputed: lost loans
    /// carry the flat lost-book fine; returned loans are charged for the days
    /// between due date and return; open loans are charged up to `today`.
    /// Paid loans are left untouched so a settled fine never reappears. The
    /// stored balance is replaced, not adjusted.
    pub async fn recompute_fines(
        &self,
        user_id: Uuid,
        today: NaiveDate,
    ) -> ResultEngine<FineReconciliation> {
        with_tx!(self, |tx| {
            async {
                let user = self.require_user(&tx, user_id).await?;

                let loan_models: Vec<loans::Model> = loans::Entity::find()
                    .filter(loans::Column::UserId.eq(user_id.to_string()))
                    .all(&tx)
                    .await?;

                let mut total_minor = 0i64;
                let mut loans_updated = 0u64;
                for model in loan_models {
                    let loan = Loan::try_from(model)?;
                    if loan.fine_paid {
                        continue;
                    }

                    let expected = match loan.status {
                        LoanStatus::Lost => self.policy.lost_book_fine_minor,
                        LoanStatus::Returned => {
                            let end = loan.returned_date.unwrap_or(loan.due_date);
                            loan.days_late(end) * self.policy.daily_fine_rate_minor
                        }
                        LoanStatus::Borrowed | LoanStatus::Overdue => {
                            loan.days_late(today) * self.policy.daily_fine_rate_minor
                        }
                    };
                    total_minor += expected;

                    if expected != loan.fine_amount_minor {
                        let loan_model = loans::ActiveModel {
                            id: ActiveValue::Set(loan.id.to_string()),
                            fine_amount_minor: ActiveValue::Set(expected),
                            ..Default::default()
                        };
                        loan_model.update(&tx).await?;
                        loans_updated += 1;
                    }
                }

                let user_model = users::ActiveModel {
                    id: ActiveValue::Set(user.id.to_string()),
                    total_fines_minor: ActiveValue::Set(total_minor),
                    ..Default::default()
                };
                user_model.update(&tx).await?;

                Ok(FineReconciliation {
                    total_minor,
                    loans_updated,
                })
            }
            .await
        })
    }

    /// A read-only statement of a user's fines.
    pub async fn current_fines(&self, user_id: Uuid) -> ResultEngine<FineStatement> {
        let user = self.require_user(&self.database, user_id).await?;

        let lines = loans::Entity::find()
            .filter(loans::Column::UserId.eq(user_id.to_string()))
            .filter(loans::Column::FineAmountMinor.gt(0))
            .order_by_desc(loans::Column::BorrowedDate)
            .all(&self.database)
            .await?
            .into_iter()
            .map(|model| {
                let loan = Loan::try_from(model)?;
                Ok(FineLine {
                    loan_id: loan.id,
                    status: loan.status,
                    fine_minor: loan.fine_amount_minor,
                    fine_paid: loan.fine_paid,
                })
            })
            .collect::<ResultEngine<Vec<_>>>()?;

        Ok(FineStatement {
            total_minor: user.total_fines_minor,
            lines,
        })
    }
}
