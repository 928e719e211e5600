//! The overdue sweep.

use chrono::NaiveDate;
use sea_orm::{QueryFilter, QueryOrder, TransactionTrait, prelude::*, sea_query::Expr};

use crate::{Loan, LoanStatus, ResultEngine, loans};

use super::{Engine, with_tx};

impl Engine {
    /// Reclassify every borrowed loan past its due date as overdue.
    ///
    /// A single `UPDATE`, so the sweep is atomic and idempotent: running it
    /// twice with the same date matches nothing the second time. Returns the
    /// number of loans flipped.
    pub async fn sweep_overdue(&self, today: NaiveDate) -> ResultEngine<u64> {
        with_tx!(self, |tx| {
            async {
                let swept = loans::Entity::update_many()
                    .col_expr(
                        loans::Column::Status,
                        Expr::value(LoanStatus::Overdue.as_str()),
                    )
                    .filter(loans::Column::Status.eq(LoanStatus::Borrowed.as_str()))
                    .filter(loans::Column::DueDate.lt(today))
                    .exec(&tx)
                    .await?;
                Ok(swept.rows_affected)
            }
            .await
        })
    }

    /// Every open loan past its due date as of `today`, most overdue first.
    ///
    /// Goes by the due date, not the stored status, so loans the sweep has
    /// not flipped yet are included.
    pub async fn list_overdue(&self, today: NaiveDate) -> ResultEngine<Vec<Loan>> {
        loans::Entity::find()
            .filter(loans::Column::Status.is_in([
                LoanStatus::Borrowed.as_str(),
                LoanStatus::Overdue.as_str(),
            ]))
            .filter(loans::Column::DueDate.lt(today))
            .order_by_asc(loans::Column::DueDate)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Loan::try_from)
            .collect()
    }
}
