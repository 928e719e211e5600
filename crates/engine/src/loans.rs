//! Loan primitives.
//!
//! A `Loan` is one checkout record linking a user and a book copy. Rows are
//! never deleted; they are the permanent audit trail of the circulation
//! history. The status moves through a small state machine:
//!
//! ```text
//! borrowed <-> overdue        (toggled by due-date comparison only)
//! borrowed  -> returned|lost  (terminal)
//! overdue   -> returned|lost  (terminal)
//! ```

use chrono::{Days, NaiveDate};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    Borrowed,
    Overdue,
    Returned,
    Lost,
}

impl LoanStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Borrowed => "borrowed",
            Self::Overdue => "overdue",
            Self::Returned => "returned",
            Self::Lost => "lost",
        }
    }

    /// A loan still out with the borrower (not yet returned or written off).
    pub fn is_open(self) -> bool {
        matches!(self, Self::Borrowed | Self::Overdue)
    }
}

impl TryFrom<&str> for LoanStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "borrowed" => Ok(Self::Borrowed),
            "overdue" => Ok(Self::Overdue),
            "returned" => Ok(Self::Returned),
            "lost" => Ok(Self::Lost),
            other => Err(EngineError::InvalidState(format!(
                "invalid loan status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub id: Uuid,
    pub book_id: Uuid,
    pub user_id: Uuid,
    pub borrowed_date: NaiveDate,
    pub due_date: NaiveDate,
    /// `None` while the loan is open.
    pub returned_date: Option<NaiveDate>,
    /// Cumulative extension days granted over the life of the loan.
    pub days_extended: i32,
    pub fine_amount_minor: i64,
    pub fine_paid: bool,
    pub status: LoanStatus,
}

impl Loan {
    pub fn new(
        book_id: Uuid,
        user_id: Uuid,
        today: NaiveDate,
        borrow_days: u32,
    ) -> ResultEngine<Self> {
        let due_date = today
            .checked_add_days(Days::new(u64::from(borrow_days)))
            .ok_or_else(|| {
                EngineError::InvalidState("borrow length is out of range".to_string())
            })?;
        Ok(Self {
            id: Uuid::new_v4(),
            book_id,
            user_id,
            borrowed_date: today,
            due_date,
            returned_date: None,
            days_extended: 0,
            fine_amount_minor: 0,
            fine_paid: false,
            status: LoanStatus::Borrowed,
        })
    }

    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }

    /// Whether the loan is past due as of `today`, regardless of whether a
    /// sweep has reclassified it yet.
    pub fn is_past_due(&self, today: NaiveDate) -> bool {
        self.is_open() && today > self.due_date
    }

    /// Whole days between the due date and `end`, floored at zero.
    pub fn days_late(&self, end: NaiveDate) -> i64 {
        end.signed_duration_since(self.due_date).num_days().max(0)
    }

    /// Close the loan as returned.
    pub fn mark_returned(&mut self, today: NaiveDate) -> ResultEngine<()> {
        match self.status {
            LoanStatus::Returned => Err(EngineError::InvalidState(
                "loan is already returned".to_string(),
            )),
            LoanStatus::Lost => Err(EngineError::InvalidState(
                "loan was written off as lost".to_string(),
            )),
            LoanStatus::Borrowed | LoanStatus::Overdue => {
                self.returned_date = Some(today);
                self.status = LoanStatus::Returned;
                Ok(())
            }
        }
    }

    /// Push the due date out by `additional_days`, respecting the cumulative
    /// cap. Overdue loans cannot be extended; they must be returned first.
    pub fn extend(
        &mut self,
        additional_days: u32,
        max_extension_days: u32,
        today: NaiveDate,
    ) -> ResultEngine<()> {
        if !self.is_open() {
            return Err(EngineError::InvalidState(
                "cannot extend a closed loan".to_string(),
            ));
        }
        if self.is_past_due(today) || self.status == LoanStatus::Overdue {
            return Err(EngineError::InvalidState(
                "cannot extend an overdue loan".to_string(),
            ));
        }
        if additional_days == 0 || additional_days > max_extension_days {
            return Err(EngineError::InvalidState(format!(
                "extension must be between 1 and {max_extension_days} days"
            )));
        }
        if self.days_extended + additional_days as i32 > max_extension_days as i32 {
            return Err(EngineError::InvalidState(format!(
                "cannot extend more than {max_extension_days} days in total"
            )));
        }

        self.due_date = self
            .due_date
            .checked_add_days(Days::new(u64::from(additional_days)))
            .ok_or_else(|| {
                EngineError::InvalidState("extension pushes the due date out of range".to_string())
            })?;
        self.days_extended += additional_days as i32;
        self.status = LoanStatus::Borrowed;
        Ok(())
    }

    /// Write the loan off as lost with an operator-supplied fine.
    pub fn mark_lost(&mut self, fine_minor: i64) -> ResultEngine<()> {
        if !self.is_open() {
            return Err(EngineError::InvalidState(
                "loan is already closed".to_string(),
            ));
        }
        if fine_minor < 0 {
            return Err(EngineError::InvalidState(
                "lost-book fine must not be negative".to_string(),
            ));
        }
        self.status = LoanStatus::Lost;
        self.fine_amount_minor = fine_minor;
        self.fine_paid = false;
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "loans")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub book_id: String,
    pub user_id: String,
    pub borrowed_date: Date,
    pub due_date: Date,
    pub returned_date: Option<Date>,
    pub days_extended: i32,
    pub fine_amount_minor: i64,
    pub fine_paid: bool,
    pub status: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::books::Entity",
        from = "Column::BookId",
        to = "super::books::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Books,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Users,
}

impl Related<super::books::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Books.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Loan> for ActiveModel {
    fn from(loan: &Loan) -> Self {
        Self {
            id: ActiveValue::Set(loan.id.to_string()),
            book_id: ActiveValue::Set(loan.book_id.to_string()),
            user_id: ActiveValue::Set(loan.user_id.to_string()),
            borrowed_date: ActiveValue::Set(loan.borrowed_date),
            due_date: ActiveValue::Set(loan.due_date),
            returned_date: ActiveValue::Set(loan.returned_date),
            days_extended: ActiveValue::Set(loan.days_extended),
            fine_amount_minor: ActiveValue::Set(loan.fine_amount_minor),
            fine_paid: ActiveValue::Set(loan.fine_paid),
            status: ActiveValue::Set(loan.status.as_str().to_string()),
        }
    }
}

impl TryFrom<Model> for Loan {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::InvalidId("invalid loan id".to_string()))?,
            book_id: Uuid::parse_str(&model.book_id)
                .map_err(|_| EngineError::InvalidId("invalid book id".to_string()))?,
            user_id: Uuid::parse_str(&model.user_id)
                .map_err(|_| EngineError::InvalidId("invalid user id".to_string()))?,
            borrowed_date: model.borrowed_date,
            due_date: model.due_date,
            returned_date: model.returned_date,
            days_extended: model.days_extended,
            fine_amount_minor: model.fine_amount_minor,
            fine_paid: model.fine_paid,
            status: LoanStatus::try_from(model.status.as_str())?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn loan() -> Loan {
        Loan::new(Uuid::new_v4(), Uuid::new_v4(), day(2026, 1, 1), 14).unwrap()
    }

    #[test]
    fn new_loan_is_borrowed_with_computed_due_date() {
        let loan = loan();
        assert_eq!(loan.status, LoanStatus::Borrowed);
        assert_eq!(loan.due_date, day(2026, 1, 15));
        assert!(loan.returned_date.is_none());
        assert!(loan.is_open());
    }

    #[test]
    fn absurd_borrow_length_is_rejected_not_panicking() {
        let err = Loan::new(Uuid::new_v4(), Uuid::new_v4(), day(2026, 1, 1), u32::MAX)
            .unwrap_err();
        assert_eq!(
            err,
            EngineError::InvalidState("borrow length is out of range".to_string())
        );
    }

    #[test]
    fn past_due_only_after_the_due_date() {
        let loan = loan();
        assert!(!loan.is_past_due(day(2026, 1, 15)));
        assert!(loan.is_past_due(day(2026, 1, 16)));
        assert_eq!(loan.days_late(day(2026, 1, 18)), 3);
        assert_eq!(loan.days_late(day(2026, 1, 10)), 0);
    }

    #[test]
    fn return_closes_the_loan_once() {
        let mut loan = loan();
        loan.mark_returned(day(2026, 1, 10)).unwrap();
        assert_eq!(loan.status, LoanStatus::Returned);
        assert_eq!(loan.returned_date, Some(day(2026, 1, 10)));

        let err = loan.mark_returned(day(2026, 1, 11)).unwrap_err();
        assert_eq!(
            err,
            EngineError::InvalidState("loan is already returned".to_string())
        );
    }

    #[test]
    fn lost_loans_cannot_be_returned() {
        let mut loan = loan();
        loan.mark_lost(1_000_000).unwrap();
        assert_eq!(loan.status, LoanStatus::Lost);
        assert_eq!(loan.fine_amount_minor, 1_000_000);
        assert!(loan.mark_returned(day(2026, 1, 10)).is_err());
        assert!(loan.mark_lost(1_000_000).is_err());
    }

    #[test]
    fn extension_accumulates_up_to_the_cap() {
        let mut loan = loan();
        loan.extend(5, 7, day(2026, 1, 5)).unwrap();
        assert_eq!(loan.due_date, day(2026, 1, 20));
        assert_eq!(loan.days_extended, 5);

        let err = loan.extend(3, 7, day(2026, 1, 5)).unwrap_err();
        assert_eq!(
            err,
            EngineError::InvalidState("cannot extend more than 7 days in total".to_string())
        );

        loan.extend(2, 7, day(2026, 1, 5)).unwrap();
        assert_eq!(loan.days_extended, 7);
        assert_eq!(loan.due_date, day(2026, 1, 22));
    }

    #[test]
    fn overdue_loans_cannot_be_extended() {
        let mut loan = loan();
        let err = loan.extend(2, 7, day(2026, 2, 1)).unwrap_err();
        assert_eq!(
            err,
            EngineError::InvalidState("cannot extend an overdue loan".to_string())
        );
    }

    #[test]
    fn status_strings_roundtrip() {
        for status in [
            LoanStatus::Borrowed,
            LoanStatus::Overdue,
            LoanStatus::Returned,
            LoanStatus::Lost,
        ] {
            assert_eq!(LoanStatus::try_from(status.as_str()).unwrap(), status);
        }
        assert!(LoanStatus::try_from("misplaced").is_err());
    }
}
