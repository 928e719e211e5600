use sea_orm::{ConnectionTrait, QueryFilter, QueryOrder, prelude::*};
use uuid::Uuid;

use crate::{Book, EngineError, Loan, LoanStatus, ResultEngine, User, books, loans, users};

use super::Engine;

impl Engine {
    pub(super) async fn require_user<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: Uuid,
    ) -> ResultEngine<User> {
        users::Entity::find_by_id(user_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::NotFound("user".to_string()))?
            .try_into()
    }

    pub(super) async fn require_book<C: ConnectionTrait>(
        &self,
        db: &C,
        book_id: Uuid,
    ) -> ResultEngine<Book> {
        books::Entity::find_by_id(book_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::NotFound("book".to_string()))?
            .try_into()
    }

    pub(super) async fn require_loan<C: ConnectionTrait>(
        &self,
        db: &C,
        loan_id: Uuid,
    ) -> ResultEngine<Loan> {
        loans::Entity::find_by_id(loan_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::NotFound("loan".to_string()))?
            .try_into()
    }

    /// Whether the user already has an open loan for this book.
    pub(super) async fn book_held_by_user<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: Uuid,
        book_id: Uuid,
    ) -> ResultEngine<bool> {
        loans::Entity::find()
            .filter(loans::Column::UserId.eq(user_id.to_string()))
            .filter(loans::Column::BookId.eq(book_id.to_string()))
            .filter(loans::Column::Status.is_in([
                LoanStatus::Borrowed.as_str(),
                LoanStatus::Overdue.as_str(),
            ]))
            .one(db)
            .await
            .map(|model| model.is_some())
            .map_err(Into::into)
    }

    /// Look a user up by id.
    pub async fn user(&self, user_id: Uuid) -> ResultEngine<User> {
        self.require_user(&self.database, user_id).await
    }

    /// Look a book up by id.
    pub async fn book(&self, book_id: Uuid) -> ResultEngine<Book> {
        self.require_book(&self.database, book_id).await
    }

    /// Look a loan up by id.
    pub async fn loan(&self, loan_id: Uuid) -> ResultEngine<Loan> {
        self.require_loan(&self.database, loan_id).await
    }

    /// Full loan history of a user, newest first.
    pub async fn loans_of_user(&self, user_id: Uuid) -> ResultEngine<Vec<Loan>> {
        self.require_user(&self.database, user_id).await?;
        loans::Entity::find()
            .filter(loans::Column::UserId.eq(user_id.to_string()))
            .order_by_desc(loans::Column::BorrowedDate)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Loan::try_from)
            .collect()
    }

    /// Loans of a user still out (borrowed or overdue).
    pub async fn open_loans_of_user(&self, user_id: Uuid) -> ResultEngine<Vec<Loan>> {
        self.require_user(&self.database, user_id).await?;
        loans::Entity::find()
            .filter(loans::Column::UserId.eq(user_id.to_string()))
            .filter(loans::Column::Status.is_in([
                LoanStatus::Borrowed.as_str(),
                LoanStatus::Overdue.as_str(),
            ]))
            .order_by_asc(loans::Column::DueDate)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Loan::try_from)
            .collect()
    }
}
