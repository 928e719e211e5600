//! Membership administration.

use sea_orm::{ActiveValue, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{Book, EngineError, ResultEngine, User, books, users};

use super::{Engine, with_tx};

impl Engine {
    /// Register a new user.
    pub async fn register_user(&self, name: &str, email: &str, age: i32) -> ResultEngine<User> {
        let name = name.trim();
        if name.is_empty() {
            return Err(EngineError::InvalidState(
                "user name must not be empty".to_string(),
            ));
        }
        let user = User::new(name.to_string(), email.trim().to_string(), age);
        users::ActiveModel::from(&user).insert(&self.database).await?;
        Ok(user)
    }

    /// Deactivate a user, blocking further checkouts.
    ///
    /// Refused while the user still has books out; open loans must be
    /// returned or written off first.
    pub async fn deactivate_user(&self, user_id: Uuid) -> ResultEngine<User> {
        with_tx!(self, |tx| {
            async {
                let mut user = self.require_user(&tx, user_id).await?;
                if user.current_borrowings > 0 {
                    return Err(EngineError::InvalidState(
                        "cannot deactivate a user with open loans".to_string(),
                    ));
                }
                user.active = false;
                let user_model = users::ActiveModel {
                    id: ActiveValue::Set(user.id.to_string()),
                    active: ActiveValue::Set(false),
                    ..Default::default()
                };
                user_model.update(&tx).await?;
                Ok(user)
            }
            .await
        })
    }

    /// Reactivate a previously deactivated user.
    pub async fn activate_user(&self, user_id: Uuid) -> ResultEngine<User> {
        with_tx!(self, |tx| {
            async {
                let mut user = self.require_user(&tx, user_id).await?;
                user.active = true;
                let user_model = users::ActiveModel {
                    id: ActiveValue::Set(user.id.to_string()),
                    active: ActiveValue::Set(true),
                    ..Default::default()
                };
                user_model.update(&tx).await?;
                Ok(user)
            }
            .await
        })
    }

    /// Add a title to the catalog.
    pub async fn add_book(
        &self,
        title: &str,
        author: &str,
        genre: &str,
        total_copies: i32,
    ) -> ResultEngine<Book> {
        let title = title.trim();
        if title.is_empty() {
            return Err(EngineError::InvalidState(
                "book title must not be empty".to_string(),
            ));
        }
        if total_copies < 1 {
            return Err(EngineError::InvalidState(
                "a book needs at least one copy".to_string(),
            ));
        }
        let book = Book::new(
            title.to_string(),
            author.trim().to_string(),
            genre.trim().to_string(),
            total_copies,
        );
        books::ActiveModel::from(&book).insert(&self.database).await?;
        Ok(book)
    }
}
