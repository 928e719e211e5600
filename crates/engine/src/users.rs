//! The module contains the `User` struct and its implementation.
//!
//! `current_borrowings` is a cached count of open loans, kept in step by the
//! lending transactions; `total_fines_minor` is a running balance owned by
//! the fine settlement operations.

use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::EngineError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Stable identifier, generated once and persisted.
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub age: i32,
    pub active: bool,
    pub current_borrowings: i32,
    pub total_borrowed: i64,
    pub total_fines_minor: i64,
}

impl User {
    pub fn new(name: String, email: String, age: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            email,
            age,
            active: true,
            current_borrowings: 0,
            total_borrowed: 0,
            total_fines_minor: 0,
        }
    }

    pub fn can_borrow_more(&self, max_borrowings: u32) -> bool {
        self.current_borrowings < max_borrowings as i32
    }

    pub fn has_unpaid_fines(&self) -> bool {
        self.total_fines_minor > 0
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub email: String,
    pub age: i32,
    pub active: bool,
    pub current_borrowings: i32,
    pub total_borrowed: i64,
    pub total_fines_minor: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::loans::Entity")]
    Loans,
}

impl Related<super::loans::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Loans.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&User> for ActiveModel {
    fn from(value: &User) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            name: ActiveValue::Set(value.name.clone()),
            email: ActiveValue::Set(value.email.clone()),
            age: ActiveValue::Set(value.age),
            active: ActiveValue::Set(value.active),
            current_borrowings: ActiveValue::Set(value.current_borrowings),
            total_borrowed: ActiveValue::Set(value.total_borrowed),
            total_fines_minor: ActiveValue::Set(value.total_fines_minor),
        }
    }
}

impl TryFrom<Model> for User {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::InvalidId("invalid user id".to_string()))?,
            name: model.name,
            email: model.email,
            age: model.age,
            active: model.active,
            current_borrowings: model.current_borrowings,
            total_borrowed: model.total_borrowed,
            total_fines_minor: model.total_fines_minor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_user_is_active_with_clean_counters() {
        let user = User::new(
            String::from("Marta Rossi"),
            String::from("marta@example.com"),
            34,
        );
        assert!(user.active);
        assert_eq!(user.current_borrowings, 0);
        assert_eq!(user.total_borrowed, 0);
        assert!(!user.has_unpaid_fines());
    }

    #[test]
    fn borrowing_limit_is_exclusive() {
        let mut user = User::new(String::from("Marta"), String::from("m@example.com"), 34);
        user.current_borrowings = 4;
        assert!(user.can_borrow_more(5));
        user.current_borrowings = 5;
        assert!(!user.can_borrow_more(5));
    }
}
