//! The module contains the `Book` struct and its implementation.

use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::EngineError;

/// A catalog title with a copy count.
///
/// `available_copies` is the number of copies currently on the shelf and is
/// bounded by `total_copies`. Copy counts are mutated through guarded SQL
/// updates inside the lending transactions, never through this struct, so a
/// loaded `Book` is a read snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Book {
    /// Stable identifier, generated once and persisted.
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub genre: String,
    pub total_copies: i32,
    pub available_copies: i32,
    /// Monotonic checkout counter; also the weight of the running rating.
    pub times_borrowed: i64,
    /// Running average of reader ratings in `0.0..=5.0`.
    pub rating: f64,
}

impl Book {
    pub fn new(title: String, author: String, genre: String, total_copies: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            title,
            author,
            genre,
            total_copies,
            available_copies: total_copies,
            times_borrowed: 0,
            rating: 0.0,
        }
    }

    pub fn is_available(&self) -> bool {
        self.available_copies > 0
    }

    /// Fold a new reader rating into the running average.
    ///
    /// The average is weighted by `times_borrowed`, which at return time has
    /// already been bumped by the checkout being rated.
    pub fn update_rating(&mut self, new_rating: f64) {
        if self.times_borrowed > 0 {
            self.rating = (self.rating * self.times_borrowed as f64 + new_rating)
                / (self.times_borrowed as f64 + 1.0);
        } else {
            self.rating = new_rating;
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "books")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub title: String,
    pub author: String,
    pub genre: String,
    pub total_copies: i32,
    pub available_copies: i32,
    pub times_borrowed: i64,
    pub rating: f64,
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

impl From<&Book> for ActiveModel {
    fn from(value: &Book) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            title: ActiveValue::Set(value.title.clone()),
            author: ActiveValue::Set(value.author.clone()),
            genre: ActiveValue::Set(value.genre.clone()),
            total_copies: ActiveValue::Set(value.total_copies),
            available_copies: ActiveValue::Set(value.available_copies),
            times_borrowed: ActiveValue::Set(value.times_borrowed),
            rating: ActiveValue::Set(value.rating),
        }
    }
}

impl TryFrom<Model> for Book {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::InvalidId("invalid book id".to_string()))?,
            title: model.title,
            author: model.author,
            genre: model.genre,
            total_copies: model.total_copies,
            available_copies: model.available_copies,
            times_borrowed: model.times_borrowed,
            rating: model.rating,
        })
    }
}
