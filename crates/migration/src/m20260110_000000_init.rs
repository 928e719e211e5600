//! Initial schema migration - creates all tables from scratch.
//!
//! It creates the complete schema for Prestito:
//!
//! - `users`: library members with cached borrowing counters
//! - `books`: catalog titles with copy counts and a running rating
//! - `loans`: the permanent checkout ledger

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Users {
    Table,
    Id,
    Name,
    Email,
    Age,
    Active,
    CurrentBorrowings,
    TotalBorrowed,
    TotalFinesMinor,
}

#[derive(Iden)]
enum Books {
    Table,
    Id,
    Title,
    Author,
    Genre,
    TotalCopies,
    AvailableCopies,
    TimesBorrowed,
    Rating,
}

#[derive(Iden)]
enum Loans {
    Table,
    Id,
    BookId,
    UserId,
    BorrowedDate,
    DueDate,
    ReturnedDate,
    DaysExtended,
    FineAmountMinor,
    FinePaid,
    Status,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Users
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Users::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Users::Name).string().not_null())
                    .col(ColumnDef::new(Users::Email).string().not_null())
                    .col(ColumnDef::new(Users::Age).integer().not_null())
                    .col(
                        ColumnDef::new(Users::Active)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Users::CurrentBorrowings)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Users::TotalBorrowed)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Users::TotalFinesMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Books
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Books::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Books::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Books::Title).string().not_null())
                    .col(ColumnDef::new(Books::Author).string().not_null())
                    .col(ColumnDef::new(Books::Genre).string().not_null())
                    .col(ColumnDef::new(Books::TotalCopies).integer().not_null())
                    .col(ColumnDef::new(Books::AvailableCopies).integer().not_null())
                    .col(
                        ColumnDef::new(Books::TimesBorrowed)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Books::Rating).double().not_null().default(0.0))
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Loans
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Loans::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Loans::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Loans::BookId).string().not_null())
                    .col(ColumnDef::new(Loans::UserId).string().not_null())
                    .col(ColumnDef::new(Loans::BorrowedDate).date().not_null())
                    .col(ColumnDef::new(Loans::DueDate).date().not_null())
                    .col(ColumnDef::new(Loans::ReturnedDate).date())
                    .col(
                        ColumnDef::new(Loans::DaysExtended)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Loans::FineAmountMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Loans::FinePaid)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Loans::Status).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-loans-book_id")
                            .from(Loans::Table, Loans::BookId)
                            .to(Books::Table, Books::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-loans-user_id")
                            .from(Loans::Table, Loans::UserId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-loans-user_id")
                    .table(Loans::Table)
                    .col(Loans::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-loans-book_id")
                    .table(Loans::Table)
                    .col(Loans::BookId)
                    .to_owned(),
            )
            .await?;

        // The sweep scans open loans by due date.
        manager
            .create_index(
                Index::create()
                    .name("idx-loans-status-due_date")
                    .table(Loans::Table)
                    .col(Loans::Status)
                    .col(Loans::DueDate)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Loans::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Books::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}
