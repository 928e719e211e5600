use chrono::NaiveDate;
use sea_orm::{Database, DatabaseConnection};

use engine::{
    Book, BorrowCmd, Engine, EngineError, ExtendCmd, LendingPolicy, LoanStatus, MarkLostCmd,
    ReturnCmd, User,
};
use migration::MigratorTrait;

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db)
}

async fn engine_with_policy(policy: LendingPolicy) -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .policy(policy)
        .build()
        .await
        .unwrap();
    (engine, db)
}

async fn seed(engine: &Engine) -> (User, Book) {
    let user = engine
        .register_user("Marta Rossi", "marta@example.com", 34)
        .await
        .unwrap();
    let book = engine
        .add_book("Il Gattopardo", "Giuseppe Tomasi di Lampedusa", "Fiction", 3)
        .await
        .unwrap();
    (user, book)
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[tokio::test]
async fn borrow_creates_loan_and_updates_counters() {
    let (engine, _db) = engine_with_db().await;
    let (user, book) = seed(&engine).await;

    let outcome = engine
        .borrow_book(BorrowCmd::new(user.id, book.id, day(2026, 1, 1)))
        .await
        .unwrap();

    assert_eq!(outcome.loan.status, LoanStatus::Borrowed);
    assert_eq!(outcome.loan.due_date, day(2026, 1, 15));
    assert_eq!(outcome.outstanding_fines_minor, None);

    let book = engine.book(book.id).await.unwrap();
    assert_eq!(book.available_copies, 2);
    assert_eq!(book.times_borrowed, 1);

    let user = engine.user(user.id).await.unwrap();
    assert_eq!(user.current_borrowings, 1);
    assert_eq!(user.total_borrowed, 1);
}

#[tokio::test]
async fn borrow_honors_requested_days() {
    let (engine, _db) = engine_with_db().await;
    let (user, book) = seed(&engine).await;

    let outcome = engine
        .borrow_book(BorrowCmd::new(user.id, book.id, day(2026, 1, 1)).days(7))
        .await
        .unwrap();
    assert_eq!(outcome.loan.due_date, day(2026, 1, 8));
}

#[tokio::test]
async fn absurd_requested_days_fail_with_a_typed_error() {
    let (engine, _db) = engine_with_db().await;
    let (user, book) = seed(&engine).await;

    let err = engine
        .borrow_book(BorrowCmd::new(user.id, book.id, day(2026, 1, 1)).days(u32::MAX))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::InvalidState("borrow length is out of range".to_string())
    );

    // No loan was created and no counter moved.
    let book = engine.book(book.id).await.unwrap();
    assert_eq!(book.available_copies, 3);
    let user = engine.user(user.id).await.unwrap();
    assert_eq!(user.current_borrowings, 0);
}

#[tokio::test]
async fn on_time_return_restores_counters_without_fine() {
    let (engine, _db) = engine_with_db().await;
    let (user, book) = seed(&engine).await;

    let outcome = engine
        .borrow_book(BorrowCmd::new(user.id, book.id, day(2026, 1, 1)))
        .await
        .unwrap();
    let returned = engine
        .return_book(ReturnCmd::new(outcome.loan.id, day(2026, 1, 10)))
        .await
        .unwrap();

    assert_eq!(returned.fine_minor, 0);
    assert_eq!(returned.loan.status, LoanStatus::Returned);
    assert_eq!(returned.loan.returned_date, Some(day(2026, 1, 10)));

    let book = engine.book(book.id).await.unwrap();
    assert_eq!(book.available_copies, 3);

    let user = engine.user(user.id).await.unwrap();
    assert_eq!(user.current_borrowings, 0);
    assert_eq!(user.total_fines_minor, 0);
}

#[tokio::test]
async fn late_return_assesses_the_daily_fine() {
    let (engine, _db) = engine_with_db().await;
    let (user, book) = seed(&engine).await;

    let outcome = engine
        .borrow_book(BorrowCmd::new(user.id, book.id, day(2026, 1, 1)))
        .await
        .unwrap();

    // Due Jan 15, back Jan 18: three days at 50 minor units.
    let returned = engine
        .return_book(ReturnCmd::new(outcome.loan.id, day(2026, 1, 18)))
        .await
        .unwrap();
    assert_eq!(returned.fine_minor, 150);
    assert_eq!(returned.loan.fine_amount_minor, 150);
    assert!(!returned.loan.fine_paid);

    let user = engine.user(user.id).await.unwrap();
    assert_eq!(user.total_fines_minor, 150);
}

#[tokio::test]
async fn rating_updates_the_running_average() {
    let (engine, _db) = engine_with_db().await;
    let (user, book) = seed(&engine).await;

    let outcome = engine
        .borrow_book(BorrowCmd::new(user.id, book.id, day(2026, 1, 1)))
        .await
        .unwrap();
    engine
        .return_book(ReturnCmd::new(outcome.loan.id, day(2026, 1, 10)).rating(4.0))
        .await
        .unwrap();

    // times_borrowed is 1 at return time: (0.0 * 1 + 4.0) / 2.
    let book = engine.book(book.id).await.unwrap();
    assert!((book.rating - 2.0).abs() < 1e-9);
}

#[tokio::test]
async fn out_of_range_rating_is_ignored() {
    let (engine, _db) = engine_with_db().await;
    let (user, book) = seed(&engine).await;

    let outcome = engine
        .borrow_book(BorrowCmd::new(user.id, book.id, day(2026, 1, 1)))
        .await
        .unwrap();
    engine
        .return_book(ReturnCmd::new(outcome.loan.id, day(2026, 1, 10)).rating(9.5))
        .await
        .unwrap();

    let book = engine.book(book.id).await.unwrap();
    assert_eq!(book.rating, 0.0);
}

#[tokio::test]
async fn last_copy_cannot_be_borrowed_twice() {
    let (engine, _db) = engine_with_db().await;
    let user = engine
        .register_user("Marta", "marta@example.com", 34)
        .await
        .unwrap();
    let other = engine
        .register_user("Luca", "luca@example.com", 41)
        .await
        .unwrap();
    let book = engine
        .add_book("Lessico famigliare", "Natalia Ginzburg", "Memoir", 1)
        .await
        .unwrap();

    engine
        .borrow_book(BorrowCmd::new(user.id, book.id, day(2026, 1, 1)))
        .await
        .unwrap();
    let err = engine
        .borrow_book(BorrowCmd::new(other.id, book.id, day(2026, 1, 1)))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::InvalidState("book is not available for borrowing".to_string())
    );

    let book = engine.book(book.id).await.unwrap();
    assert_eq!(book.available_copies, 0);
}

#[tokio::test]
async fn inactive_user_cannot_borrow() {
    let (engine, _db) = engine_with_db().await;
    let (user, book) = seed(&engine).await;

    engine.deactivate_user(user.id).await.unwrap();
    let err = engine
        .borrow_book(BorrowCmd::new(user.id, book.id, day(2026, 1, 1)))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::InvalidState("user is not active".to_string())
    );

    engine.activate_user(user.id).await.unwrap();
    engine
        .borrow_book(BorrowCmd::new(user.id, book.id, day(2026, 1, 1)))
        .await
        .unwrap();
}

#[tokio::test]
async fn underage_user_cannot_borrow() {
    let (engine, _db) = engine_with_db().await;
    let user = engine
        .register_user("Pietro", "pietro@example.com", 14)
        .await
        .unwrap();
    let book = engine
        .add_book("Il Gattopardo", "Tomasi di Lampedusa", "Fiction", 1)
        .await
        .unwrap();

    let err = engine
        .borrow_book(BorrowCmd::new(user.id, book.id, day(2026, 1, 1)))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::InvalidState("user must be at least 16 years old".to_string())
    );
}

#[tokio::test]
async fn borrowing_limit_is_enforced() {
    let policy = LendingPolicy {
        max_borrowings_per_user: 2,
        ..LendingPolicy::default()
    };
    let (engine, _db) = engine_with_policy(policy).await;
    let user = engine
        .register_user("Marta", "marta@example.com", 34)
        .await
        .unwrap();

    for title in ["Uno", "Due"] {
        let book = engine.add_book(title, "Autore", "Fiction", 1).await.unwrap();
        engine
            .borrow_book(BorrowCmd::new(user.id, book.id, day(2026, 1, 1)))
            .await
            .unwrap();
    }

    let third = engine.add_book("Tre", "Autore", "Fiction", 1).await.unwrap();
    let err = engine
        .borrow_book(BorrowCmd::new(user.id, third.id, day(2026, 1, 1)))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::InvalidState("user has reached the limit of 2 borrowings".to_string())
    );
}

#[tokio::test]
async fn duplicate_borrow_of_the_same_title_is_rejected() {
    let (engine, _db) = engine_with_db().await;
    let (user, book) = seed(&engine).await;

    engine
        .borrow_book(BorrowCmd::new(user.id, book.id, day(2026, 1, 1)))
        .await
        .unwrap();
    let err = engine
        .borrow_book(BorrowCmd::new(user.id, book.id, day(2026, 1, 2)))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::InvalidState("user already has this book on loan".to_string())
    );
}

#[tokio::test]
async fn unknown_ids_report_not_found() {
    let (engine, _db) = engine_with_db().await;
    let (user, book) = seed(&engine).await;

    let ghost = uuid::Uuid::new_v4();
    assert_eq!(
        engine
            .borrow_book(BorrowCmd::new(ghost, book.id, day(2026, 1, 1)))
            .await
            .unwrap_err(),
        EngineError::NotFound("user".to_string())
    );
    assert_eq!(
        engine
            .borrow_book(BorrowCmd::new(user.id, ghost, day(2026, 1, 1)))
            .await
            .unwrap_err(),
        EngineError::NotFound("book".to_string())
    );
    assert_eq!(
        engine
            .return_book(ReturnCmd::new(ghost, day(2026, 1, 1)))
            .await
            .unwrap_err(),
        EngineError::NotFound("loan".to_string())
    );
}

#[tokio::test]
async fn double_return_is_rejected() {
    let (engine, _db) = engine_with_db().await;
    let (user, book) = seed(&engine).await;

    let outcome = engine
        .borrow_book(BorrowCmd::new(user.id, book.id, day(2026, 1, 1)))
        .await
        .unwrap();
    engine
        .return_book(ReturnCmd::new(outcome.loan.id, day(2026, 1, 10)))
        .await
        .unwrap();
    let err = engine
        .return_book(ReturnCmd::new(outcome.loan.id, day(2026, 1, 11)))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::InvalidState("loan is already returned".to_string())
    );

    // The shelf count did not go past the copies owned.
    let book = engine.book(book.id).await.unwrap();
    assert_eq!(book.available_copies, 3);
}

#[tokio::test]
async fn extension_saturates_at_the_cap() {
    let (engine, _db) = engine_with_db().await;
    let (user, book) = seed(&engine).await;

    let outcome = engine
        .borrow_book(BorrowCmd::new(user.id, book.id, day(2026, 1, 1)))
        .await
        .unwrap();
    let loan_id = outcome.loan.id;

    let loan = engine
        .extend_loan(ExtendCmd::new(loan_id, 5, day(2026, 1, 5)))
        .await
        .unwrap();
    assert_eq!(loan.due_date, day(2026, 1, 20));

    let err = engine
        .extend_loan(ExtendCmd::new(loan_id, 3, day(2026, 1, 5)))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::InvalidState("cannot extend more than 7 days in total".to_string())
    );

    let loan = engine
        .extend_loan(ExtendCmd::new(loan_id, 2, day(2026, 1, 5)))
        .await
        .unwrap();
    assert_eq!(loan.days_extended, 7);
    assert_eq!(loan.due_date, day(2026, 1, 22));
}

#[tokio::test]
async fn overdue_loan_cannot_be_extended() {
    let (engine, _db) = engine_with_db().await;
    let (user, book) = seed(&engine).await;

    let outcome = engine
        .borrow_book(BorrowCmd::new(user.id, book.id, day(2026, 1, 1)))
        .await
        .unwrap();
    let err = engine
        .extend_loan(ExtendCmd::new(outcome.loan.id, 2, day(2026, 2, 1)))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::InvalidState("cannot extend an overdue loan".to_string())
    );
}

#[tokio::test]
async fn lost_book_charges_a_flat_fine_and_keeps_the_copy_out() {
    let (engine, _db) = engine_with_db().await;
    let (user, book) = seed(&engine).await;

    let outcome = engine
        .borrow_book(BorrowCmd::new(user.id, book.id, day(2026, 1, 1)))
        .await
        .unwrap();
    let loan = engine
        .mark_lost(MarkLostCmd::new(outcome.loan.id))
        .await
        .unwrap();
    assert_eq!(loan.status, LoanStatus::Lost);
    assert_eq!(loan.fine_amount_minor, 1_000_000);
    assert!(loan.returned_date.is_none());

    let book = engine.book(book.id).await.unwrap();
    assert_eq!(book.available_copies, 2);

    let user = engine.user(user.id).await.unwrap();
    assert_eq!(user.current_borrowings, 0);
    assert_eq!(user.total_fines_minor, 1_000_000);

    let err = engine
        .return_book(ReturnCmd::new(loan.id, day(2026, 1, 10)))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::InvalidState("loan was written off as lost".to_string())
    );
}

#[tokio::test]
async fn outstanding_fines_warn_but_do_not_block() {
    let (engine, _db) = engine_with_db().await;
    let (user, book) = seed(&engine).await;

    let outcome = engine
        .borrow_book(BorrowCmd::new(user.id, book.id, day(2026, 1, 1)))
        .await
        .unwrap();
    engine
        .return_book(ReturnCmd::new(outcome.loan.id, day(2026, 1, 18)))
        .await
        .unwrap();

    let outcome = engine
        .borrow_book(BorrowCmd::new(user.id, book.id, day(2026, 1, 20)))
        .await
        .unwrap();
    assert_eq!(outcome.outstanding_fines_minor, Some(150));
}

#[tokio::test]
async fn user_with_open_loans_cannot_be_deactivated() {
    let (engine, _db) = engine_with_db().await;
    let (user, book) = seed(&engine).await;

    let outcome = engine
        .borrow_book(BorrowCmd::new(user.id, book.id, day(2026, 1, 1)))
        .await
        .unwrap();
    let err = engine.deactivate_user(user.id).await.unwrap_err();
    assert_eq!(
        err,
        EngineError::InvalidState("cannot deactivate a user with open loans".to_string())
    );

    engine
        .return_book(ReturnCmd::new(outcome.loan.id, day(2026, 1, 10)))
        .await
        .unwrap();
    let user = engine.deactivate_user(user.id).await.unwrap();
    assert!(!user.active);
}

#[tokio::test]
async fn loan_history_lists_open_and_closed_loans() {
    let (engine, _db) = engine_with_db().await;
    let (user, book) = seed(&engine).await;
    let other = engine
        .add_book("Se questo e un uomo", "Primo Levi", "Memoir", 1)
        .await
        .unwrap();

    let first = engine
        .borrow_book(BorrowCmd::new(user.id, book.id, day(2026, 1, 1)))
        .await
        .unwrap();
    engine
        .return_book(ReturnCmd::new(first.loan.id, day(2026, 1, 10)))
        .await
        .unwrap();
    engine
        .borrow_book(BorrowCmd::new(user.id, other.id, day(2026, 1, 12)))
        .await
        .unwrap();

    let history = engine.loans_of_user(user.id).await.unwrap();
    assert_eq!(history.len(), 2);

    let open = engine.open_loans_of_user(user.id).await.unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].book_id, other.id);
}

#[tokio::test]
async fn sweep_flags_overdue_loans_once() {
    let (engine, _db) = engine_with_db().await;
    let (user, book) = seed(&engine).await;
    let outcome = engine
        .borrow_book(BorrowCmd::new(user.id, book.id, day(2026, 1, 1)))
        .await
        .unwrap();

    // Not yet due on the due date itself.
    assert_eq!(engine.sweep_overdue(day(2026, 1, 15)).await.unwrap(), 0);

    assert_eq!(engine.sweep_overdue(day(2026, 1, 16)).await.unwrap(), 1);
    let loan = engine.loan(outcome.loan.id).await.unwrap();
    assert_eq!(loan.status, LoanStatus::Overdue);

    // Idempotent: a second sweep with the same date matches nothing.
    assert_eq!(engine.sweep_overdue(day(2026, 1, 16)).await.unwrap(), 0);

    let overdue = engine.list_overdue(day(2026, 1, 16)).await.unwrap();
    assert_eq!(overdue.len(), 1);
    assert_eq!(overdue[0].id, outcome.loan.id);
}

#[tokio::test]
async fn swept_loan_can_still_be_returned_with_its_fine() {
    let (engine, _db) = engine_with_db().await;
    let (user, book) = seed(&engine).await;
    let outcome = engine
        .borrow_book(BorrowCmd::new(user.id, book.id, day(2026, 1, 1)))
        .await
        .unwrap();

    engine.sweep_overdue(day(2026, 1, 18)).await.unwrap();
    let returned = engine
        .return_book(ReturnCmd::new(outcome.loan.id, day(2026, 1, 18)))
        .await
        .unwrap();
    assert_eq!(returned.loan.status, LoanStatus::Returned);
    assert_eq!(returned.fine_minor, 150);
}
