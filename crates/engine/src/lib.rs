pub use books::Book;
pub use commands::{BorrowCmd, ExtendCmd, MarkLostCmd, PayFineCmd, ReturnCmd};
pub use error::EngineError;
pub use loans::{Loan, LoanStatus};
pub use ops::{
    BorrowOutcome, Engine, EngineBuilder, FineLine, FineReconciliation, FineStatement,
    ReturnOutcome,
};
pub use policy::LendingPolicy;
pub use users::User;

pub mod books;
mod commands;
mod error;
pub mod loans;
mod ops;
mod policy;
pub mod users;

type ResultEngine<T> = Result<T, EngineError>;
