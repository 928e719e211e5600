use sea_orm::DatabaseConnection;

use crate::{LendingPolicy, ResultEngine};

mod access;
mod fines;
mod lending;
mod members;
mod overdue;

pub use fines::{FineLine, FineReconciliation, FineStatement};
pub use lending::{BorrowOutcome, ReturnOutcome};

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    policy: LendingPolicy,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// The policy the engine enforces.
    pub fn policy(&self) -> &LendingPolicy {
        &self.policy
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    policy: Option<LendingPolicy>,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Override the default lending policy
    pub fn policy(mut self, policy: LendingPolicy) -> EngineBuilder {
        self.policy = Some(policy);
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
            policy: self.policy.unwrap_or_default(),
        })
    }
}
