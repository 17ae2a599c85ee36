use crate::db::models::AccountId;
use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;

/// SQLSTATE codes the store uses to ask the client to retry the transaction.
/// `40001` is serialization_failure (CockroachDB reports every restart with
/// it), `40P01` is PostgreSQL's deadlock_detected.
pub const TRANSIENT_SQLSTATES: &[&str] = &["40001", "40P01"];

#[derive(Debug, ThisError)]
pub enum BankError {
    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("Database error: {0}")]
    DatabaseError(#[source] SqlxError),

    #[error("transaction conflict ({code}): {message}")]
    TransactionConflict { code: String, message: String },

    #[error("account not found: {0}")]
    AccountNotFound(AccountId),

    #[error("insufficient balance in account: {0}")]
    InsufficientFunds(AccountId),

    #[error("invalid transfer amount: {0}")]
    InvalidAmount(i64),

    #[error("transfer cancelled")]
    Cancelled,
}

impl From<figment::Error> for BankError {
    fn from(e: figment::Error) -> Self {
        BankError::Config(Box::new(e))
    }
}

impl From<SqlxError> for BankError {
    fn from(e: SqlxError) -> Self {
        if let SqlxError::Database(db) = &e
            && let Some(code) = db.code()
            && is_transient_sqlstate(&code)
        {
            return BankError::TransactionConflict {
                code: code.into_owned(),
                message: db.message().to_string(),
            };
        }
        BankError::DatabaseError(e)
    }
}

/// Errors that a fresh attempt of the same unit of work may resolve.
pub trait IsRetryable {
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for BankError {
    fn is_retryable(&self) -> bool {
        matches!(self, BankError::TransactionConflict { .. })
    }
}

pub fn is_transient_sqlstate(code: &str) -> bool {
    TRANSIENT_SQLSTATES.contains(&code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialization_failure_and_deadlock_are_transient() {
        assert!(is_transient_sqlstate("40001"));
        assert!(is_transient_sqlstate("40P01"));
        // statement_completion_unknown: the commit may have happened.
        assert!(!is_transient_sqlstate("40003"));
        assert!(!is_transient_sqlstate("23505"));
    }

    #[test]
    fn only_conflicts_are_retryable() {
        let conflict = BankError::TransactionConflict {
            code: "40001".to_string(),
            message: "restart transaction".to_string(),
        };
        assert!(conflict.is_retryable());
        assert!(!BankError::InsufficientFunds(1).is_retryable());
        assert!(!BankError::AccountNotFound(1).is_retryable());
        assert!(!BankError::Cancelled.is_retryable());
        assert!(!BankError::from(SqlxError::RowNotFound).is_retryable());
    }

    #[test]
    fn insufficient_funds_names_the_account() {
        assert_eq!(
            BankError::InsufficientFunds(1).to_string(),
            "insufficient balance in account: 1"
        );
    }

    #[test]
    fn non_database_sqlx_errors_stay_database_errors() {
        let err = BankError::from(SqlxError::PoolTimedOut);
        assert!(matches!(err, BankError::DatabaseError(SqlxError::PoolTimedOut)));
    }

    #[test]
    fn database_errors_keep_their_source() {
        use std::error::Error;
        let err = BankError::from(SqlxError::PoolTimedOut);
        let source = err.source().expect("sqlx error as source");
        assert_eq!(source.to_string(), SqlxError::PoolTimedOut.to_string());
    }
}
