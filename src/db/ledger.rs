use crate::db::models::AccountId;
use crate::error::BankError;
use std::future::Future;

/// Reads and writes a unit of work performs on account balances.
///
/// Implemented by an open transaction, so every call observes and mutates
/// the same snapshot until it is committed or rolled back.
pub trait Ledger: Send {
    /// Current balance of `id`; `AccountNotFound` if the row is absent.
    fn balance_of(
        &mut self,
        id: AccountId,
    ) -> impl Future<Output = Result<i64, BankError>> + Send;

    /// Subtract `amount` from `id`; `AccountNotFound` if the row is absent.
    fn debit(
        &mut self,
        id: AccountId,
        amount: i64,
    ) -> impl Future<Output = Result<(), BankError>> + Send;

    /// Add `amount` to `id`; `AccountNotFound` if the row is absent.
    fn credit(
        &mut self,
        id: AccountId,
        amount: i64,
    ) -> impl Future<Output = Result<(), BankError>> + Send;
}

/// A store that hands out transactions.
pub trait Transactional: Sync {
    type Tx: Ledger;

    fn begin(&self) -> impl Future<Output = Result<Self::Tx, BankError>> + Send;

    /// Conflicts detected at commit surface as `BankError::TransactionConflict`.
    fn commit(&self, tx: Self::Tx) -> impl Future<Output = Result<(), BankError>> + Send;

    fn rollback(&self, tx: Self::Tx) -> impl Future<Output = Result<(), BankError>> + Send;
}
