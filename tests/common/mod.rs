#![allow(dead_code)]

use roach_bank::BankError;
use roach_bank::db::{AccountId, Ledger, Transactional};
use roach_bank::service::RetryPolicy;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// In-memory store with optimistic concurrency: a transaction works on a
/// snapshot and its commit fails with a `40001` conflict if anything else
/// committed since it began.
#[derive(Clone, Default)]
pub struct MemoryBank {
    inner: Arc<Mutex<State>>,
}

#[derive(Default)]
struct State {
    accounts: BTreeMap<AccountId, i64>,
    version: u64,
    begins: usize,
    rollbacks: usize,
    stall_reads: bool,
}

pub struct MemoryTx {
    snapshot: BTreeMap<AccountId, i64>,
    read_version: u64,
    stalled: bool,
}

impl MemoryBank {
    pub fn with(accounts: &[(AccountId, i64)]) -> Self {
        let bank = Self::default();
        bank.state().accounts = accounts.iter().copied().collect();
        bank
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.inner.lock().expect("memory bank poisoned")
    }

    pub fn balances(&self) -> BTreeMap<AccountId, i64> {
        self.state().accounts.clone()
    }

    pub fn total(&self) -> i64 {
        self.state().accounts.values().sum()
    }

    /// Commit a write from "another client".
    pub fn external_write(&self, id: AccountId, balance: i64) {
        let mut state = self.state();
        state.accounts.insert(id, balance);
        state.version += 1;
    }

    /// Transactions begun from now on never finish their first read.
    pub fn stall_reads(&self) {
        self.state().stall_reads = true;
    }

    pub fn begins(&self) -> usize {
        self.state().begins
    }

    pub fn rollbacks(&self) -> usize {
        self.state().rollbacks
    }
}

impl MemoryTx {
    fn adjust(&mut self, id: AccountId, delta: i64) -> Result<(), BankError> {
        let balance = self
            .snapshot
            .get_mut(&id)
            .ok_or(BankError::AccountNotFound(id))?;
        *balance += delta;
        Ok(())
    }
}

impl Ledger for MemoryTx {
    async fn balance_of(&mut self, id: AccountId) -> Result<i64, BankError> {
        // Let concurrent transactions interleave between read and write.
        tokio::task::yield_now().await;
        if self.stalled {
            futures::future::pending::<()>().await;
        }
        self.snapshot
            .get(&id)
            .copied()
            .ok_or(BankError::AccountNotFound(id))
    }

    async fn debit(&mut self, id: AccountId, amount: i64) -> Result<(), BankError> {
        self.adjust(id, -amount)
    }

    async fn credit(&mut self, id: AccountId, amount: i64) -> Result<(), BankError> {
        self.adjust(id, amount)
    }
}

impl Transactional for MemoryBank {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx, BankError> {
        let mut state = self.state();
        state.begins += 1;
        Ok(MemoryTx {
            snapshot: state.accounts.clone(),
            read_version: state.version,
            stalled: state.stall_reads,
        })
    }

    async fn commit(&self, tx: MemoryTx) -> Result<(), BankError> {
        let mut state = self.state();
        if state.version != tx.read_version {
            return Err(BankError::TransactionConflict {
                code: "40001".to_string(),
                message: "restart transaction: read set changed".to_string(),
            });
        }
        state.accounts = tx.snapshot;
        state.version += 1;
        Ok(())
    }

    async fn rollback(&self, _tx: MemoryTx) -> Result<(), BankError> {
        self.state().rollbacks += 1;
        Ok(())
    }
}

pub fn fast_policy(max_retries: usize) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        min_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
    }
}
