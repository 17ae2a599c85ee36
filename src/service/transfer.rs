use crate::db::ledger::{Ledger, Transactional};
use crate::db::models::AccountId;
use crate::error::BankError;
use crate::service::retry::{RetryPolicy, execute_tx};
use tracing::{info, warn};

/// Move `amount` from account `from` to account `to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferRequest {
    pub from: AccountId,
    pub to: AccountId,
    pub amount: i64,
}

impl TransferRequest {
    pub fn new(from: AccountId, to: AccountId, amount: i64) -> Result<Self, BankError> {
        if amount < 0 {
            return Err(BankError::InvalidAmount(amount));
        }
        Ok(Self { from, to, amount })
    }
}

/// The transfer's unit of work: check the source balance, then debit and
/// credit. Must run inside one transaction.
pub async fn transfer_funds<L: Ledger>(
    ledger: &mut L,
    req: TransferRequest,
) -> Result<(), BankError> {
    let from_balance = ledger.balance_of(req.from).await?;
    if from_balance < req.amount {
        return Err(BankError::InsufficientFunds(req.from));
    }

    ledger.debit(req.from, req.amount).await?;
    ledger.credit(req.to, req.amount).await?;
    Ok(())
}

/// Run [`transfer_funds`] in a transaction on `store`, re-running it from
/// scratch on conflicts.
pub async fn transfer<S: Transactional>(
    store: &S,
    policy: &RetryPolicy,
    req: TransferRequest,
) -> Result<(), BankError> {
    execute_tx(store, policy, move |tx| Box::pin(transfer_funds(tx, req))).await?;
    info!(
        from = req.from,
        to = req.to,
        amount = req.amount,
        "transfer committed"
    );
    Ok(())
}

/// [`transfer`], abandoned with `BankError::Cancelled` once `cancel`
/// completes. Dropping the in-flight transaction rolls it back.
pub async fn transfer_until<S, C>(
    store: &S,
    policy: &RetryPolicy,
    req: TransferRequest,
    cancel: C,
) -> Result<(), BankError>
where
    S: Transactional,
    C: Future<Output = ()>,
{
    tokio::select! {
        res = transfer(store, policy, req) => res,
        () = cancel => {
            warn!(from = req.from, to = req.to, "transfer cancelled before commit");
            Err(BankError::Cancelled)
        }
    }
}
