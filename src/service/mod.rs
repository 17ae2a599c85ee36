pub mod reporter;
pub mod retry;
pub mod transfer;

pub use reporter::report_balances;
pub use retry::{RetryPolicy, execute_tx};
pub use transfer::{TransferRequest, transfer, transfer_funds, transfer_until};
