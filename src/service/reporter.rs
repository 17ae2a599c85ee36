use crate::db::models::Account;
use crate::db::postgres::AccountsStorage;
use crate::error::BankError;
use futures::stream::{Stream, StreamExt};
use std::io::Write;
use tracing::warn;

/// Print every account to `out`, one `ID: <id> Balance: <balance>` line each.
pub async fn report_balances<W: Write>(storage: &AccountsStorage, out: &mut W) -> usize {
    write_balances(storage.stream_accounts(), out).await
}

/// Drain `rows` into `out`. Failed rows and failed writes are logged and
/// skipped. Returns the number of lines written.
pub async fn write_balances<S, W>(rows: S, out: &mut W) -> usize
where
    S: Stream<Item = Result<Account, BankError>>,
    W: Write,
{
    let mut rows = std::pin::pin!(rows);
    let mut written = 0;
    while let Some(row) = rows.next().await {
        match row {
            Ok(account) => match writeln!(out, "{account}") {
                Ok(()) => written += 1,
                Err(e) => warn!(id = account.id, error = %e, "error writing balance"),
            },
            Err(e) => warn!(error = %e, "error retrieving account row"),
        }
    }
    written
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    #[tokio::test]
    async fn writes_one_line_per_account() {
        let rows = stream::iter(vec![Ok(Account::new(1, 750)), Ok(Account::new(2, 500))]);
        let mut out = Vec::new();
        let written = write_balances(rows, &mut out).await;
        assert_eq!(written, 2);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "ID: 1 Balance: 750\nID: 2 Balance: 500\n"
        );
    }

    #[tokio::test]
    async fn skips_rows_that_fail_and_keeps_going() {
        let rows = stream::iter(vec![
            Ok(Account::new(1, 100)),
            Err(BankError::from(sqlx::Error::ColumnNotFound("balance".to_string()))),
            Ok(Account::new(3, 300)),
        ]);
        let mut out = Vec::new();
        let written = write_balances(rows, &mut out).await;
        assert_eq!(written, 2);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "ID: 1 Balance: 100\nID: 3 Balance: 300\n"
        );
    }

    #[tokio::test]
    async fn empty_table_prints_nothing() {
        let rows = stream::iter(Vec::<Result<Account, BankError>>::new());
        let mut out = Vec::new();
        assert_eq!(write_balances(rows, &mut out).await, 0);
        assert!(out.is_empty());
    }
}
