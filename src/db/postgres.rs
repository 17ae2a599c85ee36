use crate::config::DatabaseConfig;
use crate::db::ledger::{Ledger, Transactional};
use crate::db::models::{Account, AccountId};
use crate::db::schema::ACCOUNTS_INIT;
use crate::error::BankError;
use futures::stream::{BoxStream, StreamExt};
use sqlx::postgres::{PgConnection, PgPoolOptions};
use sqlx::{ConnectOptions, Connection, Pool, Postgres, Transaction};
use std::time::Duration;
use tracing::{debug, info};

type PgPool = Pool<Postgres>;

/// Session against the `bank` database.
///
/// The pool is capped at one connection so the program holds exactly one
/// session for its whole lifetime.
#[derive(Clone)]
pub struct AccountsStorage {
    pool: PgPool,
}

impl AccountsStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open the session described by `cfg`.
    ///
    /// A direct handshake runs first so an unreachable or misconfigured server
    /// fails with its own error instead of a pool acquire timeout.
    pub async fn connect(cfg: &DatabaseConfig) -> Result<Self, BankError> {
        let opts = cfg.connect_options();
        let handshake: PgConnection = opts.connect().await?;
        handshake.close().await?;

        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(opts)
            .await?;
        info!(
            host = %cfg.host,
            port = cfg.port,
            database = %cfg.name,
            "successfully connected to the database"
        );
        Ok(Self::new(pool))
    }

    /// Close the session. Idempotent.
    pub async fn close(&self) {
        self.pool.close().await;
        debug!("database session closed");
    }

    /// Create the `accounts` table if it does not exist yet.
    pub async fn init_schema(&self) -> Result<(), BankError> {
        sqlx::query(ACCOUNTS_INIT).execute(&self.pool).await?;
        Ok(())
    }

    /// Insert `accounts` in one transaction, leaving ids that already exist
    /// untouched. Returns the number of rows inserted.
    pub async fn seed_accounts(&self, accounts: &[Account]) -> Result<u64, BankError> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;
        for account in accounts {
            inserted += sqlx::query(
                "INSERT INTO accounts (id, balance) VALUES ($1, $2) ON CONFLICT (id) DO NOTHING",
            )
            .bind(account.id)
            .bind(account.balance)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }
        tx.commit().await?;
        Ok(inserted)
    }

    pub async fn get_account(&self, id: AccountId) -> Result<Account, BankError> {
        sqlx::query_as::<_, Account>("SELECT id, balance FROM accounts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(BankError::AccountNotFound(id))
    }

    /// Stream every account ordered by id. A row that fails to decode yields
    /// an error item without ending the stream.
    pub fn stream_accounts(&self) -> BoxStream<'_, Result<Account, BankError>> {
        sqlx::query_as::<_, Account>("SELECT id, balance FROM accounts ORDER BY id")
            .fetch(&self.pool)
            .map(|row| row.map_err(BankError::from))
            .boxed()
    }
}

impl Transactional for AccountsStorage {
    type Tx = Transaction<'static, Postgres>;

    async fn begin(&self) -> Result<Self::Tx, BankError> {
        let mut tx = self.pool.begin().await?;
        // CockroachDB default; PostgreSQL needs it to detect read-write races.
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await?;
        Ok(tx)
    }

    async fn commit(&self, tx: Self::Tx) -> Result<(), BankError> {
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(&self, tx: Self::Tx) -> Result<(), BankError> {
        tx.rollback().await?;
        Ok(())
    }
}

impl Ledger for Transaction<'static, Postgres> {
    async fn balance_of(&mut self, id: AccountId) -> Result<i64, BankError> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT balance FROM accounts WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut **self)
            .await?;
        row.map(|(balance,)| balance)
            .ok_or(BankError::AccountNotFound(id))
    }

    async fn debit(&mut self, id: AccountId, amount: i64) -> Result<(), BankError> {
        let result = sqlx::query("UPDATE accounts SET balance = balance - $1 WHERE id = $2")
            .bind(amount)
            .bind(id)
            .execute(&mut **self)
            .await?;
        if result.rows_affected() == 0 {
            return Err(BankError::AccountNotFound(id));
        }
        Ok(())
    }

    async fn credit(&mut self, id: AccountId, amount: i64) -> Result<(), BankError> {
        let result = sqlx::query("UPDATE accounts SET balance = balance + $1 WHERE id = $2")
            .bind(amount)
            .bind(id)
            .execute(&mut **self)
            .await?;
        if result.rows_affected() == 0 {
            return Err(BankError::AccountNotFound(id));
        }
        Ok(())
    }
}
