use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

pub type AccountId = i64;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, FromRow)]
pub struct Account {
    pub id: AccountId,
    pub balance: i64,
}

impl Account {
    pub fn new(id: AccountId, balance: i64) -> Self {
        Self { id, balance }
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ID: {} Balance: {}", self.id, self.balance)
    }
}

/// Rows inserted by the opt-in seeder.
pub const DEMO_ACCOUNTS: [Account; 2] = [
    Account { id: 1, balance: 1000 },
    Account { id: 2, balance: 250 },
];
