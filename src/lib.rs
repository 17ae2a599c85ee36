pub mod config;
pub mod db;
pub mod error;
pub mod service;

pub use config::Config;
pub use db::{Account, AccountId, AccountsStorage};
pub use error::BankError;
