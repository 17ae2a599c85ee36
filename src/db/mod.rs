//! Database module: models, schema and the PostgreSQL-wire storage handle.
//!
//! Layout:
//! - `models.rs`: Rust structs mirroring DB rows
//! - `schema.rs`: SQL DDL for initializing the database
//! - `ledger.rs`: the seams a unit of work runs against
//! - `postgres.rs`: single-connection session implementing those seams

pub mod ledger;
pub mod models;
pub mod postgres;
pub mod schema;

pub use ledger::{Ledger, Transactional};
pub use models::{Account, AccountId};
pub use postgres::AccountsStorage;
