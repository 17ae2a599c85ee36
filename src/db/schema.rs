//! SQL DDL for the `accounts` table.
//! Written against the PostgreSQL dialect, which CockroachDB also accepts.

/// `BIGINT` keeps the column width identical on PostgreSQL and CockroachDB
/// (a bare `INT` is 4 bytes on the former and 8 on the latter).
pub const ACCOUNTS_INIT: &str =
    "CREATE TABLE IF NOT EXISTS accounts (id BIGINT PRIMARY KEY, balance BIGINT NOT NULL)";
