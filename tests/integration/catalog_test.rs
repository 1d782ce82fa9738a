//! Database-backed catalog tests
//!
//! Every test needs a PostgreSQL instance at `TEST_DATABASE_URL` and is
//! ignored by default: `cargo test -p volha-integration-tests -- --ignored`.

mod aggregate;
mod color_photos;
mod common;
mod dictionaries;
mod products;
mod transactions;
