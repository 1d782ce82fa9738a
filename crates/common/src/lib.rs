//! Shared configuration, error handling, and transaction plumbing for Volha
//!
//! This crate provides the pieces every catalog repository leans on:
//! - Configuration management following 12-factor principles
//! - The error taxonomy and storage error classification
//! - Database scopes (pool or ambient transaction) and the transaction runner

pub mod config;
pub mod db;
pub mod error;
pub mod tx;

pub use config::Config;
pub use db::{connect, within_deadline, Atomic, DbConn, DbScope, RepositoryError};
pub use error::{Error, ErrorKind, OpContext, Result};
pub use tx::TxRunner;
