//! Database layer for the repasse automation.
//!
//! Wraps an Oracle connection and exposes the queries and `ROBO_RPA`
//! procedures the workflow needs through the [`RepasseStore`] trait.

pub mod client;
pub mod error;
pub mod models;
pub mod store;

pub use client::{DbSettings, OracleClient, ProcParam, Record, SqlParam};
pub use error::DbError;
pub use store::RepasseStore;
