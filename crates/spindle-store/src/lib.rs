//! Render job store.
//!
//! This crate provides:
//! - The [`JobStore`] repository trait with the atomic claim contract
//! - A PostgreSQL implementation backed by the `claim_next_render_job`
//!   stored procedure (`FOR UPDATE SKIP LOCKED`)
//! - An in-memory implementation honoring the identical contract, for tests

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryJobStore;
pub use postgres::PgJobStore;
pub use store::JobStore;
