//! # Docbase Database Crate
//!
//! This crate is the data-access layer over a MongoDB deployment. It adds no
//! query planning, caching or retries of its own: every operation is a single
//! call into the driver, and every failure is the driver's failure.
//!
//! ## Architectural Principles
//!
//! - **Thin Adapter:** The repository translates typed requests into driver
//!   calls and decodes the results. Filters and update payloads are BSON
//!   documents handed through verbatim.
//! - **Generic over Entities:** `Repository<T>` works for any serde record
//!   type, bound to one collection at construction time.
//! - **Swappable Backend:** Repositories talk to a `DocumentCollection`. The
//!   driver's collection handle implements it for production, and
//!   `InMemoryCollection` implements it for tests.
//!
//! ## Public API
//!
//! - `connect` / `connect_from_env`: open a health-checked `Connection`.
//! - `Connection`: database and collection handles, `ping`, `disconnect`.
//! - `Repository`: insert, find-by-id, find-all, update-by-id, delete-by-id.
//! - `BaseRepository`: the same operations as an object-safe trait.
//! - `DbError`: the errors that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod collection;
pub mod connection;
pub mod error;
pub mod memory;
pub mod repository;

// Re-export the key components to create a clean, public-facing API.
pub use collection::{DocumentCollection, DocumentStream, UpdateOutcome};
pub use connection::{connect, connect_from_env, Connection};
pub use error::DbError;
pub use memory::InMemoryCollection;
pub use repository::{BaseRepository, Repository};
