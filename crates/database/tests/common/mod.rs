#![allow(dead_code)]

use database::{InMemoryCollection, Repository};
use serde::{Deserialize, Serialize};
use std::sync::Once;

/// The record used throughout the integration tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub age: i32,
}

impl User {
    pub fn new(id: &str, name: &str, age: i32) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            age,
        }
    }
}

static TRACING: Once = Once::new();

/// Installs a test writer subscriber once per test binary.
///
/// Set `RUST_LOG=database=debug` to see the repository's log lines.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// A user repository over a fresh in-memory collection.
pub fn user_repository() -> Repository<User, InMemoryCollection> {
    init_tracing();
    Repository::with_collection(InMemoryCollection::new("users"))
}
