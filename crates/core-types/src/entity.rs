use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A record type that a repository can store in a document collection.
///
/// There is no shape constraint beyond being encodable to and decodable from
/// a document; the only field the repository ever addresses is `_id`, and it
/// does so through filters rather than through this trait.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + Unpin + 'static {}

impl<T> Entity for T where T: Serialize + DeserializeOwned + Send + Sync + Unpin + 'static {}

/// The minimal entity shape: a string identifier stored under `_id`.
///
/// Applications define their own record types with the same `_id` mapping
/// plus whatever fields they need; this one exists to show the convention.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseEntity {
    // Left out of the document when empty so the store can assign one.
    #[serde(rename = "_id", default, skip_serializing_if = "String::is_empty")]
    pub id: String,
}

impl BaseEntity {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}
