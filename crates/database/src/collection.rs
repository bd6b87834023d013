use crate::error::DbError;
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use mongodb::bson::Document;
use mongodb::Collection;

/// Documents yielded by a query, in cursor order. Errors raised while the
/// cursor is being drained show up as items.
pub type DocumentStream = BoxStream<'static, Result<Document, DbError>>;

/// What an update touched, as reported by the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub matched: u64,
    pub modified: u64,
}

/// The slice of a driver collection handle that a repository needs.
///
/// Everything is expressed in raw BSON documents; encoding and decoding of
/// entity types happens in the repository. The MongoDB driver's
/// `Collection<Document>` is the production implementation and
/// [`InMemoryCollection`](crate::memory::InMemoryCollection) stands in for it
/// where no server is available.
#[async_trait]
pub trait DocumentCollection: Send + Sync {
    /// The collection name, used for logging.
    fn name(&self) -> &str;

    /// Inserts a single document.
    async fn insert_one(&self, document: Document) -> Result<(), DbError>;

    /// Returns the first document matching `filter`, if any.
    async fn find_one(&self, filter: Document) -> Result<Option<Document>, DbError>;

    /// Runs a query and returns a stream over every matching document.
    async fn find(&self, filter: Document) -> Result<DocumentStream, DbError>;

    /// Applies `update` to the first document matching `filter`.
    async fn update_one(&self, filter: Document, update: Document) -> Result<UpdateOutcome, DbError>;

    /// Deletes the first document matching `filter` and returns how many were removed.
    async fn delete_one(&self, filter: Document) -> Result<u64, DbError>;
}

#[async_trait]
impl DocumentCollection for Collection<Document> {
    fn name(&self) -> &str {
        Collection::name(self)
    }

    async fn insert_one(&self, document: Document) -> Result<(), DbError> {
        Collection::insert_one(self, document).await?;
        Ok(())
    }

    async fn find_one(&self, filter: Document) -> Result<Option<Document>, DbError> {
        Ok(Collection::find_one(self, filter).await?)
    }

    async fn find(&self, filter: Document) -> Result<DocumentStream, DbError> {
        let cursor = Collection::find(self, filter).await?;
        Ok(cursor.map_err(DbError::from).boxed())
    }

    async fn update_one(&self, filter: Document, update: Document) -> Result<UpdateOutcome, DbError> {
        let result = Collection::update_one(self, filter, update).await?;
        Ok(UpdateOutcome {
            matched: result.matched_count,
            modified: result.modified_count,
        })
    }

    async fn delete_one(&self, filter: Document) -> Result<u64, DbError> {
        let result = Collection::delete_one(self, filter).await?;
        Ok(result.deleted_count)
    }
}
