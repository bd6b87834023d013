use crate::collection::DocumentCollection;
use crate::connection::Connection;
use crate::DbError;
use async_trait::async_trait;
use core_types::Entity;
use futures::TryStreamExt;
use mongodb::bson::{self, doc, Document};
use mongodb::Collection;
use std::marker::PhantomData;

/// The operations every repository supports.
///
/// Application code that wants to substitute a fake in its own tests should
/// depend on this trait rather than on [`Repository`] directly.
#[async_trait]
pub trait BaseRepository<T: Entity>: Send + Sync {
    async fn insert_one(&self, entity: &T) -> Result<(), DbError>;

    async fn find_one_by_id(&self, id: &str) -> Result<T, DbError>;

    async fn find_all(&self, filter: Document) -> Result<Vec<T>, DbError>;

    async fn update_one_by_id(&self, id: &str, update: Document) -> Result<(), DbError>;

    async fn delete_one_by_id(&self, id: &str) -> Result<(), DbError>;
}

/// A typed view over a single collection.
///
/// The repository holds nothing but the collection handle, so it can be shared
/// between tasks freely; every method is exactly one round trip to the store
/// and returns the store's error unchanged.
///
/// Entity-specific repositories wrap one of these and add their own queries,
/// reaching for the raw handle via [`Repository::collection`] when the five
/// operations are not enough:
///
/// ```ignore
/// struct UserRepository(Repository<User>);
///
/// impl UserRepository {
///     async fn adults(&self) -> Result<Vec<User>, DbError> {
///         self.0.find_all(doc! { "age": { "$gte": 18 } }).await
///     }
/// }
/// ```
pub struct Repository<T, C = Collection<Document>> {
    collection: C,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> Repository<T> {
    /// Binds `collection_name` in `database_name` to the entity type `T`.
    ///
    /// Neither the database nor the collection has to exist yet; the server
    /// creates them on first write.
    pub fn new(connection: &Connection, database_name: &str, collection_name: &str) -> Self {
        Self::with_collection(connection.collection(database_name, collection_name))
    }
}

impl<T: Entity, C: DocumentCollection> Repository<T, C> {
    /// Builds a repository over any collection handle.
    pub fn with_collection(collection: C) -> Self {
        Self {
            collection,
            _entity: PhantomData,
        }
    }

    /// The underlying collection handle.
    pub fn collection(&self) -> &C {
        &self.collection
    }

    /// Inserts `entity` as a new document.
    pub async fn insert_one(&self, entity: &T) -> Result<(), DbError> {
        let document = bson::to_document(entity)?;
        tracing::debug!(collection = self.collection.name(), "Inserting document.");
        self.collection.insert_one(document).await
    }

    /// Fetches the document whose `_id` equals `id`.
    ///
    /// Both a missing document ([`DbError::NotFound`]) and one that does not
    /// decode as `T` ([`DbError::Decode`]) are errors; see
    /// [`DbError::is_lookup_failure`].
    pub async fn find_one_by_id(&self, id: &str) -> Result<T, DbError> {
        tracing::debug!(collection = self.collection.name(), id, "Finding document by id.");
        let document = self
            .collection
            .find_one(id_filter(id))
            .await?
            .ok_or_else(|| DbError::NotFound(id.to_string()))?;
        Ok(bson::from_document(document)?)
    }

    /// Fetches every document matching `filter`, in cursor order.
    ///
    /// A single document that fails to decode fails the whole call. No
    /// matches yields an empty vector.
    pub async fn find_all(&self, filter: Document) -> Result<Vec<T>, DbError> {
        tracing::debug!(collection = self.collection.name(), %filter, "Finding documents.");
        let mut cursor = self.collection.find(filter).await?;

        let mut entities = Vec::new();
        while let Some(document) = cursor.try_next().await? {
            entities.push(bson::from_document(document)?);
        }
        Ok(entities)
    }

    /// Overwrites the fields named in `update` on the document whose `_id`
    /// equals `id`. Other fields are left alone.
    ///
    /// Succeeds when nothing matched.
    pub async fn update_one_by_id(&self, id: &str, update: Document) -> Result<(), DbError> {
        let outcome = self
            .collection
            .update_one(id_filter(id), doc! { "$set": update })
            .await?;
        tracing::debug!(
            collection = self.collection.name(),
            id,
            matched = outcome.matched,
            modified = outcome.modified,
            "Updated document."
        );
        Ok(())
    }

    /// Deletes the document whose `_id` equals `id`. Succeeds when nothing matched.
    pub async fn delete_one_by_id(&self, id: &str) -> Result<(), DbError> {
        let deleted = self.collection.delete_one(id_filter(id)).await?;
        tracing::debug!(collection = self.collection.name(), id, deleted, "Deleted document.");
        Ok(())
    }
}

impl<T, C: Clone> Clone for Repository<T, C> {
    fn clone(&self) -> Self {
        Self {
            collection: self.collection.clone(),
            _entity: PhantomData,
        }
    }
}

#[async_trait]
impl<T: Entity, C: DocumentCollection> BaseRepository<T> for Repository<T, C> {
    async fn insert_one(&self, entity: &T) -> Result<(), DbError> {
        Repository::insert_one(self, entity).await
    }

    async fn find_one_by_id(&self, id: &str) -> Result<T, DbError> {
        Repository::find_one_by_id(self, id).await
    }

    async fn find_all(&self, filter: Document) -> Result<Vec<T>, DbError> {
        Repository::find_all(self, filter).await
    }

    async fn update_one_by_id(&self, id: &str, update: Document) -> Result<(), DbError> {
        Repository::update_one_by_id(self, id, update).await
    }

    async fn delete_one_by_id(&self, id: &str) -> Result<(), DbError> {
        Repository::delete_one_by_id(self, id).await
    }
}

fn id_filter(id: &str) -> Document {
    doc! { "_id": id }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryCollection;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Person {
        #[serde(rename = "_id")]
        id: String,
        name: String,
        age: i32,
    }

    fn person(id: &str, name: &str, age: i32) -> Person {
        Person {
            id: id.to_string(),
            name: name.to_string(),
            age,
        }
    }

    fn repository() -> Repository<Person, InMemoryCollection> {
        Repository::with_collection(InMemoryCollection::new("people"))
    }

    #[tokio::test]
    async fn insert_then_find_by_id_round_trips() {
        let repo = repository();
        let ann = person("u1", "Ann", 30);

        repo.insert_one(&ann).await.unwrap();

        assert_eq!(repo.find_one_by_id("u1").await.unwrap(), ann);
    }

    #[tokio::test]
    async fn find_by_unknown_id_is_not_found() {
        let repo = repository();
        repo.insert_one(&person("u1", "Ann", 30)).await.unwrap();

        let err = repo.find_one_by_id("nope").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound(ref id) if id == "nope"));
        assert!(err.is_lookup_failure());
    }

    #[tokio::test]
    async fn find_by_id_with_wrong_shape_is_decode_error() {
        let collection =
            InMemoryCollection::with_documents("people", vec![doc! { "_id": "u1", "name": 7 }]);
        let repo: Repository<Person, _> = Repository::with_collection(collection);

        let err = repo.find_one_by_id("u1").await.unwrap_err();
        assert!(matches!(err, DbError::Decode(_)), "unexpected error: {err:?}");
        assert!(err.is_lookup_failure());
    }

    #[tokio::test]
    async fn find_all_returns_cursor_order() {
        let repo = repository();
        let people = [person("a", "Ann", 30), person("b", "Bob", 20), person("c", "Cid", 45)];
        for p in &people {
            repo.insert_one(p).await.unwrap();
        }

        let adults = repo.find_all(doc! { "age": { "$gte": 25 } }).await.unwrap();
        assert_eq!(adults, vec![people[0].clone(), people[2].clone()]);

        let everyone = repo.find_all(doc! {}).await.unwrap();
        assert_eq!(everyone, people.to_vec());
    }

    #[tokio::test]
    async fn find_all_without_matches_is_empty() {
        let repo = repository();
        repo.insert_one(&person("a", "Ann", 30)).await.unwrap();

        let found = repo.find_all(doc! { "age": { "$gte": 100 } }).await.unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn find_all_fails_when_any_document_does_not_decode() {
        let collection = InMemoryCollection::with_documents(
            "people",
            vec![
                doc! { "_id": "a", "name": "Ann", "age": 30 },
                doc! { "_id": "b", "name": "Bob" },
            ],
        );
        let repo: Repository<Person, _> = Repository::with_collection(collection);

        let err = repo.find_all(doc! {}).await.unwrap_err();
        assert!(matches!(err, DbError::Decode(_)));
    }

    #[tokio::test]
    async fn update_overwrites_only_named_fields() {
        let repo = repository();
        repo.insert_one(&person("u1", "Ann", 30)).await.unwrap();

        repo.update_one_by_id("u1", doc! { "age": 31 }).await.unwrap();

        assert_eq!(repo.find_one_by_id("u1").await.unwrap(), person("u1", "Ann", 31));
    }

    #[tokio::test]
    async fn update_and_delete_of_missing_id_succeed() {
        let repo = repository();

        repo.update_one_by_id("ghost", doc! { "age": 1 }).await.unwrap();
        repo.delete_one_by_id("ghost").await.unwrap();

        assert!(repo.collection().is_empty().await);
    }

    #[tokio::test]
    async fn delete_then_find_is_not_found() {
        let repo = repository();
        repo.insert_one(&person("u1", "Ann", 30)).await.unwrap();

        repo.delete_one_by_id("u1").await.unwrap();

        assert!(matches!(
            repo.find_one_by_id("u1").await,
            Err(DbError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn insert_of_non_document_entity_is_encode_error() {
        let repo: Repository<String, _> =
            Repository::with_collection(InMemoryCollection::new("strings"));

        let err = repo.insert_one(&"plain".to_string()).await.unwrap_err();
        assert!(matches!(err, DbError::Encode(_)));
    }

    #[tokio::test]
    async fn duplicate_insert_error_is_passed_through() {
        let repo = repository();
        repo.insert_one(&person("u1", "Ann", 30)).await.unwrap();

        let err = repo.insert_one(&person("u1", "Other", 1)).await.unwrap_err();
        assert!(err.is_duplicate_key());
    }

    #[tokio::test]
    async fn trait_object_dispatches_to_repository() {
        let repo: Box<dyn BaseRepository<Person>> = Box::new(repository());

        repo.insert_one(&person("u1", "Ann", 30)).await.unwrap();
        repo.update_one_by_id("u1", doc! { "name": "Anna" }).await.unwrap();

        assert_eq!(repo.find_one_by_id("u1").await.unwrap().name, "Anna");
        assert_eq!(repo.find_all(doc! {}).await.unwrap().len(), 1);
        repo.delete_one_by_id("u1").await.unwrap();
        assert!(repo.find_all(doc! {}).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn clones_share_the_collection() {
        let repo = repository();
        let clone = repo.clone();

        repo.insert_one(&person("u1", "Ann", 30)).await.unwrap();

        assert_eq!(clone.find_one_by_id("u1").await.unwrap().name, "Ann");
    }
}
