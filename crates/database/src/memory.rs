//! An in-process stand-in for a driver collection.
//!
//! `InMemoryCollection` keeps documents in insertion order and evaluates the
//! subset of the query language the repository relies on: field equality,
//! the comparison operators and `$set` updates. It is the simulated backend
//! for tests and local experiments; it makes no attempt at indexing or at the
//! rest of the query language.

use crate::collection::{DocumentCollection, DocumentStream, UpdateOutcome};
use crate::error::DbError;
use async_trait::async_trait;
use futures::StreamExt;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{Bson, Document};
use std::cmp::Ordering;
use std::sync::Arc;
use tokio::sync::RwLock;

// What a missing field reads as in a filter.
static NULL: Bson = Bson::Null;

/// A cheap-to-clone handle to a shared, in-memory list of documents.
///
/// Clones see the same documents, the way two driver handles to the same
/// collection would.
#[derive(Debug, Clone)]
pub struct InMemoryCollection {
    name: Arc<str>,
    documents: Arc<RwLock<Vec<Document>>>,
}

impl InMemoryCollection {
    pub fn new(name: &str) -> Self {
        Self::with_documents(name, Vec::new())
    }

    /// Seeds the collection as-is, without `_id` assignment or duplicate checks.
    pub fn with_documents(name: &str, documents: Vec<Document>) -> Self {
        Self {
            name: Arc::from(name),
            documents: Arc::new(RwLock::new(documents)),
        }
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

#[async_trait]
impl DocumentCollection for InMemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn insert_one(&self, mut document: Document) -> Result<(), DbError> {
        let mut documents = self.documents.write().await;

        let id = match document.get("_id") {
            Some(id) => id.clone(),
            None => {
                let id = Bson::ObjectId(ObjectId::new());
                let mut with_id = Document::new();
                with_id.insert("_id", id.clone());
                for (key, value) in document {
                    with_id.insert(key, value);
                }
                document = with_id;
                id
            }
        };

        if documents
            .iter()
            .any(|existing| existing.get("_id").is_some_and(|other| values_equal(other, &id)))
        {
            tracing::warn!(collection = %self.name, %id, "Rejected insert of a duplicate _id.");
            return Err(DbError::DuplicateKey(display_id(&id)));
        }

        documents.push(document);
        Ok(())
    }

    async fn find_one(&self, filter: Document) -> Result<Option<Document>, DbError> {
        validate_filter(&filter)?;
        let documents = self.documents.read().await;
        for document in documents.iter() {
            if matches(document, &filter)? {
                return Ok(Some(document.clone()));
            }
        }
        Ok(None)
    }

    async fn find(&self, filter: Document) -> Result<DocumentStream, DbError> {
        validate_filter(&filter)?;
        let documents = self.documents.read().await;
        let mut found = Vec::new();
        for document in documents.iter() {
            if matches(document, &filter)? {
                found.push(Ok(document.clone()));
            }
        }
        Ok(futures::stream::iter(found).boxed())
    }

    async fn update_one(&self, filter: Document, update: Document) -> Result<UpdateOutcome, DbError> {
        validate_filter(&filter)?;
        let assignments = set_operations(&update)?;

        let mut documents = self.documents.write().await;
        let mut target = None;
        for (index, document) in documents.iter().enumerate() {
            if matches(document, &filter)? {
                target = Some(index);
                break;
            }
        }
        let Some(index) = target else {
            return Ok(UpdateOutcome::default());
        };

        let mut updated = documents[index].clone();
        for (path, value) in assignments {
            if path == "_id" && updated.get("_id") != Some(value) {
                return Err(DbError::InvalidQuery(
                    "the _id field is immutable and cannot be updated".to_string(),
                ));
            }
            set_path(&mut updated, path, value.clone())?;
        }

        let modified = updated != documents[index];
        documents[index] = updated;
        Ok(UpdateOutcome {
            matched: 1,
            modified: u64::from(modified),
        })
    }

    async fn delete_one(&self, filter: Document) -> Result<u64, DbError> {
        validate_filter(&filter)?;
        let mut documents = self.documents.write().await;
        let mut target = None;
        for (index, document) in documents.iter().enumerate() {
            if matches(document, &filter)? {
                target = Some(index);
                break;
            }
        }
        match target {
            Some(index) => {
                documents.remove(index);
                Ok(1)
            }
            None => Ok(0),
        }
    }
}

/// Rejects unknown operators even when there is nothing to match against.
fn validate_filter(filter: &Document) -> Result<(), DbError> {
    // `matches` evaluates every condition, so an empty document visits them all.
    matches(&Document::new(), filter).map(|_| ())
}

fn matches(document: &Document, filter: &Document) -> Result<bool, DbError> {
    let mut matched = true;
    for (field, condition) in filter {
        if field.starts_with('$') {
            return Err(DbError::InvalidQuery(format!(
                "unsupported top-level operator `{field}`"
            )));
        }
        let value = lookup(document, field).unwrap_or(&NULL);
        let field_matched = match condition {
            Bson::Document(operators) if is_operator_document(operators) => {
                let mut all = true;
                for (operator, operand) in operators {
                    all &= apply_operator(operator, value, operand)?;
                }
                all
            }
            expected => values_equal(value, expected),
        };
        matched &= field_matched;
    }
    Ok(matched)
}

fn is_operator_document(document: &Document) -> bool {
    document.keys().next().is_some_and(|key| key.starts_with('$'))
}

fn apply_operator(operator: &str, value: &Bson, operand: &Bson) -> Result<bool, DbError> {
    let ordering = || compare(value, operand);
    let matched = match operator {
        "$eq" => values_equal(value, operand),
        "$ne" => !values_equal(value, operand),
        "$gt" => ordering() == Some(Ordering::Greater),
        "$gte" => matches!(ordering(), Some(Ordering::Greater | Ordering::Equal)),
        "$lt" => ordering() == Some(Ordering::Less),
        "$lte" => matches!(ordering(), Some(Ordering::Less | Ordering::Equal)),
        "$in" => match operand {
            Bson::Array(candidates) => candidates.iter().any(|c| values_equal(value, c)),
            _ => {
                return Err(DbError::InvalidQuery("$in needs an array".to_string()));
            }
        },
        other => {
            return Err(DbError::InvalidQuery(format!("unsupported operator `{other}`")));
        }
    };
    Ok(matched)
}

/// Resolves a dotted path through nested documents.
fn lookup<'a>(document: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let mut current = document.get(segments.next()?)?;
    for segment in segments {
        current = match current {
            Bson::Document(inner) => inner.get(segment)?,
            _ => return None,
        };
    }
    Some(current)
}

fn set_path(document: &mut Document, path: &str, value: Bson) -> Result<(), DbError> {
    match path.split_once('.') {
        None => {
            document.insert(path, value);
            Ok(())
        }
        Some((head, rest)) => {
            if !document.contains_key(head) {
                document.insert(head, Document::new());
            }
            match document.get_mut(head) {
                Some(Bson::Document(inner)) => set_path(inner, rest, value),
                _ => Err(DbError::InvalidQuery(format!(
                    "cannot create field `{rest}` inside non-document field `{head}`"
                ))),
            }
        }
    }
}

/// Pulls the field assignments out of an update document.
///
/// Only `$set` is understood, which is the only operator the repository
/// emits.
fn set_operations(update: &Document) -> Result<Vec<(&str, &Bson)>, DbError> {
    if update.is_empty() {
        return Err(DbError::InvalidQuery("update document is empty".to_string()));
    }
    let mut assignments = Vec::new();
    for (operator, fields) in update {
        match (operator.as_str(), fields) {
            ("$set", Bson::Document(fields)) => {
                assignments.extend(fields.iter().map(|(k, v)| (k.as_str(), v)));
            }
            ("$set", _) => {
                return Err(DbError::InvalidQuery("$set needs a document".to_string()));
            }
            (other, _) if other.starts_with('$') => {
                return Err(DbError::InvalidQuery(format!(
                    "unsupported update operator `{other}`"
                )));
            }
            (field, _) => {
                return Err(DbError::InvalidQuery(format!(
                    "update document must only contain operators, found `{field}`"
                )));
            }
        }
    }
    Ok(assignments)
}

#[derive(Debug, Clone, Copy)]
enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn as_f64(self) -> f64 {
        match self {
            Number::Int(n) => n as f64,
            Number::Float(n) => n,
        }
    }
}

fn as_number(value: &Bson) -> Option<Number> {
    match value {
        Bson::Int32(n) => Some(Number::Int(i64::from(*n))),
        Bson::Int64(n) => Some(Number::Int(*n)),
        Bson::Double(n) => Some(Number::Float(*n)),
        _ => None,
    }
}

/// Integers compare exactly; a double on either side compares as `f64`.
fn compare_numbers(left: Number, right: Number) -> Option<Ordering> {
    match (left, right) {
        (Number::Int(l), Number::Int(r)) => Some(l.cmp(&r)),
        (l, r) => l.as_f64().partial_cmp(&r.as_f64()),
    }
}

fn values_equal(left: &Bson, right: &Bson) -> bool {
    match (as_number(left), as_number(right)) {
        (Some(l), Some(r)) => compare_numbers(l, r) == Some(Ordering::Equal),
        _ => left == right,
    }
}

/// Orders values of the same kind; mixed kinds never compare.
fn compare(left: &Bson, right: &Bson) -> Option<Ordering> {
    if let (Some(l), Some(r)) = (as_number(left), as_number(right)) {
        return compare_numbers(l, r);
    }
    match (left, right) {
        (Bson::String(l), Bson::String(r)) => Some(l.cmp(r)),
        (Bson::DateTime(l), Bson::DateTime(r)) => Some(l.cmp(r)),
        (Bson::Boolean(l), Bson::Boolean(r)) => Some(l.cmp(r)),
        (Bson::ObjectId(l), Bson::ObjectId(r)) => Some(l.cmp(r)),
        _ => None,
    }
}

fn display_id(id: &Bson) -> String {
    match id {
        Bson::String(s) => s.clone(),
        other => other.to_string(),
    }
}
