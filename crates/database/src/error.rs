use mongodb::bson;
use mongodb::error::{CommandError, ErrorKind, WriteError, WriteFailure};
use thiserror::Error;

// Server error codes for a unique index violation.
const DUPLICATE_KEY_CODES: [i32; 3] = [11000, 11001, 12582];

// BadValue, FailedToParse, TypeMismatch, ImmutableField.
const INVALID_QUERY_CODES: [i32; 4] = [2, 9, 14, 66];

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Failed to load environment variables for database connection: {0}")]
    ConnectionConfigError(String),

    /// Anything the driver reports: connection, authentication, write and
    /// query failures all arrive here untouched.
    #[error("Database driver error: {0}")]
    Driver(#[from] mongodb::error::Error),

    #[error("Failed to encode entity as a BSON document: {0}")]
    Encode(#[from] bson::ser::Error),

    #[error("Failed to decode BSON document into the entity type: {0}")]
    Decode(#[from] bson::de::Error),

    #[error("No document with _id `{0}` was found in the collection.")]
    NotFound(String),

    #[error("A document with _id `{0}` already exists in the collection.")]
    DuplicateKey(String),

    #[error("Invalid query or update document: {0}")]
    InvalidQuery(String),
}

impl DbError {
    /// True for both the "no such document" and "document did not decode"
    /// outcomes of a single-document lookup.
    pub fn is_lookup_failure(&self) -> bool {
        matches!(self, DbError::NotFound(_) | DbError::Decode(_))
    }

    /// True when an insert or update collided with an existing `_id` or
    /// another unique index, whichever backend reported it.
    pub fn is_duplicate_key(&self) -> bool {
        match self {
            DbError::DuplicateKey(_) => true,
            DbError::Driver(e) => server_code(e).is_some_and(|c| DUPLICATE_KEY_CODES.contains(&c)),
            _ => false,
        }
    }

    /// True when the server refused a filter or update document as malformed.
    pub fn is_invalid_query(&self) -> bool {
        match self {
            DbError::InvalidQuery(_) => true,
            DbError::Driver(e) => server_code(e).is_some_and(|c| INVALID_QUERY_CODES.contains(&c)),
            _ => false,
        }
    }
}

fn server_code(error: &mongodb::error::Error) -> Option<i32> {
    match error.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(WriteError { code, .. })) => Some(*code),
        ErrorKind::Command(CommandError { code, .. }) => Some(*code),
        _ => None,
    }
}
