//! Error types for the storage layer.

use std::fmt::Display;

use thiserror::Error;

/// A result type using `StoreError`.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors raised by the record store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An update or delete addressed a record that does not exist.
    #[error("{kind} {id} not found")]
    NotFound {
        /// Record kind, e.g. "document".
        kind: &'static str,
        /// The ID that was looked up.
        id: String,
    },

    /// `RocksDB` rejected the operation.
    #[error("rocksdb: {0}")]
    Database(#[from] rocksdb::Error),

    /// The database was opened without a column family this build expects.
    #[error("column family {0} is missing")]
    MissingColumnFamily(String),

    /// A value could not be CBOR encoded or decoded.
    #[error("cbor: {0}")]
    Codec(String),
}

impl StoreError {
    pub(crate) fn not_found(kind: &'static str, id: impl Display) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}
