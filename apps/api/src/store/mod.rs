//! Remote table store: whole-file reads and writes of the contact table.
//!
//! The table is persisted as CSV with the header `name,street,postal_code,city,lat,lon`.
//! Missing coordinates are empty cells.
//!
//! Every read hands back the store's version tag for the file, and every write names
//! the version it was based on. A write based on anything but the current version is
//! rejected with [`StoreError::Conflict`].

use async_trait::async_trait;
use csv::{ReaderBuilder, WriterBuilder};
use thiserror::Error;

use crate::models::contact::{Contact, ContactTable, COLUMNS};
use crate::upstream::ServiceError;

pub mod github;
#[cfg(test)]
pub mod memory;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("{path} was changed by another writer")]
    Conflict { path: String },

    #[error("Store API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Stored file is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A table as read from the store, tagged with the version it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionedTable {
    pub table: ContactTable,
    pub version: String,
}

/// Whole-file access to a table kept in a remote repository.
#[async_trait]
pub trait TableStore: Send + Sync {
    async fn file_exists(&self, path: &str) -> Result<bool, StoreError>;

    async fn read_table(&self, path: &str) -> Result<VersionedTable, StoreError>;

    /// Overwrites `path` with the full table and returns the new version.
    ///
    /// `expected` is the version the caller last read or wrote, or `None` if it saw
    /// no file. `message` labels the change in the store's history.
    async fn write_table(
        &self,
        path: &str,
        table: &ContactTable,
        expected: Option<&str>,
        message: &str,
    ) -> Result<String, StoreError>;
}

/// Serializes the table as CSV. The header row is written even for an empty table.
pub fn encode_table(table: &ContactTable) -> Result<Vec<u8>, StoreError> {
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(vec![]);
    writer.write_record(COLUMNS)?;
    for contact in table.rows() {
        writer.serialize(contact)?;
    }
    writer.into_inner().map_err(|e| StoreError::Io(e.into_error()))
}

/// Parses CSV into a table. Columns are matched by header name; unknown columns
/// (e.g. an index column) are ignored.
pub fn decode_table(bytes: &[u8]) -> Result<ContactTable, StoreError> {
    let mut reader = ReaderBuilder::new().trim(csv::Trim::Fields).from_reader(bytes);
    let rows = reader
        .deserialize::<Contact>()
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ContactTable::from_rows(rows))
}
