mod models;
mod schema;
mod sqlite_inventory_store;

pub use models::*;
pub use schema::INVENTORY_VERSIONED_SCHEMAS;
pub use sqlite_inventory_store::SqliteInventoryStore;

use anyhow::Result;

/// Storage for uploaded command output, derived host records and the
/// externally-owned settings table.
///
/// All mutations are single auto-committing statements; batch callers are
/// expected to tolerate partial completion and retry on their next run.
pub trait InventoryStore: Send + Sync {
    // Upload boundary. Rows are produced by the external ingestion
    // endpoint; this crate only consumes them (and flips `is_current`
    // when a host is archived).
    fn insert_uploaded_file(
        &self,
        certfp: &str,
        filename: &str,
        content: &str,
        received: i64,
    ) -> Result<i64>;
    fn get_uploaded_file(&self, fileid: i64) -> Result<Option<UploadedFile>>;

    /// Ids of current files not yet reflected in their host's record:
    /// received after the host's lastseen, or belonging to a host with no
    /// record at all. Ordered by arrival.
    fn pending_file_ids(&self) -> Result<Vec<i64>>;

    // Host records.
    fn get_host(&self, certfp: &str) -> Result<Option<HostInfo>>;
    /// Create an empty host record if none exists yet.
    fn ensure_host(&self, certfp: &str) -> Result<()>;
    /// Overwrite the given fields. Empty values are skipped: absence of a
    /// signal never nulls out previously known data.
    fn apply_host_fields(&self, certfp: &str, fields: &[(HostField, String)]) -> Result<()>;
    /// Null out the given fields (used to reset OS labels before
    /// re-detection).
    fn clear_host_fields(&self, certfp: &str, fields: &[HostField]) -> Result<()>;
    /// Move lastseen forward to `received`; never backwards.
    fn advance_lastseen(&self, certfp: &str, received: i64) -> Result<()>;

    // Retention.
    fn host_ages(&self, now: i64) -> Result<Vec<HostAge>>;
    fn delete_host(&self, certfp: &str) -> Result<()>;
    fn delete_files_for_host(&self, certfp: &str) -> Result<usize>;
    /// Mark all of a host's files as no longer current. Returns the number
    /// of rows touched.
    fn archive_files_for_host(&self, certfp: &str) -> Result<usize>;

    // Settings are owned by an external tool; the core only reads them.
    // The setter exists for that owner (and for tests).
    fn get_setting_int(&self, key: &str) -> Result<Option<i64>>;
    fn set_setting_int(&self, key: &str, value: i64) -> Result<()>;
}
