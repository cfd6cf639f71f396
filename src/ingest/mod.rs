//! Orchestration of uploaded-file parsing into host records.

use crate::inventory_store::InventoryStore;
use crate::parsers::ParserRegistry;
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, warn};

/// Reads uploaded files, dispatches them to the matching parser and merges
/// the results into the host record.
pub struct FileIngestor {
    store: Arc<dyn InventoryStore>,
    registry: ParserRegistry,
}

impl FileIngestor {
    pub fn new(store: Arc<dyn InventoryStore>) -> Self {
        Self::with_registry(store, ParserRegistry::with_defaults())
    }

    pub fn with_registry(store: Arc<dyn InventoryStore>, registry: ParserRegistry) -> Self {
        Self { store, registry }
    }

    /// Parse a single uploaded file into its host's record.
    ///
    /// A missing row or an unrecognized label is a skip, not an error.
    /// Fields the parser declares as resets are cleared before its output
    /// is applied, so a parse that yields nothing leaves those fields in
    /// an explicit empty state; all other fields keep their previous
    /// values.
    pub fn parse_file(&self, fileid: i64) -> Result<()> {
        let Some(file) = self.store.get_uploaded_file(fileid)? else {
            debug!("File {} no longer exists, skipping", fileid);
            return Ok(());
        };
        let Some(parser) = self.registry.lookup(&file.filename) else {
            debug!("No parser for label {:?}, skipping", file.filename);
            return Ok(());
        };

        self.store.ensure_host(&file.certfp)?;

        let resets = parser.resets();
        if !resets.is_empty() {
            self.store.clear_host_fields(&file.certfp, resets)?;
        }

        let fields = parser.fields(&file.filename, &file.content);
        self.store.apply_host_fields(&file.certfp, &fields)?;
        self.store.advance_lastseen(&file.certfp, file.received)?;
        Ok(())
    }

    /// Parse every current file not yet reflected in its host's record, in
    /// arrival order. One file failing does not abort the batch; a failure
    /// to list pending files does (the next run retries, upserts are
    /// idempotent). Returns the number of files parsed.
    pub fn parse_pending(&self) -> Result<usize> {
        let ids = self.store.pending_file_ids()?;
        let mut parsed = 0;
        for fileid in ids {
            match self.parse_file(fileid) {
                Ok(()) => parsed += 1,
                Err(e) => warn!("Failed to parse file {}: {:#}", fileid, e),
            }
        }
        Ok(parsed)
    }
}
