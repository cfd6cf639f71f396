use super::models::{HostAge, HostField, HostInfo, UploadedFile};
use super::schema::INVENTORY_VERSIONED_SCHEMAS;
use super::InventoryStore;
use crate::sqlite_persistence::BASE_DB_VERSION;
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::info;

pub struct SqliteInventoryStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteInventoryStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let path = db_path.as_ref();
        let is_new_db = !path.exists();

        let conn = Connection::open(path).context("Failed to open inventory database")?;
        Self::init(conn, is_new_db)
    }

    /// In-memory store for unit tests.
    #[cfg(test)]
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn, true)
    }

    fn init(conn: Connection, is_new_db: bool) -> Result<Self> {
        let latest = INVENTORY_VERSIONED_SCHEMAS.last().unwrap();
        if is_new_db {
            info!("Creating new inventory database schema");
            latest.create(&conn)?;
        } else {
            let raw_version: i64 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
            let db_version = raw_version - BASE_DB_VERSION as i64;
            let schema = INVENTORY_VERSIONED_SCHEMAS
                .iter()
                .find(|s| s.version as i64 == db_version)
                .with_context(|| format!("Unknown inventory database version {}", db_version))?;
            schema.validate(&conn).with_context(|| {
                format!(
                    "Inventory database schema validation failed for version {}",
                    db_version
                )
            })?;
        }
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn row_to_uploaded_file(row: &rusqlite::Row) -> rusqlite::Result<UploadedFile> {
        Ok(UploadedFile {
            fileid: row.get("fileid")?,
            certfp: row.get("certfp")?,
            filename: row.get("filename")?,
            content: row.get("content")?,
            received: row.get("received")?,
            is_current: row.get::<_, i64>("is_current")? != 0,
        })
    }

    fn row_to_host(row: &rusqlite::Row) -> rusqlite::Result<HostInfo> {
        Ok(HostInfo {
            certfp: row.get("certfp")?,
            kernel: row.get("kernel")?,
            vendor: row.get("vendor")?,
            model: row.get("model")?,
            serialno: row.get("serialno")?,
            os: row.get("os")?,
            os_edition: row.get("os_edition")?,
            lastseen: row.get("lastseen")?,
        })
    }
}

impl InventoryStore for SqliteInventoryStore {
    fn insert_uploaded_file(
        &self,
        certfp: &str,
        filename: &str,
        content: &str,
        received: i64,
    ) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO files (certfp, filename, content, received) VALUES (?1, ?2, ?3, ?4)",
            params![certfp, filename, content, received],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn get_uploaded_file(&self, fileid: i64) -> Result<Option<UploadedFile>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT fileid, certfp, filename, content, received, is_current
             FROM files WHERE fileid = ?1",
        )?;
        let file = stmt
            .query_row(params![fileid], Self::row_to_uploaded_file)
            .optional()?;
        Ok(file)
    }

    fn pending_file_ids(&self) -> Result<Vec<i64>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT f.fileid FROM files f
             LEFT JOIN hostinfo h ON h.certfp = f.certfp
             WHERE f.is_current = 1 AND (h.certfp IS NULL OR f.received > h.lastseen)
             ORDER BY f.received ASC, f.fileid ASC",
        )?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ids)
    }

    fn get_host(&self, certfp: &str) -> Result<Option<HostInfo>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT certfp, kernel, vendor, model, serialno, os, os_edition, lastseen
             FROM hostinfo WHERE certfp = ?1",
        )?;
        let host = stmt
            .query_row(params![certfp], Self::row_to_host)
            .optional()?;
        Ok(host)
    }

    fn ensure_host(&self, certfp: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR IGNORE INTO hostinfo (certfp, lastseen) VALUES (?1, 0)",
            params![certfp],
        )?;
        Ok(())
    }

    fn apply_host_fields(&self, certfp: &str, fields: &[(HostField, String)]) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        for (field, value) in fields {
            if value.is_empty() {
                continue;
            }
            conn.execute(
                &format!(
                    "UPDATE hostinfo SET {} = ?1 WHERE certfp = ?2",
                    field.column()
                ),
                params![value, certfp],
            )?;
        }
        Ok(())
    }

    fn clear_host_fields(&self, certfp: &str, fields: &[HostField]) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        for field in fields {
            conn.execute(
                &format!(
                    "UPDATE hostinfo SET {} = NULL WHERE certfp = ?1",
                    field.column()
                ),
                params![certfp],
            )?;
        }
        Ok(())
    }

    fn advance_lastseen(&self, certfp: &str, received: i64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE hostinfo SET lastseen = MAX(lastseen, ?1) WHERE certfp = ?2",
            params![received, certfp],
        )?;
        Ok(())
    }

    fn host_ages(&self, now: i64) -> Result<Vec<HostAge>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT certfp, (?1 - lastseen) / 86400 FROM hostinfo")?;
        let ages = stmt
            .query_map(params![now], |row| {
                Ok(HostAge {
                    certfp: row.get(0)?,
                    days_since_seen: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ages)
    }

    fn delete_host(&self, certfp: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM hostinfo WHERE certfp = ?1", params![certfp])?;
        Ok(())
    }

    fn delete_files_for_host(&self, certfp: &str) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute("DELETE FROM files WHERE certfp = ?1", params![certfp])?;
        Ok(deleted)
    }

    fn archive_files_for_host(&self, certfp: &str) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            "UPDATE files SET is_current = 0 WHERE certfp = ?1",
            params![certfp],
        )?;
        Ok(updated)
    }

    fn get_setting_int(&self, key: &str) -> Result<Option<i64>> {
        let conn = self.conn.lock().unwrap();
        let value = conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set_setting_int(&self, key: &str, value: i64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = ?2",
            params![key, value],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SqliteInventoryStore {
        SqliteInventoryStore::in_memory().unwrap()
    }

    #[test]
    fn insert_and_get_uploaded_file() {
        let store = store();
        let id = store
            .insert_uploaded_file("1234", "/bin/uname -r", "4.15.13-300.fc27.x86_64", 1000)
            .unwrap();

        let file = store.get_uploaded_file(id).unwrap().unwrap();
        assert_eq!(file.certfp, "1234");
        assert_eq!(file.filename, "/bin/uname -r");
        assert_eq!(file.content, "4.15.13-300.fc27.x86_64");
        assert_eq!(file.received, 1000);
        assert!(file.is_current);

        assert!(store.get_uploaded_file(id + 1).unwrap().is_none());
    }

    #[test]
    fn pending_selects_unprocessed_current_files_in_order() {
        let store = store();
        let late = store.insert_uploaded_file("aa", "/bin/uname -r", "x", 2000).unwrap();
        let early = store.insert_uploaded_file("aa", "/bin/uname -r", "y", 1000).unwrap();

        // No host record yet: both pending, arrival order
        assert_eq!(store.pending_file_ids().unwrap(), vec![early, late]);

        // Host seen up to 1500: only the later file remains pending
        store.ensure_host("aa").unwrap();
        store.advance_lastseen("aa", 1500).unwrap();
        assert_eq!(store.pending_file_ids().unwrap(), vec![late]);

        // Archived files are never pending
        store.archive_files_for_host("aa").unwrap();
        assert!(store.pending_file_ids().unwrap().is_empty());
    }

    #[test]
    fn apply_fields_skips_empty_values() {
        let store = store();
        store.ensure_host("aa").unwrap();
        store
            .apply_host_fields("aa", &[(HostField::Kernel, "5.1.0".to_string())])
            .unwrap();
        store
            .apply_host_fields(
                "aa",
                &[
                    (HostField::Kernel, "".to_string()),
                    (HostField::Vendor, "Dell Inc.".to_string()),
                ],
            )
            .unwrap();

        let host = store.get_host("aa").unwrap().unwrap();
        assert_eq!(host.kernel.as_deref(), Some("5.1.0"));
        assert_eq!(host.vendor.as_deref(), Some("Dell Inc."));
    }

    #[test]
    fn clear_fields_nulls_only_named_columns() {
        let store = store();
        store.ensure_host("aa").unwrap();
        store
            .apply_host_fields(
                "aa",
                &[
                    (HostField::Kernel, "5.1.0".to_string()),
                    (HostField::Os, "Fedora 27".to_string()),
                    (HostField::OsEdition, "Workstation".to_string()),
                ],
            )
            .unwrap();
        store
            .clear_host_fields("aa", &[HostField::Os, HostField::OsEdition])
            .unwrap();

        let host = store.get_host("aa").unwrap().unwrap();
        assert_eq!(host.kernel.as_deref(), Some("5.1.0"));
        assert!(host.os.is_none());
        assert!(host.os_edition.is_none());
    }

    #[test]
    fn lastseen_never_moves_backwards() {
        let store = store();
        store.ensure_host("aa").unwrap();
        store.advance_lastseen("aa", 2000).unwrap();
        store.advance_lastseen("aa", 1000).unwrap();

        let host = store.get_host("aa").unwrap().unwrap();
        assert_eq!(host.lastseen, 2000);
    }

    #[test]
    fn ensure_host_is_idempotent() {
        let store = store();
        store.ensure_host("aa").unwrap();
        store.advance_lastseen("aa", 500).unwrap();
        store.ensure_host("aa").unwrap();

        let host = store.get_host("aa").unwrap().unwrap();
        assert_eq!(host.lastseen, 500);
    }

    #[test]
    fn host_ages_in_whole_days() {
        let store = store();
        store.ensure_host("aa").unwrap();
        let now = 100 * 86400;
        store.advance_lastseen("aa", 70 * 86400).unwrap();

        let ages = store.host_ages(now).unwrap();
        assert_eq!(ages.len(), 1);
        assert_eq!(ages[0].certfp, "aa");
        assert_eq!(ages[0].days_since_seen, 30);
    }

    #[test]
    fn archive_and_delete_files() {
        let store = store();
        store.insert_uploaded_file("aa", "/bin/uname -r", "x", 1).unwrap();
        store.insert_uploaded_file("aa", "/etc/redhat-release", "y", 2).unwrap();
        store.insert_uploaded_file("bb", "/bin/uname -r", "z", 3).unwrap();

        assert_eq!(store.archive_files_for_host("aa").unwrap(), 2);
        let file = store.get_uploaded_file(1).unwrap().unwrap();
        assert!(!file.is_current);

        assert_eq!(store.delete_files_for_host("aa").unwrap(), 2);
        assert!(store.get_uploaded_file(1).unwrap().is_none());
        // Other hosts untouched
        assert!(store.get_uploaded_file(3).unwrap().is_some());
    }

    #[test]
    fn settings_roundtrip() {
        let store = store();
        assert!(store.get_setting_int("no_such_key").unwrap().is_none());

        store.set_setting_int("days_inactive_before_archive", 30).unwrap();
        store.set_setting_int("days_inactive_before_archive", 45).unwrap();
        assert_eq!(
            store.get_setting_int("days_inactive_before_archive").unwrap(),
            Some(45)
        );
    }
}
