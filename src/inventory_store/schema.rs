//! SQLite schema for the inventory database: uploaded files, derived host
//! records and the externally-owned settings table.

use crate::sqlite_column;
use crate::sqlite_persistence::{Column, SqlType, Table, VersionedSchema};

/// Raw uploads of command output, one row per received file.
const FILES_TABLE_V1: Table = Table {
    name: "files",
    columns: &[
        sqlite_column!("fileid", &SqlType::Integer, is_primary_key = true), // AUTOINCREMENT
        sqlite_column!("certfp", &SqlType::Text, non_null = true),
        sqlite_column!("filename", &SqlType::Text, non_null = true),
        sqlite_column!("content", &SqlType::Text, non_null = true),
        sqlite_column!("received", &SqlType::Integer, non_null = true),
        sqlite_column!(
            "is_current",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("1")
        ),
    ],
    indices: &[
        ("idx_files_certfp", "certfp"),
        ("idx_files_current_received", "is_current, received"),
    ],
};

/// One row per host identity, holding derived attributes.
const HOSTINFO_TABLE_V1: Table = Table {
    name: "hostinfo",
    columns: &[
        sqlite_column!("certfp", &SqlType::Text, is_primary_key = true),
        sqlite_column!("kernel", &SqlType::Text),
        sqlite_column!("vendor", &SqlType::Text),
        sqlite_column!("model", &SqlType::Text),
        sqlite_column!("serialno", &SqlType::Text),
        sqlite_column!("os", &SqlType::Text),
        sqlite_column!("os_edition", &SqlType::Text),
        sqlite_column!("lastseen", &SqlType::Integer, non_null = true),
    ],
    indices: &[("idx_hostinfo_lastseen", "lastseen")],
};

/// Key -> integer settings (retention thresholds). Owned by an external
/// tool; read-only to this server.
const SETTINGS_TABLE_V1: Table = Table {
    name: "settings",
    columns: &[
        sqlite_column!("key", &SqlType::Text, is_primary_key = true),
        sqlite_column!("value", &SqlType::Integer, non_null = true),
    ],
    indices: &[],
};

pub const INVENTORY_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 1,
    tables: &[FILES_TABLE_V1, HOSTINFO_TABLE_V1, SETTINGS_TABLE_V1],
    migration: None,
}];

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn schema_creates_and_validates() {
        let conn = Connection::open_in_memory().unwrap();
        let schema = INVENTORY_VERSIONED_SCHEMAS.last().unwrap();
        schema.create(&conn).unwrap();
        schema.validate(&conn).unwrap();
    }

    #[test]
    fn files_indices_created() {
        let conn = Connection::open_in_memory().unwrap();
        INVENTORY_VERSIONED_SCHEMAS[0].create(&conn).unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='index' AND tbl_name='files'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn is_current_defaults_to_true() {
        let conn = Connection::open_in_memory().unwrap();
        INVENTORY_VERSIONED_SCHEMAS[0].create(&conn).unwrap();

        conn.execute(
            "INSERT INTO files (certfp, filename, content, received) VALUES ('aa', '/bin/uname -r', 'x', 1)",
            [],
        )
        .unwrap();
        let is_current: i64 = conn
            .query_row("SELECT is_current FROM files WHERE certfp='aa'", [], |r| {
                r.get(0)
            })
            .unwrap();
        assert_eq!(is_current, 1);
    }
}
