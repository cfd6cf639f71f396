use serde::{Deserialize, Serialize};

/// Setting key: days a host may go unseen before its record is archived.
pub const SETTING_DAYS_BEFORE_ARCHIVE: &str = "days_inactive_before_archive";
/// Setting key: days a host may go unseen before it is deleted outright.
pub const SETTING_DAYS_BEFORE_DELETE: &str = "days_inactive_before_delete";

/// A typed attribute of a host record that parsers can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostField {
    Kernel,
    Vendor,
    Model,
    SerialNo,
    Os,
    OsEdition,
}

impl HostField {
    /// Column name in the `hostinfo` table.
    pub fn column(&self) -> &'static str {
        match self {
            HostField::Kernel => "kernel",
            HostField::Vendor => "vendor",
            HostField::Model => "model",
            HostField::SerialNo => "serialno",
            HostField::Os => "os",
            HostField::OsEdition => "os_edition",
        }
    }
}

/// A raw command-output upload from an agent, keyed by the host's
/// certificate fingerprint. A host accumulates many rows per filename over
/// time; only the latest `is_current` one is authoritative.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub fileid: i64,
    pub certfp: String,
    /// The command or file path the content came from,
    /// e.g. "/bin/uname -r" or "/etc/redhat-release".
    pub filename: String,
    pub content: String,
    /// Unix seconds at which the upload was received.
    pub received: i64,
    pub is_current: bool,
}

/// The normalized, queryable record of a host's derived attributes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostInfo {
    pub certfp: String,
    pub kernel: Option<String>,
    pub vendor: Option<String>,
    pub model: Option<String>,
    pub serialno: Option<String>,
    pub os: Option<String>,
    pub os_edition: Option<String>,
    /// Unix seconds of the newest processed upload.
    pub lastseen: i64,
}

/// Inactivity age of a host, as computed by the retention scan.
#[derive(Debug, Clone)]
pub struct HostAge {
    pub certfp: String,
    pub days_since_seen: i64,
}
