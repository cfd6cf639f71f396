use super::FileParser;
use crate::inventory_store::HostField::{self, Os, OsEdition};
use crate::os_detection;

/// Parser for OS release files (`/etc/redhat-release`, `/etc/os-release`).
///
/// Delegates signature matching to [`os_detection`]. Declares OS fields as
/// resets: the orchestrator clears them before this parser runs, so an
/// upload that matches no signature leaves the host in an explicit
/// unknown state instead of keeping a stale label.
pub struct OsReleaseParser;

impl FileParser for OsReleaseParser {
    fn fields(&self, _label: &str, content: &str) -> Vec<(HostField, String)> {
        match os_detection::detect(content) {
            Some(detection) => vec![(Os, detection.os), (OsEdition, detection.edition)],
            None => Vec::new(),
        }
    }

    fn resets(&self) -> &'static [HostField] {
        &[Os, OsEdition]
    }
}
