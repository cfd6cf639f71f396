use super::FileParser;
use crate::inventory_store::HostField;

/// Parser for `dmidecode` hardware dumps.
///
/// The output is "Key: Value" lines, indented under non-indented section
/// headers. Vendor, model and serial number are taken from the
/// "System Information" section only: other sections (base board, chassis)
/// carry identically-named keys that must not win.
pub struct DmidecodeParser;

const SYSTEM_SECTION: &str = "System Information";

impl FileParser for DmidecodeParser {
    fn fields(&self, _label: &str, content: &str) -> Vec<(HostField, String)> {
        let mut fields = Vec::new();
        let mut section = "";

        for line in content.lines() {
            if line.is_empty() {
                continue;
            }
            let indented = line.starts_with(' ') || line.starts_with('\t');
            if !indented {
                // Section headers, "Handle ..." lines and the dmidecode
                // banner are all non-indented; each one changes the
                // current section.
                section = line.trim_end();
                continue;
            }
            if section != SYSTEM_SECTION {
                continue;
            }
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim();
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            match key {
                "Manufacturer" => fields.push((HostField::Vendor, value.to_string())),
                "Product Name" => fields.push((HostField::Model, value.to_string())),
                "Serial Number" => fields.push((HostField::SerialNo, value.to_string())),
                _ => {}
            }
        }
        fields
    }
}
