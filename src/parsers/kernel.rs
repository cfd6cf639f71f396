use super::FileParser;
use crate::inventory_store::HostField;

/// Parser for `uname` output: the whole trimmed content is the kernel
/// version.
pub struct KernelParser;

impl FileParser for KernelParser {
    fn fields(&self, _label: &str, content: &str) -> Vec<(HostField, String)> {
        let kernel = content.trim();
        if kernel.is_empty() {
            return Vec::new();
        }
        vec![(HostField::Kernel, kernel.to_string())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_trimmed_output_is_the_kernel() {
        let fields = KernelParser.fields("/bin/uname -r", "4.15.13-300.fc27.x86_64\n");
        assert_eq!(
            fields,
            vec![(HostField::Kernel, "4.15.13-300.fc27.x86_64".to_string())]
        );
    }

    #[test]
    fn empty_output_yields_nothing() {
        assert!(KernelParser.fields("/bin/uname -r", "").is_empty());
        assert!(KernelParser.fields("/bin/uname -r", "  \n ").is_empty());
    }
}
