//! Parsers for raw command output uploaded by agents.
//!
//! Each parser is a pure, total function over the uploaded text: malformed
//! or empty input yields no fields, never an error. Dispatch from a
//! filename/command label to a parser goes through [`ParserRegistry`],
//! an ordered pattern list where the first match wins.

mod dmidecode;
mod kernel;
mod os_release;

pub use dmidecode::DmidecodeParser;
pub use kernel::KernelParser;
pub use os_release::OsReleaseParser;

use crate::inventory_store::HostField;
use std::sync::Arc;

pub trait FileParser: Send + Sync {
    /// Extract typed host fields from raw content. Pure and total.
    fn fields(&self, label: &str, content: &str) -> Vec<(HostField, String)>;

    /// Fields the orchestrator must clear before applying this parser's
    /// output, so that a re-parse which finds nothing cannot leave a
    /// previous run's value behind.
    fn resets(&self) -> &'static [HostField] {
        &[]
    }
}

/// How a registry entry matches an uploaded file's label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelPattern {
    Exact(&'static str),
    Prefix(&'static str),
}

impl LabelPattern {
    fn matches(&self, label: &str) -> bool {
        match self {
            LabelPattern::Exact(s) => label == *s,
            LabelPattern::Prefix(s) => label.starts_with(s),
        }
    }
}

/// Ordered mapping from label patterns to parsers. Entries are evaluated
/// top to bottom; register more specific patterns first.
pub struct ParserRegistry {
    entries: Vec<(LabelPattern, Arc<dyn FileParser>)>,
}

impl ParserRegistry {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// The registry used in production: uname output, dmidecode dumps and
    /// OS release files.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(LabelPattern::Prefix("/bin/uname"), Arc::new(KernelParser));
        registry.register(
            LabelPattern::Prefix("/usr/sbin/dmidecode"),
            Arc::new(DmidecodeParser),
        );
        registry.register(
            LabelPattern::Exact("/etc/redhat-release"),
            Arc::new(OsReleaseParser),
        );
        registry.register(
            LabelPattern::Exact("/etc/os-release"),
            Arc::new(OsReleaseParser),
        );
        registry
    }

    pub fn register(&mut self, pattern: LabelPattern, parser: Arc<dyn FileParser>) {
        self.entries.push((pattern, parser));
    }

    pub fn lookup(&self, label: &str) -> Option<&dyn FileParser> {
        self.entries
            .iter()
            .find(|(pattern, _)| pattern.matches(label))
            .map(|(_, parser)| parser.as_ref())
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
