//! OS family detection over release-file text.
//!
//! An ordered list of signature rules is evaluated top to bottom and the
//! first match wins. Ordering matters: some distro strings are substrings
//! of others, so the version-qualified Red Hat rule sits below the Fedora
//! rule that folds its release number straight into the label.

use lazy_static::lazy_static;
use regex::Regex;

/// A detected OS family label and optional edition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsDetection {
    /// Family label including the major version, e.g. "Fedora 27" or
    /// "RHEL 7".
    pub os: String,
    /// Edition within the family, e.g. "Workstation"; empty when the
    /// release text carries none.
    pub edition: String,
}

impl OsDetection {
    fn new(os: String, edition: &str) -> Self {
        Self {
            os,
            edition: edition.to_string(),
        }
    }
}

type SignatureRule = fn(&str) -> Option<OsDetection>;

/// Rules in precedence order; first match wins.
const SIGNATURE_RULES: &[SignatureRule] = &[
    fedora,
    red_hat_enterprise,
    centos,
    debian,
    os_release_file,
];

/// Match release text against the signature rules. `None` means no rule
/// matched; callers commit the unknown state themselves.
pub fn detect(text: &str) -> Option<OsDetection> {
    SIGNATURE_RULES.iter().find_map(|rule| rule(text))
}

fn fedora(text: &str) -> Option<OsDetection> {
    lazy_static! {
        static ref RE: Regex = Regex::new(r"Fedora release (\d+)").unwrap();
    }
    let caps = RE.captures(text)?;
    Some(OsDetection::new(format!("Fedora {}", &caps[1]), ""))
}

fn red_hat_enterprise(text: &str) -> Option<OsDetection> {
    lazy_static! {
        static ref VERSION: Regex =
            Regex::new(r"Red Hat Enterprise Linux.* release (\d+)").unwrap();
        static ref EDITION: Regex =
            Regex::new(r"Red Hat Enterprise Linux (Workstation|Server|Client|ComputeNode)")
                .unwrap();
    }
    let caps = VERSION.captures(text)?;
    let edition = EDITION
        .captures(text)
        .map(|c| c.get(1).map_or("", |m| m.as_str()))
        .unwrap_or("");
    Some(OsDetection::new(format!("RHEL {}", &caps[1]), edition))
}

fn centos(text: &str) -> Option<OsDetection> {
    lazy_static! {
        static ref RE: Regex = Regex::new(r"CentOS(?: Linux)? release (\d+)").unwrap();
    }
    let caps = RE.captures(text)?;
    Some(OsDetection::new(format!("CentOS {}", &caps[1]), ""))
}

fn debian(text: &str) -> Option<OsDetection> {
    lazy_static! {
        static ref RE: Regex = Regex::new(r"Debian GNU/Linux (\d+)").unwrap();
    }
    let caps = RE.captures(text)?;
    Some(OsDetection::new(format!("Debian {}", &caps[1]), ""))
}

/// Structured os-release format: `ID=` and `VERSION_ID=` key/value lines,
/// values possibly quoted.
fn os_release_file(text: &str) -> Option<OsDetection> {
    let mut id = None;
    let mut version_id = None;
    for line in text.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches('"');
        match key.trim() {
            "ID" => id = Some(value),
            "VERSION_ID" => version_id = Some(value),
            _ => {}
        }
    }
    let id = id?;
    let version = version_id.unwrap_or("");
    let family = match id {
        "fedora" => "Fedora",
        "rhel" => "RHEL",
        "centos" => "CentOS",
        "debian" => "Debian",
        "ubuntu" => "Ubuntu",
        "opensuse" | "opensuse-leap" => "openSUSE",
        _ => return None,
    };
    // Debian-family labels carry the major version only
    let version = match family {
        "Ubuntu" | "openSUSE" => version,
        _ => version.split('.').next().unwrap_or(""),
    };
    if version.is_empty() {
        return None;
    }
    Some(OsDetection::new(format!("{} {}", family, version), ""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fedora_release_number_folds_into_label() {
        let detection = detect("Fedora release 27 (Twenty Seven)").unwrap();
        assert_eq!(detection.os, "Fedora 27");
        assert_eq!(detection.edition, "");
    }

    #[test]
    fn rhel_workstation_with_major_version() {
        let detection =
            detect("Red Hat Enterprise Linux Workstation release 7.4 (Maipo)").unwrap();
        assert_eq!(detection.os, "RHEL 7");
        assert_eq!(detection.edition, "Workstation");
    }

    #[test]
    fn rhel_server_edition() {
        let detection = detect("Red Hat Enterprise Linux Server release 6.9 (Santiago)").unwrap();
        assert_eq!(detection.os, "RHEL 6");
        assert_eq!(detection.edition, "Server");
    }

    #[test]
    fn rhel_without_edition() {
        let detection = detect("Red Hat Enterprise Linux release 8.1 (Ootpa)").unwrap();
        assert_eq!(detection.os, "RHEL 8");
        assert_eq!(detection.edition, "");
    }

    #[test]
    fn centos_with_and_without_linux_infix() {
        assert_eq!(detect("CentOS Linux release 7.4.1708 (Core)").unwrap().os, "CentOS 7");
        assert_eq!(detect("CentOS release 6.9 (Final)").unwrap().os, "CentOS 6");
    }

    #[test]
    fn debian_release_string() {
        assert_eq!(detect("Debian GNU/Linux 9 (stretch)").unwrap().os, "Debian 9");
    }

    #[test]
    fn ubuntu_from_os_release_keys() {
        let text = "NAME=\"Ubuntu\"\nID=ubuntu\nVERSION_ID=\"18.04\"\n";
        assert_eq!(detect(text).unwrap().os, "Ubuntu 18.04");
    }

    #[test]
    fn fedora_from_os_release_keys() {
        let text = "NAME=Fedora\nVERSION_ID=27\nID=fedora\n";
        assert_eq!(detect(text).unwrap().os, "Fedora 27");
    }

    #[test]
    fn unknown_text_matches_nothing() {
        assert!(detect("").is_none());
        assert!(detect("Totally Custom OS v9").is_none());
        assert!(detect("ID=plan9\nVERSION_ID=4").is_none());
    }

    #[test]
    fn version_qualified_rhel_rule_requires_release_number() {
        assert!(detect("Red Hat Enterprise Linux").is_none());
    }
}
