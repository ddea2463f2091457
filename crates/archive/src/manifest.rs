//! Reading and writing of `META-INF/MANIFEST.MF`.
//!
//! Attribute names compare case-insensitively and keep the spelling they were first
//! inserted with. Output uses CRLF line endings and wraps lines at 72 bytes, with
//! `Manifest-Version` always first in the main section.

use crate::error::{ArchiveError, Result};
use indexmap::IndexMap;

pub const MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";
pub const META_INF: &str = "META-INF";

pub const MANIFEST_VERSION: &str = "Manifest-Version";
pub const MAIN_CLASS: &str = "Main-Class";
pub const CLASS_PATH: &str = "Class-Path";
pub const MULTI_RELEASE: &str = "Multi-Release";
pub const IMPLEMENTATION_TITLE: &str = "Implementation-Title";
pub const IMPLEMENTATION_VERSION: &str = "Implementation-Version";

const MAX_LINE_BYTES: usize = 72;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    entries: IndexMap<String, String>,
}

impl Attributes {
    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .keys()
            .position(|k| k.eq_ignore_ascii_case(name))
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name)
            .and_then(|i| self.entries.get_index(i))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Sets `name`, returning the previous value if there was one.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(i) => {
                let (_, slot) = self.entries.get_index_mut(i)?;
                Some(std::mem::replace(slot, value))
            }
            None => {
                self.entries.insert(name, value);
                None
            }
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        let i = self.position(name)?;
        self.entries.shift_remove_index(i).map(|(_, v)| v)
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&str, &str) -> bool) {
        self.entries.retain(|k, v| keep(k, v));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    main: Attributes,
    sections: IndexMap<String, Attributes>,
}

impl Manifest {
    pub fn new() -> Self {
        let mut manifest = Self::default();
        manifest.main.insert(MANIFEST_VERSION, "1.0");
        manifest
    }

    pub fn main_attributes(&self) -> &Attributes {
        &self.main
    }

    pub fn main_attributes_mut(&mut self) -> &mut Attributes {
        &mut self.main
    }

    pub fn section(&self, name: &str) -> Option<&Attributes> {
        self.sections.get(name)
    }

    pub fn section_mut(&mut self, name: &str) -> &mut Attributes {
        self.sections.entry(name.to_string()).or_default()
    }

    pub fn sections(&self) -> impl Iterator<Item = (&str, &Attributes)> {
        self.sections.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn retain_sections(&mut self, mut keep: impl FnMut(&str, &mut Attributes) -> bool) {
        self.sections.retain(|k, v| keep(k, v));
    }

    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let text = String::from_utf8_lossy(bytes);
        let mut manifest = Manifest::default();
        let mut section: Option<String> = None;
        let mut pending: Option<(String, String)> = None;
        let mut in_main = true;

        for (idx, line) in text.split('\n').enumerate() {
            let line = line.strip_suffix('\r').unwrap_or(line);
            if let Some(rest) = line.strip_prefix(' ') {
                let Some((_, value)) = pending.as_mut() else {
                    return Err(ArchiveError::Manifest {
                        line: idx + 1,
                        reason: "continuation line without an attribute".to_string(),
                    });
                };
                value.push_str(rest);
                continue;
            }
            if let Some((name, value)) = pending.take() {
                manifest.store(in_main, &mut section, name, value);
            }
            if line.is_empty() {
                in_main = false;
                section = None;
                continue;
            }
            let Some((name, value)) = line.split_once(':') else {
                return Err(ArchiveError::Manifest {
                    line: idx + 1,
                    reason: format!("expected 'Name: value', found '{line}'"),
                });
            };
            if !in_main && section.is_none() && !name.eq_ignore_ascii_case("Name") {
                return Err(ArchiveError::Manifest {
                    line: idx + 1,
                    reason: "section does not start with a Name attribute".to_string(),
                });
            }
            let value = value.strip_prefix(' ').unwrap_or(value);
            pending = Some((name.to_string(), value.to_string()));
        }
        if let Some((name, value)) = pending.take() {
            manifest.store(in_main, &mut section, name, value);
        }
        Ok(manifest)
    }

    fn store(&mut self, in_main: bool, section: &mut Option<String>, name: String, value: String) {
        if in_main {
            self.main.insert(name, value);
            return;
        }
        match section {
            Some(current) => {
                self.section_mut(current).insert(name, value);
            }
            None => {
                self.section_mut(&value);
                *section = Some(value);
            }
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        let version = self.main.get(MANIFEST_VERSION).unwrap_or("1.0");
        write_line(&mut out, MANIFEST_VERSION, version);
        for (name, value) in self.main.iter() {
            if !name.eq_ignore_ascii_case(MANIFEST_VERSION) {
                write_line(&mut out, name, value);
            }
        }
        out.extend_from_slice(b"\r\n");
        for (section, attributes) in &self.sections {
            write_line(&mut out, "Name", section);
            for (name, value) in attributes.iter() {
                write_line(&mut out, name, value);
            }
            out.extend_from_slice(b"\r\n");
        }
        out
    }
}

fn write_line(out: &mut Vec<u8>, name: &str, value: &str) {
    let line = format!("{name}: {value}");
    let mut rest = line.as_str();
    let mut limit = MAX_LINE_BYTES;
    let mut first = true;
    while !rest.is_empty() {
        if !first {
            out.push(b' ');
        }
        let mut cut = rest.len().min(limit);
        while !rest.is_char_boundary(cut) {
            cut -= 1;
        }
        out.extend_from_slice(rest[..cut].as_bytes());
        out.extend_from_slice(b"\r\n");
        rest = &rest[cut..];
        first = false;
        limit = MAX_LINE_BYTES - 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_first_and_crlf() {
        let mut manifest = Manifest::default();
        manifest.main_attributes_mut().insert(MAIN_CLASS, "org.acme.Main");
        manifest.main_attributes_mut().insert(MANIFEST_VERSION, "1.0");

        let text = String::from_utf8(manifest.to_bytes()).unwrap();
        assert_eq!(text, "Manifest-Version: 1.0\r\nMain-Class: org.acme.Main\r\n\r\n");
    }

    #[test]
    fn test_long_values_wrap_and_parse_back() {
        let class_path: Vec<String> = (0..20).map(|i| format!("lib/org.acme.lib-{i}-1.0.jar")).collect();
        let class_path = class_path.join(" ");
        let mut manifest = Manifest::new();
        manifest.main_attributes_mut().insert(CLASS_PATH, class_path.clone());

        let bytes = manifest.to_bytes();
        for line in String::from_utf8(bytes.clone()).unwrap().split("\r\n") {
            assert!(line.len() <= 72, "line too long: {line}");
        }
        let parsed = Manifest::parse(&bytes).unwrap();
        assert_eq!(parsed.main_attributes().get("class-path"), Some(class_path.as_str()));
    }

    #[test]
    fn test_parse_sections() {
        let text = "Manifest-Version: 1.0\nCreated-By: hand\n\nName: org/acme/Foo.class\nSHA-256-Digest: abc=\n\n";
        let manifest = Manifest::parse(text.as_bytes()).unwrap();
        assert_eq!(manifest.main_attributes().get("created-by"), Some("hand"));
        let section = manifest.section("org/acme/Foo.class").unwrap();
        assert_eq!(section.get("SHA-256-Digest"), Some("abc="));
    }

    #[test]
    fn test_insert_is_case_insensitive() {
        let mut attrs = Attributes::default();
        attrs.insert("Main-Class", "a.A");
        let previous = attrs.insert("MAIN-CLASS", "b.B");
        assert_eq!(previous.as_deref(), Some("a.A"));
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs.iter().next(), Some(("Main-Class", "b.B")));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Manifest::parse(b"not an attribute\n").is_err());
        assert!(Manifest::parse(b" leading continuation\n").is_err());
    }
}
