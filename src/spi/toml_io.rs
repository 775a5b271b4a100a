//! `pom.toml` reading and writing.
//!
//! Documents are decoded with `serde` + `toml`. The decoder does not report where
//! values came from, so a line scanner builds the provenance map separately: every
//! table header and `key = value` line is recorded under its field path, with array
//! tables indexed (`profiles[1].activation.jdk`).

use std::collections::{BTreeMap, HashMap};

use super::DocumentIo;
use crate::core::{InputLocation, PomrError};
use crate::model::{Document, DocumentSource};

/// Reads documents from the file system as TOML.
#[derive(Debug, Clone, Copy, Default)]
pub struct TomlDocumentIo;

impl TomlDocumentIo {
    /// Create the reader.
    pub fn new() -> Self {
        Self
    }

    /// Decode document text on behalf of `source`.
    ///
    /// # Errors
    ///
    /// Returns [`PomrError::ReadFailure`] when the text is not a valid document.
    pub fn parse(&self, text: &str, source: &DocumentSource) -> Result<Document, PomrError> {
        let mut document: Document =
            toml::from_str(text).map_err(|e| PomrError::ReadFailure {
                location: source.location().to_string(),
                reason: e.to_string(),
            })?;
        document.locations = scan_locations(text, source.location());
        document.pom_path = source.path().map(std::path::Path::to_path_buf);
        Ok(document)
    }
}

impl DocumentIo for TomlDocumentIo {
    fn read(&self, source: &DocumentSource) -> Result<Document, PomrError> {
        let path = source.path().ok_or_else(|| PomrError::ReadFailure {
            location: source.location().to_string(),
            reason: "source has no file-system path".to_string(),
        })?;
        let text = std::fs::read_to_string(path).map_err(|e| PomrError::ReadFailure {
            location: source.location().to_string(),
            reason: e.to_string(),
        })?;
        self.parse(&text, source)
    }

    fn write(&self, document: &Document) -> Result<String, PomrError> {
        toml::to_string_pretty(document).map_err(|e| PomrError::Other {
            message: format!("Failed to serialize {}: {e}", document.id()),
        })
    }
}

fn unquote(key: &str) -> String {
    let key = key.trim();
    key.strip_prefix('"')
        .and_then(|k| k.strip_suffix('"'))
        .or_else(|| key.strip_prefix('\'').and_then(|k| k.strip_suffix('\'')))
        .unwrap_or(key)
        .to_string()
}

/// Split a header like `profiles."a.b".activation` at unquoted dots.
fn split_dotted(text: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    for c in text.chars() {
        match (quote, c) {
            (None, '"' | '\'') => {
                quote = Some(c);
                current.push(c);
            }
            (Some(q), c) if c == q => {
                quote = None;
                current.push(c);
            }
            (None, '.') => parts.push(unquote(&std::mem::take(&mut current))),
            _ => current.push(c),
        }
    }
    parts.push(unquote(&current));
    parts
}

/// Position of the first `=` outside quotes.
fn assignment(line: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, c) in line.char_indices() {
        match (quote, c) {
            (None, '"' | '\'') => quote = Some(c),
            (Some(q), c) if c == q => quote = None,
            (None, '=') => return Some(i),
            _ => {}
        }
    }
    None
}

fn resolve_header(parts: &[String], is_array: bool, counts: &mut HashMap<String, usize>) -> String {
    let mut path = String::new();
    for (i, part) in parts.iter().enumerate() {
        if !path.is_empty() {
            path.push('.');
        }
        path.push_str(part);
        let last = i + 1 == parts.len();
        if last && is_array {
            let next = counts.entry(path.clone()).or_insert(0);
            let index = *next;
            *next += 1;
            path = format!("{path}[{index}]");
        } else if let Some(count) = counts.get(&path) {
            path = format!("{path}[{}]", count.saturating_sub(1));
        }
    }
    path
}

/// Field path → location for every header and key line of a TOML text.
pub fn scan_locations(text: &str, source: &str) -> BTreeMap<String, InputLocation> {
    let mut locations = BTreeMap::new();
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut table = String::new();

    for (number, raw_line) in text.lines().enumerate() {
        let line_number = number + 1;
        let trimmed = raw_line.trim_start();
        let column = raw_line.len() - trimmed.len() + 1;
        let trimmed = trimmed.trim_end();

        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        if let Some(inner) = trimmed.strip_prefix("[[").and_then(|l| l.split("]]").next()) {
            table = resolve_header(&split_dotted(inner.trim()), true, &mut counts);
            locations.insert(table.clone(), InputLocation::at(source, line_number, column));
            continue;
        }
        if let Some(inner) = trimmed.strip_prefix('[').and_then(|l| l.split(']').next()) {
            table = resolve_header(&split_dotted(inner.trim()), false, &mut counts);
            locations.insert(table.clone(), InputLocation::at(source, line_number, column));
            continue;
        }

        if let Some(eq) = assignment(trimmed) {
            let key = split_dotted(trimmed[..eq].trim()).join(".");
            if key.is_empty() {
                continue;
            }
            let path = if table.is_empty() { key } else { format!("{table}.{key}") };
            locations.entry(path).or_insert_with(|| InputLocation::at(source, line_number, column));
        }
    }
    locations
}
