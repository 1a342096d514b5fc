// tagfile.rs -- Reader for RFC-822-style tag files (package indices,
// translation files)

use std::collections::HashMap;
use std::path::Path;

use log::warn;

use crate::exception::FetchError;
use crate::fetcher;

/// Forward-only reader over blank-line-separated sections of `Key: value`
/// fields. Continuation lines start with whitespace and are appended to the
/// preceding field; rewinding is not supported.
pub struct TagFileReader {
    lines: Vec<String>,
    pos: usize,
    current: HashMap<String, String>,
}

impl TagFileReader {
    /// Open a tag file, transparently decompressing by extension, and
    /// position the reader on the first section.
    pub fn open(path: &Path) -> Result<Self, FetchError> {
        let content = fetcher::read_compressed(path)?;
        Ok(Self::from_str(&content))
    }

    pub fn from_str(content: &str) -> Self {
        let mut reader = TagFileReader {
            lines: content.lines().map(|l| l.trim_end().to_string()).collect(),
            pos: 0,
            current: HashMap::new(),
        };
        reader.parse_section();
        reader
    }

    /// Value of a field in the current section.
    pub fn read_field(&self, name: &str) -> Option<String> {
        self.current.get(name).cloned()
    }

    /// Advance to the next section. Returns false at end of input.
    pub fn next_section(&mut self) -> bool {
        self.parse_section()
    }

    fn parse_section(&mut self) -> bool {
        self.current.clear();

        // Skip separator blank lines
        while self.pos < self.lines.len() && self.lines[self.pos].trim().is_empty() {
            self.pos += 1;
        }
        if self.pos >= self.lines.len() {
            return false;
        }

        let mut last_key: Option<String> = None;
        while self.pos < self.lines.len() {
            let line = &self.lines[self.pos];
            if line.trim().is_empty() {
                break;
            }

            if line.starts_with(' ') || line.starts_with('\t') {
                // Continuation of the previous field
                match last_key.as_ref().and_then(|k| self.current.get_mut(k)) {
                    Some(value) => {
                        value.push('\n');
                        value.push_str(line);
                    }
                    None => warn!("Continuation line without a field, skipping: {}", line),
                }
            } else if let Some(colon) = line.find(':') {
                let key = line[..colon].to_string();
                let value = line[colon + 1..].trim_start().to_string();
                self.current.insert(key.clone(), value);
                last_key = Some(key);
            } else {
                warn!("Malformed tag-file line, skipping: {}", line);
            }

            self.pos += 1;
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_section() {
        let reader = TagFileReader::from_str(
            "Package: firefox\nVersion: 115.0-1\nMaintainer: Mozilla Team <team@example.org>\n",
        );
        assert_eq!(reader.read_field("Package"), Some("firefox".to_string()));
        assert_eq!(reader.read_field("Version"), Some("115.0-1".to_string()));
        assert_eq!(reader.read_field("Missing"), None);
    }

    #[test]
    fn test_section_advance() {
        let mut reader =
            TagFileReader::from_str("Package: aaa\nVersion: 1.0\n\nPackage: bbb\nVersion: 2.0\n");
        assert_eq!(reader.read_field("Package"), Some("aaa".to_string()));

        assert!(reader.next_section());
        assert_eq!(reader.read_field("Package"), Some("bbb".to_string()));
        assert_eq!(reader.read_field("Version"), Some("2.0".to_string()));

        assert!(!reader.next_section());
        assert_eq!(reader.read_field("Package"), None);
    }

    #[test]
    fn test_continuation_lines() {
        let reader = TagFileReader::from_str(
            "Package: aaa\nDescription: short summary\n line one\n line two\n .\n line three\n",
        );
        assert_eq!(
            reader.read_field("Description"),
            Some("short summary\n line one\n line two\n .\n line three".to_string())
        );
    }

    #[test]
    fn test_malformed_line_skipped() {
        let reader = TagFileReader::from_str("Package: aaa\nnot a field line\nVersion: 1.0\n");
        assert_eq!(reader.read_field("Package"), Some("aaa".to_string()));
        assert_eq!(reader.read_field("Version"), Some("1.0".to_string()));
    }

    #[test]
    fn test_multiple_blank_separators() {
        let mut reader = TagFileReader::from_str("Package: aaa\n\n\n\nPackage: bbb\n");
        assert_eq!(reader.read_field("Package"), Some("aaa".to_string()));
        assert!(reader.next_section());
        assert_eq!(reader.read_field("Package"), Some("bbb".to_string()));
    }

    #[test]
    fn test_empty_input() {
        let mut reader = TagFileReader::from_str("");
        assert_eq!(reader.read_field("Package"), None);
        assert!(!reader.next_section());
    }
}
