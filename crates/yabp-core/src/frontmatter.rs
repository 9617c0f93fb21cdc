//! Loose `key: value` header block at the top of a template fragment.
//!
//! ```text
//! ---
//! output_file: report.md
//! docs_folder: qa
//! ---
//! # Body starts here
//! ```
//!
//! Only flat scalar pairs are recognised. Nested YAML, list items and lines
//! without a colon are ignored rather than rejected, so a fragment with an
//! unusual header degrades to "feature absent" instead of failing.

use std::collections::BTreeMap;

pub const DELIMITER: &str = "---";

pub const OUTPUT_FILE_KEY: &str = "output_file";
pub const DOCS_FOLDER_KEY: &str = "docs_folder";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frontmatter {
    fields: BTreeMap<String, String>,
}

impl Frontmatter {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn output_file(&self) -> Option<&str> {
        self.get(OUTPUT_FILE_KEY)
    }

    pub fn docs_folder(&self) -> Option<&str> {
        self.get(DOCS_FOLDER_KEY)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A document split into its optional header and the remaining body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parsed<'a> {
    pub frontmatter: Option<Frontmatter>,
    pub body: &'a str,
}

/// Split `content` into frontmatter and body.
///
/// The header must start on the very first line with a line of exactly
/// `---` and end at the next line of exactly `---`. Anything else means the
/// document has no frontmatter and the whole text is the body.
pub fn parse(content: &str) -> Parsed<'_> {
    match split_block(content) {
        Some((block, body)) => Parsed {
            frontmatter: Some(parse_fields(block)),
            body,
        },
        None => Parsed {
            frontmatter: None,
            body: content,
        },
    }
}

fn split_block(content: &str) -> Option<(&str, &str)> {
    let rest = content.strip_prefix(DELIMITER)?;
    let rest = rest
        .strip_prefix('\n')
        .or_else(|| rest.strip_prefix("\r\n"))?;

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end_matches(['\n', '\r']) == DELIMITER {
            let block = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return Some((block, body));
        }
        offset += line.len();
    }
    None
}

fn parse_fields(block: &str) -> Frontmatter {
    let mut fields = BTreeMap::new();
    for line in block.lines() {
        // Nested or list lines belong to a previous key.
        if line.starts_with([' ', '\t', '-']) {
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        fields.insert(key.to_string(), unquote(value.trim()).to_string());
    }
    Frontmatter { fields }
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_header_and_body() {
        let doc = "---\noutput_file: report.md\ndocs_folder: qa\n---\n# Title\nbody";
        let parsed = parse(doc);
        let fm = parsed.frontmatter.unwrap();
        assert_eq!(fm.output_file(), Some("report.md"));
        assert_eq!(fm.docs_folder(), Some("qa"));
        assert_eq!(parsed.body, "# Title\nbody");
    }

    #[test]
    fn no_header_means_whole_document_is_body() {
        let doc = "# Title\n---\nnot: frontmatter\n---\n";
        let parsed = parse(doc);
        assert!(parsed.frontmatter.is_none());
        assert_eq!(parsed.body, doc);
    }

    #[test]
    fn unterminated_header_is_ignored() {
        let parsed = parse("---\noutput_file: a.md\n# never closed");
        assert!(parsed.frontmatter.is_none());
    }

    #[test]
    fn missing_key_is_absent_not_error() {
        let fm = parse("---\ntitle: Roadmap\n---\nbody").frontmatter.unwrap();
        assert_eq!(fm.output_file(), None);
        assert_eq!(fm.get("title"), Some("Roadmap"));
    }

    #[test]
    fn empty_value_is_absent() {
        let fm = parse("---\noutput_file:\n---\n").frontmatter.unwrap();
        assert_eq!(fm.output_file(), None);
    }

    #[test]
    fn list_items_and_quotes() {
        let doc = "---\ninput_files:\n  - docs/spec.md\noutput_file: \"docs/out.md\"\n---\n";
        let fm = parse(doc).frontmatter.unwrap();
        assert_eq!(fm.output_file(), Some("docs/out.md"));
        assert_eq!(fm.get("input_files"), None);
    }

    #[test]
    fn crlf_line_endings() {
        let parsed = parse("---\r\noutput_file: a.md\r\n---\r\nbody");
        assert_eq!(parsed.frontmatter.unwrap().output_file(), Some("a.md"));
        assert_eq!(parsed.body, "body");
    }

    #[test]
    fn empty_header_block() {
        let parsed = parse("---\n---\nbody");
        assert!(parsed.frontmatter.unwrap().is_empty());
        assert_eq!(parsed.body, "body");
    }
}
