// hints.rs -- Static registry of issue-hint tags

use std::collections::HashMap;

use lazy_static::lazy_static;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HintDef {
    pub tag: String,
    pub severity: Severity,
    pub text: String,
}

// Tag definition document. Severity and message template per tag; message
// variables use {{name}} placeholders.
const HINT_TAGS_DOC: &str = r#"[
  {
    "tag": "internal-error",
    "severity": "error",
    "text": "A generator failure occurred while processing this package: {{msg}}"
  },
  {
    "tag": "desktop-file-error",
    "severity": "error",
    "text": "Unable to read the .desktop file: {{msg}}"
  },
  {
    "tag": "metainfo-quoted-value",
    "severity": "warning",
    "text": "The value of '{{key}}' is surrounded by quotes: {{value}}"
  },
  {
    "tag": "category-name-invalid",
    "severity": "info",
    "text": "The category '{{category}}' is not a valid registered category and was ignored."
  },
  {
    "tag": "pkg-extract-error",
    "severity": "error",
    "text": "Could not read the package payload: {{msg}}"
  },
  {
    "tag": "pkg-download-failed",
    "severity": "error",
    "text": "Could not fetch the package payload: {{msg}}"
  },
  {
    "tag": "description-missing",
    "severity": "info",
    "text": "The component is missing a long description."
  }
]"#;

lazy_static! {
    static ref REGISTRY: HashMap<String, HintDef> = {
        let defs: Vec<HintDef> =
            serde_json::from_str(HINT_TAGS_DOC).expect("builtin hint-tag document is valid");
        defs.into_iter().map(|d| (d.tag.clone(), d)).collect()
    };
}

pub fn is_registered(tag: &str) -> bool {
    REGISTRY.contains_key(tag)
}

pub fn severity(tag: &str) -> Option<Severity> {
    REGISTRY.get(tag).map(|d| d.severity)
}

/// Render the message for a tag by substituting the variable bindings into
/// its template. Returns None for unknown tags.
pub fn render(tag: &str, vars: &HashMap<String, String>) -> Option<String> {
    REGISTRY.get(tag).map(|d| substitute(&d.text, vars))
}

/// Replace {{name}} placeholders with bound values; unbound placeholders
/// render as the empty string.
fn substitute(template: &str, vars: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find("{{") {
        out.push_str(&rest[..open]);
        let after = &rest[open + 2..];
        match after.find("}}") {
            Some(close) => {
                let name = after[..close].trim();
                if let Some(value) = vars.get(name) {
                    out.push_str(value);
                }
                rest = &after[close + 2..];
            }
            None => {
                out.push_str(&rest[open..]);
                return out;
            }
        }
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_tags_registered() {
        assert!(is_registered("desktop-file-error"));
        assert!(is_registered("category-name-invalid"));
        assert!(!is_registered("no-such-tag"));
    }

    #[test]
    fn test_severities() {
        assert_eq!(severity("desktop-file-error"), Some(Severity::Error));
        assert_eq!(severity("metainfo-quoted-value"), Some(Severity::Warning));
        assert_eq!(severity("category-name-invalid"), Some(Severity::Info));
        assert_eq!(severity("no-such-tag"), None);
    }

    #[test]
    fn test_render_substitutes_variables() {
        let mut vars = HashMap::new();
        vars.insert("category".to_string(), "NotARealCategory".to_string());

        let msg = render("category-name-invalid", &vars).unwrap();
        assert!(msg.contains("'NotARealCategory'"));
    }

    #[test]
    fn test_render_unknown_tag_is_none() {
        assert_eq!(render("no-such-tag", &HashMap::new()), None);
    }

    #[test]
    fn test_unbound_placeholder_renders_empty() {
        let msg = render("desktop-file-error", &HashMap::new()).unwrap();
        assert_eq!(msg, "Unable to read the .desktop file: ");
    }

    #[test]
    fn test_substitute_handles_multiple_placeholders() {
        let mut vars = HashMap::new();
        vars.insert("key".to_string(), "Name".to_string());
        vars.insert("value".to_string(), "\"Foo\"".to_string());

        let msg = render("metainfo-quoted-value", &vars).unwrap();
        assert_eq!(msg, "The value of 'Name' is surrounded by quotes: \"Foo\"");
    }
}
