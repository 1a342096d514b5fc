// component.rs -- Unified component model for catalog entries

use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentKind {
    DesktopApp,
}

impl ComponentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentKind::DesktopApp => "desktop-app",
        }
    }
}

impl Default for ComponentKind {
    fn default() -> Self {
        ComponentKind::DesktopApp
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Icon {
    pub kind: String,
    pub name: String,
    pub width: u32,
    pub height: u32,
}

/// A catalog entry describing one installable application.
///
/// Localized attributes map a locale tag to a value; `"C"` is the reserved
/// tag for the untranslated base and is distinct from a missing entry.
#[derive(Debug, Clone, Default)]
pub struct Component {
    pub id: String,
    pub kind: ComponentKind,
    name: HashMap<String, String>,
    summary: HashMap<String, String>,
    description: HashMap<String, String>,
    keywords: HashMap<String, Vec<String>>,
    categories: BTreeSet<String>,
    provided: BTreeMap<String, Vec<String>>,
    icons: Vec<Icon>,
}

impl Component {
    pub fn new(id: &str) -> Self {
        Component {
            id: id.to_string(),
            ..Default::default()
        }
    }

    pub fn set_name(&mut self, locale: &str, value: &str) {
        self.name.insert(locale.to_string(), value.to_string());
    }

    pub fn name(&self, locale: &str) -> Option<&str> {
        self.name.get(locale).map(|s| s.as_str())
    }

    pub fn names(&self) -> &HashMap<String, String> {
        &self.name
    }

    pub fn has_name(&self, locale: &str) -> bool {
        self.name.contains_key(locale)
    }

    pub fn set_summary(&mut self, locale: &str, value: &str) {
        self.summary.insert(locale.to_string(), value.to_string());
    }

    pub fn summary(&self, locale: &str) -> Option<&str> {
        self.summary.get(locale).map(|s| s.as_str())
    }

    pub fn summaries(&self) -> &HashMap<String, String> {
        &self.summary
    }

    pub fn has_summary(&self, locale: &str) -> bool {
        self.summary.contains_key(locale)
    }

    pub fn set_description(&mut self, locale: &str, value: &str) {
        self.description.insert(locale.to_string(), value.to_string());
    }

    pub fn descriptions(&self) -> &HashMap<String, String> {
        &self.description
    }

    pub fn set_keywords(&mut self, locale: &str, values: Vec<String>) {
        self.keywords.insert(locale.to_string(), values);
    }

    pub fn keywords(&self, locale: &str) -> Option<&[String]> {
        self.keywords.get(locale).map(|v| v.as_slice())
    }

    pub fn keyword_map(&self) -> &HashMap<String, Vec<String>> {
        &self.keywords
    }

    pub fn add_category(&mut self, category: &str) {
        self.categories.insert(category.to_string());
    }

    pub fn categories(&self) -> &BTreeSet<String> {
        &self.categories
    }

    /// Attach a provided item (e.g. a mimetype) under its kind.
    pub fn add_provided(&mut self, kind: &str, item: &str) {
        self.provided
            .entry(kind.to_string())
            .or_default()
            .push(item.to_string());
    }

    pub fn provided(&self, kind: &str) -> Option<&[String]> {
        self.provided.get(kind).map(|v| v.as_slice())
    }

    pub fn provided_map(&self) -> &BTreeMap<String, Vec<String>> {
        &self.provided
    }

    pub fn add_icon(&mut self, icon: Icon) {
        self.icons.push(icon);
    }

    pub fn icons(&self) -> &[Icon] {
        &self.icons
    }
}
