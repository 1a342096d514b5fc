// package.rs -- Binary package records

use std::collections::HashMap;

/// One binary package from a repository index. Identity is the
/// (name, version, arch) triple; `filename` points at the payload relative
/// to the archive root.
#[derive(Debug, Clone, Default)]
pub struct Package {
    pub name: String,
    pub version: String,
    pub arch: String,
    pub filename: String,
    pub maintainer: String,
    /// Rendered long descriptions keyed by locale tag ("C" = untranslated)
    pub descriptions: HashMap<String, String>,
}

impl Package {
    pub fn new(name: &str, version: &str, arch: &str) -> Self {
        Package {
            name: name.to_string(),
            version: version.to_string(),
            arch: arch.to_string(),
            ..Default::default()
        }
    }

    /// Stable identifier used as the key in the persistent store.
    pub fn pkid(&self) -> String {
        format!("{}/{}/{}", self.name, self.version, self.arch)
    }

    pub fn is_valid(&self) -> bool {
        !self.name.is_empty()
            && !self.version.is_empty()
            && !self.arch.is_empty()
            && !self.filename.is_empty()
    }

    pub fn set_description(&mut self, locale: &str, text: &str) {
        self.descriptions.insert(locale.to_string(), text.to_string());
    }

    pub fn description(&self, locale: &str) -> Option<&str> {
        self.descriptions.get(locale).map(|s| s.as_str())
    }
}
