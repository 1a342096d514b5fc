// result.rs -- Per-package accumulator for components and hints

use std::collections::HashMap;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::component::Component;
use crate::exception::GeneratorError;

/// What a hint is attached to: a raw file name or a parsed component.
/// Component subjects are resolved to the component id when the result
/// is serialized for the persistent store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HintSubject {
    File(String),
    Component(String),
}

#[derive(Debug, Clone)]
pub struct RawHint {
    pub subject: HintSubject,
    pub tag: String,
    pub vars: HashMap<String, String>,
}

/// Serialized form of one hint inside the per-package store blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HintRecord {
    pub tag: String,
    #[serde(default)]
    pub vars: HashMap<String, String>,
}

/// Accumulates the components and hints produced while processing one
/// package. Created per package, consumed once.
pub struct GeneratorResult {
    pub pkid: String,
    components: HashMap<String, Component>,
    hints: Vec<RawHint>,
}

impl GeneratorResult {
    pub fn new(pkid: &str) -> Self {
        GeneratorResult {
            pkid: pkid.to_string(),
            components: HashMap::new(),
            hints: Vec::new(),
        }
    }

    pub fn get_component(&self, basename: &str) -> Option<&Component> {
        self.components.get(basename)
    }

    /// Register the component parsed from `basename`. At most one component
    /// may exist per basename; a duplicate is dropped with a warning.
    pub fn add_component(&mut self, basename: &str, component: Component) {
        if self.components.contains_key(basename) {
            warn!("Duplicate component for {}, keeping the first", basename);
            return;
        }
        self.components.insert(basename.to_string(), component);
    }

    pub fn add_hint(&mut self, subject: HintSubject, tag: &str, vars: HashMap<String, String>) {
        self.hints.push(RawHint {
            subject,
            tag: tag.to_string(),
            vars,
        });
    }

    pub fn hints(&self) -> &[RawHint] {
        &self.hints
    }

    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.components.values()
    }

    pub fn components_mut(&mut self) -> impl Iterator<Item = &mut Component> {
        self.components.values_mut()
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// Serialize the accumulated hints for the persistent store: a map from
    /// subject identifier (component id or file name) to hint records.
    pub fn hints_blob(&self) -> Result<String, GeneratorError> {
        let mut grouped: HashMap<&str, Vec<HintRecord>> = HashMap::new();
        for hint in &self.hints {
            let subject = match &hint.subject {
                HintSubject::File(name) => name.as_str(),
                HintSubject::Component(id) => id.as_str(),
            };
            grouped.entry(subject).or_default().push(HintRecord {
                tag: hint.tag.clone(),
                vars: hint.vars.clone(),
            });
        }

        serde_json::to_string(&grouped)
            .map_err(|e| GeneratorError::new(&format!("Failed to serialize hints: {}", e)))
    }
}
