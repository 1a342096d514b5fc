// config.rs - Workspace configuration handling

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::exception::GeneratorError;

/// AppStream catalog format version, ordered oldest to newest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
pub enum FormatVersion {
    #[serde(rename = "0.6")]
    V0_6,
    #[serde(rename = "0.8")]
    V0_8,
    #[serde(rename = "1.0")]
    V1_0,
}

impl FormatVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormatVersion::V0_6 => "0.6",
            FormatVersion::V0_8 => "0.8",
            FormatVersion::V1_0 => "1.0",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SuiteConfig {
    pub sections: Vec<String>,
    pub architectures: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(rename = "ProjectName")]
    pub project_name: String,
    /// Repository root: a local path or an http(s) URL
    #[serde(rename = "ArchiveRoot")]
    pub archive_root: String,
    #[serde(rename = "HtmlBaseUrl", default)]
    pub html_base_url: String,
    #[serde(rename = "FormatVersion", default = "default_format_version")]
    pub format_version: FormatVersion,
    #[serde(rename = "Suites")]
    pub suites: BTreeMap<String, SuiteConfig>,
    /// Scratch space for the fetcher; defaults to tmp/ under the workspace
    /// when the document does not set it
    #[serde(rename = "TmpDir", default)]
    pub tmp_dir: PathBuf,
    // Derived from the config file location, not part of the JSON document
    #[serde(skip)]
    pub workspace_dir: PathBuf,
}

fn default_format_version() -> FormatVersion {
    FormatVersion::V1_0
}

impl Config {
    /// Load the workspace configuration from a JSON document. The directory
    /// containing the file becomes the workspace root.
    pub fn load(path: &Path) -> Result<Self, GeneratorError> {
        let content = fs::read_to_string(path)
            .map_err(|e| GeneratorError::new(&format!("Failed to read config {}: {}", path.display(), e)))?;

        let mut config: Config = serde_json::from_str(&content)
            .map_err(|e| GeneratorError::new(&format!("Failed to parse config {}: {}", path.display(), e)))?;

        let workspace = path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        if !workspace.exists() {
            return Err(GeneratorError::new(&format!(
                "Workspace directory does not exist: {}",
                workspace.display()
            )));
        }

        config.workspace_dir = workspace.clone();
        if config.tmp_dir.as_os_str().is_empty() {
            config.tmp_dir = workspace.join("tmp");
        } else if config.tmp_dir.is_relative() {
            config.tmp_dir = workspace.join(&config.tmp_dir);
        }

        Ok(config)
    }

    /// Directory holding derived data files (hints, repo state, statistics).
    pub fn database_dir(&self) -> PathBuf {
        self.workspace_dir.join("db")
    }

    /// Directory the HTML report pages are written to.
    pub fn html_export_dir(&self) -> PathBuf {
        self.workspace_dir.join("export").join("html")
    }

    /// Directory the catalog metadata files are written to.
    pub fn data_export_dir(&self) -> PathBuf {
        self.workspace_dir.join("export").join("data")
    }

    /// Resolve the page template directory. Vendor templates named after the
    /// project take precedence over the bundled default set.
    pub fn template_dir(&self) -> Option<PathBuf> {
        let roots = [self.workspace_dir.join("templates"), PathBuf::from("templates")];
        let names = [self.project_name.to_lowercase(), "default".to_string()];

        for root in &roots {
            for name in &names {
                let candidate = root.join(name);
                if candidate.is_dir() {
                    return Some(candidate);
                }
            }
        }

        None
    }
}
