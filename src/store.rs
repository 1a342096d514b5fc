// store.rs -- Persistent key/value store interface and on-disk implementation

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use log::warn;
use serde::{Deserialize, Serialize};

use crate::exception::GeneratorError;

/// Per-slice repository state; `mtime` is the index file's modification
/// time in Unix seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoInfo {
    pub mtime: u64,
}

/// Interface to the persistent store. The pipeline treats every read and
/// write as atomic per key; implementations must be usable from multiple
/// worker tasks.
pub trait DataStore: Send + Sync {
    fn get_hints(&self, pkid: &str) -> Option<String>;
    fn set_hints(&self, pkid: &str, blob: &str) -> Result<(), GeneratorError>;

    fn get_repo_info(&self, suite: &str, section: &str, arch: &str) -> Option<RepoInfo>;
    fn set_repo_info(
        &self,
        suite: &str,
        section: &str,
        arch: &str,
        info: &RepoInfo,
    ) -> Result<(), GeneratorError>;

    /// Append a statistics blob under the current time.
    fn add_statistics(&self, blob: &str) -> Result<(), GeneratorError>;
    /// All stored samples as (timestamp, blob) pairs in insertion order.
    fn get_statistics(&self) -> Vec<(u64, String)>;
}

/// Store keeping JSON files under a database directory.
pub struct DiskStore {
    dir: PathBuf,
    stats_guard: Mutex<()>,
}

impl DiskStore {
    pub fn open(dir: &Path) -> Result<Self, GeneratorError> {
        for sub in ["hints", "repoinfo"] {
            fs::create_dir_all(dir.join(sub)).map_err(|e| {
                GeneratorError::new(&format!("Failed to create store directory: {}", e))
            })?;
        }
        Ok(DiskStore {
            dir: dir.to_path_buf(),
            stats_guard: Mutex::new(()),
        })
    }

    fn hints_path(&self, pkid: &str) -> PathBuf {
        self.dir.join("hints").join(format!("{}.json", pkid.replace('/', "_")))
    }

    fn repoinfo_path(&self, suite: &str, section: &str, arch: &str) -> PathBuf {
        self.dir
            .join("repoinfo")
            .join(format!("{}-{}-{}.json", suite, section, arch))
    }

    fn stats_path(&self) -> PathBuf {
        self.dir.join("statistics.json")
    }

    fn read_samples(&self) -> Vec<(u64, String)> {
        match fs::read_to_string(self.stats_path()) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!("Unreadable statistics file, starting fresh: {}", e);
                Vec::new()
            }),
            Err(_) => Vec::new(),
        }
    }
}

impl DataStore for DiskStore {
    fn get_hints(&self, pkid: &str) -> Option<String> {
        fs::read_to_string(self.hints_path(pkid)).ok()
    }

    fn set_hints(&self, pkid: &str, blob: &str) -> Result<(), GeneratorError> {
        fs::write(self.hints_path(pkid), blob)
            .map_err(|e| GeneratorError::new(&format!("Failed to write hints for {}: {}", pkid, e)))
    }

    fn get_repo_info(&self, suite: &str, section: &str, arch: &str) -> Option<RepoInfo> {
        let content = fs::read_to_string(self.repoinfo_path(suite, section, arch)).ok()?;
        serde_json::from_str(&content).ok()
    }

    fn set_repo_info(
        &self,
        suite: &str,
        section: &str,
        arch: &str,
        info: &RepoInfo,
    ) -> Result<(), GeneratorError> {
        let content = serde_json::to_string(info)
            .map_err(|e| GeneratorError::new(&format!("Failed to serialize repo info: {}", e)))?;
        fs::write(self.repoinfo_path(suite, section, arch), content)
            .map_err(|e| GeneratorError::new(&format!("Failed to write repo info: {}", e)))
    }

    fn add_statistics(&self, blob: &str) -> Result<(), GeneratorError> {
        let _guard = self.stats_guard.lock().unwrap();

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| GeneratorError::new(&format!("System clock error: {}", e)))?
            .as_secs();

        let mut samples = self.read_samples();
        samples.push((now, blob.to_string()));

        let content = serde_json::to_string(&samples)
            .map_err(|e| GeneratorError::new(&format!("Failed to serialize statistics: {}", e)))?;
        fs::write(self.stats_path(), content)
            .map_err(|e| GeneratorError::new(&format!("Failed to write statistics: {}", e)))
    }

    fn get_statistics(&self) -> Vec<(u64, String)> {
        let _guard = self.stats_guard.lock().unwrap();
        self.read_samples()
    }
}
