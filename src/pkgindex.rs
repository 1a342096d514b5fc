// pkgindex.rs -- Package index loading, translations and change detection

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::UNIX_EPOCH;

use lazy_static::lazy_static;
use log::{debug, info, warn};
use regex::Regex;

use crate::catalog::xml_escape;
use crate::fetcher::Fetcher;
use crate::package::Package;
use crate::store::{DataStore, RepoInfo};
use crate::tagfile::TagFileReader;

lazy_static! {
    static ref TRANSLATION_RE: Regex = Regex::new(r"Translation-([a-zA-Z_]+)").unwrap();
}

/// Enumerates the packages of (suite, section, arch) slices and correlates
/// their long descriptions across languages.
pub struct PackageIndex {
    root: String,
    tmp_dir: PathBuf,
    pkg_cache: Mutex<HashMap<String, Arc<Vec<Package>>>>,
    // Index file mtimes by resolved path, so one run stats each index once
    index_mtimes: Mutex<HashMap<String, u64>>,
}

impl PackageIndex {
    pub fn new(root: &str, tmp_dir: &Path) -> Self {
        PackageIndex {
            root: root.to_string(),
            tmp_dir: tmp_dir.to_path_buf(),
            pkg_cache: Mutex::new(HashMap::new()),
            index_mtimes: Mutex::new(HashMap::new()),
        }
    }

    fn fetcher(&self) -> Fetcher {
        Fetcher::new(&self.root, &self.tmp_dir)
    }

    fn index_path(suite: &str, section: &str, arch: &str) -> String {
        format!("dists/{}/{}/binary-{}/Packages{{ext}}", suite, section, arch)
    }

    /// Language codes with translation files in the suite's release
    /// manifest, in first-seen order. Falls back to English on any error.
    pub fn find_translations(&self, suite: &str, _section: &str) -> Vec<String> {
        let release_path = format!("dists/{}/InRelease", suite);
        let content = self
            .fetcher()
            .fetch(&release_path)
            .and_then(|path| crate::fetcher::read_compressed(&path));

        let content = match content {
            Ok(content) => content,
            Err(e) => {
                warn!("Could not read release manifest for {}: {}", suite, e);
                return vec!["en".to_string()];
            }
        };

        let mut seen = HashSet::new();
        let mut langs = Vec::new();
        for line in content.lines() {
            for caps in TRANSLATION_RE.captures_iter(line) {
                let lang = caps[1].to_string();
                if seen.insert(lang.clone()) {
                    langs.push(lang);
                }
            }
        }

        if langs.is_empty() {
            langs.push("en".to_string());
        }
        langs
    }

    /// Cached package vector for one slice; the first access loads it.
    pub fn packages_for(&self, suite: &str, section: &str, arch: &str) -> Arc<Vec<Package>> {
        let key = format!("{}/{}/{}", suite, section, arch);

        {
            let cache = self.pkg_cache.lock().unwrap();
            if let Some(pkgs) = cache.get(&key) {
                return pkgs.clone();
            }
        }

        let pkgs = Arc::new(self.load_packages(suite, section, arch));
        self.pkg_cache
            .lock()
            .unwrap()
            .insert(key, pkgs.clone());
        pkgs
    }

    fn load_packages(&self, suite: &str, section: &str, arch: &str) -> Vec<Package> {
        let index_rel = Self::index_path(suite, section, arch);
        let index_file = match self.fetcher().fetch(&index_rel) {
            Ok(path) => path,
            Err(e) => {
                warn!(
                    "No package index for {}/{}/{}: {}",
                    suite, section, arch, e
                );
                return Vec::new();
            }
        };

        let mut reader = match TagFileReader::open(&index_file) {
            Ok(reader) => reader,
            Err(e) => {
                warn!("Unreadable package index {}: {}", index_file.display(), e);
                return Vec::new();
            }
        };

        let mut packages = Vec::new();
        loop {
            if let Some(name) = reader.read_field("Package") {
                let mut pkg = Package::new(
                    &name,
                    reader.read_field("Version").unwrap_or_default().as_str(),
                    arch,
                );
                pkg.filename = reader.read_field("Filename").unwrap_or_default();
                pkg.maintainer = reader.read_field("Maintainer").unwrap_or_default();

                if pkg.is_valid() {
                    packages.push(pkg);
                } else {
                    warn!("Dropping invalid package record for '{}'", name);
                }
            }

            if !reader.next_section() {
                break;
            }
        }

        info!(
            "Loaded {} packages for {}/{}/{}",
            packages.len(),
            suite,
            section,
            arch
        );

        self.load_package_long_descs(&mut packages, suite, section);
        packages
    }

    fn load_package_long_descs(&self, packages: &mut [Package], suite: &str, section: &str) {
        let langs = self.find_translations(suite, section);
        let by_name: HashMap<String, usize> = packages
            .iter()
            .enumerate()
            .map(|(i, p)| (p.name.clone(), i))
            .collect();

        for lang in langs {
            let rel = format!(
                "dists/{}/{}/i18n/Translation-{}{{ext}}",
                suite, section, lang
            );
            let path = match self.fetcher().fetch(&rel) {
                Ok(path) => path,
                Err(e) => {
                    debug!("No translation file for {}: {}", lang, e);
                    continue;
                }
            };

            let mut reader = match TagFileReader::open(&path) {
                Ok(reader) => reader,
                Err(e) => {
                    warn!("Unreadable translation file {}: {}", path.display(), e);
                    continue;
                }
            };

            let desc_field = format!("Description-{}", lang);
            loop {
                if let (Some(name), Some(raw)) = (
                    reader.read_field("Package"),
                    reader.read_field(&desc_field),
                ) {
                    if let Some(&idx) = by_name.get(&name) {
                        let rendered = render_description(&raw);
                        packages[idx].set_description(&lang, &rendered);
                        if lang == "en" {
                            packages[idx].set_description("C", &rendered);
                        }
                    }
                }

                if !reader.next_section() {
                    break;
                }
            }
        }
    }

    /// Whether the index file changed since the previously persisted
    /// timestamp. The fresh timestamp is written back unconditionally, so a
    /// second call with an unchanged file reports no change.
    pub fn has_changes(
        &self,
        store: &dyn DataStore,
        suite: &str,
        section: &str,
        arch: &str,
    ) -> bool {
        let index_rel = Self::index_path(suite, section, arch);
        let index_file = match self.fetcher().fetch(&index_rel) {
            Ok(path) => path,
            Err(_) => {
                debug!("Index for {}/{}/{} is absent", suite, section, arch);
                return true;
            }
        };

        let path_key = index_file.to_string_lossy().to_string();
        let mtime = {
            let mut mtimes = self.index_mtimes.lock().unwrap();
            match mtimes.get(&path_key) {
                Some(&mtime) => mtime,
                None => match stat_mtime(&index_file) {
                    Some(mtime) => {
                        mtimes.insert(path_key, mtime);
                        mtime
                    }
                    None => return true,
                },
            }
        };

        let changed = match store.get_repo_info(suite, section, arch) {
            Some(info) => info.mtime != mtime,
            None => true,
        };

        if let Err(e) = store.set_repo_info(suite, section, arch, &RepoInfo { mtime }) {
            warn!("Could not persist repo state: {}", e);
        }

        changed
    }

    /// Drop the package and mtime caches.
    pub fn release(&self) {
        self.pkg_cache.lock().unwrap().clear();
        self.index_mtimes.lock().unwrap().clear();
    }
}

fn stat_mtime(path: &Path) -> Option<u64> {
    let modified = fs::metadata(path).and_then(|m| m.modified()).ok()?;
    modified
        .duration_since(UNIX_EPOCH)
        .ok()
        .map(|d| d.as_secs())
}

/// Fold a raw tag-file description into HTML paragraphs. The first line is
/// the short summary and is discarded; a line of `.` separates paragraphs;
/// contiguous lines are joined with single spaces and XML-escaped.
pub fn render_description(raw: &str) -> String {
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current: Vec<String> = Vec::new();

    for line in raw.lines().skip(1) {
        let line = line.trim();
        if line == "." {
            if !current.is_empty() {
                paragraphs.push(current.join(" "));
                current.clear();
            }
        } else if !line.is_empty() {
            current.push(xml_escape(line));
        }
    }
    if !current.is_empty() {
        paragraphs.push(current.join(" "));
    }

    paragraphs
        .iter()
        .map(|p| format!("<p>{}</p>", p))
        .collect::<Vec<String>>()
        .join("\n")
}
