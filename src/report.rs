// report.rs -- Issue-report aggregation and HTML rendering

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use log::{error, warn};

use crate::config::Config;
use crate::exception::GeneratorError;
use crate::hints::{self, Severity};
use crate::package::Package;
use crate::result::HintRecord;
use crate::store::DataStore;
use crate::template::{self, Context};

/// Rendered hints of one component, partitioned by severity. Each entry is
/// a (tag, message) pair in encounter order.
#[derive(Debug, Clone, Default)]
pub struct HintEntry {
    pub cid: String,
    pub archs: BTreeSet<String>,
    pub errors: Vec<(String, String)>,
    pub warnings: Vec<(String, String)>,
    pub infos: Vec<(String, String)>,
}

#[derive(Debug, Clone, Default)]
pub struct PkgSummary {
    pub pkgname: String,
    pub maintainer: String,
    pub info_count: u64,
    pub warning_count: u64,
    pub error_count: u64,
}

/// Aggregated issue data for one (suite, section).
#[derive(Debug, Default)]
pub struct DataSummary {
    pub suite: String,
    pub section: String,
    /// maintainer → package summaries in processing order
    pub pkg_summaries: BTreeMap<String, Vec<PkgSummary>>,
    /// package name → component id → entry
    pub hint_entries: BTreeMap<String, BTreeMap<String, HintEntry>>,
    pub total_infos: u64,
    pub total_warnings: u64,
    pub total_errors: u64,
}

/// Fold the persisted hints of all packages of a slice set into a
/// DataSummary. Packages appearing under several architectures contribute
/// their architecture to the entry but are counted once.
pub fn preprocess(
    store: &dyn DataStore,
    suite: &str,
    section: &str,
    packages: &[Package],
) -> DataSummary {
    let mut summary = DataSummary {
        suite: suite.to_string(),
        section: section.to_string(),
        ..Default::default()
    };

    let mut seen: HashSet<String> = HashSet::new();

    for pkg in packages {
        let blob = match store.get_hints(&pkg.pkid()) {
            Some(blob) => blob,
            None => continue,
        };
        let grouped: HashMap<String, Vec<HintRecord>> = match serde_json::from_str(&blob) {
            Ok(grouped) => grouped,
            Err(e) => {
                warn!("Unreadable hints blob for {}: {}", pkg.pkid(), e);
                continue;
            }
        };

        if !seen.insert(pkg.name.clone()) {
            // Already counted under another architecture
            if let Some(cid_map) = summary.hint_entries.get_mut(&pkg.name) {
                for cid in grouped.keys() {
                    if let Some(entry) = cid_map.get_mut(cid) {
                        entry.archs.insert(pkg.arch.clone());
                    }
                }
            }
            continue;
        }

        let mut pkg_summary = PkgSummary {
            pkgname: pkg.name.clone(),
            maintainer: pkg.maintainer.clone(),
            ..Default::default()
        };

        for (cid, records) in grouped {
            let entry = summary
                .hint_entries
                .entry(pkg.name.clone())
                .or_default()
                .entry(cid.clone())
                .or_insert_with(|| HintEntry {
                    cid: cid.clone(),
                    ..Default::default()
                });
            entry.archs.insert(pkg.arch.clone());

            for record in records {
                let severity = match hints::severity(&record.tag) {
                    Some(severity) => severity,
                    None => {
                        error!("Hint tag '{}' is not registered, discarding", record.tag);
                        continue;
                    }
                };
                let message = hints::render(&record.tag, &record.vars).unwrap_or_default();
                let item = (record.tag.clone(), message);

                match severity {
                    Severity::Info => {
                        entry.infos.push(item);
                        pkg_summary.info_count += 1;
                        summary.total_infos += 1;
                    }
                    Severity::Warning => {
                        entry.warnings.push(item);
                        pkg_summary.warning_count += 1;
                        summary.total_warnings += 1;
                    }
                    Severity::Error => {
                        entry.errors.push(item);
                        pkg_summary.error_count += 1;
                        summary.total_errors += 1;
                    }
                }
            }
        }

        summary
            .pkg_summaries
            .entry(pkg.maintainer.clone())
            .or_default()
            .push(pkg_summary);
    }

    summary
}

/// Renders DataSummaries into HTML pages through the page templates.
pub struct ReportGenerator<'a> {
    config: &'a Config,
    template_dir: PathBuf,
    export_dir: PathBuf,
}

impl<'a> ReportGenerator<'a> {
    pub fn new(config: &'a Config) -> Result<Self, GeneratorError> {
        let template_dir = config
            .template_dir()
            .ok_or_else(|| GeneratorError::new("No usable template directory found"))?;

        Ok(ReportGenerator {
            config,
            template_dir,
            export_dir: config.html_export_dir(),
        })
    }

    fn load_template(&self, name: &str) -> Result<String, GeneratorError> {
        let path = self.template_dir.join(name);
        fs::read_to_string(&path)
            .map_err(|e| GeneratorError::new(&format!("Missing template {}: {}", path.display(), e)))
    }

    /// Render a page template inside the base layout. The page defines
    /// named partials; base-layout blocks reuse a defined partial's text
    /// and fall back to their own body otherwise.
    fn render_page(&self, page_name: &str, ctx: &Context) -> Result<String, GeneratorError> {
        let base = self.load_template("base.html")?;
        let page = self.load_template(page_name)?;

        let partials: Arc<Mutex<HashMap<String, String>>> = Arc::new(Mutex::new(HashMap::new()));

        let mut collect = Context::new();
        {
            let partials = partials.clone();
            collect.set_lambda("partial", move |arg, inner| {
                partials
                    .lock()
                    .unwrap()
                    .insert(arg.to_string(), inner.to_string());
                String::new()
            });
        }
        template::render(&page, &[ctx, &collect]);

        let mut blocks = Context::new();
        {
            let partials = partials.clone();
            blocks.set_lambda("block", move |arg, inner| {
                partials
                    .lock()
                    .unwrap()
                    .get(arg)
                    .cloned()
                    .unwrap_or_else(|| inner.to_string())
            });
        }
        Ok(template::render(&base, &[ctx, &blocks]))
    }

    fn write_page(&self, rel_path: &str, html: &str) -> Result<(), GeneratorError> {
        let path = self.export_dir.join(rel_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| GeneratorError::new(&format!("Failed to create {}: {}", parent.display(), e)))?;
        }
        fs::write(&path, html)
            .map_err(|e| GeneratorError::new(&format!("Failed to write {}: {}", path.display(), e)))
    }

    fn base_context(&self) -> Context {
        let mut ctx = Context::new();
        ctx.set("root_url", &self.config.html_base_url);
        ctx.set("project_name", &self.config.project_name);
        ctx.set(
            "generated_time",
            &chrono::Utc::now().format("%Y-%m-%d %H:%M [UTC]").to_string(),
        );
        ctx
    }

    /// Write the per-package issue pages and the maintainer index of one
    /// section.
    pub fn render_section(&self, summary: &DataSummary) -> Result<(), GeneratorError> {
        for (pkgname, cid_map) in &summary.hint_entries {
            let mut ctx = self.base_context();
            ctx.set("package_name", pkgname);
            ctx.set("suite", &summary.suite);
            ctx.set("section", &summary.section);

            let entries: Vec<Context> = cid_map.values().map(hint_entry_context).collect();
            ctx.set_sub("entries", entries);

            let html = self.render_page("pkg_page.html", &ctx)?;
            self.write_page(
                &format!("{}/{}/issues/{}.html", summary.suite, summary.section, pkgname),
                &html,
            )?;
        }

        let mut ctx = self.base_context();
        ctx.set("suite", &summary.suite);
        ctx.set("section", &summary.section);
        // Totals use distinct names so per-package counts in sub-contexts
        // cannot fall back onto them.
        set_total(&mut ctx, "infos", summary.total_infos);
        set_total(&mut ctx, "warnings", summary.total_warnings);
        set_total(&mut ctx, "errors", summary.total_errors);

        let maintainers: Vec<Context> = summary
            .pkg_summaries
            .iter()
            .map(|(maintainer, pkgs)| {
                let mut mctx = Context::new();
                mctx.set("maintainer", maintainer);

                let packages: Vec<Context> = pkgs
                    .iter()
                    .map(|p| {
                        let mut pctx = Context::new();
                        pctx.set("pkgname", &p.pkgname);
                        set_count(&mut pctx, "info", p.info_count);
                        set_count(&mut pctx, "warning", p.warning_count);
                        set_count(&mut pctx, "error", p.error_count);
                        pctx
                    })
                    .collect();
                mctx.set_sub("packages", packages);
                mctx
            })
            .collect();
        ctx.set_sub("maintainers", maintainers);

        let html = self.render_page("section_index.html", &ctx)?;
        self.write_page(
            &format!("{}/{}/index.html", summary.suite, summary.section),
            &html,
        )
    }

    /// Write the top-level index listing all configured suites.
    pub fn render_main_index(&self) -> Result<(), GeneratorError> {
        let mut ctx = self.base_context();

        let suites: Vec<Context> = self
            .config
            .suites
            .iter()
            .map(|(name, suite)| {
                let mut sctx = Context::new();
                sctx.set("suite", name);
                let sections: Vec<Context> = suite
                    .sections
                    .iter()
                    .map(|section| {
                        let mut secctx = Context::new();
                        secctx.set("section", section);
                        secctx
                    })
                    .collect();
                sctx.set_sub("sections", sections);
                sctx
            })
            .collect();
        ctx.set_sub("suites", suites);

        let html = self.render_page("main.html", &ctx)?;
        self.write_page("index.html", &html)
    }
}

fn set_count(ctx: &mut Context, name: &str, count: u64) {
    ctx.set(&format!("{}_count", name), &count.to_string());
    if count > 0 {
        ctx.set_flag(&format!("has_{}_count", name));
    }
}

fn set_total(ctx: &mut Context, name: &str, count: u64) {
    ctx.set(&format!("total_{}", name), &count.to_string());
    if count > 0 {
        ctx.set_flag(&format!("has_total_{}", name));
    }
}

fn hint_entry_context(entry: &HintEntry) -> Context {
    let mut ctx = Context::new();
    ctx.set("component_id", &entry.cid);
    ctx.set(
        "architectures",
        &entry
            .archs
            .iter()
            .cloned()
            .collect::<Vec<String>>()
            .join(", "),
    );

    let buckets = [
        ("errors", "has_errors", &entry.errors),
        ("warnings", "has_warnings", &entry.warnings),
        ("infos", "has_infos", &entry.infos),
    ];
    for (key, flag, items) in buckets {
        if items.is_empty() {
            continue;
        }
        ctx.set_flag(flag);
        let subs: Vec<Context> = items
            .iter()
            .map(|(tag, message)| {
                let mut hctx = Context::new();
                hctx.set("tag", tag);
                hctx.set("message", message);
                hctx
            })
            .collect();
        ctx.set_sub(key, subs);
    }

    ctx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::{GeneratorResult, HintSubject};
    use crate::store::DiskStore;

    fn store_hints(store: &DiskStore, pkg: &Package, hints: &[(&str, &str, &[(&str, &str)])]) {
        let mut result = GeneratorResult::new(&pkg.pkid());
        for (cid, tag, vars) in hints {
            let vars: HashMap<String, String> = vars
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            result.add_hint(HintSubject::Component(cid.to_string()), tag, vars);
        }
        store.set_hints(&pkg.pkid(), &result.hints_blob().unwrap()).unwrap();
    }

    fn make_pkg(name: &str, arch: &str, maintainer: &str) -> Package {
        let mut pkg = Package::new(name, "1.0-1", arch);
        pkg.filename = format!("pool/main/{}.deb", name);
        pkg.maintainer = maintainer.to_string();
        pkg
    }

    #[test]
    fn test_preprocess_partitions_by_severity() {
        let db = tempfile::TempDir::new().unwrap();
        let store = DiskStore::open(db.path()).unwrap();

        let pkg = make_pkg("foobar", "amd64", "Jane <jane@example.org>");
        store_hints(
            &store,
            &pkg,
            &[
                ("org.example.foo", "desktop-file-error", &[("msg", "boom")]),
                ("org.example.foo", "category-name-invalid", &[("category", "Nope")]),
                ("org.example.foo", "metainfo-quoted-value", &[]),
            ],
        );

        let summary = preprocess(&store, "sid", "main", &[pkg]);

        assert_eq!(summary.total_errors, 1);
        assert_eq!(summary.total_warnings, 1);
        assert_eq!(summary.total_infos, 1);

        let entry = &summary.hint_entries["foobar"]["org.example.foo"];
        assert_eq!(entry.errors.len(), 1);
        assert_eq!(entry.errors[0].0, "desktop-file-error");
        assert!(entry.errors[0].1.contains("boom"));
        assert_eq!(entry.infos[0].0, "category-name-invalid");
        assert!(entry.archs.contains("amd64"));

        let pkgs = &summary.pkg_summaries["Jane <jane@example.org>"];
        assert_eq!(pkgs.len(), 1);
        assert_eq!(pkgs[0].error_count, 1);
    }

    #[test]
    fn test_totals_match_bucket_lengths() {
        let db = tempfile::TempDir::new().unwrap();
        let store = DiskStore::open(db.path()).unwrap();

        let a = make_pkg("aaa", "amd64", "M1");
        let b = make_pkg("bbb", "amd64", "M2");
        store_hints(&store, &a, &[("cid.a", "desktop-file-error", &[])]);
        store_hints(
            &store,
            &b,
            &[
                ("cid.b", "category-name-invalid", &[]),
                ("cid.b", "category-name-invalid", &[]),
            ],
        );

        let summary = preprocess(&store, "sid", "main", &[a, b]);

        let mut bucket_total = 0;
        for cid_map in summary.hint_entries.values() {
            for entry in cid_map.values() {
                bucket_total +=
                    (entry.errors.len() + entry.warnings.len() + entry.infos.len()) as u64;
            }
        }
        assert_eq!(
            summary.total_infos + summary.total_warnings + summary.total_errors,
            bucket_total
        );
    }

    #[test]
    fn test_multi_arch_package_counted_once() {
        let db = tempfile::TempDir::new().unwrap();
        let store = DiskStore::open(db.path()).unwrap();

        let amd64 = make_pkg("foobar", "amd64", "Jane");
        let i386 = make_pkg("foobar", "i386", "Jane");
        store_hints(&store, &amd64, &[("cid.foo", "desktop-file-error", &[])]);
        store_hints(&store, &i386, &[("cid.foo", "desktop-file-error", &[])]);

        let summary = preprocess(&store, "sid", "main", &[amd64, i386]);

        assert_eq!(summary.total_errors, 1);
        let entry = &summary.hint_entries["foobar"]["cid.foo"];
        assert_eq!(entry.errors.len(), 1);
        assert!(entry.archs.contains("amd64"));
        assert!(entry.archs.contains("i386"));
    }

    #[test]
    fn test_unknown_tag_discarded() {
        let db = tempfile::TempDir::new().unwrap();
        let store = DiskStore::open(db.path()).unwrap();

        let pkg = make_pkg("foobar", "amd64", "Jane");
        store_hints(&store, &pkg, &[("cid.foo", "tag-that-does-not-exist", &[])]);

        let summary = preprocess(&store, "sid", "main", &[pkg]);
        assert_eq!(
            summary.total_infos + summary.total_warnings + summary.total_errors,
            0
        );
    }
}
