// engine.rs -- Pipeline driver: slices, worker pool, export

use std::collections::HashMap;
use std::fs;
use std::sync::Arc;

use log::{info, warn};
use tokio::sync::Semaphore;

use crate::catalog;
use crate::component::Component;
use crate::config::Config;
use crate::deb;
use crate::desktop::DesktopParser;
use crate::exception::GeneratorError;
use crate::fetcher::Fetcher;
use crate::package::Package;
use crate::pkgindex::PackageIndex;
use crate::report::{self, ReportGenerator};
use crate::result::{GeneratorResult, HintSubject};
use crate::stats::{StatsSample, StatsStore};
use crate::store::DataStore;

/// Drives the metadata extraction for whole suites: one (suite, section,
/// arch) slice at a time, with a worker pool over the slice's packages.
pub struct Engine {
    config: Arc<Config>,
    store: Arc<dyn DataStore>,
    index: Arc<PackageIndex>,
    jobs: usize,
}

impl Engine {
    pub fn new(config: Config, store: Arc<dyn DataStore>) -> Self {
        let index = Arc::new(PackageIndex::new(&config.archive_root, &config.tmp_dir));
        Engine {
            config: Arc::new(config),
            store,
            index,
            jobs: 4,
        }
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Process one suite: extract metadata for changed slices, then emit
    /// reports, catalog data and statistics.
    pub async fn process_suite(&self, suite_name: &str) -> Result<(), GeneratorError> {
        let suite = self
            .config
            .suites
            .get(suite_name)
            .ok_or_else(|| GeneratorError::new(&format!("Unknown suite: {}", suite_name)))?
            .clone();

        fs::create_dir_all(&self.config.tmp_dir)
            .map_err(|e| GeneratorError::new(&format!("Failed to create tmp dir: {}", e)))?;

        // Resolve the report templates up front; a missing template
        // directory fails the whole run.
        let reporter = ReportGenerator::new(&self.config)?;

        for section in &suite.sections {
            let mut section_packages: Vec<Package> = Vec::new();

            for arch in &suite.architectures {
                let packages = self.index.packages_for(suite_name, section, arch);

                if self
                    .index
                    .has_changes(self.store.as_ref(), suite_name, section, arch)
                {
                    self.process_slice(suite_name, section, arch, &packages)
                        .await?;
                } else {
                    info!(
                        "Index for {}/{}/{} is unchanged, skipping extraction",
                        suite_name, section, arch
                    );
                }

                section_packages.extend(packages.iter().cloned());
            }

            let summary =
                report::preprocess(self.store.as_ref(), suite_name, section, &section_packages);
            reporter.render_section(&summary)?;

            let stats = StatsStore::new(self.store.as_ref());
            stats.add_statistics(&StatsSample::new(
                suite_name,
                section,
                summary.total_infos,
                summary.total_warnings,
                summary.total_errors,
            ))?;
        }

        reporter.render_main_index()?;
        self.index.release();
        Ok(())
    }

    async fn process_slice(
        &self,
        suite: &str,
        section: &str,
        arch: &str,
        packages: &Arc<Vec<Package>>,
    ) -> Result<(), GeneratorError> {
        info!(
            "Processing {} packages for {}/{}/{}",
            packages.len(),
            suite,
            section,
            arch
        );

        let semaphore = Arc::new(Semaphore::new(self.jobs));
        let mut tasks = Vec::new();

        for i in 0..packages.len() {
            let packages = packages.clone();
            let semaphore = semaphore.clone();
            let config = self.config.clone();
            let store = self.store.clone();

            let task = tokio::spawn(async move {
                let _permit = semaphore.acquire().await.unwrap();
                process_package(&config, store.as_ref(), &packages[i])
            });
            tasks.push(task);
        }

        let mut components = Vec::new();
        for task in tasks {
            match task.await {
                Ok(Ok(mut cpts)) => components.append(&mut cpts),
                Ok(Err(e)) => warn!("Package processing failed: {}", e),
                Err(e) => warn!("Worker task failed: {}", e),
            }
        }

        catalog::write_catalog(
            &components,
            suite,
            section,
            arch,
            &self.config.data_export_dir(),
            self.config.format_version,
        )?;
        Ok(())
    }
}

/// Process one package on the worker's stack: locate the payload, parse its
/// desktop entries, persist the accumulated hints, and hand the components
/// back for catalog emission. Problems become hints; only a failure to
/// persist is surfaced.
fn process_package(
    config: &Config,
    store: &dyn DataStore,
    pkg: &Package,
) -> Result<Vec<Component>, GeneratorError> {
    let mut result = GeneratorResult::new(&pkg.pkid());
    let fetcher = Fetcher::new(&config.archive_root, &config.tmp_dir);

    match fetcher.fetch(&pkg.filename) {
        Ok(payload) => {
            let scratch_name = format!("deb-{}", pkg.pkid().replace('/', "-"));
            match deb::extract_desktop_files(&payload, &config.tmp_dir, &scratch_name) {
                Ok(files) => {
                    let parser = DesktopParser::new(config.format_version);
                    for (basename, contents) in files {
                        parser.parse(&mut result, &basename, &contents, false);
                    }
                }
                Err(e) => {
                    let mut vars = HashMap::new();
                    vars.insert("msg".to_string(), e.to_string());
                    result.add_hint(
                        HintSubject::File(pkg.filename.clone()),
                        "pkg-extract-error",
                        vars,
                    );
                }
            }
        }
        Err(e) => {
            let mut vars = HashMap::new();
            vars.insert("msg".to_string(), e.to_string());
            result.add_hint(
                HintSubject::File(pkg.filename.clone()),
                "pkg-download-failed",
                vars,
            );
        }
    }

    // Attach the package's long descriptions to its components
    let mut missing_desc = Vec::new();
    for cpt in result.components_mut() {
        for (locale, desc) in &pkg.descriptions {
            cpt.set_description(locale, desc);
        }
        if cpt.descriptions().is_empty() {
            missing_desc.push(cpt.id.clone());
        }
    }
    for cid in missing_desc {
        result.add_hint(
            HintSubject::Component(cid),
            "description-missing",
            HashMap::new(),
        );
    }

    store.set_hints(&pkg.pkid(), &result.hints_blob()?)?;
    Ok(result.components().cloned().collect())
}
