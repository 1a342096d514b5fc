// stats.rs -- Timestamped aggregate statistics

use std::collections::BTreeMap;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::exception::GeneratorError;
use crate::store::DataStore;

// Real metadata accounting is deferred; callers override through
// `with_metadata_count`.
const METADATA_COUNT_PLACEHOLDER: u64 = 42;

/// One aggregate sample for a (suite, section) slice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSample {
    pub suite: String,
    pub section: String,
    #[serde(rename = "totalInfos")]
    pub total_infos: u64,
    #[serde(rename = "totalWarnings")]
    pub total_warnings: u64,
    #[serde(rename = "totalErrors")]
    pub total_errors: u64,
    #[serde(rename = "totalMetadata")]
    pub total_metadata: u64,
}

impl StatsSample {
    pub fn new(suite: &str, section: &str, infos: u64, warnings: u64, errors: u64) -> Self {
        StatsSample {
            suite: suite.to_string(),
            section: section.to_string(),
            total_infos: infos,
            total_warnings: warnings,
            total_errors: errors,
            total_metadata: METADATA_COUNT_PLACEHOLDER,
        }
    }

    pub fn with_metadata_count(mut self, count: u64) -> Self {
        self.total_metadata = count;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeriesPoint {
    pub x: u64,
    pub y: u64,
}

/// suite → section → metric name → points sorted ascending by x.
pub type SeriesMap = BTreeMap<String, BTreeMap<String, BTreeMap<String, Vec<SeriesPoint>>>>;

/// Statistics facade over the persistent store.
pub struct StatsStore<'a> {
    store: &'a dyn DataStore,
}

impl<'a> StatsStore<'a> {
    pub fn new(store: &'a dyn DataStore) -> Self {
        StatsStore { store }
    }

    /// Persist one sample under the current time.
    pub fn add_statistics(&self, sample: &StatsSample) -> Result<(), GeneratorError> {
        let blob = serde_json::to_string(sample)
            .map_err(|e| GeneratorError::new(&format!("Failed to serialize sample: {}", e)))?;
        self.store.add_statistics(&blob)
    }

    /// All stored samples with their timestamps.
    pub fn get_statistics(&self) -> Vec<(u64, StatsSample)> {
        self.store
            .get_statistics()
            .into_iter()
            .filter_map(|(ts, blob)| match serde_json::from_str(&blob) {
                Ok(sample) => Some((ts, sample)),
                Err(e) => {
                    warn!("Skipping unreadable statistics sample at {}: {}", ts, e);
                    None
                }
            })
            .collect()
    }

    /// Group all samples into per-metric time series, sorted ascending by
    /// timestamp within each series.
    pub fn export_series(&self) -> SeriesMap {
        let mut map: SeriesMap = BTreeMap::new();

        for (ts, sample) in self.get_statistics() {
            let metrics = [
                ("infos", sample.total_infos),
                ("warnings", sample.total_warnings),
                ("errors", sample.total_errors),
                ("metadata", sample.total_metadata),
            ];

            let section_map = map
                .entry(sample.suite.clone())
                .or_default()
                .entry(sample.section.clone())
                .or_default();
            for (name, value) in metrics {
                section_map
                    .entry(name.to_string())
                    .or_default()
                    .push(SeriesPoint { x: ts, y: value });
            }
        }

        for sections in map.values_mut() {
            for series in sections.values_mut() {
                for points in series.values_mut() {
                    points.sort_by_key(|p| p.x);
                }
            }
        }

        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::DiskStore;

    #[test]
    fn test_sample_roundtrip() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = DiskStore::open(dir.path()).unwrap();
        let stats = StatsStore::new(&store);

        stats
            .add_statistics(&StatsSample::new("sid", "main", 3, 2, 1))
            .unwrap();

        let samples = stats.get_statistics();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].1.suite, "sid");
        assert_eq!(samples[0].1.total_infos, 3);
        assert_eq!(samples[0].1.total_metadata, METADATA_COUNT_PLACEHOLDER);
    }

    #[test]
    fn test_metadata_count_override() {
        let sample = StatsSample::new("sid", "main", 0, 0, 0).with_metadata_count(117);
        assert_eq!(sample.total_metadata, 117);
    }

    #[test]
    fn test_series_sorted_by_timestamp() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = DiskStore::open(dir.path()).unwrap();
        let stats = StatsStore::new(&store);

        for errors in [5, 3, 7] {
            stats
                .add_statistics(&StatsSample::new("sid", "main", 0, 0, errors))
                .unwrap();
        }

        let series = stats.export_series();
        let points = &series["sid"]["main"]["errors"];
        assert_eq!(points.len(), 3);
        for pair in points.windows(2) {
            assert!(pair[0].x <= pair[1].x);
        }
        let values: Vec<u64> = points.iter().map(|p| p.y).collect();
        assert_eq!(values, vec![5, 3, 7]);
    }

    #[test]
    fn test_series_grouped_by_suite_and_section() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = DiskStore::open(dir.path()).unwrap();
        let stats = StatsStore::new(&store);

        stats
            .add_statistics(&StatsSample::new("sid", "main", 1, 0, 0))
            .unwrap();
        stats
            .add_statistics(&StatsSample::new("sid", "contrib", 2, 0, 0))
            .unwrap();
        stats
            .add_statistics(&StatsSample::new("bookworm", "main", 3, 0, 0))
            .unwrap();

        let series = stats.export_series();
        assert_eq!(series.len(), 2);
        assert_eq!(series["sid"].len(), 2);
        assert_eq!(series["sid"]["contrib"]["infos"][0].y, 2);
        assert_eq!(series["bookworm"]["main"]["infos"][0].y, 3);
    }
}
