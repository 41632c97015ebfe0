use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::data::baseline::{AmbiguousBaselinePolicy, BaselineJoiner, MissingBaselinePolicy};
use crate::data::cache::ResultCache;
use crate::error::{Error, Result};

/// Run configuration. Every field has a default so a config file only needs
/// the values it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Raw zonal statistics (parquet or CSV).
    pub raw_path: PathBuf,
    /// Differenced table, written on the first run and reused afterwards.
    pub cache_path: PathBuf,
    pub on_missing_baseline: MissingBaselinePolicy,
    pub on_ambiguous_baseline: AmbiguousBaselinePolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            raw_path: PathBuf::from("data/merged_swb_output__mean_seasonal_output.parquet"),
            cache_path: PathBuf::from(
                "data/merged_swb_output__mean_seasonal_output__w_differences.parquet",
            ),
            on_missing_baseline: MissingBaselinePolicy::default(),
            on_ambiguous_baseline: AmbiguousBaselinePolicy::default(),
        }
    }
}

impl Config {
    /// Read a JSON config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        serde_json::from_str(&text).map_err(|e| Error::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    pub fn joiner(&self) -> BaselineJoiner {
        BaselineJoiner::new(self.on_missing_baseline, self.on_ambiguous_baseline)
    }

    pub fn cache(&self) -> ResultCache {
        ResultCache::new(&self.raw_path, &self.cache_path).with_joiner(self.joiner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("swb-delta.json");
        std::fs::write(
            &path,
            r#"{ "raw_path": "in.csv", "on_missing_baseline": "skip" }"#,
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.raw_path, PathBuf::from("in.csv"));
        assert_eq!(config.cache_path, Config::default().cache_path);
        assert_eq!(config.on_missing_baseline, MissingBaselinePolicy::Skip);
        assert_eq!(config.on_ambiguous_baseline, AmbiguousBaselinePolicy::First);
        assert_eq!(config.cache().raw_path(), Path::new("in.csv"));
    }

    #[test]
    fn unknown_field_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("swb-delta.json");
        std::fs::write(&path, r#"{ "raw": "in.csv" }"#).unwrap();

        let err = Config::from_file(&path).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let dir = tempdir().unwrap();
        assert!(Config::from_file(&dir.path().join("absent.json")).is_err());
    }
}
