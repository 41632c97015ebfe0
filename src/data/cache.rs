use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use log::{error, info};

use super::baseline::BaselineJoiner;
use super::dedupe::dedupe;
use super::loader;
use super::model::SeasonalTable;
use super::writer;
use crate::error::{Error, Result};

/// Where a [`CachedTable`] came from.
#[derive(Debug)]
pub enum Origin {
    /// Read from an existing cache file; the raw file was not touched.
    Cache,
    /// Computed from the raw file. `persisted` carries the outcome of the
    /// cache write, which never invalidates the computed table.
    Computed { persisted: Result<()> },
}

#[derive(Debug)]
pub struct CachedTable {
    pub table: SeasonalTable,
    pub origin: Origin,
}

/// The differenced table, computed once per raw file and kept on disk.
///
/// An existing cache file is trusted unconditionally: when the raw file
/// changes the operator deletes the cache. Two processes sharing one cache
/// path at the same time is unsupported; each write is atomic but the last
/// one wins.
#[derive(Debug, Clone)]
pub struct ResultCache {
    raw_path: PathBuf,
    cache_path: PathBuf,
    joiner: BaselineJoiner,
}

impl ResultCache {
    pub fn new(raw_path: impl Into<PathBuf>, cache_path: impl Into<PathBuf>) -> Self {
        ResultCache {
            raw_path: raw_path.into(),
            cache_path: cache_path.into(),
            joiner: BaselineJoiner::default(),
        }
    }

    pub fn with_joiner(mut self, joiner: BaselineJoiner) -> Self {
        self.joiner = joiner;
        self
    }

    pub fn raw_path(&self) -> &Path {
        &self.raw_path
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    /// Return the cached table if present, otherwise load, dedupe, difference
    /// and persist it.
    pub fn load_or_compute(&self) -> Result<CachedTable> {
        if self.cache_path.exists() {
            info!(
                "reusing cache {} (delete it to recompute)",
                self.cache_path.display()
            );
            let table = loader::load_cache(&self.cache_path)?;
            return Ok(CachedTable {
                table,
                origin: Origin::Cache,
            });
        }

        let table = self.compute()?;
        let persisted = persist(&table, &self.cache_path);
        match &persisted {
            Ok(()) => info!("wrote {} rows to {}", table.len(), self.cache_path.display()),
            Err(e) => error!("{e}"),
        }
        Ok(CachedTable {
            table,
            origin: Origin::Computed { persisted },
        })
    }

    /// Raw file → loader → dedupe → baseline differences, no caching.
    pub fn compute(&self) -> Result<SeasonalTable> {
        let table = loader::load(&self.raw_path)?;
        let table = dedupe(table);
        self.joiner.compute_differences(table)
    }
}

/// Write `table` next to `path` under a temporary name, sync it and rename it
/// into place. On any failure the temporary file is removed and whatever was
/// at `path` before is left untouched.
pub fn persist(table: &SeasonalTable, path: &Path) -> Result<()> {
    write_atomic(table, path).map_err(|e| Error::cache_persist(path, e))
}

fn write_atomic(table: &SeasonalTable, path: &Path) -> anyhow::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".swb-delta-")
        .suffix(".parquet.tmp")
        .tempfile_in(dir)
        .context("creating temporary cache file")?;

    writer::write_parquet(table, tmp.as_file_mut())?;
    tmp.as_file_mut().flush().context("flushing cache file")?;
    tmp.as_file().sync_all().context("syncing cache file")?;
    tmp.persist(path)
        .map_err(|e| e.error)
        .context("renaming cache file into place")?;
    Ok(())
}
