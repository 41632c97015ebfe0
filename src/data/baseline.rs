use std::collections::HashMap;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use super::model::{BaselineKey, BaselineKeyRef, SeasonalTable};
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Policies for keys that break the one-baseline-per-key invariant
// ---------------------------------------------------------------------------

/// What to do with a projected row that has no historical partner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MissingBaselinePolicy {
    /// Abort the whole computation, naming the key.
    #[default]
    Fail,
    /// Leave `difference` unset for that row and keep going.
    Skip,
}

/// What to do when several historical rows share a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AmbiguousBaselinePolicy {
    /// Use the first one in table order.
    #[default]
    First,
    /// Abort, naming the key and the number of matches.
    Fail,
}

// ---------------------------------------------------------------------------
// BaselineIndex – historical means by join key
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct Baseline {
    /// Mean of the first historical row seen for the key.
    mean: f64,
    /// Row index of that first row.
    row: usize,
    matches: usize,
}

/// `(variable, zone_id, weather_source, season) → historical mean`, built in
/// one pass over the table.
#[derive(Debug)]
pub struct BaselineIndex<'a> {
    entries: HashMap<BaselineKeyRef<'a>, Baseline>,
}

impl<'a> BaselineIndex<'a> {
    pub fn build(table: &'a SeasonalTable) -> Self {
        let mut entries: HashMap<BaselineKeyRef<'a>, Baseline> = HashMap::new();
        for (row, record) in table.records.iter().enumerate() {
            if !record.is_baseline() {
                continue;
            }
            entries
                .entry(record.baseline_key())
                .and_modify(|b| b.matches += 1)
                .or_insert(Baseline {
                    mean: record.mean_value,
                    row,
                    matches: 1,
                });
        }
        BaselineIndex { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Baseline mean for a key, if any historical row carries it.
    pub fn mean(&self, key: &BaselineKeyRef<'_>) -> Option<f64> {
        self.entries.get(key).map(|b| b.mean)
    }

    /// Keys matched by more than one historical row, in table order of their
    /// first match, with the match count.
    pub fn ambiguous(&self) -> Vec<(BaselineKeyRef<'a>, usize)> {
        let mut keys: Vec<_> = self
            .entries
            .iter()
            .filter(|(_, b)| b.matches > 1)
            .map(|(k, b)| (b.row, *k, b.matches))
            .collect();
        keys.sort_by_key(|(row, _, _)| *row);
        keys.into_iter().map(|(_, k, n)| (k, n)).collect()
    }
}

// ---------------------------------------------------------------------------
// BaselineJoiner
// ---------------------------------------------------------------------------

/// Pairs every projected row with its historical baseline and stores
/// `mean - baseline.mean` in `difference`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BaselineJoiner {
    pub on_missing: MissingBaselinePolicy,
    pub on_ambiguous: AmbiguousBaselinePolicy,
}

impl BaselineJoiner {
    pub fn new(on_missing: MissingBaselinePolicy, on_ambiguous: AmbiguousBaselinePolicy) -> Self {
        BaselineJoiner {
            on_missing,
            on_ambiguous,
        }
    }

    /// Return the table with `difference` filled for every projected row.
    ///
    /// Historical rows always come back with `difference == None`, whatever
    /// they carried before.
    pub fn compute_differences(&self, table: SeasonalTable) -> Result<SeasonalTable> {
        let differences = {
            let index = BaselineIndex::build(&table);
            debug!("indexed {} historical baselines", index.len());
            self.check_ambiguous(&index)?;
            self.differences(&table, &index)?
        };

        let mut table = table;
        for (record, difference) in table.records.iter_mut().zip(differences) {
            record.difference = difference;
        }
        Ok(table)
    }

    fn check_ambiguous(&self, index: &BaselineIndex<'_>) -> Result<()> {
        let ambiguous = index.ambiguous();
        let Some(&(first, count)) = ambiguous.first() else {
            return Ok(());
        };
        match self.on_ambiguous {
            AmbiguousBaselinePolicy::Fail => Err(Error::AmbiguousBaseline {
                key: first.into(),
                count,
            }),
            AmbiguousBaselinePolicy::First => {
                for (key, count) in &ambiguous {
                    warn!(
                        "{count} historical baselines match {}; using the first",
                        BaselineKey::from(*key)
                    );
                }
                Ok(())
            }
        }
    }

    fn differences(
        &self,
        table: &SeasonalTable,
        index: &BaselineIndex<'_>,
    ) -> Result<Vec<Option<f64>>> {
        let mut out = Vec::with_capacity(table.len());
        let mut computed = 0usize;
        let mut skipped = 0usize;

        for record in &table.records {
            if record.is_baseline() {
                out.push(None);
                continue;
            }
            match index.mean(&record.baseline_key()) {
                Some(baseline) => {
                    computed += 1;
                    out.push(Some(record.mean_value - baseline));
                }
                None => match self.on_missing {
                    MissingBaselinePolicy::Fail => {
                        return Err(Error::JoinFailure {
                            key: record.owned_baseline_key(),
                        })
                    }
                    MissingBaselinePolicy::Skip => {
                        warn!(
                            "no historical baseline for {} ({}, {}); difference left unset",
                            record.owned_baseline_key(),
                            record.scenario,
                            record.time_period
                        );
                        skipped += 1;
                        out.push(None);
                    }
                },
            }
        }

        info!(
            "computed {computed} differences against {} baselines ({skipped} without baseline)",
            index.len()
        );
        Ok(out)
    }
}
