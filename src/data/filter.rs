use super::model::{Record, SeasonalTable};

// ---------------------------------------------------------------------------
// Query: exact-match selection over the differenced table
// ---------------------------------------------------------------------------

/// Shared historical period every projection horizon is shown against.
pub const BASELINE_PERIOD: &str = "1995-2014";
pub const MID_CENTURY_PERIOD: &str = "2040-2059";
pub const LATE_CENTURY_PERIOD: &str = "2080-2099";

/// Which numeric column a view reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueColumn {
    Mean,
    Difference,
}

impl ValueColumn {
    pub fn name(self) -> &'static str {
        match self {
            ValueColumn::Mean => super::model::columns::MEAN,
            ValueColumn::Difference => super::model::columns::DIFFERENCE,
        }
    }

    pub fn value_of(self, record: &Record) -> Option<f64> {
        match self {
            ValueColumn::Mean => Some(record.mean_value),
            ValueColumn::Difference => record.difference,
        }
    }
}

/// A filter left as `None` means "no constraint" on that field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pub zone_id: Option<String>,
    pub variable_name: Option<String>,
    pub season: Option<String>,
    /// Show differences from the historical baseline instead of raw means.
    pub compare_to_historical: bool,
}

impl Query {
    pub fn value_column(&self) -> ValueColumn {
        if self.compare_to_historical {
            ValueColumn::Difference
        } else {
            ValueColumn::Mean
        }
    }

    /// A record passes when every set field matches exactly. In compare mode
    /// baseline rows are hidden since they have nothing to compare.
    pub fn matches(&self, record: &Record) -> bool {
        let field_ok = |wanted: &Option<String>, actual: &str| {
            wanted.as_deref().map_or(true, |w| w == actual)
        };
        field_ok(&self.zone_id, &record.zone_id)
            && field_ok(&self.variable_name, &record.variable_name)
            && field_ok(&self.season, &record.season)
            && !(self.compare_to_historical && record.is_baseline())
    }
}

/// Return indices of records that pass the query, in table order.
pub fn filtered_indices(table: &SeasonalTable, query: &Query) -> Vec<usize> {
    table
        .records
        .iter()
        .enumerate()
        .filter(|(_, r)| query.matches(r))
        .map(|(i, _)| i)
        .collect()
}

// ---------------------------------------------------------------------------
// Horizon: the baseline period plus one future period
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Horizon {
    #[value(name = "mid")]
    MidCentury,
    #[value(name = "late")]
    LateCentury,
}

impl Horizon {
    pub fn period(self) -> &'static str {
        match self {
            Horizon::MidCentury => MID_CENTURY_PERIOD,
            Horizon::LateCentury => LATE_CENTURY_PERIOD,
        }
    }

    pub fn includes(self, time_period: &str) -> bool {
        time_period == BASELINE_PERIOD || time_period == self.period()
    }
}

/// Narrow an index set to the rows of one horizon.
pub fn horizon_indices(table: &SeasonalTable, indices: &[usize], horizon: Horizon) -> Vec<usize> {
    indices
        .iter()
        .copied()
        .filter(|&i| horizon.includes(&table.records[i].time_period))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::tests::record;

    fn table() -> SeasonalTable {
        let mut rows = vec![
            record("ET", "0000000001", "a", "summer", "historical", "1995-2014", 1.0),
            record("ET", "0000000001", "a", "summer", "ssp245", "2040-2059", 2.0),
            record("ET", "0000000001", "a", "summer", "ssp245", "2080-2099", 3.0),
            record("ET", "0000000001", "a", "winter", "ssp245", "2040-2059", 4.0),
            record("RO", "0000000002", "a", "summer", "ssp585", "2080-2099", 5.0),
        ];
        rows[1].difference = Some(1.0);
        rows[2].difference = Some(2.0);
        SeasonalTable::new(rows, Vec::new())
    }

    #[test]
    fn empty_query_selects_everything() {
        let t = table();
        assert_eq!(filtered_indices(&t, &Query::default()), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn filters_combine() {
        let t = table();
        let query = Query {
            zone_id: Some("0000000001".into()),
            season: Some("summer".into()),
            ..Default::default()
        };
        assert_eq!(filtered_indices(&t, &query), vec![0, 1, 2]);

        let query = Query {
            variable_name: Some("RO".into()),
            ..Default::default()
        };
        assert_eq!(filtered_indices(&t, &query), vec![4]);
    }

    #[test]
    fn compare_mode_hides_baseline_and_reads_difference() {
        let t = table();
        let query = Query {
            season: Some("summer".into()),
            variable_name: Some("ET".into()),
            compare_to_historical: true,
            ..Default::default()
        };
        let idx = filtered_indices(&t, &query);
        assert_eq!(idx, vec![1, 2]);
        let values: Vec<_> = idx
            .iter()
            .map(|&i| query.value_column().value_of(&t.records[i]))
            .collect();
        assert_eq!(values, vec![Some(1.0), Some(2.0)]);
        assert_eq!(Query::default().value_column(), ValueColumn::Mean);
    }

    #[test]
    fn horizons_keep_the_baseline_period() {
        let t = table();
        let all = filtered_indices(&t, &Query::default());
        assert_eq!(horizon_indices(&t, &all, Horizon::MidCentury), vec![0, 1, 3]);
        assert_eq!(horizon_indices(&t, &all, Horizon::LateCentury), vec![0, 2, 4]);
    }
}
