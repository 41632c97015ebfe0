use std::collections::HashSet;

use log::info;

use super::model::SeasonalTable;

/// Drop rows that repeat an earlier row across every column.
///
/// The first occurrence of each distinct row survives and survivors keep
/// their original relative order.
pub fn dedupe(table: SeasonalTable) -> SeasonalTable {
    let before = table.len();
    let keep: Vec<bool> = {
        let mut seen = HashSet::with_capacity(before);
        table
            .records
            .iter()
            .map(|r| seen.insert(r.row_key()))
            .collect()
    };

    let records: Vec<_> = table
        .records
        .into_iter()
        .zip(keep)
        .filter_map(|(r, keep)| keep.then_some(r))
        .collect();

    let removed = before - records.len();
    if removed > 0 {
        info!("removed {removed} duplicate rows");
    }
    SeasonalTable::new(records, table.extra_columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::tests::record;
    use crate::data::model::{ExtraColumn, MetadataValue, ValueKind};

    #[test]
    fn keeps_first_occurrence_in_order() {
        let a = record("ET", "0000000001", "m", "summer", "historical", "1995-2014", 1.0);
        let b = record("ET", "0000000002", "m", "summer", "historical", "1995-2014", 2.0);
        let c = record("RO", "0000000001", "m", "summer", "historical", "1995-2014", 3.0);
        let table = SeasonalTable::new(
            vec![a.clone(), b.clone(), a.clone(), c.clone(), b.clone(), a.clone()],
            Vec::new(),
        );

        let out = dedupe(table);
        assert_eq!(out.records, vec![a, b, c]);
    }

    #[test]
    fn every_column_participates() {
        let a = record("ET", "0000000001", "m", "summer", "historical", "1995-2014", 1.0);
        let mut other_period = a.clone();
        other_period.time_period = "1981-2000".into();
        let mut other_mean = a.clone();
        other_mean.mean_value = 1.0000001;
        let mut other_extra = a.clone();
        other_extra
            .extra
            .insert("count".into(), MetadataValue::Integer(3));

        let table = SeasonalTable::new(
            vec![a, other_period, other_mean, other_extra],
            vec![ExtraColumn {
                name: "count".into(),
                kind: ValueKind::Integer,
            }],
        );
        assert_eq!(dedupe(table).len(), 4);
    }

    #[test]
    fn nan_means_are_duplicates() {
        let a = record("ET", "0000000001", "m", "summer", "historical", "1995-2014", f64::NAN);
        let table = SeasonalTable::new(vec![a.clone(), a], Vec::new());
        assert_eq!(dedupe(table).len(), 1);
    }
}
