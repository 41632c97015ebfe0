use std::io::Write;

use anyhow::{Context, Result};

use super::filter::ValueColumn;
use super::model::{columns, SeasonalTable};

/// Write the selected rows as CSV: the key columns plus one value column,
/// named after the column it was read from. A missing value is an empty cell.
pub fn write_csv<W: Write>(
    table: &SeasonalTable,
    indices: &[usize],
    value: ValueColumn,
    sink: W,
) -> Result<()> {
    let mut writer = csv::Writer::from_writer(sink);
    writer
        .write_record([
            columns::ZONE_ID,
            columns::VARIABLE,
            columns::WEATHER_SOURCE,
            columns::SEASON,
            columns::SCENARIO,
            columns::TIME_PERIOD,
            value.name(),
        ])
        .context("writing CSV header")?;

    for &i in indices {
        let r = &table.records[i];
        let cell = value.value_of(r).map(|v| v.to_string()).unwrap_or_default();
        writer
            .write_record([
                r.zone_id.as_str(),
                r.variable_name.as_str(),
                r.weather_source.as_str(),
                r.season.as_str(),
                r.scenario.as_str(),
                r.time_period.as_str(),
                cell.as_str(),
            ])
            .with_context(|| format!("writing CSV row {i}"))?;
    }
    writer.flush().context("flushing CSV")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::tests::record;

    #[test]
    fn writes_selected_rows() {
        let mut proj = record("ET", "0000000123", "modelA", "summer", "RCP85", "2040-2059", 12.5);
        proj.difference = Some(2.5);
        let table = SeasonalTable::new(
            vec![
                record("ET", "0000000123", "modelA", "summer", "historical", "1995-2014", 10.0),
                proj,
            ],
            Vec::new(),
        );

        let mut out = Vec::new();
        write_csv(&table, &[0, 1], ValueColumn::Difference, &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "huc10,swb_variable_name,weather_data_name,season_name,scenario_name,time_period,diff\n\
             0000000123,ET,modelA,summer,historical,1995-2014,\n\
             0000000123,ET,modelA,summer,RCP85,2040-2059,2.5\n"
        );

        let mut out = Vec::new();
        write_csv(&table, &[1], ValueColumn::Mean, &mut out).unwrap();
        assert!(String::from_utf8(out).unwrap().ends_with(",12.5\n"));
    }
}
