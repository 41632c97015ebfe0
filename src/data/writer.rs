use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use super::model::{columns, ExtraColumn, MetadataValue, Record, SeasonalTable, ValueKind};

/// Output schema: raw columns, pass-through columns, then `huc10` and `diff`.
///
/// `zone` is always written as Utf8, whatever its raw type (integer or
/// dictionary zones are stringified on load), so a cache can differ from its
/// raw file in that column's type. pandas readers expect a string `zone`.
pub fn schema(table: &SeasonalTable) -> SchemaRef {
    let mut fields = vec![
        Field::new(columns::ZONE, DataType::Utf8, false),
        Field::new(columns::VARIABLE, DataType::Utf8, false),
        Field::new(columns::WEATHER_SOURCE, DataType::Utf8, false),
        Field::new(columns::SEASON, DataType::Utf8, false),
        Field::new(columns::SCENARIO, DataType::Utf8, false),
        Field::new(columns::TIME_PERIOD, DataType::Utf8, false),
        Field::new(columns::MEAN, DataType::Float64, false),
    ];
    fields.extend(
        table
            .extra_columns
            .iter()
            .map(|c| Field::new(&c.name, storage_type(c.kind), true)),
    );
    fields.push(Field::new(columns::ZONE_ID, DataType::Utf8, false));
    fields.push(Field::new(columns::DIFFERENCE, DataType::Float64, true));
    Arc::new(Schema::new(fields))
}

pub(crate) fn storage_type(kind: ValueKind) -> DataType {
    match kind {
        ValueKind::Text => DataType::Utf8,
        ValueKind::Integer => DataType::Int64,
        ValueKind::Float => DataType::Float64,
        ValueKind::Bool => DataType::Boolean,
    }
}

/// Convert the whole table into a single record batch.
pub fn to_record_batch(table: &SeasonalTable) -> Result<RecordBatch> {
    let text = |f: fn(&Record) -> &str| -> ArrayRef {
        Arc::new(StringArray::from_iter_values(table.records.iter().map(f)))
    };

    let mut arrays: Vec<ArrayRef> = vec![
        text(|r| &r.zone),
        text(|r| &r.variable_name),
        text(|r| &r.weather_source),
        text(|r| &r.season),
        text(|r| &r.scenario),
        text(|r| &r.time_period),
        Arc::new(Float64Array::from_iter_values(
            table.records.iter().map(|r| r.mean_value),
        )),
    ];
    for extra in &table.extra_columns {
        arrays.push(extra_array(&table.records, extra));
    }
    arrays.push(text(|r| &r.zone_id));
    arrays.push(Arc::new(Float64Array::from(
        table.records.iter().map(|r| r.difference).collect::<Vec<_>>(),
    )));

    RecordBatch::try_new(schema(table), arrays).context("assembling record batch")
}

fn extra_array(records: &[Record], extra: &ExtraColumn) -> ArrayRef {
    let values = records
        .iter()
        .map(|r| r.extra.get(&extra.name).unwrap_or(&MetadataValue::Null));
    match extra.kind {
        ValueKind::Text => Arc::new(StringArray::from_iter(values.map(|v| match v {
            MetadataValue::String(s) => Some(s.clone()),
            _ => None,
        }))),
        ValueKind::Integer => Arc::new(Int64Array::from_iter(values.map(|v| match v {
            MetadataValue::Integer(i) => Some(*i),
            _ => None,
        }))),
        ValueKind::Float => Arc::new(Float64Array::from_iter(values.map(|v| match v {
            MetadataValue::Float(f) => Some(*f),
            MetadataValue::Integer(i) => Some(*i as f64),
            _ => None,
        }))),
        ValueKind::Bool => Arc::new(BooleanArray::from_iter(values.map(|v| match v {
            MetadataValue::Bool(b) => Some(*b),
            _ => None,
        }))),
    }
}

/// Write the table as a single-row-group parquet file. The same table always
/// produces the same bytes.
pub fn write_parquet<W: Write + Send>(table: &SeasonalTable, sink: W) -> Result<()> {
    let batch = to_record_batch(table)?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(sink, batch.schema(), Some(props))
        .context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::tests::record;
    use arrow::array::{Array, AsArray};
    use arrow::datatypes::Float64Type;

    fn sample() -> SeasonalTable {
        let mut hist =
            record("ET", "0000000123", "modelA", "summer", "historical", "1995-2014", 10.0);
        hist.extra.insert("count".into(), MetadataValue::Integer(4));
        let mut proj = record("ET", "0000000123", "modelA", "summer", "RCP85", "2040-2059", 12.5);
        proj.difference = Some(2.5);
        SeasonalTable::new(
            vec![hist, proj],
            vec![ExtraColumn {
                name: "count".into(),
                kind: ValueKind::Integer,
            }],
        )
    }

    #[test]
    fn column_order_and_nulls() {
        let batch = to_record_batch(&sample()).unwrap();
        let schema = batch.schema();
        let names: Vec<&str> = schema
            .fields()
            .iter()
            .map(|f| f.name().as_str())
            .collect();
        assert_eq!(
            names,
            vec![
                "zone",
                "swb_variable_name",
                "weather_data_name",
                "season_name",
                "scenario_name",
                "time_period",
                "mean",
                "count",
                "huc10",
                "diff"
            ]
        );

        let count = batch.column_by_name("count").unwrap();
        assert!(count.is_valid(0));
        assert!(count.is_null(1));

        let diff = batch
            .column_by_name("diff")
            .unwrap()
            .as_primitive::<Float64Type>();
        assert!(diff.is_null(0));
        assert_eq!(diff.value(1), 2.5);
    }

    #[test]
    fn output_is_deterministic() {
        let mut a = Vec::new();
        let mut b = Vec::new();
        write_parquet(&sample(), &mut a).unwrap();
        write_parquet(&sample(), &mut b).unwrap();
        assert!(!a.is_empty());
        assert_eq!(a, b);
    }
}
