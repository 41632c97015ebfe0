use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{anyhow, bail, Context};
use arrow::array::{Array, ArrayRef, AsArray, Float64Array, StringArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Float64Type, Int64Type};
use arrow::record_batch::RecordBatch;
use log::info;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use super::model::{
    columns, ExtraColumn, MetadataValue, Record, SeasonalTable, ValueKind, NO_ZONE_SENTINEL,
    ZONE_ID_WIDTH,
};
use super::writer::storage_type;
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load the raw zonal statistics.  Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` / `.pq` – as written by `df.to_parquet()` (recommended)
/// * `.csv`             – header row with the same column names
///
/// Rows outside every HUC (sentinel zone) are dropped, the remaining zone
/// codes are zero-padded into `zone_id`. Nothing is written.
pub fn load(path: &Path) -> Result<SeasonalTable> {
    let table = read_raw(path).map_err(|e| Error::data_load(path, e))?;
    info!(
        "loaded {} rows ({} pass-through columns) from {}",
        table.len(),
        table.extra_columns.len(),
        path.display()
    );
    Ok(table)
}

/// Read a previously written differenced table back, verbatim.
pub fn load_cache(path: &Path) -> Result<SeasonalTable> {
    if !path.is_file() {
        return Err(Error::data_load(path, anyhow!("file not found")));
    }
    let table = read_parquet(path, Layout::Cache).map_err(|e| Error::data_load(path, e))?;
    info!("loaded {} cached rows from {}", table.len(), path.display());
    Ok(table)
}

/// Left-pad a raw zone code with zeros to the HUC10 width.
pub fn pad_zone(raw: &str) -> anyhow::Result<String> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        bail!("zone '{raw}' is not a numeric HUC code");
    }
    if raw.len() > ZONE_ID_WIDTH {
        bail!("zone '{raw}' is wider than {ZONE_ID_WIDTH} digits");
    }
    Ok(format!("{raw:0>width$}", width = ZONE_ID_WIDTH))
}

fn read_raw(path: &Path) -> anyhow::Result<SeasonalTable> {
    if !path.is_file() {
        bail!("file not found");
    }
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let table = match ext.as_str() {
        "parquet" | "pq" => read_parquet(path, Layout::Raw)?,
        "csv" => read_csv(path)?,
        other => bail!("unsupported file extension: .{other}"),
    };
    normalize_zones(table)
}

fn normalize_zones(table: SeasonalTable) -> anyhow::Result<SeasonalTable> {
    let sentinel = NO_ZONE_SENTINEL.to_string();
    let mut records = Vec::with_capacity(table.len());
    let mut dropped = 0usize;

    for (row, mut record) in table.records.into_iter().enumerate() {
        if record.zone == sentinel {
            dropped += 1;
            continue;
        }
        record.zone_id = pad_zone(&record.zone).with_context(|| format!("row {row}"))?;
        records.push(record);
    }

    if dropped > 0 {
        info!("dropped {dropped} rows outside the HUC10 set");
    }
    Ok(SeasonalTable::new(records, table.extra_columns))
}

// ---------------------------------------------------------------------------
// Parquet reader
// ---------------------------------------------------------------------------

/// Which columns a parquet file must carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    /// Raw zonal statistics.
    Raw,
    /// Differenced table, with `huc10` and `diff` already present.
    Cache,
}

impl Layout {
    fn required(self) -> Vec<&'static str> {
        let mut names = columns::RAW_REQUIRED.to_vec();
        if self == Layout::Cache {
            names.extend(columns::DERIVED);
        }
        names
    }
}

/// Expected schema: the seven raw columns (`zone` may be text, dictionary or
/// integer; `mean` any numeric type). Every other non-index column is carried
/// through as a [`MetadataValue`].
fn read_parquet(path: &Path, layout: Layout) -> anyhow::Result<SeasonalTable> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let schema = builder.schema().clone();

    for name in layout.required() {
        schema
            .index_of(name)
            .map_err(|_| anyhow!("parquet file missing '{name}' column"))?;
    }

    let extra_columns: Vec<ExtraColumn> = schema
        .fields()
        .iter()
        .filter(|f| !columns::is_known(f.name()))
        .map(|f| ExtraColumn {
            name: f.name().clone(),
            kind: kind_of(f.data_type()),
        })
        .collect();

    let reader = builder.build().context("building parquet reader")?;
    let mut records = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;

        let zone = text_column(&batch, columns::ZONE)?;
        let variable = text_column(&batch, columns::VARIABLE)?;
        let source = text_column(&batch, columns::WEATHER_SOURCE)?;
        let season = text_column(&batch, columns::SEASON)?;
        let scenario = text_column(&batch, columns::SCENARIO)?;
        let period = text_column(&batch, columns::TIME_PERIOD)?;
        let mean = float_column(&batch, columns::MEAN)?;

        let derived = match layout {
            Layout::Cache => Some((
                text_column(&batch, columns::ZONE_ID)?,
                float_column(&batch, columns::DIFFERENCE)?,
            )),
            Layout::Raw => None,
        };

        let extras = extra_columns
            .iter()
            .map(|c| Ok((c, extra_column(&batch, c)?)))
            .collect::<anyhow::Result<Vec<_>>>()?;

        for row in 0..batch.num_rows() {
            let (zone_id, difference) = match &derived {
                Some((ids, diffs)) => (
                    required_text(ids, row, columns::ZONE_ID)?,
                    diffs.is_valid(row).then(|| diffs.value(row)),
                ),
                None => (String::new(), None),
            };

            records.push(Record {
                zone: required_text(&zone, row, columns::ZONE)?,
                zone_id,
                variable_name: required_text(&variable, row, columns::VARIABLE)?,
                weather_source: required_text(&source, row, columns::WEATHER_SOURCE)?,
                season: required_text(&season, row, columns::SEASON)?,
                scenario: required_text(&scenario, row, columns::SCENARIO)?,
                time_period: required_text(&period, row, columns::TIME_PERIOD)?,
                mean_value: if mean.is_null(row) {
                    f64::NAN
                } else {
                    mean.value(row)
                },
                difference,
                extra: extras
                    .iter()
                    .map(|(c, array)| (c.name.clone(), metadata_at(array, c.kind, row)))
                    .collect(),
            });
        }
    }

    Ok(SeasonalTable::new(records, extra_columns))
}

// -- Parquet / Arrow helpers --

fn column<'a>(batch: &'a RecordBatch, name: &str) -> anyhow::Result<&'a ArrayRef> {
    batch
        .column_by_name(name)
        .ok_or_else(|| anyhow!("record batch missing '{name}' column"))
}

/// Any string-convertible column, as plain utf8.
fn text_column(batch: &RecordBatch, name: &str) -> anyhow::Result<StringArray> {
    let casted = cast(column(batch, name)?, &DataType::Utf8)
        .with_context(|| format!("column '{name}' is not string-convertible"))?;
    Ok(casted.as_string::<i32>().clone())
}

fn float_column(batch: &RecordBatch, name: &str) -> anyhow::Result<Float64Array> {
    let col = column(batch, name)?;
    if !col.data_type().is_numeric() && col.data_type() != &DataType::Null {
        bail!("column '{name}' is {:?}, expected a numeric type", col.data_type());
    }
    let casted = cast(col, &DataType::Float64)
        .with_context(|| format!("column '{name}' is not convertible to Float64"))?;
    Ok(casted.as_primitive::<Float64Type>().clone())
}

fn required_text(arr: &StringArray, row: usize, name: &str) -> anyhow::Result<String> {
    if arr.is_null(row) {
        bail!("row {row}: null value in '{name}'");
    }
    Ok(arr.value(row).to_string())
}

fn kind_of(data_type: &DataType) -> ValueKind {
    match data_type {
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64 => ValueKind::Integer,
        DataType::Float16 | DataType::Float32 | DataType::Float64 => ValueKind::Float,
        DataType::Boolean => ValueKind::Bool,
        _ => ValueKind::Text,
    }
}

fn extra_column(batch: &RecordBatch, extra: &ExtraColumn) -> anyhow::Result<ArrayRef> {
    cast(column(batch, &extra.name)?, &storage_type(extra.kind))
        .with_context(|| format!("column '{}' cannot be carried through", extra.name))
}

/// Extract a single pass-through value from a column already cast to the
/// storage type of `kind`.
fn metadata_at(col: &ArrayRef, kind: ValueKind, row: usize) -> MetadataValue {
    if col.is_null(row) {
        return MetadataValue::Null;
    }
    match kind {
        ValueKind::Text => MetadataValue::String(col.as_string::<i32>().value(row).to_string()),
        ValueKind::Integer => MetadataValue::Integer(col.as_primitive::<Int64Type>().value(row)),
        ValueKind::Float => MetadataValue::Float(col.as_primitive::<Float64Type>().value(row)),
        ValueKind::Bool => MetadataValue::Bool(col.as_boolean().value(row)),
    }
}

// ---------------------------------------------------------------------------
// CSV reader
// ---------------------------------------------------------------------------

/// CSV layout: header row with the raw column names. `mean` must parse as a
/// float (empty cell → NaN); the six other raw columns must be non-empty.
/// Pass-through columns are typed by guessing each cell and unifying per
/// column; a column that resolves to text keeps every cell exactly as written.
fn read_csv(path: &Path) -> anyhow::Result<SeasonalTable> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let position = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .with_context(|| format!("CSV missing '{name}' column"))
    };
    let zone_idx = position(columns::ZONE)?;
    let variable_idx = position(columns::VARIABLE)?;
    let source_idx = position(columns::WEATHER_SOURCE)?;
    let season_idx = position(columns::SEASON)?;
    let scenario_idx = position(columns::SCENARIO)?;
    let period_idx = position(columns::TIME_PERIOD)?;
    let mean_idx = position(columns::MEAN)?;

    let extra_idx: Vec<(usize, &String)> = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| !columns::is_known(h))
        .collect();

    let mut records = Vec::new();
    // Raw pass-through cells, row-major, in `extra_idx` order.
    let mut cells: Vec<Vec<String>> = Vec::new();

    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        let text = |idx: usize, name: &str| required_cell(&record, idx, row_no, name);

        let raw_mean = record.get(mean_idx).unwrap_or("").trim();
        let mean_value = if raw_mean.is_empty() {
            f64::NAN
        } else {
            raw_mean.parse::<f64>().with_context(|| {
                format!("CSV row {row_no}, {}: '{raw_mean}' is not a number", columns::MEAN)
            })?
        };

        cells.push(
            extra_idx
                .iter()
                .map(|(idx, _)| record.get(*idx).unwrap_or("").to_string())
                .collect(),
        );

        records.push(Record {
            zone: text(zone_idx, columns::ZONE)?,
            zone_id: String::new(),
            variable_name: text(variable_idx, columns::VARIABLE)?,
            weather_source: text(source_idx, columns::WEATHER_SOURCE)?,
            season: text(season_idx, columns::SEASON)?,
            scenario: text(scenario_idx, columns::SCENARIO)?,
            time_period: text(period_idx, columns::TIME_PERIOD)?,
            mean_value,
            difference: None,
            extra: BTreeMap::new(),
        });
    }

    let extra_columns: Vec<ExtraColumn> = extra_idx
        .iter()
        .enumerate()
        .map(|(col, (_, name))| {
            let guesses: Vec<MetadataValue> = cells
                .iter()
                .map(|row| guess_metadata_type(&row[col]))
                .collect();
            ExtraColumn {
                name: (*name).clone(),
                kind: ValueKind::infer(&guesses),
            }
        })
        .collect();

    for (record, row) in records.iter_mut().zip(cells) {
        for (col, cell) in extra_columns.iter().zip(row) {
            let value = match col.kind {
                ValueKind::Text if !cell.is_empty() => MetadataValue::String(cell),
                kind => guess_metadata_type(&cell).coerce(kind),
            };
            record.extra.insert(col.name.clone(), value);
        }
    }

    Ok(SeasonalTable::new(records, extra_columns))
}

fn required_cell(
    record: &csv::StringRecord,
    idx: usize,
    row: usize,
    name: &str,
) -> anyhow::Result<String> {
    match record.get(idx) {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => bail!("CSV row {row}: empty value in '{name}'"),
    }
}

fn guess_metadata_type(s: &str) -> MetadataValue {
    if s.is_empty() {
        return MetadataValue::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return MetadataValue::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return MetadataValue::Float(f);
    }
    if s == "true" || s == "false" {
        return MetadataValue::Bool(s == "true");
    }
    MetadataValue::String(s.to_string())
}
