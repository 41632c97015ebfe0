use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::{Hash, Hasher};

// ---------------------------------------------------------------------------
// Column names and well-known values
// ---------------------------------------------------------------------------

pub mod columns {
    pub const ZONE: &str = "zone";
    pub const ZONE_ID: &str = "huc10";
    pub const VARIABLE: &str = "swb_variable_name";
    pub const WEATHER_SOURCE: &str = "weather_data_name";
    pub const SEASON: &str = "season_name";
    pub const SCENARIO: &str = "scenario_name";
    pub const TIME_PERIOD: &str = "time_period";
    pub const MEAN: &str = "mean";
    pub const DIFFERENCE: &str = "diff";

    /// Columns every raw file must carry.
    pub const RAW_REQUIRED: [&str; 7] = [
        ZONE,
        VARIABLE,
        WEATHER_SOURCE,
        SEASON,
        SCENARIO,
        TIME_PERIOD,
        MEAN,
    ];

    /// Columns written by the loader/joiner on top of the raw ones.
    pub const DERIVED: [&str; 2] = [ZONE_ID, DIFFERENCE];

    /// Pandas writes its row index under this prefix; never a data column.
    pub const PANDAS_INDEX_PREFIX: &str = "__index_level_";

    pub fn is_known(name: &str) -> bool {
        RAW_REQUIRED.contains(&name)
            || DERIVED.contains(&name)
            || name.starts_with(PANDAS_INDEX_PREFIX)
    }
}

/// Scenario every projection is differenced against.
pub const BASELINE_SCENARIO: &str = "historical";

/// Zone value the zonal statistics emit for cells outside every HUC.
pub const NO_ZONE_SENTINEL: i64 = i64::MIN;

/// Width of a HUC10 code.
pub const ZONE_ID_WIDTH: usize = 10;

// ---------------------------------------------------------------------------
// MetadataValue – a cell of a pass-through column
// ---------------------------------------------------------------------------

/// A dynamically-typed value for raw columns the pipeline does not interpret.
///
/// Equality, ordering and hashing all go through `f64::total_cmp` / bit
/// patterns so the type can sit in hash sets used for deduplication.
#[derive(Debug, Clone)]
pub enum MetadataValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl PartialEq for MetadataValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for MetadataValue {}

impl PartialOrd for MetadataValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MetadataValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use MetadataValue::*;
        fn discriminant(v: &MetadataValue) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                String(_) => 4,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => canonical_f64(*a).total_cmp(&canonical_f64(*b)),
            (String(a), String(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl Hash for MetadataValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            MetadataValue::String(s) => s.hash(state),
            MetadataValue::Integer(i) => i.hash(state),
            MetadataValue::Float(f) => canonical_f64(*f).to_bits().hash(state),
            MetadataValue::Bool(b) => b.hash(state),
            MetadataValue::Null => {}
        }
    }
}

impl MetadataValue {
    /// Coerce into the storage kind of its column. Values that cannot be
    /// represented fall back to `Null` (numeric kinds) or text.
    pub fn coerce(self, kind: ValueKind) -> MetadataValue {
        use MetadataValue::*;
        match (kind, self) {
            (_, Null) => Null,
            (ValueKind::Text, String(s)) => String(s),
            (ValueKind::Text, Integer(i)) => String(i.to_string()),
            (ValueKind::Text, Float(f)) => String(f.to_string()),
            (ValueKind::Text, Bool(b)) => String(b.to_string()),
            (ValueKind::Integer, Integer(i)) => Integer(i),
            (ValueKind::Float, Integer(i)) => Float(i as f64),
            (ValueKind::Float, Float(f)) => Float(f),
            (ValueKind::Bool, Bool(b)) => Bool(b),
            _ => Null,
        }
    }

    fn kind(&self) -> Option<ValueKind> {
        match self {
            MetadataValue::String(_) => Some(ValueKind::Text),
            MetadataValue::Integer(_) => Some(ValueKind::Integer),
            MetadataValue::Float(_) => Some(ValueKind::Float),
            MetadataValue::Bool(_) => Some(ValueKind::Bool),
            MetadataValue::Null => None,
        }
    }
}

/// NaN payloads and the sign of zero do not distinguish two rows.
pub(crate) fn canonical_f64(v: f64) -> f64 {
    if v.is_nan() {
        f64::NAN
    } else if v == 0.0 {
        0.0
    } else {
        v
    }
}

// ---------------------------------------------------------------------------
// ExtraColumn – schema of a pass-through column
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Text,
    Integer,
    Float,
    Bool,
}

impl ValueKind {
    /// Narrowest kind that holds every value: integers widen to floats,
    /// anything mixed with text (or bools mixed with numbers) becomes text.
    pub fn infer<'a>(values: impl IntoIterator<Item = &'a MetadataValue>) -> ValueKind {
        let mut kind: Option<ValueKind> = None;
        for v in values {
            let Some(k) = v.kind() else { continue };
            kind = Some(match (kind, k) {
                (None, k) => k,
                (Some(a), b) if a == b => a,
                (Some(ValueKind::Integer), ValueKind::Float)
                | (Some(ValueKind::Float), ValueKind::Integer) => ValueKind::Float,
                _ => ValueKind::Text,
            });
        }
        kind.unwrap_or(ValueKind::Text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtraColumn {
    pub name: String,
    pub kind: ValueKind,
}

// ---------------------------------------------------------------------------
// BaselineKey – the four join fields
// ---------------------------------------------------------------------------

/// Owned join key, used to name the offending tuple in errors.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BaselineKey {
    pub variable_name: String,
    pub zone_id: String,
    pub weather_source: String,
    pub season: String,
}

impl fmt::Display for BaselineKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}={}, {}={}, {}={}, {}={})",
            columns::VARIABLE,
            self.variable_name,
            columns::ZONE_ID,
            self.zone_id,
            columns::WEATHER_SOURCE,
            self.weather_source,
            columns::SEASON,
            self.season
        )
    }
}

/// Borrowed form of [`BaselineKey`] for index lookups.
pub type BaselineKeyRef<'a> = (&'a str, &'a str, &'a str, &'a str);

impl From<BaselineKeyRef<'_>> for BaselineKey {
    fn from((variable_name, zone_id, weather_source, season): BaselineKeyRef<'_>) -> Self {
        BaselineKey {
            variable_name: variable_name.to_string(),
            zone_id: zone_id.to_string(),
            weather_source: weather_source.to_string(),
            season: season.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Record – one row of the working table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Raw zone code as read.
    pub zone: String,
    /// Zero-padded HUC10.
    pub zone_id: String,
    pub variable_name: String,
    pub weather_source: String,
    pub season: String,
    pub scenario: String,
    pub time_period: String,
    pub mean_value: f64,
    /// `mean_value` minus the historical baseline; `None` for baseline rows.
    pub difference: Option<f64>,
    /// Pass-through columns: column_name → value.
    pub extra: BTreeMap<String, MetadataValue>,
}

impl Record {
    pub fn is_baseline(&self) -> bool {
        self.scenario == BASELINE_SCENARIO
    }

    pub fn baseline_key(&self) -> BaselineKeyRef<'_> {
        (
            &self.variable_name,
            &self.zone_id,
            &self.weather_source,
            &self.season,
        )
    }

    pub fn owned_baseline_key(&self) -> BaselineKey {
        self.baseline_key().into()
    }

    /// Every column, floats by canonical bit pattern.
    pub(crate) fn row_key(&self) -> RowKey<'_> {
        RowKey {
            zone: &self.zone,
            zone_id: &self.zone_id,
            variable_name: &self.variable_name,
            weather_source: &self.weather_source,
            season: &self.season,
            scenario: &self.scenario,
            time_period: &self.time_period,
            mean_bits: canonical_f64(self.mean_value).to_bits(),
            difference_bits: self.difference.map(|d| canonical_f64(d).to_bits()),
            extra: &self.extra,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Hash)]
pub(crate) struct RowKey<'a> {
    zone: &'a str,
    zone_id: &'a str,
    variable_name: &'a str,
    weather_source: &'a str,
    season: &'a str,
    scenario: &'a str,
    time_period: &'a str,
    mean_bits: u64,
    difference_bits: Option<u64>,
    extra: &'a BTreeMap<String, MetadataValue>,
}

// ---------------------------------------------------------------------------
// SeasonalTable – the working table
// ---------------------------------------------------------------------------

/// Ordered rows plus the schema of the pass-through columns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SeasonalTable {
    pub records: Vec<Record>,
    pub extra_columns: Vec<ExtraColumn>,
}

/// Text fields a selector can enumerate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    ZoneId,
    Variable,
    WeatherSource,
    Season,
    Scenario,
    TimePeriod,
}

impl Field {
    pub fn get(self, record: &Record) -> &str {
        match self {
            Field::ZoneId => &record.zone_id,
            Field::Variable => &record.variable_name,
            Field::WeatherSource => &record.weather_source,
            Field::Season => &record.season,
            Field::Scenario => &record.scenario,
            Field::TimePeriod => &record.time_period,
        }
    }
}

impl SeasonalTable {
    pub fn new(records: Vec<Record>, extra_columns: Vec<ExtraColumn>) -> Self {
        SeasonalTable {
            records,
            extra_columns,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Sorted distinct values of a text field.
    pub fn distinct(&self, field: Field) -> BTreeSet<&str> {
        self.records.iter().map(|r| field.get(r)).collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Minimal record for tests across the crate.
    pub(crate) fn record(
        variable: &str,
        zone_id: &str,
        source: &str,
        season: &str,
        scenario: &str,
        period: &str,
        mean: f64,
    ) -> Record {
        Record {
            zone: zone_id.trim_start_matches('0').to_string(),
            zone_id: zone_id.to_string(),
            variable_name: variable.to_string(),
            weather_source: source.to_string(),
            season: season.to_string(),
            scenario: scenario.to_string(),
            time_period: period.to_string(),
            mean_value: mean,
            difference: None,
            extra: BTreeMap::new(),
        }
    }

    #[test]
    fn kind_inference_widens() {
        use MetadataValue::*;
        assert_eq!(ValueKind::infer(&[Integer(1), Null, Integer(2)]), ValueKind::Integer);
        assert_eq!(ValueKind::infer(&[Integer(1), Float(2.5)]), ValueKind::Float);
        assert_eq!(ValueKind::infer(&[Bool(true), Integer(2)]), ValueKind::Text);
        assert_eq!(ValueKind::infer(&[Null]), ValueKind::Text);
    }

    #[test]
    fn nan_values_compare_equal() {
        assert_eq!(MetadataValue::Float(f64::NAN), MetadataValue::Float(f64::NAN));
        assert_eq!(MetadataValue::Float(-0.0), MetadataValue::Float(0.0));
        assert_ne!(MetadataValue::Float(1.0), MetadataValue::Integer(1));
    }

    #[test]
    fn key_display_names_every_field() {
        let r = record("ET", "0000000123", "modelA", "summer", "rcp85", "2040-2059", 1.0);
        assert_eq!(
            r.owned_baseline_key().to_string(),
            "(swb_variable_name=ET, huc10=0000000123, weather_data_name=modelA, season_name=summer)"
        );
    }

    #[test]
    fn distinct_is_sorted() {
        let table = SeasonalTable::new(
            vec![
                record("ET", "0000000002", "b", "summer", "historical", "1995-2014", 1.0),
                record("ET", "0000000001", "a", "winter", "historical", "1995-2014", 1.0),
                record("ET", "0000000002", "a", "summer", "rcp85", "2040-2059", 1.0),
            ],
            Vec::new(),
        );
        let zones: Vec<&str> = table.distinct(Field::ZoneId).into_iter().collect();
        assert_eq!(zones, vec!["0000000001", "0000000002"]);
    }
}
