use std::sync::Arc;

use arrow::array::{Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

#[derive(Default)]
struct Columns {
    zone: Vec<String>,
    variable: Vec<String>,
    source: Vec<String>,
    season: Vec<String>,
    scenario: Vec<String>,
    period: Vec<String>,
    mean: Vec<f64>,
    count: Vec<i64>,
}

impl Columns {
    #[allow(clippy::too_many_arguments)]
    fn push(
        &mut self,
        zone: &str,
        variable: &str,
        source: &str,
        season: &str,
        scenario: &str,
        period: &str,
        mean: f64,
        count: i64,
    ) {
        self.zone.push(zone.to_string());
        self.variable.push(variable.to_string());
        self.source.push(source.to_string());
        self.season.push(season.to_string());
        self.scenario.push(scenario.to_string());
        self.period.push(period.to_string());
        self.mean.push(mean);
        self.count.push(count);
    }
}

fn text(values: &[String]) -> StringArray {
    StringArray::from_iter_values(values.iter().map(|s| s.as_str()))
}

fn main() -> anyhow::Result<()> {
    let mut rng = SimpleRng::new(42);

    // Zone codes as the zonal statistics emit them: no leading zeros.
    let zones = ["701000101", "701000102", "702000305", "1001000201"];
    let variables = [("actual_et", 120.0), ("net_infiltration", 45.0), ("runoff", 20.0)];
    let sources = ["ACCESS-CM2", "CNRM-ESM2-1", "MIROC6"];
    let seasons = ["winter", "spring", "summer", "fall"];
    let projections = [("ssp245", 1.05), ("ssp370", 1.10), ("ssp585", 1.18)];
    let horizons = [("2040-2059", 1.0), ("2080-2099", 1.6)];

    let mut cols = Columns::default();

    for zone in &zones {
        for &(variable, base) in &variables {
            for source in &sources {
                for (s, season) in seasons.iter().enumerate() {
                    let seasonal = base * (0.6 + 0.3 * s as f64);
                    let historical = rng.gauss(seasonal, seasonal * 0.05);
                    let cells = 200 + (rng.next_u64() % 800) as i64;
                    cols.push(
                        zone,
                        variable,
                        source,
                        season,
                        "historical",
                        "1995-2014",
                        historical,
                        cells,
                    );

                    for &(scenario, factor) in &projections {
                        for &(period, weight) in &horizons {
                            let shift = 1.0 + (factor - 1.0) * weight;
                            let mean = rng.gauss(historical * shift, seasonal * 0.02);
                            cols.push(
                                zone, variable, source, season, scenario, period, mean, cells,
                            );
                        }
                    }
                }
            }
        }
    }

    // Cells outside every HUC and an exact duplicate, both dropped on load.
    let sentinel = i64::MIN.to_string();
    cols.push(
        &sentinel,
        "actual_et",
        "MIROC6",
        "summer",
        "historical",
        "1995-2014",
        0.0,
        17,
    );
    let last = cols.zone.len() - 2;
    let dup = (
        cols.zone[last].clone(),
        cols.variable[last].clone(),
        cols.source[last].clone(),
        cols.season[last].clone(),
        cols.scenario[last].clone(),
        cols.period[last].clone(),
        cols.mean[last],
        cols.count[last],
    );
    cols.push(&dup.0, &dup.1, &dup.2, &dup.3, &dup.4, &dup.5, dup.6, dup.7);

    let schema = Arc::new(Schema::new(vec![
        Field::new("zone", DataType::Utf8, false),
        Field::new("swb_variable_name", DataType::Utf8, false),
        Field::new("weather_data_name", DataType::Utf8, false),
        Field::new("season_name", DataType::Utf8, false),
        Field::new("scenario_name", DataType::Utf8, false),
        Field::new("time_period", DataType::Utf8, false),
        Field::new("mean", DataType::Float64, false),
        Field::new("count", DataType::Int64, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(text(&cols.zone)),
            Arc::new(text(&cols.variable)),
            Arc::new(text(&cols.source)),
            Arc::new(text(&cols.season)),
            Arc::new(text(&cols.scenario)),
            Arc::new(text(&cols.period)),
            Arc::new(Float64Array::from(cols.mean.clone())),
            Arc::new(Int64Array::from(cols.count.clone())),
        ],
    )?;

    // Write Parquet
    let output_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "sample_seasonal_stats.parquet".to_string());
    let file = std::fs::File::create(&output_path)?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;

    println!(
        "Wrote {} rows ({} zones, {} weather sources) to {output_path}",
        batch.num_rows(),
        zones.len(),
        sources.len()
    );
    Ok(())
}
