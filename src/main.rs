use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use swb_delta::data::baseline::{AmbiguousBaselinePolicy, MissingBaselinePolicy};
use swb_delta::data::export::write_csv;
use swb_delta::data::filter::{filtered_indices, horizon_indices, Horizon, Query};
use swb_delta::data::model::Field;
use swb_delta::Config;

#[derive(Parser)]
#[command(name = "swb-delta")]
#[command(about = "Difference seasonal SWB projections against the historical baseline")]
struct Args {
    /// JSON config file; flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Raw zonal statistics (parquet or CSV)
    #[arg(long)]
    raw: Option<PathBuf>,

    /// Differenced cache file
    #[arg(long)]
    cache: Option<PathBuf>,

    /// What to do with projections that have no historical baseline
    #[arg(long, value_enum)]
    on_missing_baseline: Option<MissingBaselinePolicy>,

    /// What to do when several historical rows share a key
    #[arg(long, value_enum)]
    on_ambiguous_baseline: Option<AmbiguousBaselinePolicy>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compute the differenced table (or reuse the cache) and summarise it
    Build,
    /// Select rows by exact match and write them as CSV
    Query {
        /// HUC10 code, zero-padded
        #[arg(long)]
        zone: Option<String>,

        #[arg(long)]
        variable: Option<String>,

        #[arg(long)]
        season: Option<String>,

        /// Report differences from the historical baseline instead of means
        #[arg(long)]
        compare_historical: bool,

        /// Keep only the baseline period and one future horizon
        #[arg(long, value_enum)]
        horizon: Option<Horizon>,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

impl Args {
    fn config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };
        if let Some(raw) = &self.raw {
            config.raw_path = raw.clone();
        }
        if let Some(cache) = &self.cache {
            config.cache_path = cache.clone();
        }
        if let Some(policy) = self.on_missing_baseline {
            config.on_missing_baseline = policy;
        }
        if let Some(policy) = self.on_ambiguous_baseline {
            config.on_ambiguous_baseline = policy;
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let config = args.config()?;

    let table = config.cache().load_or_compute()?.table;

    match args.command {
        Command::Build => {
            let projected = table.records.iter().filter(|r| !r.is_baseline()).count();
            let differenced = table
                .records
                .iter()
                .filter(|r| r.difference.is_some())
                .count();
            info!(
                "{} rows, {} zones, {} variables, {} weather sources",
                table.len(),
                table.distinct(Field::ZoneId).len(),
                table.distinct(Field::Variable).len(),
                table.distinct(Field::WeatherSource).len()
            );
            info!("{differenced} of {projected} projected rows carry a difference");
        }
        Command::Query {
            zone,
            variable,
            season,
            compare_historical,
            horizon,
            output,
        } => {
            let query = Query {
                zone_id: zone,
                variable_name: variable,
                season,
                compare_to_historical: compare_historical,
            };
            let mut indices = filtered_indices(&table, &query);
            if let Some(horizon) = horizon {
                indices = horizon_indices(&table, &indices, horizon);
            }
            info!("{} rows match", indices.len());

            match output {
                Some(path) => {
                    let file = File::create(&path)
                        .with_context(|| format!("creating {}", path.display()))?;
                    write_csv(&table, &indices, query.value_column(), BufWriter::new(file))?;
                }
                None => write_csv(&table, &indices, query.value_column(), io::stdout().lock())?,
            }
        }
    }

    Ok(())
}
