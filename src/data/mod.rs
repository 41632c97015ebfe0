//! Data layer: core types, loading, differencing and caching.
//!
//! Architecture:
//! ```text
//!  .parquet / .csv (raw zonal statistics)
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader   │  parse file, drop sentinel zones, pad HUC10 → SeasonalTable
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  dedupe   │  drop rows repeated across every column
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │ baseline  │  index historical means, fill `diff` for projections
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  cache    │  writer → temp file → rename; reused on the next run
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  filter   │  exact-match query → indices → export
//!   └──────────┘
//! ```

pub mod baseline;
pub mod cache;
pub mod dedupe;
pub mod export;
pub mod filter;
pub mod loader;
pub mod model;
pub mod writer;
