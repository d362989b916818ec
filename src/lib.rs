//! Retail sales analytics core.
//!
//! ```text
//!  .csv / .tsv / .json / .parquet
//!        │
//!        ▼
//!   ┌──────────────┐
//!   │ DatasetStore  │  load once per source → Arc<Dataset>
//!   └──────────────┘
//!        │
//!        ▼
//!   ┌──────────────┐
//!   │ FilterDomain  │  distinct values → validated FilterContext
//!   └──────────────┘
//!        │
//!        ▼
//!   ┌───────────────────┐
//!   │ AggregationEngine  │  canned queries with bound parameters → ResultSet
//!   └───────────────────┘
//! ```

pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod query;

pub use error::{Error, Result};
