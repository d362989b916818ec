//! Data layer: core types, loading, caching, summaries and filtering.
//!
//! Architecture:
//! ```text
//!  .csv / .tsv / .json / .parquet
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader   │  read file → RawTable
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  model    │  normalize headers, validate → Dataset
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  store    │  one read per source, shared Arc<Dataset>
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  filter   │  distinct values → validated FilterContext
//!   └──────────┘
//! ```

pub mod filter;
pub mod loader;
pub mod model;
pub mod store;
pub mod summary;
