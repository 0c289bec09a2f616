/// Data layer: core types, loading, validation and filtering.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Dataset
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ validate  │  required columns, emptiness, negatives, duplicates
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  apply FilterSpec → new Dataset view
///   └──────────┘
/// ```

pub mod filter;
pub mod loader;
pub mod model;
pub mod validate;
