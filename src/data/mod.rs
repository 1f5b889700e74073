/// Data layer: core types, loading, and grouping.
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
///   │ Dataset   │  Vec<Sample>, column index
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  groups   │  variable × factor → Vec<Group>
///   └──────────┘
/// ```

pub mod groups;
pub mod loader;
pub mod model;
