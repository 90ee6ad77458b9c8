/// Data layer: core types, loading, filtering and aggregation.
///
/// Architecture:
/// ```text
///  .csv / .tsv / .json / .parquet / SQL result
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  DataSource → Dataset (failures → empty)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  Dataset  │  ordered columns, Vec<Row>
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  FilterCriteria → filtered Dataset
///   └──────────┘
///        │
///        ▼
///   ┌───────────┐
///   │ aggregate │  group by item, sum measure
///   └───────────┘
/// ```

pub mod aggregate;
pub mod filter;
pub mod loader;
pub mod model;
