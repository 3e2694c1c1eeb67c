//! Metric Query Builder
//!
//! Translates composite metric range queries into ClickHouse SQL:
//!
//! - **Model**: Request types (filters, aggregates, metric queries, formulas)
//! - **Filter**: Label predicates over the time series table
//! - **Aggregate**: Operator to SQL function / quantile / rate dispatch
//! - **Metric**: One metric query as a bucketed, grouped sub-query
//! - **Formula**: Joins sub-queries to evaluate an arithmetic formula
//! - **Builder**: Request-level entry point
//!
//! # Examples
//!
//! ```rust
//! use metrics_sql::query::{
//!     AggregateOperator, CompositeMetricQuery, MetricQuery, QueryBuilder, QueryRangeParams,
//!     StoreSchema,
//! };
//!
//! let composite = CompositeMetricQuery::default()
//!     .query("A", MetricQuery::new("errors_total", AggregateOperator::RateSum).group_by(&["service"]))
//!     .query("B", MetricQuery::new("requests_total", AggregateOperator::RateSum).group_by(&["service"]))
//!     .formula("A / B");
//! let params = QueryRangeParams::new(1_650_000_000_000, 1_650_003_600_000, 60, composite);
//!
//! let built = QueryBuilder::new(StoreSchema::default()).build_queries(&params).unwrap();
//! assert_eq!(built.formula_queries.len(), 1);
//! ```

mod aggregate;
mod builder;
mod error;
mod filter;
mod formula;
mod metric;
mod model;

pub use aggregate::{percentile, sql_function, AggregateKind};
pub use builder::{build_queries, BuiltQueries, QueryBuilder};
pub use error::{BuildError, BuildResult};
pub use filter::{build_filter_subquery, format_value, label_accessor};
pub use formula::{compose_formula, ComposedQuery, SubQueries};
pub use metric::{build_metric_query, group_by, group_select};
pub use model::{
    AggregateOperator, Combinator, CompositeMetricQuery, FilterItem, FilterOperation, FilterSet,
    FilterValue, MetricQuery, QueryRangeParams, StoreSchema, METRIC_NAME_LABEL,
};
