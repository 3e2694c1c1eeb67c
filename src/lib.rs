//! # metrics-sql
//!
//! Query construction layer for metric range queries. Translates a composite
//! metric query (named metric queries plus arithmetic formulas over them) into
//! ClickHouse SQL against a fingerprint-indexed time series table and a
//! samples table.
//!
//! ## Modules
//!
//! - [`query`]: Request model, filter translation, aggregate dispatch,
//!   single-query and formula construction
//! - [`expr`]: Formula parser front end (tokens, variables, reconstruction)
//! - [`config`]: Store schema and logging configuration
//!
//! ## Quick Start
//!
//! ```rust
//! use metrics_sql::{build_queries, AggregateOperator, CompositeMetricQuery, MetricQuery, QueryRangeParams};
//!
//! let composite = CompositeMetricQuery::default()
//!     .query("A", MetricQuery::new("cpu_seconds_total", AggregateOperator::RateSum).group_by(&["host"]))
//!     .formula("A");
//! let params = QueryRangeParams::new(1_650_000_000_000, 1_650_003_600_000, 60, composite);
//!
//! let built = build_queries(&params).unwrap();
//! assert_eq!(built.queries.len(), 1);
//! assert!(built.queries[0].contains("runningDifference(res)"));
//! ```

pub mod config;
pub mod expr;
pub mod query;

// Re-export top-level types for convenience
pub use query::{
    build_queries, AggregateOperator, BuildError, BuildResult, BuiltQueries, Combinator,
    CompositeMetricQuery, FilterItem, FilterOperation, FilterSet, FilterValue, MetricQuery,
    QueryBuilder, QueryRangeParams, StoreSchema,
};

pub use expr::{Expression, Token};

pub use config::{Config, ConfigError, LoggingConfig, StoreConfig};
