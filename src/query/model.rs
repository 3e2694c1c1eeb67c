//! Range Query Model
//!
//! Request-side types for metric range queries: label filters, aggregate
//! operators, single metric queries and the composite query that ties them
//! together with formulas.
//!
//! All types deserialize from the JSON body of the range-query API:
//!
//! ```text
//! {
//!   "start": 1650000000000, "end": 1650003600000, "step": 60,
//!   "compositeMetricQuery": {
//!     "formulas": ["A/B"],
//!     "buildMetricQueries": {
//!       "A": {"metricName": "errors_total", "groupBy": ["service"], "aggregateOperator": "RATE_SUM"},
//!       "B": {"metricName": "requests_total", "groupBy": ["service"], "aggregateOperator": "RATE_SUM"}
//!     }
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Label that carries the metric name in the time series table
pub const METRIC_NAME_LABEL: &str = "__name__";

/// Comparison applied to one label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FilterOperation {
    /// Label equals value
    Eq,
    /// Label differs from value
    Neq,
    /// Label is one of the listed values
    In,
    /// Label is none of the listed values
    Nin,
    /// SQL LIKE pattern
    Like,
    /// Regular expression match
    Match,
    /// Operation name the translator does not know
    Other(String),
}

impl FilterOperation {
    /// Parse from string (case-insensitive)
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "eq" => Self::Eq,
            "neq" => Self::Neq,
            "in" => Self::In,
            "nin" => Self::Nin,
            "like" => Self::Like,
            "match" => Self::Match,
            _ => Self::Other(s.to_string()),
        }
    }
}

impl From<String> for FilterOperation {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<FilterOperation> for String {
    fn from(op: FilterOperation) -> Self {
        op.to_string()
    }
}

impl std::fmt::Display for FilterOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Eq => write!(f, "EQ"),
            Self::Neq => write!(f, "NEQ"),
            Self::In => write!(f, "IN"),
            Self::Nin => write!(f, "NIN"),
            Self::Like => write!(f, "LIKE"),
            Self::Match => write!(f, "MATCH"),
            Self::Other(name) => write!(f, "{}", name),
        }
    }
}

/// Value compared against a label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Should hold values of a single kind; anything else cannot be rendered
    List(Vec<FilterValue>),
}

impl From<bool> for FilterValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for FilterValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for FilterValue {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<f64> for FilterValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for FilterValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl<T: Into<FilterValue>> From<Vec<T>> for FilterValue {
    fn from(values: Vec<T>) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}

/// A single label predicate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterItem {
    /// Label name
    pub key: String,
    /// Comparison to apply
    #[serde(rename = "op")]
    pub operation: FilterOperation,
    /// Value to compare against
    pub value: FilterValue,
}

impl FilterItem {
    /// Create a new filter item
    pub fn new(
        key: impl Into<String>,
        operation: FilterOperation,
        value: impl Into<FilterValue>,
    ) -> Self {
        Self {
            key: key.into(),
            operation,
            value: value.into(),
        }
    }

    /// Create an equality filter
    pub fn eq(key: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(key, FilterOperation::Eq, value)
    }
}

/// Logical connective placed between every pair of filter items
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Combinator {
    #[default]
    #[serde(rename = "AND", alias = "and")]
    And,
    #[serde(rename = "OR", alias = "or")]
    Or,
}

impl std::fmt::Display for Combinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::And => write!(f, "AND"),
            Self::Or => write!(f, "OR"),
        }
    }
}

/// Ordered filter items joined by one combinator
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterSet {
    #[serde(rename = "op", default)]
    pub combinator: Combinator,
    #[serde(default)]
    pub items: Vec<FilterItem>,
}

impl FilterSet {
    /// Items joined with AND
    pub fn and(items: Vec<FilterItem>) -> Self {
        Self {
            combinator: Combinator::And,
            items,
        }
    }

    /// Items joined with OR
    pub fn or(items: Vec<FilterItem>) -> Self {
        Self {
            combinator: Combinator::Or,
            items,
        }
    }
}

/// Aggregation applied to the samples of each time bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AggregateOperator {
    Avg,
    Sum,
    Min,
    Max,
    Count,
    CountDistinct,
    RateSum,
    RateAvg,
    RateMin,
    RateMax,
    P05,
    P10,
    P20,
    P25,
    P50,
    P75,
    P90,
    P95,
    P99,
}

impl std::fmt::Display for AggregateOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Avg => "AVG",
            Self::Sum => "SUM",
            Self::Min => "MIN",
            Self::Max => "MAX",
            Self::Count => "COUNT",
            Self::CountDistinct => "COUNT_DISTINCT",
            Self::RateSum => "RATE_SUM",
            Self::RateAvg => "RATE_AVG",
            Self::RateMin => "RATE_MIN",
            Self::RateMax => "RATE_MAX",
            Self::P05 => "P05",
            Self::P10 => "P10",
            Self::P20 => "P20",
            Self::P25 => "P25",
            Self::P50 => "P50",
            Self::P75 => "P75",
            Self::P90 => "P90",
            Self::P95 => "P95",
            Self::P99 => "P99",
        };
        write!(f, "{}", name)
    }
}

/// One named metric query inside a composite query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricQuery {
    /// Metric to select (matched against the `__name__` label)
    pub metric_name: String,
    /// Additional label filters
    #[serde(default)]
    pub tag_filters: Option<FilterSet>,
    /// Labels kept as result dimensions, in output column order
    #[serde(default, rename = "groupBy")]
    pub grouping_tags: Vec<String>,
    /// Aggregation per time bucket
    pub aggregate_operator: AggregateOperator,
}

impl MetricQuery {
    /// Create a query for a metric with an aggregation and no filters
    pub fn new(metric_name: impl Into<String>, aggregate_operator: AggregateOperator) -> Self {
        Self {
            metric_name: metric_name.into(),
            tag_filters: None,
            grouping_tags: Vec::new(),
            aggregate_operator,
        }
    }

    /// Set the label filters
    pub fn filters(mut self, filters: FilterSet) -> Self {
        self.tag_filters = Some(filters);
        self
    }

    /// Set the grouping labels
    pub fn group_by(mut self, tags: &[&str]) -> Self {
        self.grouping_tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }
}

/// Named metric queries plus the formulas combining them
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeMetricQuery {
    /// Literal query text; when non-empty, everything else is ignored
    #[serde(default)]
    pub raw_query: Option<String>,
    /// Metric queries keyed by the variable name formulas use
    #[serde(default)]
    pub build_metric_queries: BTreeMap<String, MetricQuery>,
    /// Expressions over the variable names, in output order
    #[serde(default)]
    pub formulas: Vec<String>,
}

impl CompositeMetricQuery {
    /// Composite query that passes a literal query through
    pub fn raw(query: impl Into<String>) -> Self {
        Self {
            raw_query: Some(query.into()),
            ..Default::default()
        }
    }

    /// Register a metric query under a variable name
    pub fn query(mut self, name: impl Into<String>, query: MetricQuery) -> Self {
        self.build_metric_queries.insert(name.into(), query);
        self
    }

    /// Append a formula
    pub fn formula(mut self, formula: impl Into<String>) -> Self {
        self.formulas.push(formula.into());
        self
    }

    /// Raw query text, if present and non-empty
    pub fn raw_query(&self) -> Option<&str> {
        self.raw_query.as_deref().filter(|q| !q.is_empty())
    }
}

/// Parameters of one range-query request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRangeParams {
    /// Range start, Unix milliseconds (inclusive)
    pub start: i64,
    /// Range end, Unix milliseconds (exclusive)
    pub end: i64,
    /// Bucket width in seconds
    pub step: u64,
    pub composite_metric_query: CompositeMetricQuery,
}

impl QueryRangeParams {
    /// Create range parameters
    pub fn new(start: i64, end: i64, step: u64, composite: CompositeMetricQuery) -> Self {
        Self {
            start,
            end,
            step,
            composite_metric_query: composite,
        }
    }
}

/// Names of the store objects the generated SQL references
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSchema {
    /// Database holding both tables
    pub database: String,
    /// One row per fingerprint with its JSON label set
    pub time_series_table: String,
    /// One row per sample: fingerprint, timestamp_ms, value
    pub samples_table: String,
}

impl StoreSchema {
    /// Create a schema from explicit names
    pub fn new(
        database: impl Into<String>,
        time_series_table: impl Into<String>,
        samples_table: impl Into<String>,
    ) -> Self {
        Self {
            database: database.into(),
            time_series_table: time_series_table.into(),
            samples_table: samples_table.into(),
        }
    }

    /// Fully qualified time series table
    pub fn time_series_ref(&self) -> String {
        format!("{}.{}", self.database, self.time_series_table)
    }

    /// Fully qualified samples table
    pub fn samples_ref(&self) -> String {
        format!("{}.{}", self.database, self.samples_table)
    }
}

impl Default for StoreSchema {
    fn default() -> Self {
        Self::new("signoz_metrics", "time_series_v2", "samples_v2")
    }
}
