//! Aggregate operator dispatch
//!
//! Static lookup tables from [`AggregateOperator`] to the SQL that computes
//! it per time bucket.

use crate::query::model::AggregateOperator;

/// Operator to SQL aggregate function. Rate operators share the function of
/// their instant counterpart; the derivative is applied on top.
static SQL_FUNCTIONS: &[(AggregateOperator, &str)] = &[
    (AggregateOperator::Avg, "avg"),
    (AggregateOperator::Max, "max"),
    (AggregateOperator::Min, "min"),
    (AggregateOperator::Sum, "sum"),
    (AggregateOperator::RateSum, "sum"),
    (AggregateOperator::RateAvg, "avg"),
    (AggregateOperator::RateMax, "max"),
    (AggregateOperator::RateMin, "min"),
];

/// Operator to quantile fraction. P05 maps to the median.
static PERCENTILES: &[(AggregateOperator, f64)] = &[
    (AggregateOperator::P05, 0.5),
    (AggregateOperator::P10, 0.10),
    (AggregateOperator::P20, 0.20),
    (AggregateOperator::P25, 0.25),
    (AggregateOperator::P50, 0.50),
    (AggregateOperator::P75, 0.75),
    (AggregateOperator::P90, 0.90),
    (AggregateOperator::P95, 0.95),
    (AggregateOperator::P99, 0.99),
];

/// SQL aggregate function name for an operator
pub fn sql_function(op: AggregateOperator) -> Option<&'static str> {
    SQL_FUNCTIONS
        .iter()
        .find(|(candidate, _)| *candidate == op)
        .map(|(_, func)| *func)
}

/// Quantile fraction for a percentile operator
pub fn percentile(op: AggregateOperator) -> Option<f64> {
    PERCENTILES
        .iter()
        .find(|(candidate, _)| *candidate == op)
        .map(|(_, fraction)| *fraction)
}

/// How an operator is rendered
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AggregateKind {
    /// Plain aggregate over the bucket
    Instant(&'static str),
    /// Row count per bucket
    Count,
    /// Quantile over the bucket
    Percentile(f64),
    /// Per-second change of an instant aggregate between buckets
    Rate(&'static str),
    /// No rendering exists
    Unsupported,
}

impl AggregateKind {
    /// Classify an operator
    pub fn of(op: AggregateOperator) -> Self {
        use AggregateOperator::*;

        match op {
            Avg | Sum | Min | Max => sql_function(op).map_or(Self::Unsupported, Self::Instant),
            Count => Self::Count,
            RateSum | RateAvg | RateMin | RateMax => {
                sql_function(op).map_or(Self::Unsupported, Self::Rate)
            }
            P05 | P10 | P20 | P25 | P50 | P75 | P90 | P95 | P99 => {
                percentile(op).map_or(Self::Unsupported, Self::Percentile)
            }
            CountDistinct => Self::Unsupported,
        }
    }

    /// Aggregate expression projected as `res`
    pub fn expression(&self) -> Option<String> {
        match self {
            Self::Instant(func) | Self::Rate(func) => Some(format!("{}(value)", func)),
            Self::Count => Some("count(*)".to_string()),
            Self::Percentile(fraction) => Some(format!("quantile({})(value)", fraction)),
            Self::Unsupported => None,
        }
    }

    /// Whether the bucket aggregate is differentiated over time
    pub fn is_rate(&self) -> bool {
        matches!(self, Self::Rate(_))
    }
}
