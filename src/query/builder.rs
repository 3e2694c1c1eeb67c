//! Query Builder
//!
//! Top-level entry for a range-query request. Builds every referenced metric
//! query once, then composes each formula on top of those sub-queries.
//!
//! # Build Pipeline
//!
//! ```text
//! raw query? ──yes──> [raw]
//!     │no
//!     ▼
//! per formula: parse → build new sub-queries (memoized)
//!     ▼
//! compose formulas → BuiltQueries
//! ```
//!
//! Formulas are handled in request order, so the reported error is the first
//! one met while walking them.
//!
//! The first failure aborts the whole request; no partial query set is
//! returned.

use serde::Serialize;

use crate::expr::{self, Expression};
use crate::query::error::{BuildError, BuildResult};
use crate::query::formula::{compose_formula, ComposedQuery, SubQueries};
use crate::query::metric::build_metric_query;
use crate::query::model::{QueryRangeParams, StoreSchema};

/// Generated queries for one request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuiltQueries {
    /// Raw query or bare single-query formulas, in formula order
    pub queries: Vec<String>,
    /// Joined multi-query formulas, in formula order
    pub formula_queries: Vec<String>,
}

impl BuiltQueries {
    /// Total number of generated queries
    pub fn len(&self) -> usize {
        self.queries.len() + self.formula_queries.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.queries.is_empty() && self.formula_queries.is_empty()
    }
}

/// Builds store queries against a fixed schema
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    schema: StoreSchema,
}

impl QueryBuilder {
    /// Create a builder for the given store schema
    pub fn new(schema: StoreSchema) -> Self {
        Self { schema }
    }

    /// Schema the generated SQL references
    pub fn schema(&self) -> &StoreSchema {
        &self.schema
    }

    /// Build the queries for a range-query request
    pub fn build_queries(&self, params: &QueryRangeParams) -> BuildResult<BuiltQueries> {
        let composite = &params.composite_metric_query;

        if let Some(raw) = composite.raw_query() {
            tracing::debug!("Passing raw query through");
            return Ok(BuiltQueries {
                queries: vec![raw.to_string()],
                formula_queries: Vec::new(),
            });
        }

        let mut expressions: Vec<Expression> = Vec::with_capacity(composite.formulas.len());
        let mut sub_queries = SubQueries::new();
        for formula in &composite.formulas {
            let expression = expr::parse(formula)?;

            for name in expression.variables() {
                if sub_queries.contains_key(name) {
                    continue;
                }

                let query = composite.build_metric_queries.get(name).ok_or_else(|| {
                    BuildError::UnknownVariable {
                        formula: expression.source().to_string(),
                        variable: name.clone(),
                    }
                })?;
                let sql = build_metric_query(params, query, &self.schema)?;

                tracing::debug!(
                    query = %name,
                    metric = %query.metric_name,
                    aggregate = %query.aggregate_operator,
                    "Built metric sub-query"
                );
                sub_queries.insert(name.clone(), sql);
            }
            expressions.push(expression);
        }

        let mut built = BuiltQueries::default();
        for expression in &expressions {
            match compose_formula(expression, &composite.build_metric_queries, &sub_queries)? {
                ComposedQuery::Plain(sql) => built.queries.push(sql),
                ComposedQuery::Formula(sql) => {
                    tracing::debug!(
                        formula = %expression.source(),
                        queries = expression.variables().len(),
                        "Composed formula query"
                    );
                    built.formula_queries.push(sql);
                }
            }
        }

        Ok(built)
    }
}

/// Build queries with the default store schema
pub fn build_queries(params: &QueryRangeParams) -> BuildResult<BuiltQueries> {
    QueryBuilder::default().build_queries(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::model::{
        AggregateOperator, CompositeMetricQuery, FilterItem, FilterSet, MetricQuery,
    };

    fn params(composite: CompositeMetricQuery) -> QueryRangeParams {
        QueryRangeParams::new(1_650_000_000_000, 1_650_003_600_000, 60, composite)
    }

    fn requests() -> MetricQuery {
        MetricQuery::new("http_requests_total", AggregateOperator::RateSum)
            .filters(FilterSet::and(vec![FilterItem::eq("env", "prod")]))
            .group_by(&["service"])
    }

    fn errors() -> MetricQuery {
        MetricQuery::new("http_errors_total", AggregateOperator::RateSum).group_by(&["service"])
    }

    #[test]
    fn test_single_formula_is_plain_query() {
        let p = params(CompositeMetricQuery::default().query("a", requests()).formula("a"));
        let built = build_queries(&p).unwrap();

        let expected = build_metric_query(&p, &requests(), &StoreSchema::default()).unwrap();
        assert_eq!(built.queries, vec![expected]);
        assert!(built.formula_queries.is_empty());
    }

    #[test]
    fn test_formula_joins_sub_queries() {
        let p = params(
            CompositeMetricQuery::default()
                .query("a", errors())
                .query("b", requests())
                .formula("a+b"),
        );
        let built = build_queries(&p).unwrap();

        assert!(built.queries.is_empty());
        assert_eq!(built.formula_queries.len(), 1);

        let sql = &built.formula_queries[0];
        assert!(sql.starts_with("SELECT ts, a.res + b.res AS res FROM ("));
        assert!(sql.contains("INNER JOIN"));
        assert!(sql.contains("USING (ts"));
        assert!(sql.ends_with("USING (ts, service)"));
    }

    #[test]
    fn test_grouping_mismatch_returns_no_queries() {
        let p = params(
            CompositeMetricQuery::default()
                .query("a", requests())
                .query("b", errors().group_by(&["host"]))
                .formula("a")
                .formula("a+b"),
        );
        let err = build_queries(&p).unwrap_err();
        assert!(matches!(err, BuildError::GroupingMismatch { .. }));
    }

    #[test]
    fn test_raw_query_bypasses_everything() {
        let mut composite = CompositeMetricQuery::raw("SELECT 1");
        composite.formulas.push("not a ( formula".to_string());
        composite
            .build_metric_queries
            .insert("a".to_string(), MetricQuery::new("x", AggregateOperator::CountDistinct));

        let built = build_queries(&params(composite)).unwrap();
        assert_eq!(built.queries, vec!["SELECT 1".to_string()]);
        assert!(built.formula_queries.is_empty());
    }

    #[test]
    fn test_empty_raw_query_is_ignored() {
        let composite = CompositeMetricQuery::raw("").query("a", requests()).formula("a");

        let built = build_queries(&params(composite)).unwrap();
        assert_eq!(built.queries.len(), 1);
        assert_ne!(built.queries[0], "");
    }

    #[test]
    fn test_routing_preserves_formula_order() {
        let p = params(
            CompositeMetricQuery::default()
                .query("a", errors())
                .query("b", requests())
                .formula("a / b")
                .formula("b")
                .formula("a * 100")
                .formula("a"),
        );
        let built = build_queries(&p).unwrap();

        assert_eq!(built.len(), 4);
        assert_eq!(built.queries.len(), 2);
        assert!(built.queries[0].contains("'http_requests_total'"));
        assert!(built.queries[1].contains("'http_errors_total'"));
        assert!(built.formula_queries[0].contains("a.res / b.res"));
        assert!(built.formula_queries[1].contains("a.res * 100"));
    }

    #[test]
    fn test_parse_error_aborts() {
        let p = params(
            CompositeMetricQuery::default()
                .query("a", requests())
                .formula("a")
                .formula("a +"),
        );
        let err = build_queries(&p).unwrap_err();
        assert!(matches!(err, BuildError::ExpressionParse { ref formula, .. } if formula == "a +"));
    }

    #[test]
    fn test_errors_follow_formula_order() {
        let p = params(
            CompositeMetricQuery::default()
                .query("a", MetricQuery::new("users", AggregateOperator::CountDistinct))
                .formula("a")
                .formula("b +"),
        );
        let err = build_queries(&p).unwrap_err();
        assert_eq!(
            err,
            BuildError::UnsupportedAggregateOperator("COUNT_DISTINCT".to_string())
        );
    }

    #[test]
    fn test_unknown_variable_aborts() {
        let p = params(CompositeMetricQuery::default().query("a", requests()).formula("a + c"));
        let err = build_queries(&p).unwrap_err();
        assert_eq!(
            err,
            BuildError::UnknownVariable {
                formula: "a + c".to_string(),
                variable: "c".to_string(),
            }
        );
    }

    #[test]
    fn test_sub_query_error_aborts() {
        let p = params(
            CompositeMetricQuery::default()
                .query("a", requests())
                .query("d", MetricQuery::new("users", AggregateOperator::CountDistinct))
                .formula("a")
                .formula("d"),
        );
        let err = build_queries(&p).unwrap_err();
        assert!(matches!(err, BuildError::UnsupportedAggregateOperator(_)));
    }

    #[test]
    fn test_sub_queries_shared_across_formulas() {
        let p = params(
            CompositeMetricQuery::default()
                .query("a", errors())
                .query("b", requests())
                .formula("a / b")
                .formula("b - a"),
        );
        let built = build_queries(&p).unwrap();
        let sql_a = build_metric_query(&p, &errors(), &StoreSchema::default()).unwrap();

        for formula in &built.formula_queries {
            assert!(formula.contains(&format!("({}) AS a", sql_a)));
        }
    }

    #[test]
    fn test_unreferenced_queries_are_not_built() {
        let p = params(
            CompositeMetricQuery::default()
                .query("a", requests())
                .query("unused", MetricQuery::new("x", AggregateOperator::CountDistinct))
                .formula("a"),
        );
        assert!(build_queries(&p).is_ok());
    }

    #[test]
    fn test_output_is_deterministic() {
        let make = || {
            params(
                CompositeMetricQuery::default()
                    .query("b", requests())
                    .query("a", errors())
                    .formula("a / b")
                    .formula("b"),
            )
        };
        assert_eq!(build_queries(&make()).unwrap(), build_queries(&make()).unwrap());
    }

    #[test]
    fn test_custom_schema() {
        let builder = QueryBuilder::new(StoreSchema::new("metrics", "series", "points"));
        let p = params(CompositeMetricQuery::default().query("a", requests()).formula("a"));
        let built = builder.build_queries(&p).unwrap();

        assert!(built.queries[0].contains("FROM metrics.points"));
        assert!(built.queries[0].contains("FROM metrics.series WHERE"));
        assert!(built.queries[0].contains("JSONExtractString(series.labels,'env')"));
    }

    #[test]
    fn test_serializes_camel_case() {
        let built = BuiltQueries {
            queries: vec!["q".to_string()],
            formula_queries: vec![],
        };
        let json = serde_json::to_value(&built).unwrap();
        assert_eq!(json["queries"][0], "q");
        assert!(json["formulaQueries"].as_array().unwrap().is_empty());
    }
}
