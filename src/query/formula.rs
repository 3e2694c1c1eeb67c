//! Formula composition
//!
//! Combines the sub-queries a formula references into one joined query:
//!
//! ```text
//! A / B  =>  SELECT ts, A.res / B.res AS res
//!            FROM (<sql A>) AS A INNER JOIN (<sql B>) AS B USING (ts, service)
//! ```
//!
//! Every joined sub-query must group by the same labels, in the same order,
//! since those labels plus `ts` form the join key.

use std::borrow::Cow;
use std::collections::BTreeMap;

use crate::expr::{reconstruct, Expression};
use crate::query::error::{BuildError, BuildResult};
use crate::query::metric::column;
use crate::query::model::MetricQuery;

/// Built SQL per variable name
pub type SubQueries = BTreeMap<String, String>;

/// Output of composing one formula
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposedQuery {
    /// The formula is a bare reference; this is the referenced sub-query
    Plain(String),
    /// Joined query evaluating the formula
    Formula(String),
}

/// Compose one parsed formula from already-built sub-queries
pub fn compose_formula(
    expression: &Expression,
    queries: &BTreeMap<String, MetricQuery>,
    sub_queries: &SubQueries,
) -> BuildResult<ComposedQuery> {
    if let Some(name) = expression.as_single_variable() {
        return sub_query(expression, sub_queries, name).map(|sql| ComposedQuery::Plain(sql.clone()));
    }

    let variables = expression.variables();
    let last = variables.last().ok_or_else(|| {
        BuildError::parse(expression.source(), "formula references no queries")
    })?;

    for pair in variables.windows(2) {
        let left = metric_query(expression, queries, &pair[0])?;
        let right = metric_query(expression, queries, &pair[1])?;
        if left.grouping_tags != right.grouping_tags {
            return Err(BuildError::GroupingMismatch {
                left: pair[0].clone(),
                left_tags: left.grouping_tags.clone(),
                right: pair[1].clone(),
                right_tags: right.grouping_tags.clone(),
            });
        }
    }

    let projection = reconstruct(&expression.map_variables(|name| format!("{}.res", name)));

    let joined = variables
        .iter()
        .map(|name| {
            sub_query(expression, sub_queries, name).map(|sql| format!("({}) AS {}", sql, name))
        })
        .collect::<BuildResult<Vec<_>>>()?
        .join(" INNER JOIN ");

    let mut query = format!("SELECT ts, {} AS res FROM {}", projection, joined);
    if variables.len() > 1 {
        let tags = &metric_query(expression, queries, last)?.grouping_tags;
        query.push_str(&format!(" USING ({})", join_key(tags)));
    }

    Ok(ComposedQuery::Formula(query))
}

/// `ts` followed by the grouping tags
fn join_key(tags: &[String]) -> String {
    std::iter::once(Cow::Borrowed("ts"))
        .chain(tags.iter().map(|tag| column(tag)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn metric_query<'a>(
    expression: &Expression,
    queries: &'a BTreeMap<String, MetricQuery>,
    name: &str,
) -> BuildResult<&'a MetricQuery> {
    queries.get(name).ok_or_else(|| unknown(expression, name))
}

fn sub_query<'a>(
    expression: &Expression,
    sub_queries: &'a SubQueries,
    name: &str,
) -> BuildResult<&'a String> {
    sub_queries.get(name).ok_or_else(|| unknown(expression, name))
}

fn unknown(expression: &Expression, name: &str) -> BuildError {
    BuildError::UnknownVariable {
        formula: expression.source().to_string(),
        variable: name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::parse;
    use crate::query::model::AggregateOperator;

    /// Entries are `(name, comma separated grouping tags)`
    fn setup(entries: &[(&str, &str)]) -> (BTreeMap<String, MetricQuery>, SubQueries) {
        let mut queries = BTreeMap::new();
        let mut sub_queries = SubQueries::new();
        for (name, tags) in entries {
            let tags: Vec<&str> = tags.split(',').filter(|t| !t.is_empty()).collect();
            queries.insert(
                name.to_string(),
                MetricQuery::new(format!("metric_{}", name), AggregateOperator::Sum)
                    .group_by(&tags),
            );
            sub_queries.insert(name.to_string(), format!("SQL_{}", name));
        }
        (queries, sub_queries)
    }

    #[test]
    fn test_bare_reference_is_plain() {
        let (queries, subs) = setup(&[("A", "")]);
        let composed = compose_formula(&parse("A").unwrap(), &queries, &subs).unwrap();
        assert_eq!(composed, ComposedQuery::Plain("SQL_A".to_string()));
    }

    #[test]
    fn test_two_way_join() {
        let (queries, subs) = setup(&[("A", "service"), ("B", "service")]);
        let composed = compose_formula(&parse("A/B").unwrap(), &queries, &subs).unwrap();

        assert_eq!(
            composed,
            ComposedQuery::Formula(
                "SELECT ts, A.res / B.res AS res FROM (SQL_A) AS A \
                 INNER JOIN (SQL_B) AS B USING (ts, service)"
                    .to_string()
            )
        );
    }

    #[test]
    fn test_three_way_join_single_using() {
        let (queries, subs) = setup(&[("A", "a,b"), ("B", "a,b"), ("C", "a,b")]);
        let composed =
            compose_formula(&parse("(A + B) * C").unwrap(), &queries, &subs).unwrap();

        let ComposedQuery::Formula(sql) = composed else {
            panic!("expected formula query");
        };
        assert!(sql.starts_with("SELECT ts, (A.res + B.res) * C.res AS res FROM "));
        assert_eq!(sql.matches("INNER JOIN").count(), 2);
        assert_eq!(sql.matches("USING").count(), 1);
        assert!(sql.ends_with("(SQL_C) AS C USING (ts, a, b)"));
    }

    #[test]
    fn test_join_key_quotes_non_identifier_tags() {
        let (queries, subs) = setup(&[("A", "k8s-pod,zone"), ("B", "k8s-pod,zone")]);
        let ComposedQuery::Formula(sql) =
            compose_formula(&parse("A + B").unwrap(), &queries, &subs).unwrap()
        else {
            panic!("expected formula query");
        };
        assert!(sql.ends_with("USING (ts, `k8s-pod`, zone)"));
    }

    #[test]
    fn test_join_order_follows_first_appearance() {
        let (queries, subs) = setup(&[("A", ""), ("B", "")]);
        let ComposedQuery::Formula(sql) =
            compose_formula(&parse("B - A").unwrap(), &queries, &subs).unwrap()
        else {
            panic!("expected formula query");
        };
        assert!(sql.ends_with("FROM (SQL_B) AS B INNER JOIN (SQL_A) AS A USING (ts)"));
    }

    #[test]
    fn test_repeated_variable_joined_once() {
        let (queries, subs) = setup(&[("A", ""), ("B", "")]);
        let ComposedQuery::Formula(sql) =
            compose_formula(&parse("A * A + B").unwrap(), &queries, &subs).unwrap()
        else {
            panic!("expected formula query");
        };
        assert_eq!(sql.matches("(SQL_A) AS A").count(), 1);
        assert!(sql.contains("A.res * A.res + B.res"));
    }

    #[test]
    fn test_single_variable_with_operators_has_no_join() {
        let (queries, subs) = setup(&[("A", "host")]);
        let composed = compose_formula(&parse("A * 100").unwrap(), &queries, &subs).unwrap();
        assert_eq!(
            composed,
            ComposedQuery::Formula("SELECT ts, A.res * 100 AS res FROM (SQL_A) AS A".to_string())
        );
    }

    #[test]
    fn test_grouping_mismatch() {
        let (queries, subs) = setup(&[("A", "service"), ("B", "host")]);
        let err = compose_formula(&parse("A + B").unwrap(), &queries, &subs).unwrap_err();
        assert_eq!(
            err,
            BuildError::GroupingMismatch {
                left: "A".to_string(),
                left_tags: vec!["service".to_string()],
                right: "B".to_string(),
                right_tags: vec!["host".to_string()],
            }
        );
    }

    #[test]
    fn test_grouping_order_matters() {
        let (queries, subs) = setup(&[("A", "x,y"), ("B", "y,x")]);
        let err = compose_formula(&parse("A + B").unwrap(), &queries, &subs).unwrap_err();
        assert!(matches!(err, BuildError::GroupingMismatch { .. }));
    }

    #[test]
    fn test_no_variables() {
        let (queries, subs) = setup(&[]);
        let err = compose_formula(&parse("1 + 2").unwrap(), &queries, &subs).unwrap_err();
        assert!(matches!(err, BuildError::ExpressionParse { .. }));
    }

    #[test]
    fn test_missing_sub_query() {
        let (queries, subs) = setup(&[("A", "")]);
        let err = compose_formula(&parse("A + Z").unwrap(), &queries, &subs).unwrap_err();
        assert_eq!(
            err,
            BuildError::UnknownVariable {
                formula: "A + Z".to_string(),
                variable: "Z".to_string(),
            }
        );
    }
}
