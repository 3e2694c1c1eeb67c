//! Single metric query construction
//!
//! Turns one [`MetricQuery`] into a ClickHouse query returning one row per
//! `(fingerprint, ts)` bucket with the aggregate projected as `res`:
//!
//! ```text
//! SELECT fingerprint, service, toStartOfInterval(...) AS ts, avg(value) AS res
//! FROM samples INNER JOIN (<label filter>) AS filtered_time_series USING fingerprint
//! WHERE timestamp_ms >= start AND timestamp_ms < end
//! GROUP BY fingerprint, ts, JSONExtractString(labels,'service') AS service
//! ORDER BY fingerprint, ts
//! ```
//!
//! Rate operators wrap that query and divide the running difference of `res`
//! by the running difference of `ts`.

use std::borrow::Cow;

use crate::query::aggregate::AggregateKind;
use crate::query::error::{BuildError, BuildResult};
use crate::query::filter::{build_filter_subquery, label_accessor};
use crate::query::model::{
    FilterItem, FilterSet, MetricQuery, QueryRangeParams, StoreSchema, METRIC_NAME_LABEL,
};

/// Build the SQL for one metric query
pub fn build_metric_query(
    params: &QueryRangeParams,
    query: &MetricQuery,
    schema: &StoreSchema,
) -> BuildResult<String> {
    let kind = AggregateKind::of(query.aggregate_operator);
    let aggregate = kind.expression().ok_or_else(|| {
        BuildError::UnsupportedAggregateOperator(query.aggregate_operator.to_string())
    })?;

    let filters = with_name_filter(query);
    let filter_subquery = build_filter_subquery(&filters, schema)?;

    let group_tags = group_select(&query.grouping_tags);
    let intermediate = format!(
        "SELECT fingerprint, {group_tags} \
         toStartOfInterval(toDateTime(intDiv(timestamp_ms, 1000)), INTERVAL {step} SECOND) AS ts, \
         {aggregate} AS res \
         FROM {samples} \
         INNER JOIN ({filter_subquery}) AS filtered_time_series USING fingerprint \
         WHERE {time_filter} \
         GROUP BY {group_by} \
         ORDER BY fingerprint, ts",
        step = params.step,
        samples = schema.samples_ref(),
        time_filter = time_filter(params),
        group_by = group_by(&query.grouping_tags),
    );

    if kind.is_rate() {
        Ok(format!(
            "SELECT {group_tags} ts, runningDifference(res)/runningDifference(ts) AS res \
             FROM ({intermediate})"
        ))
    } else {
        Ok(intermediate)
    }
}

/// Copy of the query's filters with the metric name filter appended
fn with_name_filter(query: &MetricQuery) -> FilterSet {
    let mut filters = query.tag_filters.clone().unwrap_or_default();
    filters
        .items
        .push(FilterItem::eq(METRIC_NAME_LABEL, query.metric_name.as_str()));
    filters
}

/// Half-open sample time range
fn time_filter(params: &QueryRangeParams) -> String {
    format!(
        "timestamp_ms >= {} AND timestamp_ms < {}",
        params.start, params.end
    )
}

/// GROUP BY clause: bucket keys, then one label extraction per tag
pub fn group_by(tags: &[String]) -> String {
    let mut clause = String::from("fingerprint, ts");
    for tag in tags {
        clause.push_str(&format!(", {} AS {}", label_accessor(None, tag), column(tag)));
    }
    clause
}

/// Projection of the grouping tags, comma-terminated so it can precede fixed columns
pub fn group_select(tags: &[String]) -> String {
    if tags.is_empty() {
        return String::new();
    }
    let columns: Vec<_> = tags.iter().map(|tag| column(tag)).collect();
    format!("{},", columns.join(","))
}

/// Column name for a grouping tag, backquoted unless it is a plain identifier
pub fn column(tag: &str) -> Cow<'_, str> {
    let plain = tag.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_')
        && tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if plain {
        Cow::Borrowed(tag)
    } else {
        Cow::Owned(format!("`{}`", tag.replace('\\', "\\\\").replace('`', "\\`")))
    }
}
