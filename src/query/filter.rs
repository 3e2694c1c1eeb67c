//! Label filter translation
//!
//! Renders a [`FilterSet`] as a subquery over the time series table that
//! returns one `(fingerprint, labels)` row per label set matching the
//! predicate.
//!
//! ```text
//! SELECT fingerprint, labels FROM signoz_metrics.time_series_v2
//! WHERE JSONExtractString(time_series_v2.labels,'service') = 'api'
//!   AND JSONExtractString(time_series_v2.labels,'__name__') = 'requests_total'
//! ```

use crate::query::error::{BuildError, BuildResult};
use crate::query::model::{FilterOperation, FilterSet, FilterValue, StoreSchema};

/// Build the time series filter subquery
///
/// An empty filter set selects every series.
pub fn build_filter_subquery(filters: &FilterSet, schema: &StoreSchema) -> BuildResult<String> {
    let separator = format!(" {} ", filters.combinator);

    let predicates = filters
        .items
        .iter()
        .map(|item| {
            let value = format_value(&item.value).map_err(|reason| {
                BuildError::UnsupportedFilterValue {
                    key: item.key.clone(),
                    reason: reason.to_string(),
                }
            })?;
            let label = label_accessor(Some(schema.time_series_table.as_str()), &item.key);

            Ok(match &item.operation {
                FilterOperation::Eq => format!("{} = {}", label, value),
                FilterOperation::Neq => format!("{} != {}", label, value),
                FilterOperation::In => format!("{} IN {}", label, value),
                FilterOperation::Nin => format!("{} NOT IN {}", label, value),
                FilterOperation::Like => format!("like({}, {})", label, value),
                FilterOperation::Match => format!("match({}, {})", label, value),
                FilterOperation::Other(name) => {
                    return Err(BuildError::UnsupportedOperation(name.clone()))
                }
            })
        })
        .collect::<BuildResult<Vec<_>>>()?;

    let mut sql = format!("SELECT fingerprint, labels FROM {}", schema.time_series_ref());
    if !predicates.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&predicates.join(&separator));
    }
    Ok(sql)
}

/// Extract a label from the JSON label set, optionally qualified by table
pub fn label_accessor(table: Option<&str>, key: &str) -> String {
    match table {
        Some(table) => format!("JSONExtractString({}.labels,{})", table, quote(key)),
        None => format!("JSONExtractString(labels,{})", quote(key)),
    }
}

/// Render a filter value as a SQL literal
///
/// Lists must be non-empty and hold one kind of scalar: strings render as an
/// array literal, numbers and booleans as a bare comma list.
pub fn format_value(value: &FilterValue) -> Result<String, &'static str> {
    match value {
        FilterValue::List(items) => format_list(items),
        scalar => Ok(format_scalar(scalar)),
    }
}

fn format_scalar(value: &FilterValue) -> String {
    match value {
        FilterValue::Int(v) => v.to_string(),
        FilterValue::Float(v) => format!("{:.6}", v),
        FilterValue::Str(v) => quote(v),
        FilterValue::Bool(v) => v.to_string(),
        FilterValue::List(_) => String::new(),
    }
}

fn format_list(items: &[FilterValue]) -> Result<String, &'static str> {
    let first = items.first().ok_or("empty list")?;

    let kind = ListKind::of(first).ok_or("nested list")?;
    if items.iter().any(|item| ListKind::of(item) != Some(kind)) {
        return Err("list mixes value types");
    }

    let rendered: Vec<String> = items.iter().map(format_scalar).collect();
    Ok(match kind {
        ListKind::Strings => format!("[{}]", rendered.join(",")),
        ListKind::Numbers | ListKind::Bools => rendered.join(","),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Strings,
    Numbers,
    Bools,
}

impl ListKind {
    fn of(value: &FilterValue) -> Option<Self> {
        match value {
            FilterValue::Str(_) => Some(Self::Strings),
            FilterValue::Int(_) | FilterValue::Float(_) => Some(Self::Numbers),
            FilterValue::Bool(_) => Some(Self::Bools),
            FilterValue::List(_) => None,
        }
    }
}

/// Single-quote a string literal
fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
}
