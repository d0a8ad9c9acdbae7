//! Row filters shared by both backend implementations.

use serde_json::Value;
use std::cmp::Ordering;

/// A single column predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Column equals value.
    Eq(String, Value),
    /// Column is null or absent.
    IsNull(String),
    /// Column equals one of the values.
    In(String, Vec<Value>),
}

impl Filter {
    fn matches(&self, row: &Value) -> bool {
        match self {
            Self::Eq(column, value) => row.get(column) == Some(value),
            Self::IsNull(column) => row.get(column).is_none_or(Value::is_null),
            Self::In(column, values) => row.get(column).is_some_and(|v| values.contains(v)),
        }
    }
}

/// Filters, ordering and limit for a table read or write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    filters: Vec<Filter>,
    order: Option<(String, bool)>,
    limit: Option<usize>,
}

impl Query {
    /// Empty query matching every row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality filter.
    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq(column.into(), value.into()));
        self
    }

    /// Add an is-null filter.
    pub fn is_null(mut self, column: impl Into<String>) -> Self {
        self.filters.push(Filter::IsNull(column.into()));
        self
    }

    /// Add a membership filter.
    pub fn one_of<V: Into<Value>>(
        mut self,
        column: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.filters.push(Filter::In(
            column.into(),
            values.into_iter().map(Into::into).collect(),
        ));
        self
    }

    /// Order results by `column`.
    pub fn order_by(mut self, column: impl Into<String>, ascending: bool) -> Self {
        self.order = Some((column.into(), ascending));
        self
    }

    /// Cap the number of results.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// The filters of this query.
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// Whether `row` satisfies every filter.
    pub fn matches(&self, row: &Value) -> bool {
        self.filters.iter().all(|f| f.matches(row))
    }

    /// Sort and truncate rows in place according to order and limit.
    pub fn apply_order_and_limit(&self, rows: &mut Vec<Value>) {
        if let Some((column, ascending)) = &self.order {
            rows.sort_by(|a, b| {
                let ord = compare_values(a.get(column), b.get(column));
                if *ascending { ord } else { ord.reverse() }
            });
        }
        if let Some(limit) = self.limit {
            rows.truncate(limit);
        }
    }

    /// PostgREST query parameters (`col=eq.v`, `order=col.desc`, `limit=n`).
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params: Vec<(String, String)> = self
            .filters
            .iter()
            .map(|f| match f {
                Filter::Eq(column, value) => (column.clone(), format!("eq.{}", plain(value))),
                Filter::IsNull(column) => (column.clone(), "is.null".to_string()),
                Filter::In(column, values) => {
                    let list: Vec<String> = values.iter().map(plain).collect();
                    (column.clone(), format!("in.({})", list.join(",")))
                }
            })
            .collect();

        if let Some((column, ascending)) = &self.order {
            let dir = if *ascending { "asc" } else { "desc" };
            params.push(("order".to_string(), format!("{}.{}", column, dir)));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        params
    }
}

fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        (None | Some(Value::Null), Some(v)) if !v.is_null() => Ordering::Less,
        (Some(v), None | Some(Value::Null)) if !v.is_null() => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_matches() {
        let row = json!({"user_id": "u1", "is_active": true, "triggered_at": null});
        assert!(
            Query::new()
                .eq("user_id", "u1")
                .eq("is_active", true)
                .is_null("triggered_at")
                .matches(&row)
        );
        assert!(!Query::new().eq("user_id", "u2").matches(&row));
        assert!(Query::new().is_null("missing").matches(&row));
        assert!(Query::new().one_of("user_id", ["u0", "u1"]).matches(&row));
    }

    #[test]
    fn test_order_and_limit() {
        let mut rows = vec![
            json!({"created_at": "2024-01-01"}),
            json!({"created_at": "2024-03-01"}),
            json!({"created_at": "2024-02-01"}),
        ];
        Query::new()
            .order_by("created_at", false)
            .limit(2)
            .apply_order_and_limit(&mut rows);
        assert_eq!(
            rows,
            vec![json!({"created_at": "2024-03-01"}), json!({"created_at": "2024-02-01"})]
        );
    }

    #[test]
    fn test_postgrest_params() {
        let params = Query::new()
            .eq("user_id", "abc")
            .eq("is_active", true)
            .is_null("triggered_at")
            .one_of("post_id", ["p1", "p2"])
            .order_by("created_at", false)
            .limit(50)
            .to_params();

        assert_eq!(
            params,
            vec![
                ("user_id".to_string(), "eq.abc".to_string()),
                ("is_active".to_string(), "eq.true".to_string()),
                ("triggered_at".to_string(), "is.null".to_string()),
                ("post_id".to_string(), "in.(p1,p2)".to_string()),
                ("order".to_string(), "created_at.desc".to_string()),
                ("limit".to_string(), "50".to_string()),
            ]
        );
    }
}
