//! Local query operations over array views.
//!
//! A query is an ordered list of operations applied left-to-right:
//! predicates filter, orderings sort (nulls last), limit/offset slice.
//! Everything here is pure and local — no handler required.
//!
//! Ops are also parseable from the JSON list form hosts pass through,
//! e.g. `[["equal", "id", 1], ["sort_desc", "name"], ["limit", 10]]`.

use std::cmp::Ordering;

use rand::seq::SliceRandom;
use serde_json::Value;

use crate::error::Error;

/// One query operation.
#[derive(Clone, Debug, PartialEq)]
pub enum QueryOp {
    Equal(String, Value),
    NotEqual(String, Value),
    Greater(String, Value),
    GreaterOrEqual(String, Value),
    Less(String, Value),
    LessOrEqual(String, Value),
    /// Case-sensitive substring match on a string field.
    Contains(String, String),
    Prefix(String, String),
    Suffix(String, String),
    IsNull(String),
    NotNull(String),
    SortAsc(String),
    SortDesc(String),
    /// Random ordering.
    Shuffle,
    Limit(usize),
    Offset(usize),
}

impl QueryOp {
    /// Parse one op from its JSON list form, e.g. `["equal", "id", 1]`.
    pub fn parse(op: &Value) -> Result<QueryOp, Error> {
        let parts = op
            .as_array()
            .ok_or_else(|| Error::invalid_query(format!("expected a list, got {op}")))?;
        let name = parts
            .first()
            .and_then(Value::as_str)
            .ok_or_else(|| Error::invalid_query("missing operation name"))?;

        let field = |i: usize| -> Result<String, Error> {
            parts
                .get(i)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| Error::invalid_query(format!("'{name}' needs a field name")))
        };
        let operand = |i: usize| -> Result<Value, Error> {
            parts
                .get(i)
                .cloned()
                .ok_or_else(|| Error::invalid_query(format!("'{name}' needs an operand")))
        };
        let text = |i: usize| -> Result<String, Error> {
            parts
                .get(i)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| Error::invalid_query(format!("'{name}' needs a string operand")))
        };
        let count = |i: usize| -> Result<usize, Error> {
            parts
                .get(i)
                .and_then(Value::as_u64)
                .map(|n| n as usize)
                .ok_or_else(|| Error::invalid_query(format!("'{name}' needs a non-negative count")))
        };

        Ok(match name {
            "equal" => QueryOp::Equal(field(1)?, operand(2)?),
            "not_equal" => QueryOp::NotEqual(field(1)?, operand(2)?),
            "greater" => QueryOp::Greater(field(1)?, operand(2)?),
            "greater_or_equal" => QueryOp::GreaterOrEqual(field(1)?, operand(2)?),
            "less" => QueryOp::Less(field(1)?, operand(2)?),
            "less_or_equal" => QueryOp::LessOrEqual(field(1)?, operand(2)?),
            "contains" => QueryOp::Contains(field(1)?, text(2)?),
            "prefix" => QueryOp::Prefix(field(1)?, text(2)?),
            "suffix" => QueryOp::Suffix(field(1)?, text(2)?),
            "is_null" => QueryOp::IsNull(field(1)?),
            "not_null" => QueryOp::NotNull(field(1)?),
            "sort_asc" => QueryOp::SortAsc(field(1)?),
            "sort_desc" => QueryOp::SortDesc(field(1)?),
            "shuffle" => QueryOp::Shuffle,
            "limit" => QueryOp::Limit(count(1)?),
            "offset" => QueryOp::Offset(count(1)?),
            other => {
                return Err(Error::invalid_query(format!("unknown operation '{other}'")));
            }
        })
    }

    /// Parse a whole op list.
    pub fn parse_list(ops: &Value) -> Result<Vec<QueryOp>, Error> {
        let list = ops
            .as_array()
            .ok_or_else(|| Error::invalid_query("expected a list of operations"))?;
        list.iter().map(QueryOp::parse).collect()
    }
}

/// Apply ops left-to-right to the items.
pub(crate) fn apply(ops: &[QueryOp], mut items: Vec<Value>) -> Vec<Value> {
    for op in ops {
        match op {
            QueryOp::Equal(f, v) => items.retain(|item| value_eq(field_of(item, f), v)),
            QueryOp::NotEqual(f, v) => items.retain(|item| !value_eq(field_of(item, f), v)),
            QueryOp::Greater(f, v) => retain_cmp(&mut items, f, v, |o| o == Ordering::Greater),
            QueryOp::GreaterOrEqual(f, v) => {
                retain_cmp(&mut items, f, v, |o| o != Ordering::Less)
            }
            QueryOp::Less(f, v) => retain_cmp(&mut items, f, v, |o| o == Ordering::Less),
            QueryOp::LessOrEqual(f, v) => {
                retain_cmp(&mut items, f, v, |o| o != Ordering::Greater)
            }
            QueryOp::Contains(f, needle) => {
                items.retain(|item| string_field(item, f).is_some_and(|s| s.contains(needle)))
            }
            QueryOp::Prefix(f, needle) => {
                items.retain(|item| string_field(item, f).is_some_and(|s| s.starts_with(needle)))
            }
            QueryOp::Suffix(f, needle) => {
                items.retain(|item| string_field(item, f).is_some_and(|s| s.ends_with(needle)))
            }
            QueryOp::IsNull(f) => items.retain(|item| is_null_field(item, f)),
            QueryOp::NotNull(f) => items.retain(|item| !is_null_field(item, f)),
            QueryOp::SortAsc(f) => sort_items(&mut items, f, false),
            QueryOp::SortDesc(f) => sort_items(&mut items, f, true),
            QueryOp::Shuffle => items.shuffle(&mut rand::thread_rng()),
            QueryOp::Limit(n) => items.truncate(*n),
            QueryOp::Offset(n) => {
                items.drain(..(*n).min(items.len()));
            }
        }
    }
    items
}

/// Local case-insensitive substring search.
///
/// With `fields` given, only those fields are inspected; otherwise every
/// string-valued field of each item counts. A non-object item matches on
/// its own string form.
pub(crate) fn search(items: &[Value], needle: &str, fields: Option<&[&str]>) -> Vec<Value> {
    let needle = needle.to_lowercase();
    items
        .iter()
        .filter(|item| match item {
            Value::Object(map) => match fields {
                Some(fields) => fields.iter().any(|f| {
                    map.get(*f)
                        .and_then(Value::as_str)
                        .is_some_and(|s| s.to_lowercase().contains(&needle))
                }),
                None => map
                    .values()
                    .filter_map(Value::as_str)
                    .any(|s| s.to_lowercase().contains(&needle)),
            },
            Value::String(s) => s.to_lowercase().contains(&needle),
            _ => false,
        })
        .cloned()
        .collect()
}

fn field_of<'a>(item: &'a Value, field: &str) -> Option<&'a Value> {
    item.as_object().and_then(|map| map.get(field))
}

fn string_field<'a>(item: &'a Value, field: &str) -> Option<&'a str> {
    field_of(item, field).and_then(Value::as_str)
}

fn is_null_field(item: &Value, field: &str) -> bool {
    matches!(field_of(item, field), None | Some(Value::Null))
}

/// Equality with numeric coercion, so `1` matches `1.0`.
fn value_eq(field: Option<&Value>, operand: &Value) -> bool {
    match field {
        Some(v) => {
            if let (Some(a), Some(b)) = (v.as_f64(), operand.as_f64()) {
                a == b
            } else {
                v == operand
            }
        }
        None => operand.is_null(),
    }
}

/// Ordering across comparable values; `None` for mismatched or
/// non-comparable types (which filter out).
fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(_), Value::Number(_)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn retain_cmp(items: &mut Vec<Value>, field: &str, operand: &Value, keep: impl Fn(Ordering) -> bool) {
    items.retain(|item| {
        field_of(item, field)
            .and_then(|v| compare_values(v, operand))
            .is_some_and(&keep)
    });
}

/// Stable sort with nulls (and missing fields) last regardless of
/// direction.
fn sort_items(items: &mut [Value], field: &str, descending: bool) {
    items.sort_by(|a, b| {
        let a = field_of(a, field).filter(|v| !v.is_null());
        let b = field_of(b, field).filter(|v| !v.is_null());
        match (a, b) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(a), Some(b)) => {
                let ord = compare_values(a, b).unwrap_or(Ordering::Equal);
                if descending {
                    ord.reverse()
                } else {
                    ord
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn people() -> Vec<Value> {
        vec![
            json!({"id": 1, "name": "Alice", "age": 34, "city": "Berlin"}),
            json!({"id": 2, "name": "Bob", "age": 28, "city": null}),
            json!({"id": 3, "name": "Carol", "age": 41}),
            json!({"id": 4, "name": "dave", "age": 28, "city": "Lisbon"}),
        ]
    }

    #[test]
    fn equal_filters_with_numeric_coercion() {
        let out = apply(&[QueryOp::Equal("id".into(), json!(1.0))], people());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["name"], json!("Alice"));
    }

    #[test]
    fn range_predicates() {
        let out = apply(&[QueryOp::Greater("age".into(), json!(30))], people());
        assert_eq!(out.len(), 2);

        let out = apply(&[QueryOp::LessOrEqual("age".into(), json!(28))], people());
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn string_predicates() {
        let out = apply(&[QueryOp::Prefix("name".into(), "Al".into())], people());
        assert_eq!(out.len(), 1);

        let out = apply(&[QueryOp::Suffix("name".into(), "ol".into())], people());
        assert_eq!(out[0]["name"], json!("Carol"));

        let out = apply(&[QueryOp::Contains("name".into(), "a".into())], people());
        // Case-sensitive: Carol, dave (not Alice: capital A only at start).
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn null_predicates_treat_missing_as_null() {
        let out = apply(&[QueryOp::IsNull("city".into())], people());
        // Bob has an explicit null, Carol has no city at all.
        assert_eq!(out.len(), 2);

        let out = apply(&[QueryOp::NotNull("city".into())], people());
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn sort_asc_puts_nulls_last() {
        let out = apply(&[QueryOp::SortAsc("city".into())], people());
        assert_eq!(out[0]["city"], json!("Berlin"));
        assert_eq!(out[1]["city"], json!("Lisbon"));
        assert!(out[2]["city"].is_null() || !out[2].as_object().unwrap().contains_key("city"));
    }

    #[test]
    fn sort_desc_still_puts_nulls_last() {
        let out = apply(&[QueryOp::SortDesc("city".into())], people());
        assert_eq!(out[0]["city"], json!("Lisbon"));
        assert_eq!(out[1]["city"], json!("Berlin"));
    }

    #[test]
    fn limit_and_offset_slice() {
        let ops = [
            QueryOp::SortAsc("id".into()),
            QueryOp::Offset(1),
            QueryOp::Limit(2),
        ];
        let out = apply(&ops, people());
        assert_eq!(out.len(), 2);
        assert_eq!(out[0]["id"], json!(2));
        assert_eq!(out[1]["id"], json!(3));
    }

    #[test]
    fn offset_past_the_end_is_empty() {
        let out = apply(&[QueryOp::Offset(99)], people());
        assert!(out.is_empty());
    }

    #[test]
    fn ops_apply_left_to_right() {
        // limit-then-filter differs from filter-then-limit.
        let a = apply(
            &[QueryOp::Limit(1), QueryOp::Equal("id".into(), json!(2))],
            people(),
        );
        assert!(a.is_empty());

        let b = apply(
            &[QueryOp::Equal("id".into(), json!(2)), QueryOp::Limit(1)],
            people(),
        );
        assert_eq!(b.len(), 1);
    }

    #[test]
    fn shuffle_keeps_every_item() {
        let out = apply(&[QueryOp::Shuffle], people());
        assert_eq!(out.len(), 4);
        for person in people() {
            assert!(out.contains(&person));
        }
    }

    #[test]
    fn parse_list_round_trips_ops() {
        let ops = QueryOp::parse_list(&json!([
            ["equal", "id", 1],
            ["sort_desc", "name"],
            ["limit", 10],
            ["shuffle"]
        ]))
        .unwrap();
        assert_eq!(
            ops,
            vec![
                QueryOp::Equal("id".into(), json!(1)),
                QueryOp::SortDesc("name".into()),
                QueryOp::Limit(10),
                QueryOp::Shuffle,
            ]
        );
    }

    #[test]
    fn parse_rejects_unknown_and_malformed_ops() {
        assert!(QueryOp::parse(&json!(["betwixt", "a", 1])).is_err());
        assert!(QueryOp::parse(&json!(["equal"])).is_err());
        assert!(QueryOp::parse(&json!(["limit", -3])).is_err());
        assert!(QueryOp::parse(&json!("equal")).is_err());
        assert!(QueryOp::parse_list(&json!({"not": "a list"})).is_err());
    }

    #[test]
    fn search_is_case_insensitive_over_all_string_fields() {
        let out = search(&people(), "LI", None);
        // Alice (name), dave (city Lisbon).
        assert_eq!(out.len(), 2);
        assert_eq!(out[0]["name"], json!("Alice"));
        assert_eq!(out[1]["name"], json!("dave"));
    }

    #[test]
    fn search_restricted_to_named_fields() {
        let out = search(&people(), "lis", Some(&["city"]));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["name"], json!("dave"));
    }

    #[test]
    fn search_matches_bare_strings() {
        let items = vec![json!("Apple pie"), json!("cherry"), json!(42)];
        let out = search(&items, "PIE", None);
        assert_eq!(out, vec![json!("Apple pie")]);
    }
}
