//! Query-string filtering over JSON records.
//!
//! Every query parameter must match the record field of the same name.
//! Matching is loose, by rules specific to this service: strings compare
//! as-is, numbers by their text or numeric value (`?port=8080` and
//! `?port=8080.0` match `"port": 8080`), booleans by their text
//! (`?is_running=true` matches `"is_running": true`). A record without the
//! field never matches, and neither do null, array or object fields.
//!
//! These are not JavaScript `==` semantics: `?is_running=true` matches here
//! where `true == "true"` is false in JS, and an empty value never matches
//! `0` although `0 == ""` holds in JS.

use std::collections::HashMap;

use serde_json::Value;

pub fn filter(records: &[Value], query: &HashMap<String, String>) -> Vec<Value> {
    records
        .iter()
        .filter(|record| matches(record, query))
        .cloned()
        .collect()
}

pub fn matches(record: &Value, query: &HashMap<String, String>) -> bool {
    query
        .iter()
        .all(|(key, wanted)| record.get(key).is_some_and(|field| loose_eq(field, wanted)))
}

fn loose_eq(field: &Value, wanted: &str) -> bool {
    match field {
        Value::String(s) => s == wanted,
        Value::Number(n) => {
            n.to_string() == wanted
                || wanted
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .zip(n.as_f64())
                    .is_some_and(|(w, f)| w == f)
        }
        Value::Bool(b) => b.to_string() == wanted,
        Value::Null | Value::Array(_) | Value::Object(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn records() -> Vec<Value> {
        vec![
            json!({ "id": 1, "name": "postgres", "is_running": true }),
            json!({ "id": 2, "name": "hasura", "is_running": false }),
            json!({ "id": 3, "name": "api" }),
        ]
    }

    #[test]
    fn empty_query_keeps_everything() {
        assert_eq!(filter(&records(), &HashMap::new()).len(), 3);
    }

    #[test]
    fn string_field_matches_exactly() {
        let out = filter(&records(), &query(&[("name", "hasura")]));
        assert_eq!(out, vec![records()[1].clone()]);
        assert!(filter(&records(), &query(&[("name", "Hasura")])).is_empty());
    }

    #[test]
    fn numbers_match_their_text() {
        let out = filter(&records(), &query(&[("id", "3")]));
        assert_eq!(out, vec![records()[2].clone()]);
        assert_eq!(filter(&records(), &query(&[("id", "3.0")])).len(), 1);
        assert!(filter(&records(), &query(&[("id", "three")])).is_empty());
    }

    #[test]
    fn booleans_match_their_text() {
        let out = filter(&records(), &query(&[("is_running", "false")]));
        assert_eq!(out, vec![records()[1].clone()]);
    }

    #[test]
    fn missing_field_never_matches() {
        let out = filter(&records(), &query(&[("is_running", "true")]));
        assert_eq!(out.len(), 1);
        assert!(filter(&records(), &query(&[("cluster", "docker")])).is_empty());
    }

    #[test]
    fn all_parameters_must_match() {
        let q = query(&[("name", "postgres"), ("id", "2")]);
        assert!(filter(&records(), &q).is_empty());
        let q = query(&[("name", "postgres"), ("id", "1")]);
        assert_eq!(filter(&records(), &q).len(), 1);
    }

    #[test]
    fn empty_value_does_not_match_zero() {
        let record = json!({ "restarts": 0 });
        assert!(!matches(&record, &query(&[("restarts", "")])));
        assert!(matches(&record, &query(&[("restarts", "0")])));
    }

    #[test]
    fn nested_values_never_match() {
        let record = json!({ "tags": ["a"], "owner": null });
        assert!(!matches(&record, &query(&[("tags", "a")])));
        assert!(!matches(&record, &query(&[("owner", "null")])));
    }
}
