/// Feature alignment: reduce an inbound record to the training-time schema.
///
/// Callers may send keys in any order, omit keys, or add keys the model has
/// never seen. `align` always produces exactly one value per stored feature
/// name, in stored order, so the pipeline sees inputs shaped identically to
/// its training data.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::model::MISSING;

/// An inbound feature record: feature name to scalar JSON value.
pub type Record = Map<String, Value>;

/// How a service treats features absent from the inbound record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingFeaturePolicy {
    /// Substitute the missing marker and let the pipeline impute it.
    #[default]
    Impute,
    /// Reject the request, listing every absent feature.
    Reject,
}

/// A single row whose columns are exactly the stored feature order.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedRow<'a> {
    columns: &'a [String],
    values: Vec<Value>,
}

impl<'a> AlignedRow<'a> {
    pub fn columns(&self) -> &'a [String] {
        self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value for a named column, or `None` if the column is not in the row.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == name)
            .map(|i| &self.values[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(String::as_str).zip(self.values.iter())
    }
}

/// Builds the row for `order` from `record`, substituting the missing
/// marker for absent keys. Extra keys in `record` are ignored.
pub fn align<'a>(record: &Record, order: &'a [String]) -> AlignedRow<'a> {
    let values = order
        .iter()
        .map(|name| record.get(name).cloned().unwrap_or(MISSING))
        .collect();

    AlignedRow { columns: order, values }
}

/// Feature names from `order` that are entirely absent from `record`,
/// in feature order. An explicit `null` counts as present.
pub fn missing_features(record: &Record, order: &[String]) -> Vec<String> {
    order
        .iter()
        .filter(|name| !record.contains_key(name.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn order(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn record(value: Value) -> Record {
        value.as_object().cloned().expect("test record must be an object")
    }

    #[test]
    fn test_align_reorders_to_stored_order() {
        let order = order(&["magnitude", "depth", "alert"]);
        let rec = record(json!({ "alert": "green", "depth": 10.0, "magnitude": 7.1 }));

        let row = align(&rec, &order);

        assert_eq!(row.columns(), order.as_slice());
        assert_eq!(row.values(), &[json!(7.1), json!(10.0), json!("green")]);
    }

    #[test]
    fn test_align_fills_absent_keys_with_missing_marker() {
        let order = order(&["a", "b", "c"]);
        let rec = record(json!({ "b": 2 }));

        let row = align(&rec, &order);

        assert_eq!(row.len(), 3);
        assert_eq!(row.get("a"), Some(&MISSING));
        assert_eq!(row.get("b"), Some(&json!(2)));
        assert_eq!(row.get("c"), Some(&MISSING));
    }

    #[test]
    fn test_align_drops_unknown_keys() {
        let order = order(&["a"]);
        let rec = record(json!({ "a": 1, "zzz": "extra" }));

        let row = align(&rec, &order);

        assert_eq!(row.len(), 1);
        assert_eq!(row.get("zzz"), None);
    }

    #[test]
    fn test_align_empty_order_yields_empty_row() {
        let row = align(&record(json!({ "a": 1 })), &[]);
        assert!(row.is_empty());
    }

    #[test]
    fn test_align_length_matches_order_for_many_shapes() {
        let full = order(&["f0", "f1", "f2", "f3", "f4", "f5"]);
        for take in 0..=full.len() {
            let subset: Record = full[..take]
                .iter()
                .enumerate()
                .map(|(i, name)| (name.clone(), json!(i)))
                .collect();

            let row = align(&subset, &full);

            assert_eq!(row.len(), full.len());
            for (i, (name, value)) in row.iter().enumerate() {
                assert_eq!(name, full[i]);
                if i < take {
                    assert_eq!(value, &json!(i));
                } else {
                    assert_eq!(value, &MISSING);
                }
            }
        }
    }

    #[test]
    fn test_missing_features_in_feature_order() {
        let order = order(&["MonsoonIntensity", "Urbanization", "Deforestation"]);
        let rec = record(json!({ "Urbanization": 5 }));

        assert_eq!(
            missing_features(&rec, &order),
            vec!["MonsoonIntensity".to_string(), "Deforestation".to_string()]
        );
    }

    #[test]
    fn test_explicit_null_counts_as_present() {
        let order = order(&["a"]);
        let rec = record(json!({ "a": null }));
        assert!(missing_features(&rec, &order).is_empty());
    }

    #[test]
    fn test_policy_parses_from_lowercase() {
        #[derive(Deserialize)]
        struct Wrapper {
            policy: MissingFeaturePolicy,
        }
        let w: Wrapper = toml::from_str("policy = \"reject\"").unwrap();
        assert_eq!(w.policy, MissingFeaturePolicy::Reject);
        assert_eq!(MissingFeaturePolicy::default(), MissingFeaturePolicy::Impute);
    }
}
