//! Request parameters and the right-biased merge used to combine provider
//! defaults with route-level values.
//!
//! # Design
//! `Parameters` is an insertion-ordered map. Parameter sets are short, so a
//! vector with linear lookup is enough and keeps the order in which keys were
//! merged, which is the order they appear in a query string or form body.
//!
//! `ParamValue` can hold values JSON cannot (non-finite floats); the JSON
//! encoder reports those instead of silently writing `null`.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::http::{set_header, Headers};

/// A single parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<ParamValue>),
    Object(Parameters),
}

impl ParamValue {
    /// Convert to a JSON value, failing on non-finite floats.
    ///
    /// The error carries the dotted path of the offending value.
    pub fn to_json(&self) -> Result<serde_json::Value, String> {
        self.to_json_at("")
    }

    fn to_json_at(&self, path: &str) -> Result<serde_json::Value, String> {
        use serde_json::Value;
        Ok(match self {
            ParamValue::Null => Value::Null,
            ParamValue::Bool(b) => Value::Bool(*b),
            ParamValue::Int(i) => Value::from(*i),
            ParamValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .ok_or_else(|| format!("non-finite number {f} at `{path}`"))?,
            ParamValue::String(s) => Value::String(s.clone()),
            ParamValue::Array(items) => Value::Array(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| item.to_json_at(&join_path(path, &i.to_string())))
                    .collect::<Result<Vec<_>, String>>()?,
            ),
            ParamValue::Object(params) => Value::Object(params.to_json_map_at(path)?),
        })
    }

    /// JSON value with non-finite floats written as `null`.
    fn to_json_lossy(&self) -> serde_json::Value {
        use serde_json::Value;
        match self {
            ParamValue::Float(f) => serde_json::Number::from_f64(*f).map_or(Value::Null, Value::Number),
            ParamValue::Array(items) => Value::Array(items.iter().map(ParamValue::to_json_lossy).collect()),
            ParamValue::Object(params) => Value::Object(
                params
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_json_lossy()))
                    .collect(),
            ),
            other => other.to_json().unwrap_or(Value::Null),
        }
    }
}

fn join_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

/// String form used by the query and form encoders.
///
/// Scalars print bare; arrays and objects print as compact JSON, with any
/// non-finite float inside them written as `null`.
impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Null => Ok(()),
            ParamValue::Bool(b) => write!(f, "{b}"),
            ParamValue::Int(i) => write!(f, "{i}"),
            ParamValue::Float(x) => write!(f, "{x}"),
            ParamValue::String(s) => f.write_str(s),
            ParamValue::Array(_) | ParamValue::Object(_) => write!(f, "{}", self.to_json_lossy()),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::String(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::String(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Int(value.into())
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        ParamValue::Int(value.into())
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Float(value)
    }
}

impl<T: Into<ParamValue>> From<Vec<T>> for ParamValue {
    fn from(values: Vec<T>) -> Self {
        ParamValue::Array(values.into_iter().map(Into::into).collect())
    }
}

impl From<Parameters> for ParamValue {
    fn from(value: Parameters) -> Self {
        ParamValue::Object(value)
    }
}

/// Insertion-ordered parameter map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parameters {
    entries: Vec<(String, ParamValue)>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace. A replaced key keeps its original position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Option<ParamValue> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => Some(std::mem::replace(&mut entry.1, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Convert to a JSON object, failing on non-finite floats.
    pub fn to_json(&self) -> Result<serde_json::Value, String> {
        self.to_json_map_at("").map(serde_json::Value::Object)
    }

    fn to_json_map_at(&self, path: &str) -> Result<serde_json::Map<String, serde_json::Value>, String> {
        self.entries
            .iter()
            .map(|(k, v)| Ok((k.clone(), v.to_json_at(&join_path(path, k))?)))
            .collect()
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for Parameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Parameters::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

impl Serialize for Parameters {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Parameters {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ParametersVisitor;

        impl<'de> Visitor<'de> for ParametersVisitor {
            type Value = Parameters;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of parameters")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Parameters, A::Error> {
                let mut params = Parameters::new();
                while let Some((key, value)) = access.next_entry::<String, ParamValue>()? {
                    params.insert(key, value);
                }
                Ok(params)
            }
        }

        deserializer.deserialize_map(ParametersVisitor)
    }
}

/// Right-biased shallow merge: keys in `overrides` win, keys only in `base`
/// remain. Order is `base` order followed by keys new in `overrides`.
pub fn merge_params(base: &Parameters, overrides: &Parameters) -> Parameters {
    let mut merged = base.clone();
    for (k, v) in overrides.iter() {
        merged.insert(k, v.clone());
    }
    merged
}

/// Right-biased shallow merge of header lists, comparing names
/// case-insensitively.
pub fn merge_headers(base: &[(String, String)], overrides: &[(String, String)]) -> Headers {
    let mut merged = Headers::new();
    for (name, value) in base.iter().chain(overrides) {
        set_header(&mut merged, name, value);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_replaces_in_place() {
        let mut params = Parameters::new().with("a", 1).with("b", 2);
        let old = params.insert("a", "x");
        assert_eq!(old, Some(ParamValue::Int(1)));
        let keys: Vec<&str> = params.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(params.get("a"), Some(&ParamValue::from("x")));
    }

    #[test]
    fn merge_is_right_biased() {
        let provider = Parameters::new().with("b", "override").with("c", "3");
        let route = Parameters::new().with("a", "1").with("b", "2");
        let merged = merge_params(&provider, &route);
        assert_eq!(merged.get("a"), Some(&ParamValue::from("1")));
        assert_eq!(merged.get("b"), Some(&ParamValue::from("2")));
        assert_eq!(merged.get("c"), Some(&ParamValue::from("3")));
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn merge_headers_ignores_name_case() {
        let provider = vec![
            ("Accept".to_string(), "text/plain".to_string()),
            ("X-Client".to_string(), "routekit".to_string()),
        ];
        let route = vec![("accept".to_string(), "application/json".to_string())];
        let merged = merge_headers(&provider, &route);
        assert_eq!(merged.len(), 2);
        assert_eq!(crate::http::header(&merged, "ACCEPT"), Some("application/json"));
        assert_eq!(crate::http::header(&merged, "x-client"), Some("routekit"));
    }

    #[test]
    fn to_json_rejects_non_finite_numbers() {
        let params = Parameters::new()
            .with("ok", 1.5)
            .with("nested", Parameters::new().with("bad", f64::NAN));
        let err = params.to_json().unwrap_err();
        assert!(err.contains("nested.bad"), "{err}");
    }

    #[test]
    fn display_stringifies_values() {
        assert_eq!(ParamValue::from(true).to_string(), "true");
        assert_eq!(ParamValue::from(42).to_string(), "42");
        assert_eq!(ParamValue::from("hi").to_string(), "hi");
        assert_eq!(ParamValue::from(vec![1, 2]).to_string(), "[1,2]");
        assert_eq!(ParamValue::Null.to_string(), "");
    }

    #[test]
    fn display_writes_non_finite_members_as_null() {
        assert_eq!(ParamValue::from(vec![1.5, f64::NAN]).to_string(), "[1.5,null]");
        let nested = Parameters::new().with("inf", f64::INFINITY).with("n", 1);
        assert_eq!(ParamValue::from(nested).to_string(), r#"{"inf":null,"n":1}"#);
    }

    #[test]
    fn deserializes_from_toml_table() {
        let params: Parameters = toml::from_str("b = 2\na = \"x\"\nlist = [1, 2]").unwrap();
        assert_eq!(params.len(), 3);
        assert_eq!(params.get("a"), Some(&ParamValue::from("x")));
        assert_eq!(params.get("b"), Some(&ParamValue::Int(2)));
        assert_eq!(params.get("list"), Some(&ParamValue::from(vec![1, 2])));
    }
}
