//! Conversions from parsed YAML into template values.

use gtmpl_value::Value;
use serde_yaml::Mapping;
use std::collections::HashMap;

/// Converts a YAML value into a template [`Value`].
pub fn yaml_to_value(v: &serde_yaml::Value) -> Value {
    match v {
        serde_yaml::Value::Null => Value::Nil,
        serde_yaml::Value::Bool(b) => Value::from(*b),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                Value::from(n.as_f64().unwrap_or_default())
            }
        }
        serde_yaml::Value::String(s) => Value::from(s.as_str()),
        serde_yaml::Value::Sequence(seq) => {
            Value::Array(seq.iter().map(yaml_to_value).collect())
        }
        serde_yaml::Value::Mapping(m) => mapping_to_value(m),
    }
}

/// Converts a YAML mapping into a template object. Non-string keys are
/// stringified so templates can still address them.
pub fn mapping_to_value(m: &Mapping) -> Value {
    let mut out: HashMap<String, Value> = HashMap::new();
    for (k, v) in m.iter() {
        out.insert(key_to_string(k), yaml_to_value(v));
    }
    Value::Object(out)
}

fn key_to_string(k: &serde_yaml::Value) -> String {
    match k {
        serde_yaml::Value::String(s) => s.clone(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Number(n) => n.to_string(),
        other => serde_yaml::to_string(other)
            .unwrap_or_default()
            .trim()
            .trim_start_matches("---")
            .trim()
            .to_owned(),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_scalars() {
        assert_eq!(yaml_to_value(&serde_yaml::Value::Null), Value::Nil);
        assert_eq!(
            yaml_to_value(&serde_yaml::Value::String("x".into())),
            Value::from("x")
        );
        assert_eq!(
            yaml_to_value(&serde_yaml::from_str("3").unwrap()),
            Value::from(3i64)
        );
        assert_eq!(
            yaml_to_value(&serde_yaml::from_str("true").unwrap()),
            Value::from(true)
        );
    }

    #[test]
    fn test_nested_mapping() {
        let m: Mapping = serde_yaml::from_str("a:\n  b: [1, 2]\n").unwrap();
        match mapping_to_value(&m) {
            Value::Object(top) => match top.get("a") {
                Some(Value::Object(inner)) => match inner.get("b") {
                    Some(Value::Array(items)) => assert_eq!(items.len(), 2),
                    other => panic!("unexpected b: {:?}", other),
                },
                other => panic!("unexpected a: {:?}", other),
            },
            other => panic!("unexpected top: {:?}", other),
        }
    }
}
