use std::collections::BTreeMap;

use super::*;

#[test]
fn as_i64_accepts_integral_doubles_only() {
    assert_eq!(Value::Int(7).as_i64(), Some(7));
    assert_eq!(Value::Double(3.0).as_i64(), Some(3));
    assert_eq!(Value::Double(3.5).as_i64(), None);
    assert_eq!(Value::Double(f64::NAN).as_i64(), None);
    assert_eq!(Value::from("3").as_i64(), None);
    assert_eq!(Value::Double(1e19).as_i64(), None);
    assert_eq!(Value::Double(-1e300).as_i64(), None);
    assert_eq!(Value::Double(f64::INFINITY).as_i64(), None);
    assert_eq!(Value::Double(-9_223_372_036_854_775_808.0).as_i64(), Some(i64::MIN));
}

#[test]
fn from_option_maps_none_to_null() {
    let none: Option<i64> = None;
    assert!(Value::from(none).is_null());
    assert_eq!(Value::from(Some(5i64)), Value::Int(5));
}

#[test]
fn display_renders_nested_containers() {
    let mut map = BTreeMap::new();
    map.insert("b".to_string(), Value::Bool(true));
    map.insert("a".to_string(), Value::Array(vec![Value::Int(1), Value::from("x")]));

    assert_eq!(Value::Map(map).to_string(), r#"{"a": [1, "x"], "b": true}"#);
}

#[test]
fn nested_value_survives_bincode() {
    let mut map = BTreeMap::new();
    map.insert("count".to_string(), Value::Int(1));
    map.insert("ratio".to_string(), Value::Double(0.25));
    map.insert("tags".to_string(), Value::Array(vec![Value::Null, Value::from("t")]));
    let value = Value::Map(map);

    let bytes = bincode::serialize(&value).unwrap();
    let decoded: Value = bincode::deserialize(&bytes).unwrap();

    assert_eq!(decoded, value);
}

#[test]
fn request_operation_labels_are_stable() {
    let request = Request::Subscribe {
        instance_id: InstanceId::from("vm-1"),
        property_name: "count".into(),
    };
    assert_eq!(request.operation(), "subscribe");
    assert_eq!(ErrorCode::InstanceNotFound.as_str(), "instance_not_found");
}

#[test]
fn decoding_rejects_values_nested_past_the_limit() {
    let mut value = Value::Null;
    for _ in 0..MAX_VALUE_DEPTH {
        value = Value::Array(vec![value]);
    }
    let at_limit = bincode::serialize(&value).unwrap();
    assert_eq!(bincode::deserialize::<Value>(&at_limit).unwrap(), value);

    let mut map = BTreeMap::new();
    map.insert("inner".to_string(), value);
    let past_limit = bincode::serialize(&Value::Map(map)).unwrap();
    assert!(bincode::deserialize::<Value>(&past_limit).is_err());
}
