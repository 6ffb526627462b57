//! JSON truthiness for loosely-typed request fields.

use serde_json::Value;

/// Whether a JSON value is truthy under the ECMAScript rules clients of
/// this API historically relied on.
///
/// `null`, `false`, numeric zero, and the empty string are falsy; every
/// other value, including empty arrays and objects, is truthy.
pub fn json_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn falsy_values() {
        assert!(!json_truthy(&Value::Null));
        assert!(!json_truthy(&json!(false)));
        assert!(!json_truthy(&json!(0)));
        assert!(!json_truthy(&json!(0.0)));
        assert!(!json_truthy(&json!("")));
    }

    #[test]
    fn truthy_values() {
        assert!(json_truthy(&json!(true)));
        assert!(json_truthy(&json!(1)));
        assert!(json_truthy(&json!(-1)));
        assert!(json_truthy(&json!("false")));
        assert!(json_truthy(&json!("open")));
        assert!(json_truthy(&json!([])));
        assert!(json_truthy(&json!({})));
    }
}
