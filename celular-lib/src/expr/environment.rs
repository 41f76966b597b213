//! Variable bindings visible to predicates

use cel_interpreter::objects::Map;
use cel_interpreter::{Context, Value};
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Name under which the user variables map is bound.
pub const VARS_BINDING: &str = "vars";

/// Static bindings shared by every predicate: each global under its own name, plus `vars`.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    globals: BTreeMap<String, JsonValue>,
    vars: BTreeMap<String, JsonValue>,
}

impl Environment {
    #[must_use]
    pub const fn new(globals: BTreeMap<String, JsonValue>, vars: BTreeMap<String, JsonValue>) -> Self {
        Self { globals, vars }
    }

    /// Build the read-only root scope that per-predicate scopes are layered on.
    #[must_use]
    pub fn base_context(&self) -> Context<'static> {
        let mut context = Context::default();

        for (name, value) in &self.globals {
            context.add_variable_from_value(name.as_str(), json_to_cel(value));
        }

        let vars: HashMap<Arc<String>, Value> = self
            .vars
            .iter()
            .map(|(name, value)| (Arc::new(name.clone()), json_to_cel(value)))
            .collect();
        context.add_variable_from_value(VARS_BINDING, Value::Map(Map::from(vars)));

        context
    }
}

/// Convert a JSON value into its CEL counterpart.
///
/// Integers that fit in an `i64` become `int`; larger positive ones become `uint`.
#[must_use]
pub fn json_to_cel(value: &JsonValue) -> Value {
    match value {
        JsonValue::Null => Value::Null,
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else if let Some(u) = n.as_u64() {
                Value::UInt(u)
            } else {
                Value::Float(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        JsonValue::String(s) => Value::String(Arc::new(s.clone())),
        JsonValue::Array(items) => Value::List(Arc::new(items.iter().map(json_to_cel).collect())),
        JsonValue::Object(fields) => {
            let map: HashMap<Arc<String>, Value> = fields.iter().map(|(k, v)| (Arc::new(k.clone()), json_to_cel(v))).collect();
            Value::Map(Map::from(map))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cel_interpreter::Program;
    use serde_json::json;

    fn eval(expr: &str, context: &Context<'_>) -> Value {
        Program::compile(expr).unwrap().execute(context).unwrap()
    }

    #[test]
    fn test_json_numbers() {
        assert_eq!(json_to_cel(&json!(-3)), Value::Int(-3));
        assert_eq!(json_to_cel(&json!(u64::MAX)), Value::UInt(u64::MAX));
        assert_eq!(json_to_cel(&json!(1.5)), Value::Float(1.5));
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_globals_and_vars_are_bound() {
        let globals = BTreeMap::from([("threshold".to_string(), json!(5))]);
        let vars = BTreeMap::from([("mount".to_string(), json!("/mnt/usb")), ("limits".to_string(), json!({"max": 2}))]);
        let context = Environment::new(globals, vars).base_context();

        assert_eq!(eval("threshold == 5", &context), Value::Bool(true));
        assert_eq!(eval("vars.mount == '/mnt/usb'", &context), Value::Bool(true));
        assert_eq!(eval("vars.limits.max < threshold", &context), Value::Bool(true));
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_vars_is_always_bound() {
        let context = Environment::default().base_context();
        assert_eq!(eval("size(vars) == 0", &context), Value::Bool(true));
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_inner_scope_sees_base_bindings() {
        let globals = BTreeMap::from([("limit".to_string(), json!(1))]);
        let base = Environment::new(globals, BTreeMap::new()).base_context();
        let mut scope = base.new_inner_scope();
        scope.add_variable_from_value("users", json_to_cel(&json!([{"pw_name": "a"}, {"pw_name": "b"}])));

        assert_eq!(eval("size(users) > limit", &scope), Value::Bool(true));
        assert_eq!(eval("users.exists(u, u.pw_name == 'b')", &scope), Value::Bool(true));
    }
}
