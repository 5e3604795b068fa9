//! JSON canónico: claves de objetos ordenadas, sin espacios. Dos valores
//! iguales producen siempre el mismo texto, independiente del orden de
//! inserción.

use std::collections::BTreeMap;

use serde_json::Value;

pub fn to_canonical_json(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote(s),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(to_canonical_json).collect();
            format!("[{}]", parts.join(","))
        }
        Value::Object(map) => {
            let sorted: BTreeMap<&String, String> = map.iter().map(|(k, v)| (k, to_canonical_json(v))).collect();
            let parts: Vec<String> = sorted.into_iter()
                                           .map(|(k, v)| format!("{}:{}", quote(k), v))
                                           .collect();
            format!("{{{}}}", parts.join(","))
        }
    }
}

// Serializar un &str no falla.
fn quote(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| format!("\"{}\"", s.escape_default()))
}
