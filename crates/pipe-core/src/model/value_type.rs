use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tipo declarado de un valor que circula por la pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Any,
    Bool,
    Int,
    Float,
    Str,
    Array,
    Object,
}

impl ValueType {
    /// Indica si `value` es aceptable para este tipo. `Float` acepta enteros.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            ValueType::Any => true,
            ValueType::Bool => value.is_boolean(),
            ValueType::Int => value.is_i64() || value.is_u64(),
            ValueType::Float => value.is_number(),
            ValueType::Str => value.is_string(),
            ValueType::Array => value.is_array(),
            ValueType::Object => value.is_object(),
        }
    }

    /// Parsea el nombre usado en restricciones de ruta (`{id:int}`).
    pub fn from_constraint(name: &str) -> Option<Self> {
        match name {
            "int" | "long" => Some(ValueType::Int),
            "bool" => Some(ValueType::Bool),
            "float" | "double" | "decimal" => Some(ValueType::Float),
            "str" | "string" | "alpha" => Some(ValueType::Str),
            _ => None,
        }
    }

    /// Convierte un texto crudo (segmento de ruta, query) al tipo declarado.
    pub fn coerce_str(&self, raw: &str) -> Option<Value> {
        match self {
            ValueType::Int => raw.parse::<i64>().ok().map(Value::from),
            ValueType::Float => raw.parse::<f64>().ok().map(Value::from),
            ValueType::Bool => raw.parse::<bool>().ok().map(Value::Bool),
            ValueType::Str | ValueType::Any => Some(Value::String(raw.to_string())),
            ValueType::Array | ValueType::Object => serde_json::from_str::<Value>(raw).ok().filter(|v| self.accepts(v)),
        }
    }

    /// Nombre del tipo JSON de `value`, para mensajes de error.
    pub fn describe(value: &Value) -> String {
        let name = match value {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(n) if n.is_f64() => "float",
            Value::Number(_) => "int",
            Value::String(_) => "str",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        };
        name.to_string()
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Any => "any",
            ValueType::Bool => "bool",
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::Str => "str",
            ValueType::Array => "array",
            ValueType::Object => "object",
        };
        f.write_str(name)
    }
}
