use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    View,
    Partial,
    Component,
}

/// Descriptor producido por un paso de render. La capa de templates (externa)
/// es quien lo materializa; aquí solo se nombra el destino y el modelo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderOutput {
    pub render: RenderMode,
    pub target: String,
    pub model: Value,
}

impl RenderOutput {
    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "render": self.render,
            "target": self.target,
            "model": self.model,
        })
    }

    /// Lee un descriptor producido por una unidad (None si `value` no lo es).
    pub fn from_value(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }
}
