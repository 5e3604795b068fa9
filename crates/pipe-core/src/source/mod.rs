//! Value Source Model: de dónde sale cada argumento de un handler.
//!
//! Las fuentes se declaran como datos (`ValueSource`) y el sintetizador las
//! compila a `ArgPlan` una sola vez. Los errores que se pueden detectar sin
//! request (predecesor inexistente, clave de configuración desconocida,
//! propiedad ambiente no declarada) salen en ese momento, no por invocación.

mod resolve;
mod unify;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::ValueType;

pub use resolve::{ArgPlan, Scope};
pub use unify::{unify_inputs, InputSlot, InputSlots};

/// Valores de configuración disponibles para `ValueSource::Bound`.
pub type BoundValues = IndexMap<String, Value>;

/// Parte de la request de la que el host extrae un input externo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputOrigin {
    Route,
    Query,
    Form,
    Header,
    Body,
    Service,
}

/// Input suministrado por la invocación.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalInput {
    pub origin: InputOrigin,
    pub name: String,
    pub value_type: ValueType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ExternalInput {
    pub fn new(origin: InputOrigin, name: impl Into<String>, value_type: ValueType) -> Self {
        Self { origin,
               name: name.into(),
               value_type,
               default: None }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    /// Identidad estructural usada para unificar inputs repetidos. El default
    /// no forma parte de ella.
    pub fn identity(&self) -> InputIdentity {
        InputIdentity { origin: self.origin,
                        name: self.name.clone(),
                        value_type: self.value_type }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InputIdentity {
    pub origin: InputOrigin,
    pub name: String,
    pub value_type: ValueType,
}

/// Fuente de un argumento.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ValueSource {
    /// Slot de input externo (ruta, query, form, ...).
    External(ExternalInput),
    /// Propiedad del contexto ambiente, por nombre.
    Ambient { name: String },
    /// Resultado del último handler que produjo valor.
    Predecessor,
    /// Objeto contenedor de la invocación.
    Enclosing,
    /// Archivo subido, por nombre de campo.
    Artifact { name: String },
    /// Valor de configuración, resuelto al sintetizar.
    Bound { key: String },
}

impl ValueSource {
    pub fn external(input: ExternalInput) -> Self {
        ValueSource::External(input)
    }

    pub fn route(name: impl Into<String>, value_type: ValueType) -> Self {
        Self::external(ExternalInput::new(InputOrigin::Route, name, value_type))
    }

    pub fn query(name: impl Into<String>, value_type: ValueType) -> Self {
        Self::external(ExternalInput::new(InputOrigin::Query, name, value_type))
    }

    pub fn form(name: impl Into<String>, value_type: ValueType) -> Self {
        Self::external(ExternalInput::new(InputOrigin::Form, name, value_type))
    }

    pub fn header(name: impl Into<String>, value_type: ValueType) -> Self {
        Self::external(ExternalInput::new(InputOrigin::Header, name, value_type))
    }

    pub fn body(name: impl Into<String>, value_type: ValueType) -> Self {
        Self::external(ExternalInput::new(InputOrigin::Body, name, value_type))
    }

    pub fn service(name: impl Into<String>) -> Self {
        Self::external(ExternalInput::new(InputOrigin::Service, name, ValueType::Any))
    }

    /// Input externo opcional con default.
    pub fn optional(origin: InputOrigin, name: impl Into<String>, value_type: ValueType, default: Value) -> Self {
        Self::external(ExternalInput::new(origin, name, value_type).with_default(default))
    }

    pub fn ambient(name: impl Into<String>) -> Self {
        ValueSource::Ambient { name: name.into() }
    }

    pub fn predecessor() -> Self {
        ValueSource::Predecessor
    }

    pub fn enclosing() -> Self {
        ValueSource::Enclosing
    }

    pub fn artifact(name: impl Into<String>) -> Self {
        ValueSource::Artifact { name: name.into() }
    }

    pub fn bound(key: impl Into<String>) -> Self {
        ValueSource::Bound { key: key.into() }
    }

    pub fn as_external(&self) -> Option<&ExternalInput> {
        match self {
            ValueSource::External(input) => Some(input),
            _ => None,
        }
    }
}
