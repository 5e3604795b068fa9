//! Errores del core.
//!
//! Tres familias, separadas porque se detectan en momentos distintos:
//! - `ConfigurationError`: definición mal formada, detectada al construir la
//!   pipeline o al sintetizarla. Nunca llega a existir una unidad.
//! - `ExecutionFault`: fallo de una invocación (handler que falla o entra en
//!   pánico, input ausente, tipos). Se entrega al llamador como resultado de
//!   la unidad.
//! - `RegistryError`: inserción explícita con clave duplicada en un registro.

use std::fmt;

use thiserror::Error;

use crate::model::ValueType;
use crate::registry::RegistryKey;

/// Referencia legible a un handler dentro de su pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HandlerRef {
    pub index: usize,
    pub label: String,
}

impl HandlerRef {
    pub fn new(index: usize, label: impl Into<String>) -> Self {
        Self { index,
               label: label.into() }
    }
}

impl fmt::Display for HandlerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} '{}'", self.index, self.label)
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("pipeline must contain at least one handler")]
    EmptyPipeline,
    #[error("handler {handler}: render step requires a render target")]
    MissingRenderTarget { handler: HandlerRef },
    #[error("handler {handler}: component targets are only valid on RenderComponent")]
    ComponentTargetMisplaced { handler: HandlerRef },
    #[error("handler {handler}: only render steps accept a render target")]
    UnexpectedRenderTarget { handler: HandlerRef },
    #[error("handler {handler}: side-effecting action cannot declare an output type")]
    ActionWithOutput { handler: HandlerRef },
    #[error("handler {handler}: pure function must declare an output type")]
    MissingOutputType { handler: HandlerRef },
    #[error("handler {handler}: passthrough body is only valid on synchronous render steps")]
    InvalidPassthrough { handler: HandlerRef },
    #[error("handler {handler}: declared async={declared} but behavior is async={actual}")]
    AsyncMismatch { handler: HandlerRef, declared: bool, actual: bool },
    #[error("pipeline must end with a value-producing handler, found side-effecting action {handler}")]
    EndsWithAction { handler: HandlerRef },
    #[error("handler {handler}: predecessor result requested but no earlier handler produces a value")]
    PredecessorUnavailable { handler: HandlerRef },
    #[error("external input '{name}' declared with conflicting defaults")]
    ConflictingDefaults { name: String },
    #[error("external input '{name}' declared twice with a different origin or type")]
    DuplicateInputName { name: String },
    #[error("handler {handler}: external input '{name}' is not part of the pipeline inputs")]
    UnknownExternalInput { handler: HandlerRef, name: String },
    #[error("default value of '{name}' does not match declared type {expected}")]
    DefaultTypeMismatch { name: String, expected: ValueType },
    #[error("invalid route template '{route}': {reason}")]
    InvalidRoute { route: String, reason: String },
    #[error("route parameter '{name}' is not part of route '{route}'")]
    UnknownRouteParameter { name: String, route: String },
    #[error("route parameter '{name}' is constrained to {constraint} but declared as {declared}")]
    RouteConstraintMismatch { name: String, constraint: ValueType, declared: ValueType },
    #[error("handler {handler}: unknown ambient property '{name}'")]
    UnknownAmbientProperty { handler: HandlerRef, name: String },
    #[error("handler {handler}: unknown bound configuration key '{key}'")]
    UnknownBoundKey { handler: HandlerRef, key: String },
    #[error("handler {handler}: unknown behavior key {key}")]
    UnknownBehavior { handler: HandlerRef, key: RegistryKey },
    #[error("pipeline partitions into {states} states, above the limit of {max}")]
    TooManyStates { states: usize, max: usize },
}

/// Fallo reportado por el cuerpo de un handler.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }

    /// La operación asíncrona se descartó sin resolverse.
    pub fn abandoned() -> Self {
        Self::new("pending operation dropped without a result")
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<&str> for HandlerError {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for HandlerError {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(value: serde_json::Error) -> Self {
        Self::new(format!("json: {value}"))
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExecutionFault {
    #[error("handler {handler} failed: {error}")]
    Handler { handler: HandlerRef, error: HandlerError },
    #[error("panic in {location}: {message}")]
    Panicked { location: String, message: String },
    #[error("missing required input '{name}'")]
    MissingInput { name: String },
    #[error("input '{name}' expected {expected}, got {found}")]
    InputTypeMismatch { name: String, expected: ValueType, found: String },
    #[error("handler {handler}: ambient property '{name}' not available")]
    MissingAmbient { handler: HandlerRef, name: String },
    #[error("handler {handler}: uploaded artifact '{name}' not available")]
    MissingArtifact { handler: HandlerRef, name: String },
    #[error("handler {handler}: no enclosing reference bound to the invocation")]
    MissingEnclosing { handler: HandlerRef },
    #[error("handler {handler}: output expected {expected}, got {found}")]
    OutputTypeMismatch { handler: HandlerRef, expected: ValueType, found: String },
    #[error("internal: {0}")]
    Internal(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("registry '{registry}' already holds key {key}")]
    DuplicateKey { registry: &'static str, key: RegistryKey },
}
