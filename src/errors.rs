use pipe_core::{ConfigurationError, ExecutionFault, ValueType, Verb};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Error de configuración: {0}")]
    Config(String),
    #[error("Error en IO: {0}")]
    Io(#[from] std::io::Error),
    #[error("Pipeline inválida: {0}")]
    Synthesis(#[from] ConfigurationError),
    #[error("Fallo de ejecución: {0}")]
    Execution(#[from] ExecutionFault),
    #[error("Ruta ya registrada: {verb} {route}")]
    DuplicateRoute { verb: Verb, route: String },
    #[error("Ruta no encontrada: {verb} {path}")]
    RouteNotFound { verb: Verb, path: String },
    #[error("Valor inválido para '{name}': '{raw}' no es {expected}")]
    InvalidValue { name: String, raw: String, expected: ValueType },
}
