//! pipeflow: host de ejemplo sobre `pipe-core`.
//!
//! - `config`: ajustes de síntesis y valores ligados leídos del entorno.
//! - `errors`: errores de la aplicación.
//! - `host`: tabla de rutas que registra y despacha pipelines.

pub mod config;
pub mod errors;
pub mod host;

pub use config::{AppConfig, CONFIG};
pub use errors::AppError;
pub use host::{RouteSummary, RouteTable};
