//! Modelo de datos neutro compartido por definición y ejecución.
//!
//! - `ValueType`: tipo declarado de inputs/outputs (los valores viajan como
//!   `serde_json::Value`).
//! - `Invocation`: contexto de una llamada, ya extraído de la request por el
//!   host (inputs externos, propiedades ambiente, uploads, objeto contenedor).
//! - `HandlerArgs`: argumentos resueltos entregados al cuerpo de un handler.
//! - `RenderOutput`: descriptor producido por los pasos de render.

mod args;
mod invocation;
mod render;
mod value_type;

pub use args::{Arg, HandlerArgs};
pub use invocation::{Enclosing, Invocation, UploadedArtifact};
pub use render::{RenderMode, RenderOutput};
pub use value_type::ValueType;
