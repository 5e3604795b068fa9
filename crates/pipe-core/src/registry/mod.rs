//! Registros cross-boundary.
//!
//! Permiten que la unidad sintetizada referencie por clave valores que no se
//! pueden incrustar como datos (closures, sinks de diagnóstico). Hay dos
//! registros globales e independientes (`behaviors()` y `diagnostics()`),
//! con vida de proceso: las entradas nunca se eliminan porque cada una
//! corresponde a un paso de pipeline fijo hasta que el proceso termina.
//!
//! Después de sintetizar, la unidad no vuelve a leer `behaviors()`: copia los
//! cuerpos a su propia `CaptureTable`.

mod capture;
mod store;

use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::diagnostics::DiagnosticSink;
use crate::handler::Behavior;

pub use capture::CaptureTable;
pub use store::{Registry, RegistryKey};

/// Clave de un comportamiento registrado.
pub type BehaviorKey = RegistryKey;
/// Clave de un sink de diagnóstico registrado.
pub type SinkKey = RegistryKey;

static BEHAVIORS: Lazy<Registry<Behavior>> = Lazy::new(|| Registry::new("behaviors"));
static DIAGNOSTICS: Lazy<Registry<Arc<dyn DiagnosticSink>>> = Lazy::new(|| Registry::new("diagnostics"));

/// Registro global de comportamientos (cuerpos de handler).
pub fn behaviors() -> &'static Registry<Behavior> {
    &BEHAVIORS
}

/// Registro global de sinks de diagnóstico.
pub fn diagnostics() -> &'static Registry<Arc<dyn DiagnosticSink>> {
    &DIAGNOSTICS
}
