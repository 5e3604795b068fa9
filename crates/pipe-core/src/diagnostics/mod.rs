//! Eventos de diagnóstico de las unidades sintetizadas.

mod sink;
mod types;

pub use sink::{DiagnosticSink, LogSink, MemorySink};
pub use types::{UnitEvent, UnitEventKind};
