use std::fmt;
use std::sync::Mutex;

use uuid::Uuid;

use super::{UnitEvent, UnitEventKind};
use crate::future::lock;

/// Destino de los eventos de una unidad. Se registra en
/// `registry::diagnostics()` y la unidad lo resuelve por clave.
pub trait DiagnosticSink: Send + Sync + fmt::Debug {
    fn record(&self, event: &UnitEvent);
}

/// Reenvía los eventos a la fachada `log`.
#[derive(Debug, Clone, Copy)]
pub struct LogSink {
    level: log::Level,
}

impl LogSink {
    pub fn new(level: log::Level) -> Self {
        Self { level }
    }
}

impl Default for LogSink {
    fn default() -> Self {
        Self::new(log::Level::Debug)
    }
}

impl DiagnosticSink for LogSink {
    fn record(&self, event: &UnitEvent) {
        // Los fallos siempre salen como warn, sin importar el nivel configurado.
        let level = match event.kind {
            UnitEventKind::Faulted { .. } => log::Level::Warn,
            _ => self.level,
        };
        log::log!(target: "pipe_core::unit",
                  level,
                  "[{} {}] run={} state={} {:?}",
                  event.route,
                  event.definition_hash.get(..12).unwrap_or(&event.definition_hash),
                  event.run_id,
                  event.state,
                  event.kind);
    }
}

/// Sink en memoria, append-only. Útil en tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<UnitEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<UnitEvent> {
        lock(&self.events).clone()
    }

    pub fn kinds(&self) -> Vec<UnitEventKind> {
        lock(&self.events).iter().map(|e| e.kind.clone()).collect()
    }

    /// Eventos de una corrida, en orden de emisión.
    pub fn for_run(&self, run_id: Uuid) -> Vec<UnitEvent> {
        lock(&self.events).iter().filter(|e| e.run_id == run_id).cloned().collect()
    }
}

impl DiagnosticSink for MemorySink {
    fn record(&self, event: &UnitEvent) {
        lock(&self.events).push(event.clone());
    }
}
