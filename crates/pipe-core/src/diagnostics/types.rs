//! Tipos de evento emitidos por una unidad durante una invocación.
//!
//! - Una invocación (sync) o una corrida reanudable (async) comparte un
//!   `run_id`, de modo que un sink puede reconstruir la secuencia.
//! - El `definition_hash` identifica la forma de la pipeline.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UnitEventKind {
    /// Primera entrada a la unidad con una invocación recién ligada.
    InvocationStarted,
    HandlerStarted { index: usize, label: String },
    HandlerFinished { index: usize, label: String },
    /// El estado quedó esperando una operación pendiente.
    Suspended,
    /// Reentrada en un estado que estaba esperando.
    Resumed,
    Completed,
    Faulted { message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitEvent {
    pub run_id: Uuid,
    pub definition_hash: String,
    pub route: String,
    /// Estado del cursor al emitir; 0 para unidades síncronas.
    pub state: usize,
    pub kind: UnitEventKind,
    pub ts: DateTime<Utc>,
}

impl UnitEvent {
    pub fn new(run_id: Uuid, definition_hash: &str, route: &str, state: usize, kind: UnitEventKind) -> Self {
        Self { run_id,
               definition_hash: definition_hash.to_string(),
               route: route.to_string(),
               state,
               kind,
               ts: Utc::now() }
    }
}
