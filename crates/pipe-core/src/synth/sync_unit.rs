//! Unidad síncrona: ejecución lineal, sin suspensión.

use std::cell::Cell;
use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use super::plan::{Invoked, UnitPlan};
use crate::diagnostics::UnitEventKind;
use crate::errors::ExecutionFault;
use crate::model::Invocation;
use crate::source::{InputSlots, Scope};

/// Unidad sintetizada para pipelines sin handlers asíncronos.
#[derive(Debug, Clone)]
pub struct SyncUnit {
    plan: Arc<UnitPlan>,
}

impl SyncUnit {
    pub(crate) fn new(plan: Arc<UnitPlan>) -> Self {
        Self { plan }
    }

    /// Ejecuta todos los handlers en orden en el thread llamador y devuelve el
    /// último resultado. Cualquier fallo corta la ejecución.
    pub fn invoke(&self, invocation: &Invocation) -> Result<Value, ExecutionFault> {
        let run_id = Uuid::new_v4();
        let current = Cell::new(None);
        self.plan.emit(run_id, 0, UnitEventKind::InvocationStarted);
        let result = self.plan.guard(&current, || self.run(run_id, invocation, &current));
        match &result {
            Ok(_) => self.plan.emit(run_id, 0, UnitEventKind::Completed),
            Err(fault) => self.plan.emit(run_id, 0, UnitEventKind::Faulted { message: fault.to_string() }),
        }
        result
    }

    fn run(&self, run_id: Uuid, invocation: &Invocation, current: &Cell<Option<usize>>) -> Result<Value, ExecutionFault> {
        let inputs = self.plan.inputs.bind_all(invocation)?;
        let mut last: Option<Value> = None;
        for index in 0..self.plan.handlers.len() {
            current.set(Some(index));
            self.plan.handler_started(run_id, 0, index);
            let scope = Scope { invocation,
                                inputs: &inputs,
                                predecessor: last.as_ref() };
            let raw = match self.plan.invoke(index, &scope)? {
                Invoked::Value(value) => value,
                Invoked::Pending(_) => {
                    return Err(ExecutionFault::Internal(format!("handler {} is asynchronous", self.plan.handlers[index].handler)))
                }
            };
            if let Some(value) = self.plan.complete(index, raw)? {
                last = Some(value);
            }
            self.plan.handler_finished(run_id, 0, index);
        }
        current.set(None);
        last.ok_or_else(|| ExecutionFault::Internal("pipeline produced no value".to_string()))
    }

    /// Inputs externos unificados que espera cada invocación.
    pub fn inputs(&self) -> &InputSlots {
        &self.plan.inputs
    }

    /// Hash de la definición de la pipeline de origen.
    pub fn definition_hash(&self) -> &str {
        &self.plan.definition_hash
    }
}
