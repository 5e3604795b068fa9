//! Plan compilado de una pipeline: lo que las unidades ejecutan.

use std::any::Any;
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use indexmap::IndexSet;
use once_cell::sync::OnceCell;
use serde_json::Value;
use uuid::Uuid;

use super::SynthesisSettings;
use crate::diagnostics::{DiagnosticSink, LogSink, UnitEvent, UnitEventKind};
use crate::errors::{ConfigurationError, ExecutionFault, HandlerRef};
use crate::future::PendingOp;
use crate::handler::{Behavior, HandlerBody, HandlerKind, RenderTarget};
use crate::model::{HandlerArgs, RenderOutput, ValueType};
use crate::pipeline::PipelineDefinition;
use crate::registry::{self, CaptureTable, SinkKey};
use crate::source::{ArgPlan, BoundValues, InputSlots, Scope};

#[derive(Debug)]
pub(crate) struct CompiledHandler {
    pub handler: HandlerRef,
    pub kind: HandlerKind,
    pub is_async: bool,
    pub output: Option<ValueType>,
    pub target: Option<RenderTarget>,
    pub args: Vec<ArgPlan>,
}

/// Resultado crudo de llamar un cuerpo.
pub(crate) enum Invoked {
    Value(Value),
    Pending(PendingOp),
}

#[derive(Debug)]
pub(crate) struct UnitPlan {
    pub handlers: Vec<CompiledHandler>,
    pub captures: CaptureTable,
    pub inputs: InputSlots,
    pub definition_hash: String,
    pub route: String,
    pub settings: SynthesisSettings,
    sink_key: SinkKey,
    sink: OnceCell<Arc<dyn DiagnosticSink>>,
}

impl UnitPlan {
    pub fn compile(pipeline: &PipelineDefinition,
                   settings: &SynthesisSettings,
                   bound: &BoundValues,
                   ambient: Option<&IndexSet<String>>,
                   sink_key: SinkKey)
                   -> Result<Self, ConfigurationError> {
        let mut handlers = Vec::with_capacity(pipeline.len());
        let mut captures = CaptureTable::with_capacity(pipeline.len());
        let mut has_predecessor = false;

        for (index, definition) in pipeline.handlers().iter().enumerate() {
            let handler = definition.handler_ref(index);
            let args = definition.inputs
                                 .iter()
                                 .map(|source| ArgPlan::compile(source, &handler, pipeline.inputs(), bound, ambient, has_predecessor))
                                 .collect::<Result<Vec<_>, _>>()?;
            let behavior = match &definition.body {
                HandlerBody::Inline(behavior) => Some(behavior.clone()),
                HandlerBody::Registered(key) => {
                    let behavior = registry::behaviors().get(*key)
                                                        .ok_or_else(|| ConfigurationError::UnknownBehavior { handler: handler.clone(),
                                                                                                             key: *key })?;
                    if behavior.is_async() != definition.is_async {
                        return Err(ConfigurationError::AsyncMismatch { handler,
                                                                       declared: definition.is_async,
                                                                       actual: behavior.is_async() });
                    }
                    Some(behavior)
                }
                HandlerBody::Passthrough if !has_predecessor => return Err(ConfigurationError::PredecessorUnavailable { handler }),
                HandlerBody::Passthrough => None,
            };
            captures.push(behavior);
            handlers.push(CompiledHandler { handler,
                                            kind: definition.kind,
                                            is_async: definition.is_async,
                                            output: definition.output,
                                            target: definition.render_target.clone(),
                                            args });
            has_predecessor |= definition.kind.produces_value();
        }

        Ok(Self { handlers,
                  captures,
                  inputs: pipeline.inputs().clone(),
                  definition_hash: pipeline.definition_hash().to_string(),
                  route: format!("{} {}", pipeline.verb(), pipeline.route().as_str()),
                  settings: settings.clone(),
                  sink_key,
                  sink: OnceCell::new() })
    }

    /// Sink resuelto por clave en el primer uso.
    fn sink(&self) -> &Arc<dyn DiagnosticSink> {
        self.sink.get_or_init(|| {
                     registry::diagnostics().get(self.sink_key).unwrap_or_else(|| {
                                                                   log::warn!("[{}] diagnostic sink {} not registered, using log",
                                                                              self.route,
                                                                              self.sink_key);
                                                                   Arc::new(LogSink::new(self.settings.event_level))
                                                               })
                 })
    }

    pub fn emit(&self, run_id: Uuid, state: usize, kind: UnitEventKind) {
        self.sink().record(&UnitEvent::new(run_id, &self.definition_hash, &self.route, state, kind));
    }

    pub fn handler_started(&self, run_id: Uuid, state: usize, index: usize) {
        let handler = &self.handlers[index].handler;
        self.emit(run_id,
                  state,
                  UnitEventKind::HandlerStarted { index,
                                                  label: handler.label.clone() });
    }

    pub fn handler_finished(&self, run_id: Uuid, state: usize, index: usize) {
        let handler = &self.handlers[index].handler;
        self.emit(run_id,
                  state,
                  UnitEventKind::HandlerFinished { index,
                                                   label: handler.label.clone() });
    }

    /// Resuelve los argumentos y llama el cuerpo del handler `index`.
    pub fn invoke(&self, index: usize, scope: &Scope<'_>) -> Result<Invoked, ExecutionFault> {
        let compiled = &self.handlers[index];
        let Some(behavior) = self.captures.get(index) else {
            return scope.predecessor
                        .cloned()
                        .map(Invoked::Value)
                        .ok_or_else(|| ExecutionFault::Internal(format!("passthrough handler {} without model", compiled.handler)));
        };
        let args = compiled.args
                           .iter()
                           .map(|plan| plan.resolve(&compiled.handler, scope))
                           .collect::<Result<HandlerArgs, _>>()?;
        match behavior {
            Behavior::Sync(f) => f(args).map(Invoked::Value)
                                        .map_err(|error| ExecutionFault::Handler { handler: compiled.handler.clone(),
                                                                                   error }),
            Behavior::Async(f) => Ok(Invoked::Pending(f(args))),
        }
    }

    /// Convierte el valor crudo de un cuerpo en el nuevo resultado previo.
    /// `None` = el resultado previo no cambia (acción con efectos).
    pub fn complete(&self, index: usize, raw: Value) -> Result<Option<Value>, ExecutionFault> {
        let compiled = &self.handlers[index];
        if self.settings.strict_output_types {
            if let Some(expected) = compiled.output {
                if !expected.accepts(&raw) {
                    return Err(ExecutionFault::OutputTypeMismatch { handler: compiled.handler.clone(),
                                                                    expected,
                                                                    found: ValueType::describe(&raw) });
                }
            }
        }
        let mode = match compiled.kind {
            HandlerKind::SideEffectingAction => return Ok(None),
            HandlerKind::PureFunction => return Ok(Some(raw)),
            kind => kind.render_mode(),
        };
        let (Some(render), Some(target)) = (mode, &compiled.target) else {
            return Err(ExecutionFault::Internal(format!("render handler {} without target", compiled.handler)));
        };
        Ok(Some(RenderOutput { render,
                               target: target.name().to_string(),
                               model: raw }.to_value()))
    }

    /// Frontera externa: convierte un pánico del cuerpo en `ExecutionFault`.
    pub fn guard<T, F>(&self, current: &Cell<Option<usize>>, f: F) -> Result<T, ExecutionFault>
        where F: FnOnce() -> Result<T, ExecutionFault>
    {
        if !self.settings.catch_panics {
            return f();
        }
        panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| Err(self.panic_fault(current, payload.as_ref())))
    }

    /// Fallo `Panicked` con la ubicación del handler en curso (o la unidad).
    pub fn panic_fault(&self, current: &Cell<Option<usize>>, payload: &(dyn Any + Send)) -> ExecutionFault {
        let location = current.get()
                              .map(|i| format!("handler {}", self.handlers[i].handler))
                              .unwrap_or_else(|| "unit".to_string());
        ExecutionFault::Panicked { location,
                                   message: panic_message(payload) }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
