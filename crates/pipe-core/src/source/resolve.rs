use indexmap::IndexSet;
use serde_json::Value;

use super::{BoundValues, InputSlots, ValueSource};
use crate::errors::{ConfigurationError, ExecutionFault, HandlerRef};
use crate::model::{Arg, Invocation};

/// Fuente compilada: lo que queda de un `ValueSource` después de sintetizar.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgPlan {
    /// Índice en los inputs ya ligados de la invocación.
    Slot(usize),
    Ambient(String),
    Predecessor,
    Enclosing,
    Artifact(String),
    /// Valor de configuración resuelto en tiempo de síntesis.
    Constant(Value),
}

/// Lo que un handler puede ver al resolver sus argumentos.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    pub invocation: &'a Invocation,
    pub inputs: &'a [Value],
    pub predecessor: Option<&'a Value>,
}

impl ArgPlan {
    /// Compila una fuente. `has_predecessor` indica si algún handler anterior
    /// produce valor; `ambient` es el conjunto declarado por el host (None =
    /// no se valida).
    pub fn compile(source: &ValueSource,
                   handler: &HandlerRef,
                   slots: &InputSlots,
                   bound: &BoundValues,
                   ambient: Option<&IndexSet<String>>,
                   has_predecessor: bool)
                   -> Result<ArgPlan, ConfigurationError> {
        match source {
            ValueSource::External(input) => {
                let index = slots.index_of(&input.identity())
                                 .ok_or_else(|| ConfigurationError::UnknownExternalInput { handler: handler.clone(),
                                                                                          name: input.name.clone() })?;
                Ok(ArgPlan::Slot(index))
            }
            ValueSource::Ambient { name } => match ambient {
                Some(known) if !known.contains(name) => Err(ConfigurationError::UnknownAmbientProperty { handler: handler.clone(),
                                                                                                         name: name.clone() }),
                _ => Ok(ArgPlan::Ambient(name.clone())),
            },
            ValueSource::Predecessor if !has_predecessor => Err(ConfigurationError::PredecessorUnavailable { handler: handler.clone() }),
            ValueSource::Predecessor => Ok(ArgPlan::Predecessor),
            ValueSource::Enclosing => Ok(ArgPlan::Enclosing),
            ValueSource::Artifact { name } => Ok(ArgPlan::Artifact(name.clone())),
            ValueSource::Bound { key } => bound.get(key)
                                               .cloned()
                                               .map(ArgPlan::Constant)
                                               .ok_or_else(|| ConfigurationError::UnknownBoundKey { handler: handler.clone(),
                                                                                                    key: key.clone() }),
        }
    }

    /// Produce el argumento concreto para una invocación.
    pub fn resolve(&self, handler: &HandlerRef, scope: &Scope<'_>) -> Result<Arg, ExecutionFault> {
        match self {
            ArgPlan::Slot(index) => scope.inputs
                                         .get(*index)
                                         .cloned()
                                         .map(Arg::Value)
                                         .ok_or_else(|| ExecutionFault::Internal(format!("input slot {index} not bound"))),
            ArgPlan::Ambient(name) => scope.invocation
                                           .ambient(name)
                                           .cloned()
                                           .map(Arg::Value)
                                           .ok_or_else(|| ExecutionFault::MissingAmbient { handler: handler.clone(),
                                                                                           name: name.clone() }),
            // Validado al sintetizar; llegar aquí sin valor es un bug del core.
            ArgPlan::Predecessor => scope.predecessor
                                         .cloned()
                                         .map(Arg::Value)
                                         .ok_or_else(|| ExecutionFault::Internal(format!("no predecessor value for handler {handler}"))),
            ArgPlan::Enclosing => scope.invocation
                                       .enclosing()
                                       .cloned()
                                       .map(Arg::Enclosing)
                                       .ok_or_else(|| ExecutionFault::MissingEnclosing { handler: handler.clone() }),
            ArgPlan::Artifact(name) => scope.invocation
                                            .upload(name)
                                            .cloned()
                                            .map(Arg::Artifact)
                                            .ok_or_else(|| ExecutionFault::MissingArtifact { handler: handler.clone(),
                                                                                             name: name.clone() }),
            ArgPlan::Constant(value) => Ok(Arg::Value(value.clone())),
        }
    }
}
