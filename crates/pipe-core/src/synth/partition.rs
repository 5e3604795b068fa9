//! State Partitioner.
//!
//! Un estado se cierra inmediatamente después de cada handler asíncrono; los
//! handlers síncronos que le siguen pasan al estado siguiente y solo corren
//! después de la reanudación.

use std::ops::Range;

use crate::handler::HandlerDefinition;
use crate::model::ValueType;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State {
    pub index: usize,
    /// Rango de índices de handler en la pipeline.
    pub handlers: Range<usize>,
    /// true si el último handler del estado es asíncrono.
    pub is_async: bool,
    pub result_type: Option<ValueType>,
}

impl State {
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn last_handler(&self) -> usize {
        self.handlers.end - 1
    }
}

pub fn partition(handlers: &[HandlerDefinition]) -> Vec<State> {
    let mut states = Vec::new();
    let mut start = 0;
    for (index, handler) in handlers.iter().enumerate() {
        if handler.is_async || index + 1 == handlers.len() {
            states.push(State { index: states.len(),
                                handlers: start..index + 1,
                                is_async: handler.is_async,
                                result_type: handler.result_type() });
            start = index + 1;
        }
    }
    states
}
