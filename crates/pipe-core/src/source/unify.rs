use std::collections::HashMap;

use indexmap::IndexMap;
use serde_json::Value;

use super::{ExternalInput, InputIdentity, InputOrigin, ValueSource};
use crate::errors::{ConfigurationError, ExecutionFault};
use crate::model::{Invocation, ValueType};

/// Slot de input visible desde fuera de la pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct InputSlot {
    pub index: usize,
    pub origin: InputOrigin,
    pub name: String,
    pub value_type: ValueType,
    pub default: Option<Value>,
}

impl InputSlot {
    fn from_input(index: usize, input: &ExternalInput) -> Self {
        Self { index,
               origin: input.origin,
               name: input.name.clone(),
               value_type: input.value_type,
               default: input.default.clone() }
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }

    /// Lee el valor del slot desde la invocación, aplicando el default y
    /// verificando el tipo declarado.
    pub fn bind(&self, invocation: &Invocation) -> Result<Value, ExecutionFault> {
        let value = match (invocation.input(&self.name), &self.default) {
            (Some(v), _) => v.clone(),
            (None, Some(default)) => return Ok(default.clone()),
            (None, None) => return Err(ExecutionFault::MissingInput { name: self.name.clone() }),
        };
        if !self.value_type.accepts(&value) {
            return Err(ExecutionFault::InputTypeMismatch { name: self.name.clone(),
                                                           expected: self.value_type,
                                                           found: ValueType::describe(&value) });
        }
        Ok(value)
    }
}

/// Inputs externos unificados, en orden de primera aparición.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputSlots {
    slots: IndexMap<InputIdentity, InputSlot>,
}

impl InputSlots {
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &InputSlot> {
        self.slots.values()
    }

    pub fn get(&self, index: usize) -> Option<&InputSlot> {
        self.slots.get_index(index).map(|(_, slot)| slot)
    }

    pub fn by_name(&self, name: &str) -> Option<&InputSlot> {
        self.slots.values().find(|s| s.name == name)
    }

    pub fn index_of(&self, identity: &InputIdentity) -> Option<usize> {
        self.slots.get_index_of(identity)
    }

    /// Liga todos los slots; el primer fallo corta.
    pub fn bind_all(&self, invocation: &Invocation) -> Result<Vec<Value>, ExecutionFault> {
        self.slots.values().map(|slot| slot.bind(invocation)).collect()
    }
}

/// Unifica los inputs externos de una secuencia de fuentes. Dos fuentes con la
/// misma identidad (origen + nombre + tipo) comparten slot; el mismo nombre con
/// otra identidad, o defaults distintos para la misma, es un error de
/// configuración.
pub fn unify_inputs<'a, I>(sources: I) -> Result<InputSlots, ConfigurationError>
    where I: IntoIterator<Item = &'a ValueSource>
{
    let mut slots: IndexMap<InputIdentity, InputSlot> = IndexMap::new();
    let mut names: HashMap<String, InputIdentity> = HashMap::new();

    for input in sources.into_iter().filter_map(ValueSource::as_external) {
        if let Some(default) = &input.default {
            if !default.is_null() && !input.value_type.accepts(default) {
                return Err(ConfigurationError::DefaultTypeMismatch { name: input.name.clone(),
                                                                     expected: input.value_type });
            }
        }
        let identity = input.identity();
        if let Some(existing) = slots.get(&identity) {
            if existing.default != input.default {
                return Err(ConfigurationError::ConflictingDefaults { name: input.name.clone() });
            }
            continue;
        }
        if names.contains_key(&input.name) {
            return Err(ConfigurationError::DuplicateInputName { name: input.name.clone() });
        }
        names.insert(input.name.clone(), identity.clone());
        let slot = InputSlot::from_input(slots.len(), input);
        slots.insert(identity, slot);
    }

    Ok(InputSlots { slots })
}
