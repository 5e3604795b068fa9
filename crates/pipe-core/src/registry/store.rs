use std::fmt;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::RegistryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegistryKey(Uuid);

impl RegistryKey {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RegistryKey {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RegistryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Almacén clave → valor, seguro para inserciones concurrentes desde varias
/// síntesis a la vez. Append-only.
pub struct Registry<T> {
    name: &'static str,
    entries: DashMap<RegistryKey, T>,
}

impl<T: Clone> Registry<T> {
    pub fn new(name: &'static str) -> Self {
        Self { name,
               entries: DashMap::new() }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Inserta `value` bajo una clave nueva.
    ///
    /// # Panics
    /// Si la clave generada ya existe. Con claves UUID v4 esto indica un
    /// defecto del generador, no un error recuperable.
    pub fn add(&self, value: T) -> RegistryKey {
        let key = RegistryKey::new();
        if let Err(err) = self.insert(key, value) {
            panic!("invariant violated: {err}");
        }
        log::trace!("[registry:{}] added {key}", self.name);
        key
    }

    /// Inserta con una clave elegida por el llamador; nunca sobrescribe.
    pub fn insert(&self, key: RegistryKey, value: T) -> Result<(), RegistryError> {
        match self.entries.entry(key) {
            Entry::Occupied(_) => Err(RegistryError::DuplicateKey { registry: self.name,
                                                                    key }),
            Entry::Vacant(slot) => {
                slot.insert(value);
                Ok(())
            }
        }
    }

    pub fn get(&self, key: RegistryKey) -> Option<T> {
        self.entries.get(&key).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, key: RegistryKey) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> fmt::Debug for Registry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
         .field("name", &self.name)
         .field("entries", &self.entries.len())
         .finish()
    }
}
