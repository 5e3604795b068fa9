use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

/// Referencia al objeto contenedor (p.ej. el controller dueño de la ruta).
pub type Enclosing = Arc<dyn Any + Send + Sync>;

/// Archivo subido con la request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedArtifact {
    pub name: String,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadedArtifact {
    pub fn new(name: impl Into<String>, file_name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { name: name.into(),
               file_name: file_name.into(),
               content_type: content_type.into(),
               bytes }
    }
}

/// Contexto de una invocación. El host lo construye por cada llamada entrante
/// con los valores ya extraídos de la request; el core no sabe de HTTP.
#[derive(Clone, Default)]
pub struct Invocation {
    inputs: HashMap<String, Value>,
    ambient: HashMap<String, Value>,
    uploads: HashMap<String, Arc<UploadedArtifact>>,
    enclosing: Option<Enclosing>,
}

impl Invocation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input(mut self, name: impl Into<String>, value: Value) -> Self {
        self.inputs.insert(name.into(), value);
        self
    }

    pub fn with_ambient(mut self, name: impl Into<String>, value: Value) -> Self {
        self.ambient.insert(name.into(), value);
        self
    }

    pub fn with_upload(mut self, artifact: UploadedArtifact) -> Self {
        self.uploads.insert(artifact.name.clone(), Arc::new(artifact));
        self
    }

    pub fn with_enclosing<T: Any + Send + Sync>(mut self, owner: Arc<T>) -> Self {
        let owner: Enclosing = owner;
        self.enclosing = Some(owner);
        self
    }

    pub fn set_input(&mut self, name: impl Into<String>, value: Value) {
        self.inputs.insert(name.into(), value);
    }

    pub fn input(&self, name: &str) -> Option<&Value> {
        self.inputs.get(name)
    }

    pub fn ambient(&self, name: &str) -> Option<&Value> {
        self.ambient.get(name)
    }

    pub fn upload(&self, name: &str) -> Option<&Arc<UploadedArtifact>> {
        self.uploads.get(name)
    }

    pub fn enclosing(&self) -> Option<&Enclosing> {
        self.enclosing.as_ref()
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
         .field("inputs", &self.inputs)
         .field("ambient", &self.ambient)
         .field("uploads", &self.uploads.keys().collect::<Vec<_>>())
         .field("enclosing", &self.enclosing.is_some())
         .finish()
    }
}
