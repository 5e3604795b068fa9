use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::{Enclosing, UploadedArtifact};
use crate::errors::HandlerError;

/// Un argumento ya resuelto.
#[derive(Clone)]
pub enum Arg {
    Value(Value),
    Artifact(Arc<UploadedArtifact>),
    Enclosing(Enclosing),
}

impl fmt::Debug for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Arg::Artifact(a) => f.debug_tuple("Artifact").field(&a.name).finish(),
            Arg::Enclosing(_) => f.write_str("Enclosing(..)"),
        }
    }
}

/// Argumentos de un handler, en el orden de sus `ValueSource` declarados.
///
/// Los accesores devuelven `HandlerError` en vez de entrar en pánico, de modo
/// que un cuerpo puede usar `?` y el fallo termina como `ExecutionFault`.
#[derive(Debug, Clone, Default)]
pub struct HandlerArgs {
    args: Vec<Arg>,
}

impl HandlerArgs {
    pub fn new(args: Vec<Arg>) -> Self {
        Self { args }
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Arg> {
        self.args.get(index)
    }

    pub fn value(&self, index: usize) -> Result<&Value, HandlerError> {
        match self.args.get(index) {
            Some(Arg::Value(v)) => Ok(v),
            Some(other) => Err(HandlerError::new(format!("argument {index} is not a value: {other:?}"))),
            None => Err(HandlerError::new(format!("argument {index} missing"))),
        }
    }

    pub fn i64(&self, index: usize) -> Result<i64, HandlerError> {
        let v = self.value(index)?;
        v.as_i64().ok_or_else(|| HandlerError::new(format!("argument {index} is not an int: {v}")))
    }

    pub fn f64(&self, index: usize) -> Result<f64, HandlerError> {
        let v = self.value(index)?;
        v.as_f64().ok_or_else(|| HandlerError::new(format!("argument {index} is not a number: {v}")))
    }

    pub fn str(&self, index: usize) -> Result<&str, HandlerError> {
        let v = self.value(index)?;
        v.as_str().ok_or_else(|| HandlerError::new(format!("argument {index} is not a string: {v}")))
    }

    pub fn artifact(&self, index: usize) -> Result<&UploadedArtifact, HandlerError> {
        match self.args.get(index) {
            Some(Arg::Artifact(a)) => Ok(a.as_ref()),
            _ => Err(HandlerError::new(format!("argument {index} is not an uploaded artifact"))),
        }
    }

    /// Downcast del objeto contenedor al tipo concreto esperado.
    pub fn enclosing<T: Any + Send + Sync>(&self, index: usize) -> Result<Arc<T>, HandlerError> {
        match self.args.get(index) {
            Some(Arg::Enclosing(owner)) => owner.clone()
                                               .downcast::<T>()
                                               .map_err(|_| HandlerError::new(format!("enclosing reference is not a {}", std::any::type_name::<T>()))),
            _ => Err(HandlerError::new(format!("argument {index} is not the enclosing reference"))),
        }
    }
}

impl FromIterator<Arg> for HandlerArgs {
    fn from_iter<I: IntoIterator<Item = Arg>>(iter: I) -> Self {
        Self { args: iter.into_iter().collect() }
    }
}
