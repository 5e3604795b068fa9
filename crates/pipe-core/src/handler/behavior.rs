use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::errors::HandlerError;
use crate::future::PendingOp;
use crate::model::HandlerArgs;
use crate::registry::BehaviorKey;

pub type SyncFn = Arc<dyn Fn(HandlerArgs) -> Result<Value, HandlerError> + Send + Sync>;
pub type AsyncFn = Arc<dyn Fn(HandlerArgs) -> PendingOp + Send + Sync>;

/// Cuerpo ejecutable de un handler.
#[derive(Clone)]
pub enum Behavior {
    Sync(SyncFn),
    /// Devuelve una operación pendiente; la unidad se suspende hasta que
    /// se complete.
    Async(AsyncFn),
}

impl Behavior {
    pub fn sync<F>(f: F) -> Self
        where F: Fn(HandlerArgs) -> Result<Value, HandlerError> + Send + Sync + 'static
    {
        Behavior::Sync(Arc::new(f))
    }

    pub fn asynchronous<F>(f: F) -> Self
        where F: Fn(HandlerArgs) -> PendingOp + Send + Sync + 'static
    {
        Behavior::Async(Arc::new(f))
    }

    pub fn is_async(&self) -> bool {
        matches!(self, Behavior::Async(_))
    }
}

impl fmt::Debug for Behavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Behavior::Sync(_) => f.write_str("Behavior::Sync(..)"),
            Behavior::Async(_) => f.write_str("Behavior::Async(..)"),
        }
    }
}

/// Referencia opaca al cuerpo.
#[derive(Debug, Clone)]
pub enum HandlerBody {
    Inline(Behavior),
    /// Clave en `registry::behaviors()`, resuelta al sintetizar.
    Registered(BehaviorKey),
    /// Sin cuerpo: el modelo de un render es el resultado previo.
    Passthrough,
}
