use std::fmt;
use std::sync::{Arc, Mutex};

use serde_json::Value;

use super::lock;
use crate::errors::HandlerError;

type Continuation = Box<dyn FnOnce() + Send>;

struct OpState {
    result: Option<Result<Value, HandlerError>>,
    taken: bool,
    continuation: Option<Continuation>,
}

/// Resultado de registrar una continuación.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// Quedó registrada; se ejecutará (una vez) al resolverse la operación.
    Registered,
    /// La operación ya estaba resuelta; la continuación no se guardó y el
    /// llamador debe seguir en línea.
    AlreadyComplete,
}

/// Operación en curso devuelta por un handler asíncrono; sirve de token de
/// continuación. Los clones comparten la misma celda.
#[derive(Clone)]
pub struct PendingOp {
    shared: Arc<Mutex<OpState>>,
}

/// Lado productor de un `PendingOp`. Descartarlo sin resolver falla la
/// operación con `HandlerError::abandoned()`.
pub struct Resolver {
    shared: Option<Arc<Mutex<OpState>>>,
}

impl PendingOp {
    /// Operación sin resolver y el `Resolver` que la completa.
    pub fn channel() -> (PendingOp, Resolver) {
        let shared = Arc::new(Mutex::new(OpState { result: None,
                                                   taken: false,
                                                   continuation: None }));
        (PendingOp { shared: shared.clone() }, Resolver { shared: Some(shared) })
    }

    /// Operación ya completada con éxito.
    pub fn ready(value: Value) -> Self {
        let (op, resolver) = Self::channel();
        resolver.complete(value);
        op
    }

    /// Operación ya completada con error.
    pub fn failed(error: HandlerError) -> Self {
        let (op, resolver) = Self::channel();
        resolver.fail(error);
        op
    }

    /// `true` si ya hay resultado (o ya se extrajo).
    pub fn is_complete(&self) -> bool {
        let state = lock(&self.shared);
        state.result.is_some() || state.taken
    }

    /// Registra `continuation` o informa que ya no hace falta. La comprobación
    /// y el registro son atómicos respecto a `Resolver::resolve`.
    pub fn on_complete<F>(&self, continuation: F) -> Registration
        where F: FnOnce() + Send + 'static
    {
        let mut state = lock(&self.shared);
        if state.result.is_some() || state.taken {
            return Registration::AlreadyComplete;
        }
        state.continuation = Some(Box::new(continuation));
        Registration::Registered
    }

    /// Extrae el resultado; `None` si aún no hay o si ya se extrajo.
    pub fn take_result(&self) -> Option<Result<Value, HandlerError>> {
        let mut state = lock(&self.shared);
        let result = state.result.take();
        if result.is_some() {
            state.taken = true;
        }
        result
    }
}

impl fmt::Debug for PendingOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock(&self.shared);
        f.debug_struct("PendingOp")
         .field("complete", &(state.result.is_some() || state.taken))
         .field("continuation", &state.continuation.is_some())
         .finish()
    }
}

impl Resolver {
    /// Completa la operación y ejecuta la continuación registrada, si hay.
    pub fn resolve(mut self, result: Result<Value, HandlerError>) {
        if let Some(shared) = self.shared.take() {
            settle(&shared, result);
        }
    }

    pub fn complete(self, value: Value) {
        self.resolve(Ok(value))
    }

    pub fn fail(self, error: HandlerError) {
        self.resolve(Err(error))
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver").field("pending", &self.shared.is_some()).finish()
    }
}

impl Drop for Resolver {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.take() {
            settle(&shared, Err(HandlerError::abandoned()));
        }
    }
}

// La continuación corre fuera del lock: puede volver a tocar este PendingOp.
fn settle(shared: &Arc<Mutex<OpState>>, result: Result<Value, HandlerError>) {
    let continuation = {
        let mut state = lock(shared);
        if state.result.is_some() || state.taken {
            return;
        }
        state.result = Some(result);
        state.continuation.take()
    };
    if let Some(continuation) = continuation {
        continuation();
    }
}
