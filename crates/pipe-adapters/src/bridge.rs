use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use pipe_core::registry;
use pipe_core::{Behavior, BehaviorKey, HandlerArgs, HandlerError, PendingOp};
use serde_json::Value;
use tokio::runtime::Handle;

use crate::handler::{AsyncHandler, FnHandler};

/// Lanza cuerpos de handler en un runtime tokio.
///
/// Cada llamada crea un `PendingOp`, hace `spawn` del trabajo y devuelve la
/// operación sin esperar. Si la tarea entra en pánico o el runtime se apaga
/// antes de terminar, el `Resolver` se descarta y la unidad recibe un fallo
/// de operación abandonada.
#[derive(Debug, Clone)]
pub struct TokioBridge {
    handle: Handle,
    timeout: Option<Duration>,
}

impl TokioBridge {
    pub fn new(handle: Handle) -> Self {
        Self { handle,
               timeout: None }
    }

    /// Bridge sobre el runtime actual; `None` fuera de un contexto tokio.
    pub fn current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }

    /// Límite por operación. Una suspensión sin límite puede quedar esperando
    /// para siempre.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn behavior<H>(&self, handler: Arc<H>) -> Behavior
        where H: AsyncHandler + 'static
    {
        let handle = self.handle.clone();
        let timeout = self.timeout;
        Behavior::asynchronous(move |args| {
            let (op, resolver) = PendingOp::channel();
            let handler = handler.clone();
            handle.spawn(async move {
                      let result = match timeout {
                          Some(limit) => match tokio::time::timeout(limit, handler.call(args)).await {
                              Ok(result) => result,
                              Err(_) => {
                                  log::warn!("[bridge] handler '{}' timed out after {:?}", handler.name(), limit);
                                  Err(HandlerError::new(format!("timed out after {limit:?}")))
                              }
                          },
                          None => handler.call(args).await,
                      };
                      resolver.resolve(result);
                  });
            op
        })
    }

    pub fn from_fn<F, Fut>(&self, name: &str, f: F) -> Behavior
        where F: Fn(HandlerArgs) -> Fut + Send + Sync + 'static,
              Fut: Future<Output = Result<Value, HandlerError>> + Send + 'static
    {
        self.behavior(Arc::new(FnHandler::new(name, f)))
    }

    /// Corre una función bloqueante en el pool de `spawn_blocking`.
    pub fn blocking<F>(&self, f: F) -> Behavior
        where F: Fn(HandlerArgs) -> Result<Value, HandlerError> + Send + Sync + 'static
    {
        let handle = self.handle.clone();
        let f = Arc::new(f);
        Behavior::asynchronous(move |args| {
            let (op, resolver) = PendingOp::channel();
            let f = f.clone();
            handle.spawn_blocking(move || resolver.resolve(f(args)));
            op
        })
    }

    /// Registra el handler en `registry::behaviors()`.
    pub fn register<H>(&self, handler: Arc<H>) -> BehaviorKey
        where H: AsyncHandler + 'static
    {
        let key = registry::behaviors().add(self.behavior(handler.clone()));
        log::debug!("[bridge] registered '{}' as {key}", handler.name());
        key
    }
}
