use std::future::Future;

use async_trait::async_trait;
use pipe_core::{HandlerArgs, HandlerError};
use serde_json::Value;

/// Cuerpo de handler asíncrono.
#[async_trait]
pub trait AsyncHandler: Send + Sync {
    fn name(&self) -> &str;

    async fn call(&self, args: HandlerArgs) -> Result<Value, HandlerError>;
}

/// `AsyncHandler` a partir de una closure que devuelve un future.
pub struct FnHandler<F> {
    name: String,
    f: F,
}

impl<F> FnHandler<F> {
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self { name: name.into(),
               f }
    }
}

#[async_trait]
impl<F, Fut> AsyncHandler for FnHandler<F>
    where F: Fn(HandlerArgs) -> Fut + Send + Sync,
          Fut: Future<Output = Result<Value, HandlerError>> + Send + 'static
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn call(&self, args: HandlerArgs) -> Result<Value, HandlerError> {
        (self.f)(args).await
    }
}
