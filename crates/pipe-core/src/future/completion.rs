use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};

use serde_json::Value;

use super::lock;
use crate::errors::ExecutionFault;

pub type UnitOutcome = Result<Value, ExecutionFault>;

type Listener = Box<dyn FnOnce(&UnitOutcome) + Send>;

#[derive(Default)]
struct CompletionState {
    outcome: Option<UnitOutcome>,
    wakers: Vec<Waker>,
    listeners: Vec<Listener>,
}

/// Resultado observable de una unidad reanudable. Se resuelve una sola vez,
/// con el valor final o con el fallo que detuvo la unidad.
#[derive(Clone, Default)]
pub struct UnitCompletion {
    shared: Arc<Mutex<CompletionState>>,
}

impl UnitCompletion {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Devuelve `false` si ya estaba resuelta (el segundo resultado se ignora).
    pub(crate) fn resolve(&self, outcome: UnitOutcome) -> bool {
        let (wakers, listeners) = {
            let mut state = lock(&self.shared);
            if state.outcome.is_some() {
                return false;
            }
            state.outcome = Some(outcome.clone());
            (std::mem::take(&mut state.wakers), std::mem::take(&mut state.listeners))
        };
        for waker in wakers {
            waker.wake();
        }
        for listener in listeners {
            listener(&outcome);
        }
        true
    }

    /// `true` una vez resuelta.
    pub fn is_resolved(&self) -> bool {
        lock(&self.shared).outcome.is_some()
    }

    /// Resultado sin bloquear; `None` mientras siga pendiente.
    pub fn try_result(&self) -> Option<UnitOutcome> {
        lock(&self.shared).outcome.clone()
    }

    /// Ejecuta `listener` al resolverse (o de inmediato si ya lo está).
    pub fn on_resolved<F>(&self, listener: F)
        where F: FnOnce(&UnitOutcome) + Send + 'static
    {
        let outcome = {
            let mut state = lock(&self.shared);
            match &state.outcome {
                Some(outcome) => outcome.clone(),
                None => {
                    state.listeners.push(Box::new(listener));
                    return;
                }
            }
        };
        listener(&outcome);
    }
}

impl Future for UnitCompletion {
    type Output = UnitOutcome;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut state = lock(&self.shared);
        if let Some(outcome) = &state.outcome {
            return Poll::Ready(outcome.clone());
        }
        if !state.wakers.iter().any(|w| w.will_wake(cx.waker())) {
            state.wakers.push(cx.waker().clone());
        }
        Poll::Pending
    }
}

impl fmt::Debug for UnitCompletion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitCompletion").field("outcome", &lock(&self.shared).outcome).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio_test::{assert_pending, assert_ready_eq, task};

    #[test]
    fn resolves_once_and_wakes_pollers() {
        let completion = UnitCompletion::new();
        let mut fut = task::spawn(completion.clone());
        assert_pending!(fut.poll());

        assert!(completion.resolve(Ok(json!(8))));
        assert!(fut.is_woken());
        assert_ready_eq!(fut.poll(), Ok(json!(8)));

        assert!(!completion.resolve(Ok(json!(9))));
        assert_eq!(completion.try_result(), Some(Ok(json!(8))));
    }

    #[test]
    fn late_listener_runs_immediately() {
        let completion = UnitCompletion::new();
        completion.resolve(Err(ExecutionFault::Internal("x".into())));
        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();
        completion.on_resolved(move |o| *sink.lock().unwrap() = Some(o.is_err()));
        assert_eq!(*seen.lock().unwrap(), Some(true));
    }
}
