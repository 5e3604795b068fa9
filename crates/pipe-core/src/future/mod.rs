//! Primitivas de completitud sin runtime asíncrono.
//!
//! - `PendingOp`: operación en curso devuelta por un handler asíncrono. Quien
//!   la resuelve (un runtime, un thread, un test) usa el `Resolver`.
//! - `UnitCompletion`: resultado global de una unidad reanudable; implementa
//!   `Future` para quien quiera hacer `.await`.

mod completion;
mod pending;

use std::sync::{Mutex, MutexGuard, PoisonError};

pub use completion::{UnitCompletion, UnitOutcome};
pub use pending::{PendingOp, Registration, Resolver};

// Ningún código del core entra en pánico con estos locks tomados; si un
// callback externo lo hizo, el estado sigue siendo consistente.
pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
