//! pipe-adapters: puentes entre los cuerpos de handler y el ecosistema async.
//!
//! El core no depende de ningún runtime: un handler asíncrono devuelve un
//! `PendingOp` y alguien lo resuelve. Aquí ese alguien es tokio:
//! - `AsyncHandler`: trait `async-trait` para escribir cuerpos con `async fn`.
//! - `TokioBridge`: convierte un `AsyncHandler` (o una closure async, o una
//!   función bloqueante) en un `Behavior` cuyo trabajo corre en un runtime
//!   tokio y resuelve la operación al terminar.

pub mod bridge;
pub mod handler;

pub use bridge::TokioBridge;
pub use handler::{AsyncHandler, FnHandler};
