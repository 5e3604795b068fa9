use crate::handler::Behavior;

/// Tabla de capturas de una unidad: el cuerpo de cada handler, indexado por
/// posición en la pipeline. `None` = handler sin cuerpo (render passthrough).
///
/// Se llena una vez al sintetizar y queda inmutable; es la alternativa local
/// al registro global y no crece con la vida del proceso.
#[derive(Debug, Clone, Default)]
pub struct CaptureTable {
    entries: Vec<Option<Behavior>>,
}

impl CaptureTable {
    /// Tabla vacía con lugar para `capacity` handlers.
    pub fn with_capacity(capacity: usize) -> Self {
        Self { entries: Vec::with_capacity(capacity) }
    }

    /// Agrega la captura del siguiente handler y devuelve su índice.
    pub fn push(&mut self, behavior: Option<Behavior>) -> usize {
        self.entries.push(behavior);
        self.entries.len() - 1
    }

    /// Cuerpo capturado del handler `index`; `None` si no tiene o no existe.
    pub fn get(&self, index: usize) -> Option<&Behavior> {
        self.entries.get(index).and_then(Option::as_ref)
    }

    /// Cantidad de handlers registrados (con o sin cuerpo).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
