//! Handler Definition: un paso de la pipeline como dato.

mod behavior;
mod definition;

use serde::{Deserialize, Serialize};

use crate::model::RenderMode;

pub use behavior::{AsyncFn, Behavior, HandlerBody, SyncFn};
pub use definition::{HandlerDefinition, RenderTarget};

/// Tipo de paso. Conjunto cerrado: el sintetizador hace match exhaustivo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandlerKind {
    PureFunction,
    SideEffectingAction,
    RenderView,
    RenderPartialView,
    RenderComponent,
}

impl HandlerKind {
    pub fn is_render(&self) -> bool {
        self.render_mode().is_some()
    }

    /// Un `SideEffectingAction` no reemplaza el resultado previo.
    pub fn produces_value(&self) -> bool {
        !matches!(self, HandlerKind::SideEffectingAction)
    }

    pub fn render_mode(&self) -> Option<RenderMode> {
        match self {
            HandlerKind::RenderView => Some(RenderMode::View),
            HandlerKind::RenderPartialView => Some(RenderMode::Partial),
            HandlerKind::RenderComponent => Some(RenderMode::Component),
            HandlerKind::PureFunction | HandlerKind::SideEffectingAction => None,
        }
    }
}
