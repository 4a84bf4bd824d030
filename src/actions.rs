//! Engine requests raised from inside hooks
//!
//! Input handlers, update hooks and UI callbacks cannot reach the engine while
//! it is dispatching to them, so they record layer-stack changes here. The
//! engine applies them as soon as the hook returns.

use crate::layer::LayerRef;

pub enum StackRequest {
    Push(LayerRef),
    Pop,
}

#[derive(Default)]
pub struct Actions {
    requests: Vec<StackRequest>,
}

impl Actions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `layer` the active layer
    pub fn push_layer(&mut self, layer: LayerRef) {
        self.requests.push(StackRequest::Push(layer));
    }

    /// Return to the layer below the active one
    pub fn pop_layer(&mut self) {
        self.requests.push(StackRequest::Pop);
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn drain(&mut self) -> std::vec::Drain<'_, StackRequest> {
        self.requests.drain(..)
    }
}
