//! Platform backends
//!
//! The browser backend implements the engine traits over a canvas, DOM input
//! events, media elements and LocalStorage. Native builds run headless with
//! `RecordingSurface`, `ManualClock` and `MemoryStore`.

#[cfg(target_arch = "wasm32")]
pub mod web;
