//! Radius - a small scene-graph and layer-stack engine for 2D canvas games
//!
//! Core modules:
//! - `scene`: Entity tree, drawable elements, keyframe scripts and ghosts
//! - `layer`: One full-screen mode with its own entities, clock and input hooks
//! - `engine`: The layer stack and the per-frame input/update/draw loop
//! - `ui`: Retained forms with flow/grid/fixed layout and focus navigation
//! - `platform`: Browser backend (canvas, DOM input, LocalStorage)

pub mod actions;
pub mod assets;
pub mod audio;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod input;
pub mod layer;
pub mod locking_list;
pub mod persistence;
pub mod platform;
pub mod scene;
pub mod settings;
pub mod surface;
pub mod text;
pub mod transform;
pub mod ui;

pub use actions::Actions;
pub use config::EngineConfig;
pub use engine::{Radius, Viewport};
pub use error::{RadiusError, RadiusResult};
pub use event::{Event, ListenerId};
pub use layer::{Layer, LayerRef};
pub use locking_list::LockingList;
pub use scene::{Element, Entity, EntityList, EntityRef};
pub use settings::Settings;
pub use surface::{Color, Font, Surface, TextMetrics};
pub use transform::{Rect, Transform2D};

/// Engine configuration constants
pub mod consts {
    /// Logical coordinate space (center origin, y-up)
    pub const LOGICAL_WIDTH: f32 = 640.0;
    pub const LOGICAL_HEIGHT: f32 = 480.0;

    /// Frame deltas above this are treated as a suspended host (backgrounded tab)
    pub const MAX_FRAME_MS: f32 = 100.0;
    /// Delta substituted for an over-long frame
    pub const FALLBACK_FRAME_MS: f32 = 50.0;

    /// Concurrent playback instances per audio clip
    pub const MAX_AUDIO_INSTANCES: usize = 4;
}
