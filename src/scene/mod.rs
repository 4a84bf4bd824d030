//! Scene graph
//!
//! Entities form a tree: each owns drawable elements and an ordered child list.
//! Updates recurse depth-first and drop children flagged `dead`; drawing
//! composes each node's transform onto its parent's.

pub mod draw;
pub mod element;
pub mod entity;
pub mod script;

pub use draw::draw_entity;
pub use element::{Element, Image, ImageRegion, Rectangle, Text, TextContent};
pub use entity::{EndedHook, Entity, EntityList, EntityRef, UpdateHook, update_list};
pub use script::{GhostParams, Keyframe, Pose, Script, ScriptState, ScriptStep};
