//! Keyframe scripts: linear interpolation of an entity's pose over time
//!
//! Keyframe 0 is the initial pose and is never animated to. Each later keyframe
//! is reached `duration_ms` after the previous one, interpolating from the pose
//! snapshotted when the previous keyframe completed. Leftover time carries into
//! the next segment, so a single large step can cross several keyframes.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Animated entity properties
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec2,
    pub size: Vec2,
    pub angle: f32,
    pub opacity: f32,
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            size: Vec2::ONE,
            angle: 0.0,
            opacity: 1.0,
        }
    }
}

impl Pose {
    pub fn lerp(&self, target: &Pose, t: f32) -> Pose {
        Pose {
            position: self.position.lerp(target.position, t),
            size: self.size.lerp(target.size, t),
            angle: self.angle + (target.angle - self.angle) * t,
            opacity: self.opacity + (target.opacity - self.opacity) * t,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    pub duration_ms: f32,
    pub pose: Pose,
}

impl Keyframe {
    pub fn new(duration_ms: f32, pose: Pose) -> Self {
        Self { duration_ms, pose }
    }

    /// `[duration, x, y, width, height, angle, opacity]`
    pub fn from_array(v: [f32; 7]) -> Self {
        Self {
            duration_ms: v[0],
            pose: Pose {
                position: Vec2::new(v[1], v[2]),
                size: Vec2::new(v[3], v[4]),
                angle: v[5],
                opacity: v[6],
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptState {
    /// Interpolating towards keyframe `step`
    Armed { step: usize },
    Completed,
}

/// Result of advancing a script
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScriptStep {
    pub pose: Pose,
    /// True only on the update that finished the script
    pub just_completed: bool,
}

#[derive(Debug, Clone)]
pub struct Script {
    steps: Vec<Keyframe>,
    repeat: bool,
    timer: f32,
    base: Pose,
    state: ScriptState,
}

impl Script {
    /// Panics if `steps` is empty
    pub fn new(steps: Vec<Keyframe>, repeat: bool) -> Self {
        assert!(!steps.is_empty(), "script needs at least one keyframe");
        let base = steps[0].pose;
        Self {
            steps,
            repeat,
            timer: 0.0,
            base,
            state: ScriptState::Armed { step: 0 },
        }
    }

    pub fn initial_pose(&self) -> Pose {
        self.steps[0].pose
    }

    pub fn final_pose(&self) -> Pose {
        self.steps[self.steps.len() - 1].pose
    }

    pub fn state(&self) -> ScriptState {
        self.state
    }

    pub fn is_completed(&self) -> bool {
        self.state == ScriptState::Completed
    }

    /// Time through all segments after keyframe 0, i.e. one repeat cycle
    fn cycle_ms(&self) -> f32 {
        self.steps[1..].iter().map(|k| k.duration_ms).sum()
    }

    pub fn advance(&mut self, ms: f32) -> ScriptStep {
        let ScriptState::Armed { mut step } = self.state else {
            return ScriptStep {
                pose: self.final_pose(),
                just_completed: false,
            };
        };

        self.timer += ms;
        loop {
            let duration = self.steps[step].duration_ms;
            if self.timer < duration {
                break;
            }

            self.timer -= duration;
            self.base = self.steps[step].pose;
            step += 1;

            if step >= self.steps.len() {
                if self.repeat && self.steps.len() > 1 {
                    step = 1;
                    // Zero-length cycles would never consume the timer
                    if self.cycle_ms() <= 0.0 {
                        self.timer = 0.0;
                        break;
                    }
                } else {
                    self.state = ScriptState::Completed;
                    self.timer = 0.0;
                    return ScriptStep {
                        pose: self.final_pose(),
                        just_completed: true,
                    };
                }
            }
        }

        self.state = ScriptState::Armed { step };
        let target = &self.steps[step];
        let t = if target.duration_ms > 0.0 {
            self.timer / target.duration_ms
        } else {
            1.0
        };
        ScriptStep {
            pose: self.base.lerp(&target.pose, t),
            just_completed: false,
        }
    }
}

/// Parameters for a ghost: a one-shot grow/shrink-and-fade of an entity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GhostParams {
    pub period_ms: f32,
    /// Peak scale multiplier
    pub scale_max: f32,
    /// Inward: shrink from `scale_max` while fading in. Outward: grow while fading out.
    pub inward: bool,
    /// Offset added to the final position
    pub offset: Vec2,
}

impl GhostParams {
    pub fn outward(period_ms: f32, scale_max: f32) -> Self {
        Self {
            period_ms,
            scale_max,
            inward: false,
            offset: Vec2::ZERO,
        }
    }

    pub fn inward(period_ms: f32, scale_max: f32) -> Self {
        Self {
            inward: true,
            ..Self::outward(period_ms, scale_max)
        }
    }

    pub fn with_offset(mut self, offset: Vec2) -> Self {
        self.offset = offset;
        self
    }

    /// Two-keyframe script starting from `pose`
    pub fn keyframes(&self, pose: &Pose) -> Vec<Keyframe> {
        let peak_opacity = if pose.opacity >= 0.0 { pose.opacity } else { 1.0 };
        let (initial_scale, final_scale, initial_opacity, final_opacity) = if self.inward {
            (self.scale_max, 1.0, 0.0, peak_opacity)
        } else {
            (1.0, self.scale_max, peak_opacity, 0.0)
        };

        vec![
            Keyframe::new(
                0.0,
                Pose {
                    position: pose.position,
                    size: pose.size * initial_scale,
                    angle: pose.angle,
                    opacity: initial_opacity,
                },
            ),
            Keyframe::new(
                self.period_ms,
                Pose {
                    position: pose.position + self.offset,
                    size: pose.size * final_scale,
                    angle: pose.angle,
                    opacity: final_opacity,
                },
            ),
        ]
    }
}
