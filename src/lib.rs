//! Life Hockey - air hockey against a Game of Life wall
//!
//! Core modules:
//! - `sim`: Fixed-timestep simulation (physics, collisions, automaton, power-ups)
//! - `command`: Validated command boundary for front-ends
//! - `runner`: Fixed-rate tick driver shared with snapshot observers
//! - `settings`: Data-driven configuration

pub mod command;
pub mod error;
pub mod runner;
pub mod settings;
pub mod sim;

pub use command::Command;
pub use error::{CommandError, SettingsError};
pub use settings::Settings;
pub use sim::{SimulationState, tick};

/// Game configuration constants
pub mod consts {
    use std::time::Duration;

    /// Fixed simulation timestep (125 Hz)
    pub const TICK_INTERVAL: Duration = Duration::from_millis(8);
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Canvas defaults
    pub const DEFAULT_CANVAS_WIDTH: f32 = 800.0;
    pub const DEFAULT_CANVAS_HEIGHT: f32 = 600.0;

    /// Puck defaults (velocities are per-tick displacements)
    pub const PUCK_RADIUS: f32 = 10.0;
    pub const PUCK_START_VX: f32 = 5.0;
    pub const PUCK_START_VY: f32 = 3.0;
    /// Speed ceiling applied after every tick
    pub const MAX_PUCK_SPEED: f32 = 20.0;

    /// Paddles sit flush against the left/right canvas edges
    pub const PADDLE_WIDTH: f32 = 10.0;
    /// Paddle height is canvas height divided by this
    pub const PADDLE_HEIGHT_DIVISOR: f32 = 6.0;
    pub const AI_PADDLE_SPEED: f32 = 6.0;
    pub const AI_DEAD_ZONE: f32 = 8.0;
    /// Vertical velocity range produced by paddle impact offset
    pub const PADDLE_ANGLE_RANGE: f32 = 15.0;

    /// Restitution gains (primary puck)
    pub const WALL_RESTITUTION: f32 = 1.15;
    pub const PADDLE_RESTITUTION: f32 = 1.3;
    pub const LINE_RESTITUTION: f32 = 1.15;

    /// Restitution gains (multi-ball pucks)
    pub const EXTRA_WALL_RESTITUTION: f32 = 1.0;
    pub const EXTRA_PADDLE_RESTITUTION: f32 = 1.1;
    pub const EXTRA_LINE_RESTITUTION: f32 = 1.0;
    pub const EXTRA_PUCK_SPEED_SCALE: f32 = 1.0;

    /// Drawn lines
    pub const DEFAULT_LINE_WIDTH: f32 = 4.0;
    pub const MAX_LINE_POINTS: usize = 1000;
    pub const LINE_NUDGE: f32 = 2.0;
    pub const LINE_COOLDOWN: Duration = Duration::from_millis(100);
    pub const LINE_ANIMATION_STEP: f32 = 0.05;

    /// Spline flattening
    pub const SPLINE_STEPS: usize = 15;
    pub const SPLINE_TENSION: f32 = 0.5;

    /// Block collision
    pub const BLOCK_PERTURBATION: f32 = 0.5;
    pub const BLOCK_NUDGE: f32 = 1.0;
}

/// Reflect a velocity about a unit normal: v' = v - 2(v·n)n
#[inline]
pub fn reflect(velocity: glam::Vec2, normal: glam::Vec2) -> glam::Vec2 {
    velocity - 2.0 * velocity.dot(normal) * normal
}
