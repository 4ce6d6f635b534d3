//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Time comes in as `Duration`, never read from the system clock
//! - No rendering or platform dependencies

pub mod automaton;
pub mod collision;
pub mod formula;
pub mod powerup;
pub mod snapshot;
pub mod spline;
pub mod state;
pub mod tick;

pub use automaton::LifeGrid;
pub use collision::{CollisionResult, WallHit, cap_speed};
pub use formula::{FormulaKind, FormulaRegistry};
pub use powerup::{ActiveEffect, PowerUp, PowerUpKind, PowerUpManager};
pub use snapshot::{PowerUpInfo, Snapshot, Stats, power_up_catalog};
pub use state::{ExtraPuck, Line, LineOrigin, Paddle, Puck, Score, Side, SimEvent, SimulationState};
pub use tick::{tick, update_ai_paddle};
