//! Read-only views of the simulation for adapters
//!
//! Everything here is plain data with camelCase serde so a front-end can
//! ship it as JSON without touching live state.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::formula::FormulaKind;
use super::powerup::{POWER_UP_RADIUS, PowerUpKind};
use super::state::{LineOrigin, Score, SimulationState};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PuckView {
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineView {
    pub id: u32,
    pub origin: LineOrigin,
    pub width: f32,
    /// Flattened polyline, or the raw control points while still drawing
    pub points: Vec<Vec2>,
    pub finished: bool,
    pub progress: f32,
    pub animating: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerUpView {
    pub kind: PowerUpKind,
    pub pos: Vec2,
    pub radius: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectView {
    pub kind: PowerUpKind,
    /// Seconds left; 0 for the multi-ball marker
    pub remaining_secs: f32,
}

/// Everything a renderer needs for one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub canvas: Vec2,
    pub puck: PuckView,
    pub extra_pucks: Vec<PuckView>,
    /// Top edges of the player and AI paddles
    pub left_paddle_y: f32,
    pub right_paddle_y: f32,
    pub paddle_height: f32,
    pub paused: bool,
    pub demo_mode: bool,
    pub speed_multiplier: f32,
    pub ghost_mode: bool,
    pub paddle_shield: bool,
    pub score: Score,
    pub formula: Option<FormulaKind>,
    pub lines: Vec<LineView>,
    pub power_ups: Vec<PowerUpView>,
    pub effects: Vec<EffectView>,
    /// Top-left corners of live automaton cells
    pub cells: Vec<Vec2>,
    pub cell_size: f32,
    pub clock_secs: f64,
}

/// Aggregate counters for HUDs and logs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub active_effects: usize,
    pub power_ups: usize,
    pub lines: usize,
    pub extra_pucks: usize,
    pub live_cells: usize,
    pub speed_multiplier: f32,
    pub paused: bool,
    /// Seconds the puck has been in motion (paused time excluded)
    pub moving_secs: f64,
    pub score: Score,
}

/// Catalog entry describing one power-up kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerUpInfo {
    pub kind: PowerUpKind,
    pub description: String,
    pub glyph: String,
    pub color: String,
    pub duration_secs: f32,
}

/// Static description of every power-up kind
pub fn power_up_catalog() -> Vec<PowerUpInfo> {
    PowerUpKind::ALL
        .into_iter()
        .map(|kind| PowerUpInfo {
            kind,
            description: kind.description().to_string(),
            glyph: kind.glyph().to_string(),
            color: kind.color().to_string(),
            duration_secs: kind.duration().as_secs_f32(),
        })
        .collect()
}

impl SimulationState {
    pub fn snapshot(&self) -> Snapshot {
        let now = self.clock;
        let puck_view = |p: &super::state::Puck| PuckView {
            pos: p.pos,
            vel: p.vel,
            radius: p.radius,
        };

        Snapshot {
            canvas: self.canvas,
            puck: puck_view(&self.puck),
            extra_pucks: self.extra_pucks.iter().map(|e| puck_view(&e.puck)).collect(),
            left_paddle_y: self.left.y,
            right_paddle_y: self.right.y,
            paddle_height: self.paddle_height(),
            paused: self.paused,
            demo_mode: self.demo_mode,
            speed_multiplier: self.speed_multiplier,
            ghost_mode: self.power_ups.ghost_mode(),
            paddle_shield: self.power_ups.paddle_shield(),
            score: self.score,
            formula: self.formulas.active(),
            lines: self
                .lines
                .iter()
                .map(|l| LineView {
                    id: l.id,
                    origin: l.origin,
                    width: l.width,
                    points: l.geometry().to_vec(),
                    finished: l.is_finished(),
                    progress: l.progress,
                    animating: l.animating,
                })
                .collect(),
            power_ups: self
                .power_ups
                .power_ups
                .iter()
                .map(|p| PowerUpView {
                    kind: p.kind,
                    pos: p.pos,
                    radius: POWER_UP_RADIUS,
                })
                .collect(),
            effects: self
                .power_ups
                .effects
                .iter()
                .map(|e| EffectView {
                    kind: e.kind,
                    remaining_secs: e.remaining(now).as_secs_f32(),
                })
                .collect(),
            cells: self
                .grid
                .live_cells()
                .map(|(r, c)| self.grid.cell_origin(r, c))
                .collect(),
            cell_size: self.grid.cell_size,
            clock_secs: now.as_secs_f64(),
        }
    }

    pub fn stats(&self) -> Stats {
        Stats {
            active_effects: self.power_ups.effects.len(),
            power_ups: self.power_ups.power_ups.len(),
            lines: self.lines.len(),
            extra_pucks: self.extra_pucks.len(),
            live_cells: self.grid.live_count(),
            speed_multiplier: self.speed_multiplier,
            paused: self.paused,
            moving_secs: self.clock.as_secs_f64(),
            score: self.score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::tick;
    use std::time::Duration;

    #[test]
    fn test_snapshot_reflects_state() {
        let mut state = SimulationState::new(21);
        state.start_line(Vec2::new(100.0, 100.0));
        state.append_line_point(Vec2::new(120.0, 100.0));
        state.spawn_power_up(PowerUpKind::MagnetBall);

        let snap = state.snapshot();
        assert_eq!(snap.canvas, Vec2::new(800.0, 600.0));
        assert_eq!(snap.puck.pos, Vec2::new(400.0, 300.0));
        assert_eq!(snap.paddle_height, 100.0);
        assert_eq!(snap.lines.len(), 1);
        assert!(!snap.lines[0].finished);
        assert_eq!(snap.lines[0].points.len(), 2);
        assert_eq!(snap.power_ups.len(), 1);
        assert_eq!(snap.power_ups[0].kind, PowerUpKind::MagnetBall);
        assert_eq!(snap.power_ups[0].radius, POWER_UP_RADIUS);
        assert_eq!(snap.cells.len(), state.grid.live_count());
        assert!(snap.effects.is_empty());
    }

    #[test]
    fn test_effect_remaining_counts_down() {
        let mut state = SimulationState::new(22);
        state.formulas.interval = Duration::from_secs(3600);
        state
            .power_ups
            .activate(PowerUpKind::GhostMode, Duration::ZERO, &state.puck, &mut state.extra_pucks, &mut state.rng);
        tick(&mut state, Duration::ZERO);
        tick(&mut state, Duration::from_secs(2));

        let snap = state.snapshot();
        assert!(snap.ghost_mode);
        assert_eq!(snap.effects.len(), 1);
        assert!((snap.effects[0].remaining_secs - 3.0).abs() < 1e-4);
    }

    #[test]
    fn test_stats_moving_time_excludes_pause() {
        let mut state = SimulationState::new(23);
        tick(&mut state, Duration::ZERO);
        tick(&mut state, Duration::from_millis(500));
        state.toggle_pause();
        tick(&mut state, Duration::from_secs(3));
        state.toggle_pause();
        tick(&mut state, Duration::from_millis(3250));

        let stats = state.stats();
        assert!((stats.moving_secs - 0.75).abs() < 1e-9);
        assert!(!stats.paused);
        assert_eq!(stats.live_cells, state.grid.live_count());
        assert_eq!(stats.lines, state.lines.len());
    }

    #[test]
    fn test_snapshot_json_is_camel_case() {
        let state = SimulationState::new(24);
        let json = serde_json::to_string(&state.snapshot()).unwrap();
        assert!(json.contains("\"leftPaddleY\""));
        assert!(json.contains("\"speedMultiplier\""));
        assert!(json.contains("\"clockSecs\""));

        let back: Snapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state.snapshot());
    }

    #[test]
    fn test_catalog_covers_every_kind() {
        let catalog = power_up_catalog();
        assert_eq!(catalog.len(), PowerUpKind::ALL.len());
        let shield = catalog
            .iter()
            .find(|i| i.kind == PowerUpKind::PaddleShield)
            .unwrap();
        assert_eq!(shield.duration_secs, 10.0);
        let multi = catalog.iter().find(|i| i.kind == PowerUpKind::MultiBall).unwrap();
        assert_eq!(multi.duration_secs, 0.0);
        assert!(catalog.iter().all(|i| !i.description.is_empty()));
    }
}
