//! Simulation state and core entity types
//!
//! Everything the tick mutates lives in [`SimulationState`]. Front-ends go
//! through the command methods here (or [`crate::command::Command`]) and read
//! back through snapshots; they never touch the fields mid-tick.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::automaton::LifeGrid;
use super::formula::{self, FormulaKind, FormulaRegistry};
use super::powerup::{PowerUpKind, PowerUpManager};
use super::spline;
use crate::consts::*;
use crate::settings::Settings;

/// Which edge of the canvas a paddle defends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    /// Player (mouse) paddle
    Left,
    /// AI paddle
    Right,
}

/// A moving disc
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Puck {
    pub pos: Vec2,
    /// Displacement per tick at speed multiplier 1.0
    pub vel: Vec2,
    pub radius: f32,
}

impl Puck {
    pub fn new(pos: Vec2, vel: Vec2) -> Self {
        Self {
            pos,
            vel,
            radius: PUCK_RADIUS,
        }
    }

    /// Advance by one tick of displacement
    #[inline]
    pub fn advance(&mut self, multiplier: f32) {
        self.pos += self.vel * multiplier;
    }

    pub fn is_finite(&self) -> bool {
        self.pos.is_finite() && self.vel.is_finite()
    }
}

/// Transient puck spawned by the multi-ball power-up
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtraPuck {
    pub puck: Puck,
    pub created_at: Duration,
    pub lifetime: Duration,
}

impl ExtraPuck {
    pub fn expired(&self, now: Duration) -> bool {
        now.saturating_sub(self.created_at) >= self.lifetime
    }
}

/// A vertical paddle flush against one canvas edge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paddle {
    pub side: Side,
    /// Top edge of the paddle
    pub y: f32,
}

impl Paddle {
    pub fn new(side: Side) -> Self {
        Self { side, y: 0.0 }
    }

    /// Center the paddle vertically
    pub fn center(&mut self, canvas_height: f32, height: f32) {
        self.y = (canvas_height - height) / 2.0;
        self.clamp(canvas_height, height);
    }

    /// Keep the paddle inside [0, canvas_height - height]
    pub fn clamp(&mut self, canvas_height: f32, height: f32) {
        self.y = self.y.clamp(0.0, (canvas_height - height).max(0.0));
    }

    /// X coordinate of the face the puck bounces off
    pub fn face_x(&self, canvas_width: f32) -> f32 {
        match self.side {
            Side::Left => PADDLE_WIDTH,
            Side::Right => canvas_width - PADDLE_WIDTH,
        }
    }

    /// Canvas-space center of the paddle rectangle
    pub fn center_point(&self, canvas: Vec2, height: f32) -> Vec2 {
        let x = match self.side {
            Side::Left => PADDLE_WIDTH / 2.0,
            Side::Right => canvas.x - PADDLE_WIDTH / 2.0,
        };
        Vec2::new(x, self.y + height / 2.0)
    }

    /// Move toward a target top edge by at most `max_step`, ignoring offsets
    /// inside the dead zone.
    pub fn move_toward(&mut self, target_y: f32, max_step: f32, canvas_height: f32, height: f32) {
        let delta = target_y - self.y;
        if delta.abs() > AI_DEAD_ZONE {
            self.y += delta.signum() * delta.abs().min(max_step);
        }
        self.clamp(canvas_height, height);
    }
}

/// Where an obstacle line came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LineOrigin {
    Drawn,
    Formula,
}

/// A reflective obstacle curve
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Line {
    pub id: u32,
    pub origin: LineOrigin,
    /// Sparse control points as drawn or generated
    pub points: Vec<Vec2>,
    /// Dense polyline used for collision; `None` until finished
    pub flattened: Option<Vec<Vec2>>,
    pub width: f32,
    /// Draw-in animation progress (0-1)
    pub progress: f32,
    pub animating: bool,
}

impl Line {
    pub fn new(id: u32, origin: LineOrigin, start: Vec2) -> Self {
        Self {
            id,
            origin,
            points: vec![start],
            flattened: None,
            width: DEFAULT_LINE_WIDTH,
            progress: 0.0,
            animating: false,
        }
    }

    /// Append a control point, dropping the oldest past the cap
    pub fn push_point(&mut self, p: Vec2) {
        self.points.push(p);
        if self.points.len() > MAX_LINE_POINTS {
            let excess = self.points.len() - MAX_LINE_POINTS;
            self.points.drain(..excess);
        }
    }

    /// Flatten the control points and arm the draw-in animation
    pub fn finish(&mut self, animate: bool) {
        self.flattened = Some(spline::flatten(&self.points));
        if animate {
            self.progress = 0.0;
            self.animating = true;
        } else {
            self.progress = 1.0;
            self.animating = false;
        }
    }

    pub fn is_finished(&self) -> bool {
        self.flattened.is_some()
    }

    /// Step the draw-in animation
    pub fn advance_animation(&mut self) {
        if self.animating {
            self.progress = (self.progress + LINE_ANIMATION_STEP).min(1.0);
            if self.progress >= 1.0 {
                self.animating = false;
            }
        }
    }

    /// Collision segments as (index, start, end)
    pub fn segments(&self) -> impl Iterator<Item = (usize, Vec2, Vec2)> + '_ {
        self.flattened
            .as_deref()
            .unwrap_or(&[])
            .windows(2)
            .enumerate()
            .map(|(i, w)| (i, w[0], w[1]))
    }

    /// Points used for clearance checks (flattened if available)
    pub fn geometry(&self) -> &[Vec2] {
        self.flattened.as_deref().unwrap_or(&self.points)
    }
}

/// Identity of one line segment: (line id, segment index)
pub type SegmentKey = (u32, usize);

/// Goals per side
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub player: u32,
    pub ai: u32,
}

/// Things that happened during a tick, for HUD/sound adapters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SimEvent {
    Goal { scorer: Side },
    PowerUpCollected { kind: PowerUpKind },
    EffectExpired { kind: PowerUpKind },
    BlockDestroyed { row: usize, col: usize },
    FormulaChanged { kind: FormulaKind },
}

/// Events kept for adapters that fall behind
pub const MAX_PENDING_EVENTS: usize = 256;

/// Queue an event, dropping the oldest once full
pub fn push_event(events: &mut VecDeque<SimEvent>, event: SimEvent) {
    if events.len() >= MAX_PENDING_EVENTS {
        events.pop_front();
    }
    events.push_back(event);
}

/// Complete simulation state
#[derive(Debug, Clone)]
pub struct SimulationState {
    /// Canvas size (width, height)
    pub canvas: Vec2,
    pub puck: Puck,
    pub extra_pucks: Vec<ExtraPuck>,
    /// Player paddle
    pub left: Paddle,
    /// AI paddle
    pub right: Paddle,
    /// User-controlled speed (0.1-10.0)
    pub base_speed: f32,
    /// Effective speed this tick (base x power-up)
    pub speed_multiplier: f32,
    pub paused: bool,
    /// AI drives both paddles
    pub demo_mode: bool,
    pub lines: Vec<Line>,
    /// Line currently being drawn
    drawing: Option<u32>,
    pub power_ups: PowerUpManager,
    pub grid: LifeGrid,
    pub formulas: FormulaRegistry,
    /// Last collision time per line segment
    pub cooldowns: HashMap<SegmentKey, Duration>,
    pub score: Score,
    pub events: VecDeque<SimEvent>,
    /// Simulation clock; only advances while unpaused
    pub clock: Duration,
    /// Driver timestamp of the previous tick
    pub last_tick: Option<Duration>,
    pub seed: u64,
    pub rng: Pcg32,
    next_id: u32,
}

impl SimulationState {
    /// Create a new state with default settings and the given seed
    pub fn new(seed: u64) -> Self {
        let settings = Settings {
            seed: Some(seed),
            ..Settings::default()
        };
        Self::from_settings(&settings)
    }

    pub fn from_settings(settings: &Settings) -> Self {
        let mut settings = settings.clone();
        settings.validate();
        let seed = settings.seed.unwrap_or_else(rand::random);

        let mut grid = LifeGrid::new(settings.grid_rows, settings.grid_cols, settings.cell_size);
        grid.step_interval = Duration::from_millis(settings.grid_step_ms);
        grid.density = settings.grid_density;

        let mut power_ups = PowerUpManager::default();
        power_ups.spawn_interval = Duration::from_secs_f32(settings.power_up_interval_secs);

        let mut formulas = FormulaRegistry::default();
        formulas.interval = Duration::from_secs_f32(settings.formula_interval_secs);

        let canvas = Vec2::new(settings.canvas_width, settings.canvas_height);
        let mut state = Self {
            canvas,
            puck: Puck::new(canvas / 2.0, Vec2::new(PUCK_START_VX, PUCK_START_VY)),
            extra_pucks: Vec::new(),
            left: Paddle::new(Side::Left),
            right: Paddle::new(Side::Right),
            base_speed: settings.base_speed,
            speed_multiplier: settings.base_speed,
            paused: false,
            demo_mode: settings.demo_mode,
            lines: Vec::new(),
            drawing: None,
            power_ups,
            grid,
            formulas,
            cooldowns: HashMap::new(),
            score: Score::default(),
            events: VecDeque::new(),
            clock: Duration::ZERO,
            last_tick: None,
            seed,
            rng: Pcg32::seed_from_u64(seed),
            next_id: 1,
        };
        state.reset();
        state
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Shared paddle height (canvas height / 6)
    #[inline]
    pub fn paddle_height(&self) -> f32 {
        self.canvas.y / PADDLE_HEIGHT_DIVISOR
    }

    /// Center of the player paddle (magnet target)
    pub fn player_paddle_center(&self) -> Vec2 {
        self.left.center_point(self.canvas, self.paddle_height())
    }

    /// Put the puck, paddles, power-ups and automaton back to a fresh round.
    /// Drawn lines, scores and the base speed survive.
    pub fn reset(&mut self) {
        let height = self.paddle_height();
        let serve_x = if self.rng.random_bool(0.5) {
            PUCK_START_VX
        } else {
            -PUCK_START_VX
        };
        self.puck = Puck::new(self.canvas / 2.0, Vec2::new(serve_x, PUCK_START_VY));
        self.left.center(self.canvas.y, height);
        self.right.center(self.canvas.y, height);

        self.extra_pucks.clear();
        self.power_ups.clear(self.clock);
        self.cooldowns.clear();
        self.speed_multiplier = self.base_speed * self.power_ups.speed_multiplier();

        self.grid.randomize(&mut self.rng, self.clock);
        self.grid.reposition(&mut self.rng, self.canvas);

        log::info!(
            "Reset: grid at ({:.0}, {:.0}) with {} live cells",
            self.grid.origin.x,
            self.grid.origin.y,
            self.grid.live_count()
        );
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
        log::info!("{}", if self.paused { "Paused" } else { "Resumed" });
    }

    /// Set the user speed; callers validate the [0.1, 10.0] range
    pub fn set_base_speed(&mut self, value: f32) {
        self.base_speed = value;
        self.speed_multiplier = value * self.power_ups.speed_multiplier();
    }

    /// Remove every user-drawn line (the formula curve stays)
    pub fn clear_lines(&mut self) {
        self.lines.retain(|l| l.origin == LineOrigin::Formula);
        self.drawing = None;
        self.cooldowns.clear();
    }

    /// Begin a new drawn line, finishing any line still in progress
    pub fn start_line(&mut self, p: Vec2) {
        if self.drawing.is_some() {
            self.finish_line();
        }
        let id = self.next_entity_id();
        self.lines.push(Line::new(id, LineOrigin::Drawn, p));
        self.drawing = Some(id);
    }

    /// Extend the line being drawn; ignored when nothing is being drawn
    pub fn append_line_point(&mut self, p: Vec2) {
        if let Some(line) = self.drawing_line_mut() {
            line.push_point(p);
        }
    }

    /// Flatten the line being drawn and start its draw-in animation
    pub fn finish_line(&mut self) {
        if let Some(line) = self.drawing_line_mut() {
            line.finish(true);
            log::debug!(
                "Line {} finished: {} control points, {} samples",
                line.id,
                line.points.len(),
                line.geometry().len()
            );
        }
        self.drawing = None;
    }

    fn drawing_line_mut(&mut self) -> Option<&mut Line> {
        let id = self.drawing?;
        self.lines.iter_mut().find(|l| l.id == id)
    }

    /// Move the player paddle so its center sits at `center_y`
    pub fn move_player_paddle(&mut self, center_y: f32) {
        let height = self.paddle_height();
        self.left.y = center_y - height / 2.0;
        self.left.clamp(self.canvas.y, height);
    }

    /// Debug injection: drop a power-up at canvas center
    pub fn spawn_power_up(&mut self, kind: PowerUpKind) {
        let center = self.canvas / 2.0;
        self.power_ups.spawn_at(kind, center, self.clock);
    }

    /// Change canvas size. Re-clamps entities, moves the automaton and
    /// regenerates the formula curve without animation.
    pub fn resize(&mut self, width: f32, height: f32) {
        self.canvas = Vec2::new(width, height);
        let paddle_height = self.paddle_height();
        self.left.clamp(height, paddle_height);
        self.right.clamp(height, paddle_height);

        let bounds = self.canvas;
        let clamp_puck = |p: &mut Puck| {
            p.pos = p.pos.clamp(Vec2::ZERO, bounds);
        };
        clamp_puck(&mut self.puck);
        for extra in &mut self.extra_pucks {
            clamp_puck(&mut extra.puck);
        }

        self.grid.reposition(&mut self.rng, self.canvas);
        if let Some(kind) = self.formulas.active() {
            self.install_formula(kind, false);
        }
        log::info!("Resized to {width}x{height}");
    }

    /// Pick a new formula curve and install it with a draw-in animation
    pub fn rotate_formula(&mut self) {
        let kind = self.formulas.pick_next(&mut self.rng, self.clock);
        self.install_formula(kind, true);
    }

    fn install_formula(&mut self, kind: FormulaKind, animate: bool) {
        let id = self.next_entity_id();
        match formula::build_line(kind, self.canvas, id, animate) {
            Some(line) => {
                self.lines.retain(|l| l.origin != LineOrigin::Formula);
                self.lines.push(line);
                push_event(&mut self.events, SimEvent::FormulaChanged { kind });
                log::info!("Formula curve: {}", kind.name());
            }
            None => {
                log::warn!(
                    "Formula {} produced no curve for {}x{}; keeping previous",
                    kind.name(),
                    self.canvas.x,
                    self.canvas.y
                );
            }
        }
    }

    /// Take all pending events
    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.events).into()
    }

    /// Award a goal and start a new round
    pub fn goal(&mut self, scorer: Side) {
        match scorer {
            Side::Left => self.score.player += 1,
            Side::Right => self.score.ai += 1,
        }
        push_event(&mut self.events, SimEvent::Goal { scorer });
        log::info!(
            "Goal for {:?} - player {} : {} ai",
            scorer,
            self.score.player,
            self.score.ai
        );
        self.reset();
    }
}
