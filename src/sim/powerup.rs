//! Power-ups: spawning, pickup, timed effects
//!
//! Pickups appear on a soft timer at positions clear of the paddles and of
//! obstacle lines. Collecting one activates an effect; the set of active
//! effects folds into a speed multiplier plus ghost/shield flags.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::state::{ExtraPuck, Line, Puck, SimEvent, push_event};
use crate::consts::PADDLE_WIDTH;
use crate::error::CommandError;

pub const DEFAULT_SPAWN_INTERVAL: Duration = Duration::from_secs(10);
/// How long an uncollected power-up stays on the field
pub const POWER_UP_LIFETIME: Duration = Duration::from_secs(10);
pub const POWER_UP_RADIUS: f32 = 15.0;
pub const MAX_POWER_UPS_ON_FIELD: usize = 3;

/// Spawn placement
pub const SPAWN_MARGIN: f32 = 50.0;
pub const MIN_PADDLE_DISTANCE: f32 = 80.0;
pub const MIN_LINE_CLEARANCE: f32 = 40.0;
pub const MAX_SPAWN_ATTEMPTS: u32 = 20;

pub const SPEED_BOOST_MULTIPLIER: f32 = 1.5;
pub const MAGNET_RANGE: f32 = 200.0;
pub const MAGNET_STRENGTH: f32 = 0.3;

pub const MULTI_BALL_COUNT: usize = 2;
pub const MULTI_BALL_OFFSET: f32 = 20.0;
pub const MULTI_BALL_MIN_SPEED: f32 = 3.0;
pub const MULTI_BALL_MAX_SPEED: f32 = 6.0;
pub const EXTRA_PUCK_LIFETIME: Duration = Duration::from_secs(10);

/// Power-up types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PowerUpKind {
    SpeedBoost,
    MagnetBall,
    GhostMode,
    MultiBall,
    PaddleShield,
}

impl PowerUpKind {
    pub const ALL: [PowerUpKind; 5] = [
        PowerUpKind::SpeedBoost,
        PowerUpKind::MagnetBall,
        PowerUpKind::GhostMode,
        PowerUpKind::MultiBall,
        PowerUpKind::PaddleShield,
    ];

    /// Effect duration; zero means instant (no timer)
    pub fn duration(&self) -> Duration {
        match self {
            PowerUpKind::SpeedBoost => Duration::from_secs(5),
            PowerUpKind::MagnetBall => Duration::from_secs(8),
            PowerUpKind::GhostMode => Duration::from_secs(5),
            PowerUpKind::MultiBall => Duration::ZERO,
            PowerUpKind::PaddleShield => Duration::from_secs(10),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PowerUpKind::SpeedBoost => "SPEED_BOOST",
            PowerUpKind::MagnetBall => "MAGNET_BALL",
            PowerUpKind::GhostMode => "GHOST_MODE",
            PowerUpKind::MultiBall => "MULTI_BALL",
            PowerUpKind::PaddleShield => "PADDLE_SHIELD",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            PowerUpKind::SpeedBoost => "Puck moves 50% faster",
            PowerUpKind::MagnetBall => "Puck is drawn toward your paddle",
            PowerUpKind::GhostMode => "Puck passes through drawn lines",
            PowerUpKind::MultiBall => "Spawns extra pucks",
            PowerUpKind::PaddleShield => "Shields your paddle",
        }
    }

    pub fn glyph(&self) -> &'static str {
        match self {
            PowerUpKind::SpeedBoost => "⚡",
            PowerUpKind::MagnetBall => "🧲",
            PowerUpKind::GhostMode => "👻",
            PowerUpKind::MultiBall => "⚪",
            PowerUpKind::PaddleShield => "🛡",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            PowerUpKind::SpeedBoost => "#ffeb3b",
            PowerUpKind::MagnetBall => "#f44336",
            PowerUpKind::GhostMode => "#b0bec5",
            PowerUpKind::MultiBall => "#4caf50",
            PowerUpKind::PaddleShield => "#2196f3",
        }
    }
}

impl fmt::Display for PowerUpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PowerUpKind {
    type Err = CommandError;

    /// Case-insensitive; `_`, `-` and spaces are ignored
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match key.as_str() {
            "speedboost" | "speed" => Ok(PowerUpKind::SpeedBoost),
            "magnetball" | "magnet" => Ok(PowerUpKind::MagnetBall),
            "ghostmode" | "ghost" => Ok(PowerUpKind::GhostMode),
            "multiball" | "multi" => Ok(PowerUpKind::MultiBall),
            "paddleshield" | "shield" => Ok(PowerUpKind::PaddleShield),
            _ => Err(CommandError::UnknownPowerUp(s.to_string())),
        }
    }
}

/// A pickup on the field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerUp {
    pub kind: PowerUpKind,
    pub pos: Vec2,
    pub spawned_at: Duration,
    pub lifetime: Duration,
}

impl PowerUp {
    pub fn expired(&self, now: Duration) -> bool {
        now.saturating_sub(self.spawned_at) >= self.lifetime
    }

    /// Whether a puck is close enough to collect this
    pub fn touches(&self, puck: &Puck) -> bool {
        puck.pos.distance(self.pos) <= POWER_UP_RADIUS + puck.radius
    }
}

/// An effect currently applied
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveEffect {
    pub kind: PowerUpKind,
    pub activated_at: Duration,
    /// Zero = cleared explicitly, never by the timer
    pub duration: Duration,
}

impl ActiveEffect {
    pub fn expired(&self, now: Duration) -> bool {
        !self.duration.is_zero() && now.saturating_sub(self.activated_at) > self.duration
    }

    pub fn remaining(&self, now: Duration) -> Duration {
        self.duration
            .saturating_sub(now.saturating_sub(self.activated_at))
    }
}

/// What the power-up update needs from the rest of the simulation
pub struct Field<'a> {
    pub canvas: Vec2,
    pub puck: &'a mut Puck,
    pub extra_pucks: &'a mut Vec<ExtraPuck>,
    pub lines: &'a [Line],
    pub events: &'a mut VecDeque<SimEvent>,
}

/// Owns pickups on the field and the active effect set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerUpManager {
    pub power_ups: Vec<PowerUp>,
    pub effects: Vec<ActiveEffect>,
    pub spawn_interval: Duration,
    last_spawn: Duration,
    ghost_mode: bool,
    paddle_shield: bool,
}

impl Default for PowerUpManager {
    fn default() -> Self {
        Self {
            power_ups: Vec::new(),
            effects: Vec::new(),
            spawn_interval: DEFAULT_SPAWN_INTERVAL,
            last_spawn: Duration::ZERO,
            ghost_mode: false,
            paddle_shield: false,
        }
    }
}

impl PowerUpManager {
    /// Drop everything and restart the spawn timer
    pub fn clear(&mut self, now: Duration) {
        self.power_ups.clear();
        self.effects.clear();
        self.ghost_mode = false;
        self.paddle_shield = false;
        self.last_spawn = now;
    }

    /// 1.5 while any speed boost is active, otherwise 1.0
    pub fn speed_multiplier(&self) -> f32 {
        if self.is_active(PowerUpKind::SpeedBoost) {
            SPEED_BOOST_MULTIPLIER
        } else {
            1.0
        }
    }

    pub fn ghost_mode(&self) -> bool {
        self.ghost_mode
    }

    pub fn paddle_shield(&self) -> bool {
        self.paddle_shield
    }

    pub fn is_active(&self, kind: PowerUpKind) -> bool {
        self.effects.iter().any(|e| e.kind == kind)
    }

    /// Place a specific power-up (debug injection)
    pub fn spawn_at(&mut self, kind: PowerUpKind, pos: Vec2, now: Duration) {
        log::debug!("Power-up {kind} spawned at ({:.0}, {:.0})", pos.x, pos.y);
        self.power_ups.push(PowerUp {
            kind,
            pos,
            spawned_at: now,
            lifetime: POWER_UP_LIFETIME,
        });
    }

    /// One tick of the subsystem: expire, spawn, apply magnet, collect
    pub fn update(&mut self, now: Duration, field: Field<'_>, magnet_center: Vec2, rng: &mut impl Rng) {
        self.expire(now, field.extra_pucks, field.events);
        self.maybe_spawn(now, field.canvas, field.lines, rng);
        if self.is_active(PowerUpKind::MagnetBall) {
            apply_magnet(field.puck, magnet_center);
            for extra in field.extra_pucks.iter_mut() {
                apply_magnet(&mut extra.puck, magnet_center);
            }
        }
        self.collect(now, field.puck, field.extra_pucks, field.events, rng);
    }

    /// Remove stale pickups and finished effects
    pub fn expire(&mut self, now: Duration, extra_pucks: &[ExtraPuck], events: &mut VecDeque<SimEvent>) {
        self.power_ups.retain(|p| !p.expired(now));

        let mut expired = Vec::new();
        self.effects.retain(|e| {
            let multi_ball_done = e.kind == PowerUpKind::MultiBall && extra_pucks.is_empty();
            if e.expired(now) || multi_ball_done {
                expired.push(e.kind);
                false
            } else {
                true
            }
        });
        for kind in expired {
            self.deactivate(kind);
            push_event(events, SimEvent::EffectExpired { kind });
        }
    }

    /// Spawn one random power-up if the timer has run out
    pub fn maybe_spawn(&mut self, now: Duration, canvas: Vec2, lines: &[Line], rng: &mut impl Rng) {
        if now.saturating_sub(self.last_spawn) < self.spawn_interval {
            return;
        }
        self.last_spawn = now;
        if self.power_ups.len() >= MAX_POWER_UPS_ON_FIELD {
            return;
        }
        let kind = PowerUpKind::ALL[rng.random_range(0..PowerUpKind::ALL.len())];
        let pos = safe_spawn_position(rng, canvas, lines);
        self.spawn_at(kind, pos, now);
    }

    /// Let every puck pick up anything it touches
    pub fn collect(
        &mut self,
        now: Duration,
        puck: &Puck,
        extra_pucks: &mut Vec<ExtraPuck>,
        events: &mut VecDeque<SimEvent>,
        rng: &mut impl Rng,
    ) {
        let mut collected = Vec::new();
        self.power_ups.retain(|p| {
            let hit = p.touches(puck) || extra_pucks.iter().any(|e| p.touches(&e.puck));
            if hit {
                collected.push(p.kind);
            }
            !hit
        });
        for kind in collected {
            self.activate(kind, now, puck, extra_pucks, rng);
            push_event(events, SimEvent::PowerUpCollected { kind });
        }
    }

    /// Apply a collected power-up
    pub fn activate(
        &mut self,
        kind: PowerUpKind,
        now: Duration,
        puck: &Puck,
        extra_pucks: &mut Vec<ExtraPuck>,
        rng: &mut impl Rng,
    ) {
        log::info!("Power-up activated: {kind}");
        match kind {
            PowerUpKind::MultiBall => {
                spawn_multi_ball(puck, now, extra_pucks, rng);
                // Keep a single marker entry while extra pucks are alive
                if !self.is_active(kind) {
                    self.effects.push(ActiveEffect {
                        kind,
                        activated_at: now,
                        duration: Duration::ZERO,
                    });
                }
            }
            _ => {
                self.effects.push(ActiveEffect {
                    kind,
                    activated_at: now,
                    duration: kind.duration(),
                });
            }
        }
        self.refresh_flags();
    }

    fn deactivate(&mut self, kind: PowerUpKind) {
        log::debug!("Effect expired: {kind}");
        self.refresh_flags();
    }

    /// Flags reflect whatever effects remain, so overlapping pickups of
    /// one kind keep the mode on until the last one ends.
    fn refresh_flags(&mut self) {
        self.ghost_mode = self.is_active(PowerUpKind::GhostMode);
        self.paddle_shield = self.is_active(PowerUpKind::PaddleShield);
    }
}

/// Nudge a puck toward the magnet center if it is in range
pub fn apply_magnet(puck: &mut Puck, center: Vec2) {
    let to_center = center - puck.pos;
    let dist = to_center.length();
    if dist <= f32::EPSILON || dist > MAGNET_RANGE {
        return;
    }
    puck.vel += to_center / dist * MAGNET_STRENGTH;
}

fn spawn_multi_ball(puck: &Puck, now: Duration, extra_pucks: &mut Vec<ExtraPuck>, rng: &mut impl Rng) {
    for _ in 0..MULTI_BALL_COUNT {
        let offset = Vec2::new(
            rng.random_range(-MULTI_BALL_OFFSET..=MULTI_BALL_OFFSET),
            rng.random_range(-MULTI_BALL_OFFSET..=MULTI_BALL_OFFSET),
        );
        let angle = rng.random_range(0.0..std::f32::consts::TAU);
        let speed = rng.random_range(MULTI_BALL_MIN_SPEED..=MULTI_BALL_MAX_SPEED);
        extra_pucks.push(ExtraPuck {
            puck: Puck::new(puck.pos + offset, Vec2::from_angle(angle) * speed),
            created_at: now,
            lifetime: EXTRA_PUCK_LIFETIME,
        });
    }
}

/// Rejection-sample a point away from both paddle columns and all lines.
/// Falls back to the last sample when every attempt is rejected.
pub fn safe_spawn_position(rng: &mut impl Rng, canvas: Vec2, lines: &[Line]) -> Vec2 {
    let mut last = canvas / 2.0;
    for _ in 0..MAX_SPAWN_ATTEMPTS {
        let candidate = Vec2::new(
            sample_axis(rng, canvas.x, SPAWN_MARGIN),
            sample_axis(rng, canvas.y, SPAWN_MARGIN),
        );
        last = candidate;
        if is_clear_of_paddles(candidate, canvas) && is_clear_of_lines(candidate, lines) {
            return candidate;
        }
    }
    log::debug!("No clear spawn spot after {MAX_SPAWN_ATTEMPTS} attempts");
    last
}

fn sample_axis(rng: &mut impl Rng, extent: f32, margin: f32) -> f32 {
    let lo = margin.min(extent / 2.0);
    let hi = extent - lo;
    if hi > lo {
        rng.random_range(lo..hi)
    } else {
        (extent / 2.0).max(0.0)
    }
}

fn is_clear_of_paddles(p: Vec2, canvas: Vec2) -> bool {
    p.x - PADDLE_WIDTH >= MIN_PADDLE_DISTANCE && (canvas.x - PADDLE_WIDTH) - p.x >= MIN_PADDLE_DISTANCE
}

fn is_clear_of_lines(p: Vec2, lines: &[Line]) -> bool {
    lines
        .iter()
        .flat_map(|l| l.geometry())
        .all(|q| q.distance(p) >= MIN_LINE_CLEARANCE)
}
