//! Formula curves
//!
//! A rotating set of parametric curves installed as a single obstacle line
//! in the middle of the table. Curves are generated from the current canvas
//! size so a resize can rebuild the active one in place.

use std::f32::consts::{PI, TAU};
use std::time::Duration;

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::state::{Line, LineOrigin};

pub const DEFAULT_FORMULA_INTERVAL: Duration = Duration::from_secs(20);
/// Control points sampled per generator
pub const FORMULA_SAMPLES: usize = 24;

/// Available curve generators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FormulaKind {
    Arc,
    Parabola,
    SineWave,
    Spiral,
    Cubic,
}

impl FormulaKind {
    pub const ALL: [FormulaKind; 5] = [
        FormulaKind::Arc,
        FormulaKind::Parabola,
        FormulaKind::SineWave,
        FormulaKind::Spiral,
        FormulaKind::Cubic,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            FormulaKind::Arc => "arc",
            FormulaKind::Parabola => "parabola",
            FormulaKind::SineWave => "sine wave",
            FormulaKind::Spiral => "spiral",
            FormulaKind::Cubic => "cubic",
        }
    }

    /// Control points for this curve on a canvas of the given size.
    /// Empty when the canvas is degenerate.
    pub fn control_points(&self, canvas: Vec2) -> Vec<Vec2> {
        if !canvas.is_finite() || canvas.x <= 0.0 || canvas.y <= 0.0 {
            return Vec::new();
        }
        let center = canvas / 2.0;
        // Curves stay in the middle half horizontally, clear of the paddles
        let half_w = canvas.x * 0.25;
        let half_h = canvas.y * 0.3;

        let n = FORMULA_SAMPLES;
        let lerp = |i: usize| i as f32 / (n - 1) as f32;

        (0..n)
            .map(|i| {
                let t = lerp(i);
                let local = match self {
                    FormulaKind::Arc => {
                        // Open toward the player so the puck can escape
                        let radius = half_w.min(half_h) * 0.8;
                        let theta = -2.0 * PI / 3.0 + t * (4.0 * PI / 3.0);
                        Vec2::from_angle(theta) * radius
                    }
                    FormulaKind::Parabola => {
                        let x = (t * 2.0 - 1.0) * half_w;
                        let u = x / half_w;
                        Vec2::new(x, half_h * 0.8 * (2.0 * u * u - 1.0))
                    }
                    FormulaKind::SineWave => {
                        let x = (t * 2.0 - 1.0) * half_w;
                        Vec2::new(x, half_h * 0.5 * (t * 2.0 * TAU).sin())
                    }
                    FormulaKind::Spiral => {
                        let max_r = half_w.min(half_h);
                        let theta = t * 2.0 * TAU;
                        Vec2::from_angle(theta) * (max_r * (0.2 + 0.8 * t))
                    }
                    FormulaKind::Cubic => {
                        let x = (t * 2.0 - 1.0) * half_w;
                        let u = x / half_w;
                        Vec2::new(x, half_h * u * u * u)
                    }
                };
                center + local
            })
            .collect()
    }
}

/// Build the obstacle line for a formula, or None if it is degenerate
pub fn build_line(kind: FormulaKind, canvas: Vec2, id: u32, animate: bool) -> Option<Line> {
    let points = kind.control_points(canvas);
    if points.len() < 2 {
        return None;
    }
    let mut line = Line::new(id, LineOrigin::Formula, points[0]);
    for &p in &points[1..] {
        line.push_point(p);
    }
    line.finish(animate);
    Some(line)
}

/// Picks which formula curve is on the table and when to change it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormulaRegistry {
    active: Option<FormulaKind>,
    last_switch: Option<Duration>,
    pub interval: Duration,
}

impl Default for FormulaRegistry {
    fn default() -> Self {
        Self {
            active: None,
            last_switch: None,
            interval: DEFAULT_FORMULA_INTERVAL,
        }
    }
}

impl FormulaRegistry {
    pub fn active(&self) -> Option<FormulaKind> {
        self.active
    }

    /// Due immediately on the first tick, then once per interval
    pub fn is_due(&self, now: Duration) -> bool {
        match self.last_switch {
            None => true,
            Some(t) => now.saturating_sub(t) >= self.interval,
        }
    }

    /// Choose a random formula different from the current one
    pub fn pick_next(&mut self, rng: &mut impl Rng, now: Duration) -> FormulaKind {
        let choices: Vec<FormulaKind> = FormulaKind::ALL
            .into_iter()
            .filter(|k| Some(*k) != self.active)
            .collect();
        let kind = choices[rng.random_range(0..choices.len())];
        self.active = Some(kind);
        self.last_switch = Some(now);
        kind
    }
}
