//! Collision detection and response
//!
//! Four obstacle classes: canvas walls, paddles, obstacle polylines and
//! automaton blocks. Each resolver works on a single puck so the same code
//! serves the primary puck and multi-ball pucks with different gains.

use std::collections::HashMap;
use std::time::Duration;

use glam::Vec2;
use rand::Rng;

use super::automaton::LifeGrid;
use super::state::{Line, Paddle, Puck, SegmentKey, Side};
use crate::consts::*;
use crate::reflect;

/// Result of a contact check
#[derive(Debug, Clone)]
pub struct CollisionResult {
    /// Whether a collision occurred
    pub hit: bool,
    /// Closest point on the obstacle
    pub point: Vec2,
    /// Unit normal pointing from the obstacle toward the puck center
    pub normal: Vec2,
    /// Overlap depth (for position correction)
    pub penetration: f32,
}

impl CollisionResult {
    pub fn miss() -> Self {
        Self {
            hit: false,
            point: Vec2::ZERO,
            normal: Vec2::ZERO,
            penetration: 0.0,
        }
    }
}

/// Outcome of the wall check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WallHit {
    None,
    /// Bounced off top or bottom
    Bounce,
    /// Left the canvas past a paddle; the side names who scores
    Goal(Side),
}

/// Bounce off the top/bottom walls; report a goal when the puck center
/// leaves the canvas horizontally.
pub fn resolve_wall_collision(puck: &mut Puck, canvas: Vec2, restitution: f32) -> WallHit {
    if puck.pos.x < 0.0 {
        return WallHit::Goal(Side::Right);
    }
    if puck.pos.x > canvas.x {
        return WallHit::Goal(Side::Left);
    }

    let r = puck.radius;
    if puck.pos.y - r < 0.0 {
        puck.pos.y = r;
        puck.vel.y = puck.vel.y.abs() * restitution;
        WallHit::Bounce
    } else if puck.pos.y + r > canvas.y {
        puck.pos.y = canvas.y - r;
        puck.vel.y = -puck.vel.y.abs() * restitution;
        WallHit::Bounce
    } else {
        WallHit::None
    }
}

/// Bounce off a paddle face. The horizontal speed is amplified and forced
/// outward; the vertical speed comes from where on the paddle it hit.
pub fn resolve_paddle_collision(
    puck: &mut Puck,
    paddle: &Paddle,
    paddle_height: f32,
    canvas_width: f32,
    restitution: f32,
) -> bool {
    if paddle_height <= 0.0 {
        return false;
    }
    let r = puck.radius;
    let overlaps_span = puck.pos.y + r >= paddle.y && puck.pos.y - r <= paddle.y + paddle_height;
    if !overlaps_span {
        return false;
    }

    let face = paddle.face_x(canvas_width);
    let (in_reach, approaching, outward) = match paddle.side {
        Side::Left => (puck.pos.x <= face + r, puck.vel.x < 0.0, 1.0),
        Side::Right => (puck.pos.x >= face - r, puck.vel.x > 0.0, -1.0),
    };
    if !in_reach || !approaching {
        return false;
    }

    let relative = ((puck.pos.y - paddle.y) / paddle_height).clamp(0.0, 1.0);
    puck.vel.x = outward * puck.vel.x.abs() * restitution;
    puck.vel.y = -PADDLE_ANGLE_RANGE + relative * 2.0 * PADDLE_ANGLE_RANGE;
    puck.pos.x = face + outward * r;
    true
}

/// Catch a puck that crossed a paddle's contact line during this step.
///
/// A fast puck can start in front of the paddle and end behind it, or even
/// past the goal line. When the path from `prev` crosses the contact line
/// inside the paddle's span the puck is placed back at the crossing point,
/// leaving the bounce itself to [`resolve_paddle_collision`].
pub fn sweep_paddle_face(
    puck: &mut Puck,
    prev: Vec2,
    paddle: &Paddle,
    paddle_height: f32,
    canvas_width: f32,
) -> bool {
    if paddle_height <= 0.0 {
        return false;
    }
    let r = puck.radius;
    let face = paddle.face_x(canvas_width);
    let (contact_x, crossed) = match paddle.side {
        Side::Left => (face + r, prev.x > face + r && puck.pos.x < face + r),
        Side::Right => (face - r, prev.x < face - r && puck.pos.x > face - r),
    };
    if !crossed {
        return false;
    }

    let t = (contact_x - prev.x) / (puck.pos.x - prev.x);
    let y = prev.y + (puck.pos.y - prev.y) * t;
    if y + r < paddle.y || y - r > paddle.y + paddle_height {
        return false;
    }
    puck.pos = Vec2::new(contact_x, y);
    true
}

/// Closest point on segment ab to p. None for a zero-length segment.
pub fn closest_point_on_segment(p: Vec2, a: Vec2, b: Vec2) -> Option<Vec2> {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq < 1e-8 {
        return None;
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    Some(a + ab * t)
}

/// Check a puck against one thick segment
pub fn puck_segment_collision(pos: Vec2, radius: f32, a: Vec2, b: Vec2, half_width: f32) -> CollisionResult {
    let Some(closest) = closest_point_on_segment(pos, a, b) else {
        return CollisionResult::miss();
    };
    let offset = pos - closest;
    let dist = offset.length();
    let reach = radius + half_width;
    if dist >= reach {
        return CollisionResult::miss();
    }

    let normal = if dist > 1e-6 {
        offset / dist
    } else {
        // Center exactly on the segment: use its perpendicular
        let seg = (b - a).normalize_or_zero();
        Vec2::new(-seg.y, seg.x)
    };
    if normal == Vec2::ZERO {
        return CollisionResult::miss();
    }

    CollisionResult {
        hit: true,
        point: closest,
        normal,
        penetration: reach - dist,
    }
}

/// Reflect off the first obstacle segment the puck touches that is not
/// cooling down. At most one reflection per call.
pub fn resolve_line_collision(
    puck: &mut Puck,
    lines: &[Line],
    cooldowns: &mut HashMap<SegmentKey, Duration>,
    now: Duration,
    restitution: f32,
) -> bool {
    for line in lines {
        let half_width = line.width / 2.0;
        for (index, a, b) in line.segments() {
            let key = (line.id, index);
            if let Some(&last) = cooldowns.get(&key) {
                if now.saturating_sub(last) < LINE_COOLDOWN {
                    continue;
                }
            }

            let result = puck_segment_collision(puck.pos, puck.radius, a, b, half_width);
            if !result.hit {
                continue;
            }

            // Only reflect when heading into the line
            if puck.vel.dot(result.normal) < 0.0 {
                puck.vel = reflect(puck.vel, result.normal) * restitution;
            }
            puck.pos += result.normal * LINE_NUDGE;
            cooldowns.insert(key, now);
            return true;
        }
    }
    false
}

/// Forget cooldowns older than twice the window
pub fn prune_cooldowns(cooldowns: &mut HashMap<SegmentKey, Duration>, now: Duration) {
    cooldowns.retain(|_, &mut last| now.saturating_sub(last) <= LINE_COOLDOWN * 2);
}

/// Circle vs axis-aligned square of side `size` centered on `center`
/// (closest point test). The normal points from the cell center to the
/// puck center.
pub fn puck_cell_collision(pos: Vec2, radius: f32, center: Vec2, size: f32) -> CollisionResult {
    let half = Vec2::splat(size * 0.5);
    let closest = pos.clamp(center - half, center + half);
    let dist = (pos - closest).length();
    if dist >= radius {
        return CollisionResult::miss();
    }
    let normal = (pos - center).normalize_or_zero();
    if normal == Vec2::ZERO {
        return CollisionResult::miss();
    }
    CollisionResult {
        hit: true,
        point: closest,
        normal,
        penetration: radius - dist,
    }
}

/// Bounce off the first live cell the puck overlaps and destroy it.
/// Returns the (row, col) of the destroyed cell.
pub fn resolve_block_collision(
    puck: &mut Puck,
    grid: &mut LifeGrid,
    rng: &mut impl Rng,
) -> Option<(usize, usize)> {
    let reach = Vec2::splat(puck.radius);
    let ((r0, r1), (c0, c1)) = grid.cells_overlapping(puck.pos - reach, puck.pos + reach)?;

    for row in r0..=r1 {
        for col in c0..=c1 {
            if !grid.get(row, col) {
                continue;
            }
            let center = grid.cell_center(row, col);
            let result = puck_cell_collision(puck.pos, puck.radius, center, grid.cell_size);
            if !result.hit {
                continue;
            }

            let jitter = Vec2::new(
                rng.random_range(-BLOCK_PERTURBATION..=BLOCK_PERTURBATION),
                rng.random_range(-BLOCK_PERTURBATION..=BLOCK_PERTURBATION),
            );
            puck.vel = reflect(puck.vel, result.normal) + jitter;
            puck.pos += result.normal * (result.penetration + BLOCK_NUDGE);
            grid.kill(row, col);
            return Some((row, col));
        }
    }
    None
}

/// Clamp speed to `max`, preserving direction
#[inline]
pub fn cap_speed(vel: Vec2, max: f32) -> Vec2 {
    let speed = vel.length();
    if speed > max && speed > 0.0 {
        vel * (max / speed)
    } else {
        vel
    }
}
