//! Fixed timestep simulation tick
//!
//! Advances the whole table by one step: AI, motion, collisions, power-ups,
//! formula rotation, automaton, animations and speed caps, in that order.

use std::time::Duration;

use glam::Vec2;

use super::collision::{
    WallHit, cap_speed, prune_cooldowns, resolve_block_collision, resolve_line_collision,
    resolve_paddle_collision, resolve_wall_collision, sweep_paddle_face,
};
use super::powerup::Field;
use super::state::{Paddle, Puck, SimEvent, SimulationState, Side, push_event};
use crate::consts::*;

/// Advance the simulation to driver time `now`.
///
/// Time spent paused is skipped: the simulation clock only advances while
/// unpaused, so effect timers and the automaton freeze with the puck.
pub fn tick(state: &mut SimulationState, now: Duration) {
    let elapsed = state
        .last_tick
        .map_or(Duration::ZERO, |last| now.saturating_sub(last));
    state.last_tick = Some(now);
    if state.paused {
        return;
    }
    state.clock += elapsed;
    let clock = state.clock;
    let canvas = state.canvas;
    let paddle_height = state.paddle_height();

    // Power-up factor from the previous tick
    let multiplier = state.base_speed * state.power_ups.speed_multiplier();
    state.speed_multiplier = multiplier;

    update_ai_paddle(&mut state.right, &state.puck, canvas, paddle_height, multiplier);
    if state.demo_mode {
        update_ai_paddle(&mut state.left, &state.puck, canvas, paddle_height, multiplier);
    }

    let prev = state.puck.pos;
    let extra_prev: Vec<Vec2> = state.extra_pucks.iter().map(|e| e.puck.pos).collect();
    state.puck.advance(multiplier);
    for extra in &mut state.extra_pucks {
        extra.puck.advance(multiplier * EXTRA_PUCK_SPEED_SCALE);
    }

    // Primary puck. A paddle crossed this step takes priority over the goal.
    for paddle in [&state.left, &state.right] {
        if sweep_paddle_face(&mut state.puck, prev, paddle, paddle_height, canvas.x) {
            break;
        }
    }
    if let WallHit::Goal(scorer) = resolve_wall_collision(&mut state.puck, canvas, WALL_RESTITUTION) {
        state.goal(scorer);
        return;
    }
    for paddle in [&state.left, &state.right] {
        if resolve_paddle_collision(&mut state.puck, paddle, paddle_height, canvas.x, PADDLE_RESTITUTION) {
            break;
        }
    }
    let ghost = state.power_ups.ghost_mode();
    if !ghost {
        resolve_line_collision(
            &mut state.puck,
            &state.lines,
            &mut state.cooldowns,
            clock,
            LINE_RESTITUTION,
        );
    }

    // Multi-ball pucks: same obstacles, softer gains, no scoring
    let mut extra_prev = extra_prev.into_iter();
    state.extra_pucks.retain_mut(|extra| {
        let prev = extra_prev.next().unwrap_or(extra.puck.pos);
        if extra.expired(clock) {
            return false;
        }
        let puck = &mut extra.puck;
        for paddle in [&state.left, &state.right] {
            if sweep_paddle_face(puck, prev, paddle, paddle_height, canvas.x) {
                break;
            }
        }
        if let WallHit::Goal(_) = resolve_wall_collision(puck, canvas, EXTRA_WALL_RESTITUTION) {
            return false;
        }
        for paddle in [&state.left, &state.right] {
            if resolve_paddle_collision(puck, paddle, paddle_height, canvas.x, EXTRA_PADDLE_RESTITUTION) {
                break;
            }
        }
        if !ghost {
            resolve_line_collision(puck, &state.lines, &mut state.cooldowns, clock, EXTRA_LINE_RESTITUTION);
        }
        true
    });

    let magnet_center = state.player_paddle_center();
    state.power_ups.update(
        clock,
        Field {
            canvas,
            puck: &mut state.puck,
            extra_pucks: &mut state.extra_pucks,
            lines: &state.lines,
            events: &mut state.events,
        },
        magnet_center,
        &mut state.rng,
    );
    state.speed_multiplier = state.base_speed * state.power_ups.speed_multiplier();

    if state.formulas.is_due(clock) {
        state.rotate_formula();
    }

    state.grid.step_if_due(clock);
    if let Some((row, col)) = resolve_block_collision(&mut state.puck, &mut state.grid, &mut state.rng) {
        log::debug!("Block ({row}, {col}) destroyed");
        push_event(&mut state.events, SimEvent::BlockDestroyed { row, col });
    }
    for extra in &mut state.extra_pucks {
        if let Some((row, col)) = resolve_block_collision(&mut extra.puck, &mut state.grid, &mut state.rng) {
            log::debug!("Block ({row}, {col}) destroyed by extra puck");
            push_event(&mut state.events, SimEvent::BlockDestroyed { row, col });
        }
    }

    for line in &mut state.lines {
        line.advance_animation();
    }
    prune_cooldowns(&mut state.cooldowns, clock);

    state.puck.vel = cap_speed(state.puck.vel, MAX_PUCK_SPEED);
    for extra in &mut state.extra_pucks {
        extra.puck.vel = cap_speed(extra.puck.vel, MAX_PUCK_SPEED);
    }

    debug_assert!(state.puck.is_finite(), "puck state went non-finite");
    debug_assert!(state.extra_pucks.iter().all(|e| e.puck.is_finite()));
}

/// Steer a paddle toward where the puck will cross its face.
///
/// While the puck heads toward the paddle the crossing point is projected
/// along the current velocity and mirrored off the top and bottom walls;
/// otherwise the paddle just tracks the puck's height.
pub fn update_ai_paddle(paddle: &mut Paddle, puck: &Puck, canvas: Vec2, height: f32, multiplier: f32) {
    let face = paddle.face_x(canvas.x);
    let approaching = match paddle.side {
        Side::Left => puck.vel.x < 0.0,
        Side::Right => puck.vel.x > 0.0,
    };

    let predicted_y = if approaching {
        let t = (face - puck.pos.x) / puck.vel.x;
        let raw = puck.pos.y + puck.vel.y * t.max(0.0);
        fold_into(raw, puck.radius, canvas.y - puck.radius)
    } else {
        puck.pos.y
    };

    let target = predicted_y - height / 2.0;
    paddle.move_toward(target, AI_PADDLE_SPEED * multiplier, canvas.y, height);
}

/// Mirror `value` back into [lo, hi] as if it bounced off both ends
pub fn fold_into(value: f32, lo: f32, hi: f32) -> f32 {
    let span = hi - lo;
    if span <= 0.0 || !value.is_finite() {
        return (lo + hi) / 2.0;
    }
    let period = 2.0 * span;
    let m = (value - lo).rem_euclid(period);
    lo + if m > span { period - m } else { m }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::powerup::PowerUpKind;
    use crate::sim::state::{ExtraPuck, Line, LineOrigin, Score};
    use proptest::prelude::*;

    const STEP: Duration = TICK_INTERVAL;

    /// A state with no grid, no lines and no timers due for an hour
    fn quiet_state(seed: u64) -> SimulationState {
        let mut state = SimulationState::new(seed);
        state.formulas.interval = Duration::from_secs(3600);
        state.power_ups.spawn_interval = Duration::from_secs(3600);
        tick(&mut state, Duration::ZERO);
        state.lines.clear();
        state.grid.clear();
        state.events.clear();
        state.puck = Puck::new(Vec2::new(400.0, 300.0), Vec2::new(1.0, 0.0));
        state
    }

    fn activate(state: &mut SimulationState, kind: PowerUpKind) {
        state
            .power_ups
            .activate(kind, state.clock, &state.puck, &mut state.extra_pucks, &mut state.rng);
    }

    #[test]
    fn test_position_update_without_collision() {
        let mut state = SimulationState::new(1);
        state.grid.clear();
        state.puck = Puck::new(Vec2::new(400.0, 300.0), Vec2::new(80.0, 80.0));

        tick(&mut state, Duration::ZERO);

        assert_eq!(state.puck.pos, Vec2::new(480.0, 380.0));
        // Over-ceiling velocity is capped after the move
        assert!((state.puck.vel.length() - MAX_PUCK_SPEED).abs() < 1e-4);
    }

    #[test]
    fn test_first_tick_installs_formula() {
        let mut state = SimulationState::new(4);
        tick(&mut state, Duration::ZERO);
        assert!(state.formulas.active().is_some());
        assert_eq!(
            state.lines.iter().filter(|l| l.origin == LineOrigin::Formula).count(),
            1
        );
        assert!(
            state
                .drain_events()
                .iter()
                .any(|e| matches!(e, SimEvent::FormulaChanged { .. }))
        );
    }

    #[test]
    fn test_pause_freezes_clock_and_puck() {
        let mut state = quiet_state(2);
        tick(&mut state, STEP);
        let clock = state.clock;
        let pos = state.puck.pos;

        state.toggle_pause();
        tick(&mut state, Duration::from_secs(1));
        tick(&mut state, Duration::from_secs(2));
        assert_eq!(state.clock, clock);
        assert_eq!(state.puck.pos, pos);

        // No time jump after resuming
        state.toggle_pause();
        tick(&mut state, Duration::from_secs(2) + STEP);
        assert_eq!(state.clock, clock + STEP);
        assert_ne!(state.puck.pos, pos);
    }

    #[test]
    fn test_speed_boost_scales_motion() {
        let mut state = quiet_state(3);
        state.puck.vel = Vec2::new(4.0, 0.0);
        activate(&mut state, PowerUpKind::SpeedBoost);

        tick(&mut state, STEP);
        assert_eq!(state.puck.pos, Vec2::new(406.0, 300.0));
        assert_eq!(state.speed_multiplier, 1.5);

        // Five seconds later the boost is gone
        tick(&mut state, STEP + Duration::from_millis(5100));
        assert_eq!(state.speed_multiplier, 1.0);
        assert!(!state.power_ups.is_active(PowerUpKind::SpeedBoost));
    }

    #[test]
    fn test_base_speed_scales_motion() {
        let mut state = quiet_state(3);
        state.puck.vel = Vec2::new(2.0, 1.0);
        state.set_base_speed(2.5);
        tick(&mut state, STEP);
        assert_eq!(state.puck.pos, Vec2::new(405.0, 302.5));
        assert_eq!(state.speed_multiplier, 2.5);
    }

    #[test]
    fn test_goal_scores_and_skips_tick() {
        let mut state = quiet_state(5);
        state.left.y = 0.0;
        state.puck = Puck::new(Vec2::new(5.0, 300.0), Vec2::new(-10.0, 0.0));

        tick(&mut state, STEP);

        assert_eq!(state.score, Score { player: 0, ai: 1 });
        assert_eq!(state.puck.pos, Vec2::new(400.0, 300.0));
        assert!(state.events.contains(&SimEvent::Goal { scorer: Side::Right }));
    }

    #[test]
    fn test_player_paddle_returns_puck() {
        let mut state = quiet_state(6);
        state.move_player_paddle(300.0);
        state.puck = Puck::new(Vec2::new(25.0, 300.0), Vec2::new(-6.0, 0.0));

        tick(&mut state, STEP);

        assert!(state.puck.vel.x > 0.0);
        assert!((state.puck.vel.x - 7.8).abs() < 1e-4);
        assert_eq!(state.score, Score::default());
    }

    #[test]
    fn test_boosted_puck_cannot_skip_paddle() {
        let mut state = quiet_state(6);
        state.move_player_paddle(300.0);
        activate(&mut state, PowerUpKind::SpeedBoost);
        // 16 * 1.5 carries the puck from x=22 to x=-2 in one step
        state.puck = Puck::new(Vec2::new(22.0, 300.0), Vec2::new(-16.0, 0.0));

        tick(&mut state, STEP);

        assert_eq!(state.score, Score::default());
        assert!(!state.events.contains(&SimEvent::Goal { scorer: Side::Right }));
        assert_eq!(state.puck.pos, Vec2::new(PADDLE_WIDTH + PUCK_RADIUS, 300.0));
        assert!(state.puck.vel.x > 0.0);
    }

    #[test]
    fn test_extra_puck_leaves_without_scoring() {
        let mut state = quiet_state(7);
        state.extra_pucks.push(ExtraPuck {
            puck: Puck::new(Vec2::new(795.0, 100.0), Vec2::new(10.0, 0.0)),
            created_at: state.clock,
            lifetime: Duration::from_secs(10),
        });
        state.right.y = 400.0;

        tick(&mut state, STEP);

        assert!(state.extra_pucks.is_empty());
        assert_eq!(state.score, Score::default());
        assert_eq!(state.puck.pos, Vec2::new(401.0, 300.0));
    }

    #[test]
    fn test_multi_ball_marker_cleared_with_pucks() {
        let mut state = quiet_state(8);
        activate(&mut state, PowerUpKind::MultiBall);
        assert_eq!(state.extra_pucks.len(), 2);
        assert!(state.power_ups.is_active(PowerUpKind::MultiBall));

        tick(&mut state, Duration::from_secs(11));

        assert!(state.extra_pucks.is_empty());
        assert!(!state.power_ups.is_active(PowerUpKind::MultiBall));
        assert!(state.events.contains(&SimEvent::EffectExpired {
            kind: PowerUpKind::MultiBall
        }));
    }

    #[test]
    fn test_ghost_mode_passes_through_lines() {
        let wall = |state: &mut SimulationState| {
            let mut line = Line::new(99, LineOrigin::Drawn, Vec2::new(300.0, 310.0));
            line.push_point(Vec2::new(500.0, 310.0));
            line.finish(false);
            state.lines.push(line);
            state.puck = Puck::new(Vec2::new(400.0, 300.0), Vec2::new(0.0, 2.0));
        };

        let mut solid = quiet_state(9);
        wall(&mut solid);
        tick(&mut solid, STEP);
        assert!((solid.puck.vel.y + 2.3).abs() < 1e-4);

        let mut ghost = quiet_state(9);
        wall(&mut ghost);
        activate(&mut ghost, PowerUpKind::GhostMode);
        tick(&mut ghost, STEP);
        assert_eq!(ghost.puck.vel, Vec2::new(0.0, 2.0));
        assert_eq!(ghost.puck.pos, Vec2::new(400.0, 302.0));
    }

    #[test]
    fn test_block_hit_emits_event() {
        let mut state = quiet_state(10);
        state.grid.origin = Vec2::new(300.0, 200.0);
        state.grid.set(5, 5, true);
        // Cell (5,5) spans 350..360 x 250..260
        state.puck = Puck::new(Vec2::new(339.0, 255.0), Vec2::new(2.0, 0.0));

        tick(&mut state, STEP);

        assert!(!state.grid.get(5, 5));
        assert!(state.puck.vel.x < 0.0);
        assert!(state.events.contains(&SimEvent::BlockDestroyed { row: 5, col: 5 }));
    }

    #[test]
    fn test_line_animation_advances_per_tick() {
        let mut state = quiet_state(11);
        state.start_line(Vec2::new(100.0, 100.0));
        state.append_line_point(Vec2::new(150.0, 100.0));
        state.finish_line();

        for i in 1..=3 {
            tick(&mut state, STEP * i);
        }
        let line = state.lines.last().unwrap();
        assert!((line.progress - 0.15).abs() < 1e-5);
        assert!(line.animating);
    }

    #[test]
    fn test_ai_predicts_crossing() {
        let canvas = Vec2::new(800.0, 600.0);
        let mut paddle = Paddle { side: Side::Right, y: 250.0 };
        let puck = Puck::new(Vec2::new(400.0, 300.0), Vec2::new(10.0, 5.0));
        // Crosses x=790 at y=495, so the target top is 445
        update_ai_paddle(&mut paddle, &puck, canvas, 100.0, 1.0);
        assert_eq!(paddle.y, 256.0);

        // Moving away: track the puck height instead
        let away = Puck::new(Vec2::new(400.0, 100.0), Vec2::new(-10.0, 0.0));
        let mut paddle = Paddle { side: Side::Right, y: 250.0 };
        update_ai_paddle(&mut paddle, &away, canvas, 100.0, 1.0);
        assert_eq!(paddle.y, 244.0);
    }

    #[test]
    fn test_ai_dead_zone() {
        let canvas = Vec2::new(800.0, 600.0);
        let mut paddle = Paddle { side: Side::Right, y: 250.0 };
        let puck = Puck::new(Vec2::new(400.0, 305.0), Vec2::new(-3.0, 0.0));
        update_ai_paddle(&mut paddle, &puck, canvas, 100.0, 1.0);
        assert_eq!(paddle.y, 250.0);
    }

    #[test]
    fn test_demo_mode_drives_player_paddle() {
        let mut state = quiet_state(12);
        state.demo_mode = true;
        state.left.y = 0.0;
        state.puck = Puck::new(Vec2::new(400.0, 500.0), Vec2::new(1.0, 0.0));
        tick(&mut state, STEP);
        assert_eq!(state.left.y, AI_PADDLE_SPEED);

        let mut manual = quiet_state(12);
        manual.left.y = 0.0;
        tick(&mut manual, STEP);
        assert_eq!(manual.left.y, 0.0);
    }

    #[test]
    fn test_fold_into() {
        assert_eq!(fold_into(300.0, 10.0, 590.0), 300.0);
        assert_eq!(fold_into(650.0, 10.0, 590.0), 530.0);
        assert_eq!(fold_into(-30.0, 10.0, 590.0), 50.0);
        assert_eq!(fold_into(f32::NAN, 10.0, 590.0), 300.0);
        assert_eq!(fold_into(42.0, 5.0, 5.0), 5.0);
    }

    #[test]
    fn test_determinism() {
        let mut a = SimulationState::new(99999);
        let mut b = SimulationState::new(99999);
        a.demo_mode = true;
        b.demo_mode = true;

        for i in 0..2000u32 {
            let now = STEP * i;
            tick(&mut a, now);
            tick(&mut b, now);
        }

        assert_eq!(a.puck, b.puck);
        assert_eq!(a.score, b.score);
        assert_eq!(a.left.y, b.left.y);
        assert_eq!(a.grid.live_count(), b.grid.live_count());
        assert_eq!(a.lines.len(), b.lines.len());
        assert_eq!(a.events, b.events);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_speed_never_exceeds_ceiling(seed in any::<u64>(), speed in 0.1f32..10.0) {
            let mut state = SimulationState::new(seed);
            state.demo_mode = true;
            state.set_base_speed(speed);
            for i in 0..300u32 {
                tick(&mut state, STEP * i);
                prop_assert!(state.puck.vel.length() <= MAX_PUCK_SPEED + 1e-3);
                prop_assert!(state.puck.is_finite());
                for extra in &state.extra_pucks {
                    prop_assert!(extra.puck.vel.length() <= MAX_PUCK_SPEED + 1e-3);
                }
            }
        }
    }
}
