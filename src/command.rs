//! Front-end commands
//!
//! Every mutation an adapter may request goes through [`Command`]. Commands
//! are validated before they touch the state, so the simulation only ever
//! sees finite coordinates, sane speeds and known power-up kinds.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::CommandError;
use crate::sim::{PowerUpKind, SimulationState};

/// Accepted range for the user speed multiplier
pub const SPEED_RANGE: std::ops::RangeInclusive<f32> = 0.1..=10.0;

/// One state transition requested by a front-end
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Command {
    Reset,
    TogglePause,
    SetSpeed { value: f32 },
    ClearLines,
    StartLine { x: f32, y: f32 },
    AppendLinePoint { x: f32, y: f32 },
    FinishLine,
    /// Debug injection at canvas center
    SpawnPowerUp { kind: String },
    Resize { width: f32, height: f32 },
    /// Player paddle center
    MovePaddle { y: f32 },
}

impl Command {
    /// Parse a JSON command such as `{"type": "setSpeed", "value": 2.0}`
    pub fn parse(json: &str) -> Result<Self, CommandError> {
        let command: Command = serde_json::from_str(json)?;
        command.validate()?;
        Ok(command)
    }

    pub fn validate(&self) -> Result<(), CommandError> {
        match self {
            Command::SetSpeed { value } => {
                if !SPEED_RANGE.contains(value) {
                    return Err(CommandError::SpeedOutOfRange(*value));
                }
            }
            Command::StartLine { x, y } | Command::AppendLinePoint { x, y } => {
                if !(x.is_finite() && y.is_finite()) {
                    return Err(CommandError::NonFinitePoint);
                }
            }
            Command::MovePaddle { y } => {
                if !y.is_finite() {
                    return Err(CommandError::NonFinitePoint);
                }
            }
            Command::SpawnPowerUp { kind } => {
                kind.parse::<PowerUpKind>()?;
            }
            Command::Resize { width, height } => {
                let ok = |v: &f32| v.is_finite() && *v > 0.0;
                if !(ok(width) && ok(height)) {
                    return Err(CommandError::InvalidDimensions {
                        width: *width,
                        height: *height,
                    });
                }
            }
            Command::Reset | Command::TogglePause | Command::ClearLines | Command::FinishLine => {}
        }
        Ok(())
    }

    /// Validate and apply to the state
    pub fn apply(&self, state: &mut SimulationState) -> Result<(), CommandError> {
        self.validate()?;
        log::debug!("Command: {self:?}");
        match self {
            Command::Reset => state.reset(),
            Command::TogglePause => state.toggle_pause(),
            Command::SetSpeed { value } => state.set_base_speed(*value),
            Command::ClearLines => state.clear_lines(),
            Command::StartLine { x, y } => state.start_line(Vec2::new(*x, *y)),
            Command::AppendLinePoint { x, y } => state.append_line_point(Vec2::new(*x, *y)),
            Command::FinishLine => state.finish_line(),
            Command::SpawnPowerUp { kind } => state.spawn_power_up(kind.parse()?),
            Command::Resize { width, height } => state.resize(*width, *height),
            Command::MovePaddle { y } => state.move_player_paddle(*y),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::LineOrigin;

    #[test]
    fn test_parse_tagged_json() {
        assert_eq!(Command::parse(r#"{"type": "reset"}"#).unwrap(), Command::Reset);
        assert_eq!(
            Command::parse(r#"{"type": "setSpeed", "value": 2.5}"#).unwrap(),
            Command::SetSpeed { value: 2.5 }
        );
        assert_eq!(
            Command::parse(r#"{"type": "appendLinePoint", "x": 1, "y": 2}"#).unwrap(),
            Command::AppendLinePoint { x: 1.0, y: 2.0 }
        );
        assert_eq!(
            Command::parse(r#"{"type": "spawnPowerUp", "kind": "ghost_mode"}"#).unwrap(),
            Command::SpawnPowerUp {
                kind: "ghost_mode".into()
            }
        );
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(matches!(
            Command::parse(r#"{"type": "teleport"}"#),
            Err(CommandError::Malformed(_))
        ));
        assert!(matches!(
            Command::parse(r#"{"type": "setSpeed"}"#),
            Err(CommandError::Malformed(_))
        ));
    }

    #[test]
    fn test_speed_range() {
        assert!(Command::SetSpeed { value: 0.1 }.validate().is_ok());
        assert!(Command::SetSpeed { value: 10.0 }.validate().is_ok());
        assert!(matches!(
            Command::SetSpeed { value: 0.05 }.validate(),
            Err(CommandError::SpeedOutOfRange(_))
        ));
        assert!(Command::SetSpeed { value: 10.5 }.validate().is_err());
        assert!(Command::SetSpeed { value: f32::NAN }.validate().is_err());
    }

    #[test]
    fn test_resize_rejects_degenerate() {
        for (width, height) in [(0.0, 600.0), (800.0, -1.0), (f32::INFINITY, 600.0)] {
            assert!(matches!(
                Command::Resize { width, height }.validate(),
                Err(CommandError::InvalidDimensions { .. })
            ));
        }
    }

    #[test]
    fn test_unknown_power_up_rejected() {
        let mut state = SimulationState::new(1);
        let err = Command::SpawnPowerUp { kind: "laser".into() }
            .apply(&mut state)
            .unwrap_err();
        assert!(matches!(err, CommandError::UnknownPowerUp(ref k) if k == "laser"));
        assert!(state.power_ups.power_ups.is_empty());
    }

    #[test]
    fn test_non_finite_point_rejected() {
        let mut state = SimulationState::new(1);
        Command::StartLine { x: 10.0, y: 10.0 }.apply(&mut state).unwrap();
        let before = state.lines[0].points.len();
        assert!(Command::AppendLinePoint { x: f32::NAN, y: 0.0 }.apply(&mut state).is_err());
        assert!(Command::MovePaddle { y: f32::INFINITY }.apply(&mut state).is_err());
        assert_eq!(state.lines[0].points.len(), before);
    }

    #[test]
    fn test_apply_drives_state() {
        let mut state = SimulationState::new(2);

        Command::SetSpeed { value: 3.0 }.apply(&mut state).unwrap();
        assert_eq!(state.base_speed, 3.0);

        Command::TogglePause.apply(&mut state).unwrap();
        assert!(state.paused);

        for cmd in [
            Command::StartLine { x: 0.0, y: 0.0 },
            Command::AppendLinePoint { x: 10.0, y: 0.0 },
            Command::AppendLinePoint { x: 20.0, y: 0.0 },
            Command::AppendLinePoint { x: 30.0, y: 0.0 },
            Command::FinishLine,
        ] {
            cmd.apply(&mut state).unwrap();
        }
        assert_eq!(state.lines.len(), 1);
        assert_eq!(state.lines[0].origin, LineOrigin::Drawn);
        assert_eq!(state.lines[0].flattened.as_ref().map(Vec::len), Some(48));

        Command::SpawnPowerUp { kind: "Speed Boost".into() }
            .apply(&mut state)
            .unwrap();
        assert_eq!(state.power_ups.power_ups[0].kind, PowerUpKind::SpeedBoost);
        assert_eq!(state.power_ups.power_ups[0].pos, Vec2::new(400.0, 300.0));

        Command::MovePaddle { y: 100.0 }.apply(&mut state).unwrap();
        assert_eq!(state.left.y, 50.0);

        Command::Resize { width: 1000.0, height: 700.0 }
            .apply(&mut state)
            .unwrap();
        assert_eq!(state.canvas, Vec2::new(1000.0, 700.0));

        Command::ClearLines.apply(&mut state).unwrap();
        assert!(state.lines.is_empty());

        Command::Reset.apply(&mut state).unwrap();
        assert_eq!(state.base_speed, 3.0);
        assert!(state.power_ups.power_ups.is_empty());
    }
}
