//! Simulation state
//!
//! Every entity is an independent value record; nothing owns anything else.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::settings::PongSettings;

/// A moving point: position and velocity in NDC
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Body {
    pub position: Vec2,
    pub velocity: Vec2,
}

impl Body {
    pub const fn new(position: Vec2, velocity: Vec2) -> Self {
        Self { position, velocity }
    }

    pub const fn at(position: Vec2) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
        }
    }
}

/// Complete simulation state for one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationState {
    pub ball: Body,
    pub left_paddle: Body,
    pub right_paddle: Body,
    /// Paddle speed applied while a direction key is held
    pub paddle_speed: f32,
}

impl SimulationState {
    pub fn from_settings(pong: &PongSettings) -> Self {
        Self {
            ball: Body::new(pong.ball_position.into(), pong.ball_velocity.into()),
            left_paddle: Body::at(Vec2::new(-pong.paddle_x, 0.0)),
            right_paddle: Body::at(Vec2::new(pong.paddle_x, 0.0)),
            paddle_speed: pong.paddle_speed,
        }
    }

    /// Bodies in draw order: ball, left paddle, right paddle
    pub fn bodies(&self) -> [&Body; 3] {
        [&self.ball, &self.left_paddle, &self.right_paddle]
    }
}

impl Default for SimulationState {
    fn default() -> Self {
        Self::from_settings(&PongSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let state = SimulationState::default();
        assert_eq!(state.ball.position, Vec2::ZERO);
        assert_eq!(state.ball.velocity, Vec2::new(1.0, 0.5));
        assert_eq!(state.left_paddle.position, Vec2::new(-0.9, 0.0));
        assert_eq!(state.right_paddle.position, Vec2::new(0.9, 0.0));
        assert_eq!(state.left_paddle.velocity, Vec2::ZERO);
    }

    #[test]
    fn test_from_settings() {
        let pong = PongSettings {
            ball_position: [0.25, -0.5],
            paddle_x: 0.7,
            paddle_speed: 2.0,
            ..Default::default()
        };
        let state = SimulationState::from_settings(&pong);
        assert_eq!(state.ball.position, Vec2::new(0.25, -0.5));
        assert_eq!(state.right_paddle.position.x, 0.7);
        assert_eq!(state.paddle_speed, 2.0);
    }
}
