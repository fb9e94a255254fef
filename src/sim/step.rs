//! Per-frame simulation step
//!
//! Advances the simulation by a variable frame delta.

use glam::Vec2;

use super::state::{Body, SimulationState};
use crate::consts::BOUND;

/// Up/down sample for one paddle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaddleInput {
    pub up: bool,
    pub down: bool,
}

impl PaddleInput {
    pub const fn new(up: bool, down: bool) -> Self {
        Self { up, down }
    }

    /// +1 for up, -1 for down, 0 for neither or both
    pub fn axis(&self) -> f32 {
        match (self.up, self.down) {
            (true, false) => 1.0,
            (false, true) => -1.0,
            _ => 0.0,
        }
    }
}

/// Input commands for a single step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepInput {
    pub left: PaddleInput,
    pub right: PaddleInput,
}

/// Negate each velocity component whose position is at or beyond `bound`.
///
/// Axes are checked independently. A body still outside the bound after one
/// step flips back, so an overshoot deeper than `|v| * dt` keeps it
/// oscillating outside the wall.
pub fn reflect_at_bounds(body: &mut Body, bound: f32) {
    if body.position.x.abs() >= bound {
        body.velocity.x = -body.velocity.x;
    }
    if body.position.y.abs() >= bound {
        body.velocity.y = -body.velocity.y;
    }
}

/// Explicit Euler: `position += velocity * dt`
#[inline]
pub fn integrate(body: &mut Body, dt: f32) {
    body.position += body.velocity * dt;
}

/// Advance the simulation by `dt` seconds
pub fn step(state: SimulationState, dt: f32, input: &StepInput) -> SimulationState {
    let mut next = state;

    // Ball: reflect first, then move
    reflect_at_bounds(&mut next.ball, BOUND);
    integrate(&mut next.ball, dt);

    // Paddles: the sampled input is the velocity for this frame. No track clamp.
    for (paddle, sample) in [
        (&mut next.left_paddle, input.left),
        (&mut next.right_paddle, input.right),
    ] {
        paddle.velocity = Vec2::new(0.0, sample.axis() * state.paddle_speed);
        integrate(paddle, dt);
    }

    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const EPS: f32 = 1e-5;

    fn ball_state(position: Vec2, velocity: Vec2) -> SimulationState {
        SimulationState {
            ball: Body::new(position, velocity),
            ..SimulationState::default()
        }
    }

    #[test]
    fn test_step_moves_ball_without_bounce() {
        let state = ball_state(Vec2::ZERO, Vec2::new(1.0, 0.5));
        let next = step(state, 0.1, &StepInput::default());

        assert!((next.ball.position.x - 0.1).abs() < EPS);
        assert!((next.ball.position.y - 0.05).abs() < EPS);
        assert_eq!(next.ball.velocity, Vec2::new(1.0, 0.5));
    }

    #[test]
    fn test_step_is_pure() {
        let state = SimulationState::default();
        let input = StepInput {
            left: PaddleInput::new(true, false),
            ..Default::default()
        };
        let a = step(state, 0.016, &input);
        let b = step(state, 0.016, &input);
        assert_eq!(a, b);
        assert_eq!(state, SimulationState::default());
    }

    #[test]
    fn test_ball_bounces_off_right_wall() {
        let state = ball_state(Vec2::new(1.0, 0.0), Vec2::new(1.0, 0.5));
        let next = step(state, 0.1, &StepInput::default());

        assert_eq!(next.ball.velocity, Vec2::new(-1.0, 0.5));
        assert!((next.ball.position.x - 0.9).abs() < EPS);
    }

    #[test]
    fn test_ball_bounces_on_both_axes() {
        let state = ball_state(Vec2::new(-1.0, -1.2), Vec2::new(-0.3, -0.4));
        let next = step(state, 0.0, &StepInput::default());
        assert_eq!(next.ball.velocity, Vec2::new(0.3, 0.4));
    }

    #[test]
    fn test_ball_beyond_overshoot_sticks_to_wall() {
        let mut state = ball_state(Vec2::new(1.04, 0.0), Vec2::new(1.0, 0.0));
        let mut sign = 1.0;
        for _ in 0..10 {
            state = step(state, 0.016, &StepInput::default());
            sign = -sign;
            assert_eq!(state.ball.velocity.x, sign);
            assert!(state.ball.position.x >= 1.0);
            assert!(state.ball.position.x <= 1.04 + EPS);
        }
    }

    #[test]
    fn test_paddle_velocity_comes_from_input() {
        let mut state = SimulationState::default();
        state.paddle_speed = 2.0;
        // Leftover velocity from an earlier frame is ignored
        state.right_paddle.velocity = Vec2::new(0.0, 5.0);

        let input = StepInput {
            left: PaddleInput::new(true, false),
            right: PaddleInput::new(false, false),
        };
        let next = step(state, 0.5, &input);

        assert_eq!(next.left_paddle.velocity, Vec2::new(0.0, 2.0));
        assert!((next.left_paddle.position.y - 1.0).abs() < EPS);
        assert_eq!(next.right_paddle.velocity, Vec2::ZERO);
        assert_eq!(next.right_paddle.position, state.right_paddle.position);
    }

    #[test]
    fn test_paddles_are_not_clamped() {
        let mut state = SimulationState::default();
        let input = StepInput {
            right: PaddleInput::new(false, true),
            ..Default::default()
        };
        for _ in 0..100 {
            state = step(state, 0.1, &input);
        }
        // 100 * 0.1s * 1.5/s = 15 units below the centre line
        assert!((state.right_paddle.position.y + 15.0).abs() < 1e-3);
    }

    #[test]
    fn test_paddle_axis() {
        assert_eq!(PaddleInput::new(true, false).axis(), 1.0);
        assert_eq!(PaddleInput::new(false, true).axis(), -1.0);
        assert_eq!(PaddleInput::new(true, true).axis(), 0.0);
        assert_eq!(PaddleInput::default().axis(), 0.0);
    }

    proptest! {
        #[test]
        fn prop_integration_is_linear_in_dt(
            vx in -5.0f32..5.0,
            vy in -5.0f32..5.0,
            dt in 0.0f32..0.5,
        ) {
            let start = Body::new(Vec2::new(0.1, -0.2), Vec2::new(vx, vy));
            let mut once = start;
            let mut twice = start;
            integrate(&mut once, dt);
            integrate(&mut twice, dt * 2.0);

            let d1 = once.position - start.position;
            let d2 = twice.position - start.position;
            prop_assert!((d2 - d1 * 2.0).length() < 1e-4);
            // Monotonic: a longer step never moves less along the velocity
            prop_assert!(d2.dot(start.velocity) >= d1.dot(start.velocity) - 1e-6);
        }

        #[test]
        fn prop_outside_bound_flips_sign(
            x in 1.0f32..3.0,
            negative in any::<bool>(),
            vx in 0.01f32..5.0,
            vy in -5.0f32..5.0,
        ) {
            let x = if negative { -x } else { x };
            let state = ball_state(Vec2::new(x, 0.0), Vec2::new(vx, vy));
            let next = step(state, 0.01, &StepInput::default());
            prop_assert_eq!(next.ball.velocity.x, -vx);
            prop_assert_eq!(next.ball.velocity.y, vy);
        }

        #[test]
        fn prop_inside_bound_keeps_sign(
            x in -0.99f32..0.99,
            y in -0.99f32..0.99,
            vx in -5.0f32..5.0,
            vy in -5.0f32..5.0,
        ) {
            let state = ball_state(Vec2::new(x, y), Vec2::new(vx, vy));
            let next = step(state, 0.01, &StepInput::default());
            prop_assert_eq!(next.ball.velocity, Vec2::new(vx, vy));
        }
    }
}
