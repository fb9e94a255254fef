//! Scenes: turn state and time into a list of quads to draw

pub mod transform;

use glam::{Mat4, Vec2, Vec4};

use crate::settings::PongSettings;
use crate::sim::SimulationState;

pub use transform::{pulse_scale, pulsing_quad, quad_transform, spinning_quad};

/// One draw of the shared unit quad
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Drawable {
    /// Uploaded to the `transform` uniform
    pub transform: Mat4,
    /// Uploaded to the `tint` uniform
    pub tint: Vec4,
    /// Uploaded to the `textured` uniform
    pub textured: bool,
}

/// The two-quad transform demo at `time` seconds since start
pub fn transform_demo(time: f32) -> Vec<Drawable> {
    [spinning_quad(time), pulsing_quad(time)]
        .into_iter()
        .map(|transform| Drawable {
            transform,
            tint: Vec4::ONE,
            textured: true,
        })
        .collect()
}

/// Ball and both paddles, in that order
pub fn pong(state: &SimulationState, pong: &PongSettings) -> Vec<Drawable> {
    let ball_size = Vec2::splat(pong.ball_size);
    let paddle_size = Vec2::from(pong.paddle_size);

    let ball = Drawable {
        transform: quad_transform(state.ball.position, ball_size),
        tint: pong.ball_color.into(),
        textured: false,
    };
    let paddles = [&state.left_paddle, &state.right_paddle].map(|paddle| Drawable {
        transform: quad_transform(paddle.position, paddle_size),
        tint: pong.paddle_color.into(),
        textured: false,
    });

    let mut draws = Vec::with_capacity(3);
    draws.push(ball);
    draws.extend(paddles);
    draws
}
