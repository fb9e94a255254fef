//! Quad Pong - textured quads and a two-paddle Pong on wgpu
//!
//! Core modules:
//! - `shader`: WGSL stage compilation, program linking and named uniforms (CPU side)
//! - `sim`: Pure ball/paddle simulation
//! - `scene`: Turns simulation state and time into per-quad transforms
//! - `game`: Frame loop state machine (clock, input, step, draw list)
//! - `renderer`: wgpu device, quad mesh, textures and the GPU shader program
//! - `platform`: Frame clock and keyboard sampling
//! - `settings`: JSON-backed configuration

pub mod game;
pub mod platform;
pub mod renderer;
pub mod scene;
pub mod settings;
pub mod shader;
pub mod sim;

pub use game::{Game, LoopState};
pub use settings::{Scene, Settings};

/// Configuration constants
pub mod consts {
    /// Default window size (logical pixels)
    pub const SCREEN_WIDTH: u32 = 800;
    pub const SCREEN_HEIGHT: u32 = 600;

    /// Reflective bound on each axis, in NDC
    pub const BOUND: f32 = 1.0;

    /// Ball defaults
    pub const BALL_START_POS: [f32; 2] = [0.0, 0.0];
    pub const BALL_START_VEL: [f32; 2] = [1.0, 0.5];
    pub const BALL_SIZE: f32 = 0.05;

    /// Paddle defaults - left paddle sits at -PADDLE_X, right at +PADDLE_X
    pub const PADDLE_X: f32 = 0.9;
    pub const PADDLE_SIZE: [f32; 2] = [0.05, 0.3];
    /// Paddle speed in NDC units per second while a key is held
    pub const PADDLE_SPEED: f32 = 1.5;

    /// Blend factor between the two textures in the transform demo
    pub const MIX_AMOUNT: f32 = 0.2;

    /// Maximum indexed draws recorded per frame
    pub const MAX_DRAWS_PER_FRAME: u32 = 64;
}
