//! Pong simulation
//!
//! Pure and GPU-free: state goes in, state comes out.
//! - Explicit Euler integration with the frame delta
//! - Reflective bounds on the ball, none on the paddles
//! - Paddle velocity comes straight from the input sample

pub mod state;
pub mod step;

pub use state::{Body, SimulationState};
pub use step::{PaddleInput, StepInput, integrate, reflect_at_bounds, step};
