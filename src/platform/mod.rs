//! Platform abstraction layer
//!
//! Handles the boundary with the windowing provider:
//! - Frame timing from a monotonic seconds clock
//! - Keyboard state and per-frame input sampling

pub mod clock;
pub mod input;

pub use clock::FrameClock;
pub use input::{FrameInput, KeyboardState};
