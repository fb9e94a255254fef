//! Keyboard state and per-frame input sampling

use std::collections::HashSet;

use winit::keyboard::KeyCode;

use crate::sim::{PaddleInput, StepInput};

/// Input sampled once per frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameInput {
    /// The user asked to quit (Escape or window close)
    pub close_requested: bool,
    pub step: StepInput,
}

/// Keys currently held down
#[derive(Debug, Clone, Default)]
pub struct KeyboardState {
    pressed: HashSet<KeyCode>,
    close_requested: bool,
}

impl KeyboardState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a key transition
    pub fn apply(&mut self, code: KeyCode, pressed: bool) {
        if pressed {
            self.pressed.insert(code);
        } else {
            self.pressed.remove(&code);
        }
    }

    /// Record a close request from the window (sticky)
    pub fn request_close(&mut self) {
        self.close_requested = true;
    }

    pub fn is_pressed(&self, code: KeyCode) -> bool {
        self.pressed.contains(&code)
    }

    /// Current state as a frame input.
    ///
    /// Escape closes; W/S drive the left paddle, ArrowUp/ArrowDown the right.
    pub fn sample(&self) -> FrameInput {
        FrameInput {
            close_requested: self.close_requested || self.is_pressed(KeyCode::Escape),
            step: StepInput {
                left: PaddleInput::new(
                    self.is_pressed(KeyCode::KeyW),
                    self.is_pressed(KeyCode::KeyS),
                ),
                right: PaddleInput::new(
                    self.is_pressed(KeyCode::ArrowUp),
                    self.is_pressed(KeyCode::ArrowDown),
                ),
            },
        }
    }
}
