//! Frame loop state machine
//!
//! One call to [`Game::frame`] is one loop iteration: measure the frame delta,
//! consume the input sample, advance the simulation and produce the draw list.
//! Rendering and presentation happen outside, so this runs without a GPU.

use crate::platform::{FrameClock, FrameInput};
use crate::scene::{self, Drawable};
use crate::settings::{PongSettings, Scene, Settings};
use crate::sim::{self, SimulationState};

/// Loop state: `Running` until a close request, then `Terminated` for good
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Terminated,
}

pub struct Game {
    scene: Scene,
    pong: PongSettings,
    sim: SimulationState,
    clock: FrameClock,
    /// Seconds since start, as of the last frame
    elapsed: f64,
    state: LoopState,
}

impl Game {
    pub fn new(settings: &Settings) -> Self {
        Self {
            scene: settings.scene,
            pong: settings.pong.clone(),
            sim: SimulationState::from_settings(&settings.pong),
            clock: FrameClock::new(),
            elapsed: 0.0,
            state: LoopState::Running,
        }
    }

    pub fn scene(&self) -> Scene {
        self.scene
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn simulation(&self) -> &SimulationState {
        &self.sim
    }

    /// Run one iteration at `now` seconds since start.
    ///
    /// Returns the quads to draw, or `None` once the loop has terminated.
    pub fn frame(&mut self, now: f64, input: &FrameInput) -> Option<Vec<Drawable>> {
        if self.state == LoopState::Terminated {
            return None;
        }
        if input.close_requested {
            log::info!("Close requested after {} frames", self.clock.frame_index());
            self.state = LoopState::Terminated;
            return None;
        }

        let dt = self.clock.tick(now);
        self.elapsed = self.clock.last_frame();

        let draws = match self.scene {
            Scene::Transforms => scene::transform_demo(self.elapsed as f32),
            Scene::Pong => {
                self.sim = sim::step(self.sim, dt, &input.step);
                scene::pong(&self.sim, &self.pong)
            }
        };
        Some(draws)
    }
}
