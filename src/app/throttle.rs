pub const MIN_BATCH_FRACTION: f32 = 0.3;

const EMA_KEEP: f32 = 0.95;
const EMA_BLEND: f32 = 0.05;
const DECREASE_BELOW: f32 = 0.9;
const INCREASE_ABOVE: f32 = 1.1;

/// Closed-loop controller for the kernel's batch fraction. Tracks an
/// exponential moving average of the achieved frame rate and nudges the
/// fraction by one fixed step per frame, never past [floor, 1.0]. The kernel
/// compensates repulsion internally, so moving the knob keeps the visual
/// equilibrium intact while trading fidelity for frame time.
pub struct ThrottleController {
    target_fps: f32,
    average_fps: f32,
    batch_fraction: f32,
}

impl ThrottleController {
    pub fn new(target_fps: f32) -> Self {
        let target_fps = target_fps.max(1.0);
        Self {
            target_fps,
            // Start optimistic so the first frames never trigger a decrease.
            average_fps: target_fps * 2.0,
            batch_fraction: 1.0,
        }
    }

    pub fn batch_fraction(&self) -> f32 {
        self.batch_fraction
    }

    pub fn average_fps(&self) -> f32 {
        self.average_fps
    }

    pub fn target_fps(&self) -> f32 {
        self.target_fps
    }

    pub fn set_target_fps(&mut self, target_fps: f32) {
        self.target_fps = target_fps.max(1.0);
    }

    /// Feeds one frame-rate sample. Returns the new batch fraction when an
    /// adjustment happened, so the caller can push it to the kernel.
    pub fn observe(&mut self, instant_fps: f32) -> Option<f32> {
        self.average_fps = self.average_fps * EMA_KEEP + instant_fps * EMA_BLEND;

        let step = 0.5 / self.target_fps;
        if self.average_fps < self.target_fps * DECREASE_BELOW
            && self.batch_fraction > MIN_BATCH_FRACTION
        {
            self.batch_fraction = (self.batch_fraction - step).max(MIN_BATCH_FRACTION);
            if self.batch_fraction == MIN_BATCH_FRACTION {
                tracing::debug!("batch fraction reached its floor");
            }
            return Some(self.batch_fraction);
        }

        if self.average_fps > self.target_fps * INCREASE_ABOVE && self.batch_fraction < 1.0 {
            self.batch_fraction = (self.batch_fraction + step).min(1.0);
            return Some(self.batch_fraction);
        }

        None
    }
}
