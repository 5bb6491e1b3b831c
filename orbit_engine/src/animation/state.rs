/// AnimationState - rotation angle advanced once per tick.
///
/// Owned by the pipeline and mutated only on the tick thread. The angle
/// accumulates without wraparound, so very long runs drift slowly in
/// precision.

/// Radians added to the angle every tick
pub const DEFAULT_ANGLE_STEP: f32 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationState {
    /// Current rotation angle in radians
    pub angle: f32,
    /// Radians added per tick
    pub step: f32,
    /// Number of ticks applied so far
    pub ticks: u64,
}

impl Default for AnimationState {
    fn default() -> Self {
        Self::new(DEFAULT_ANGLE_STEP)
    }
}

impl AnimationState {
    pub fn new(step: f32) -> Self {
        Self { angle: 0.0, step, ticks: 0 }
    }

    /// Apply one tick and return the new angle
    pub fn advance(&mut self) -> f32 {
        self.angle += self.step;
        self.ticks += 1;
        self.angle
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
