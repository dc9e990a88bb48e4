//! Output volume with logarithmic scaling and focus ducking
//!
//! Volume range is 0-100%, mapped to -60 dB to 0 dB internally. Ducking
//! multiplies the resulting gain by a fixed attenuation factor.

/// Volume controller
#[derive(Debug, Clone)]
pub struct Volume {
    /// Volume level (0-100)
    level: u8,

    /// Cached linear gain multiplier for `level`
    linear_gain: f32,

    /// Multiplier applied while ducked
    duck_gain: f32,

    /// Whether another source asked us to duck
    ducked: bool,
}

impl Volume {
    /// Create new volume controller
    ///
    /// `duck_gain` is clamped to `[0, 1]`.
    pub fn new(level: u8, duck_gain: f32) -> Self {
        let level = level.min(100);

        Self {
            level,
            linear_gain: Self::calculate_linear_gain(level),
            duck_gain: duck_gain.clamp(0.0, 1.0),
            ducked: false,
        }
    }

    /// Set volume level (0-100)
    pub fn set_level(&mut self, level: u8) {
        self.level = level.min(100);
        self.linear_gain = Self::calculate_linear_gain(self.level);
    }

    /// Get current volume level (0-100)
    pub fn level(&self) -> u8 {
        self.level
    }

    /// Attenuate output without changing the level
    pub fn duck(&mut self) {
        self.ducked = true;
    }

    /// Return to full (unducked) output
    pub fn restore(&mut self) {
        self.ducked = false;
    }

    /// Check if ducked
    pub fn is_ducked(&self) -> bool {
        self.ducked
    }

    /// Linear gain handed to the player
    pub fn gain(&self) -> f32 {
        if self.ducked {
            self.linear_gain * self.duck_gain
        } else {
            self.linear_gain
        }
    }

    /// Convert volume percentage to linear gain
    ///
    /// Formula: gain = 10^((level% - 100) * 0.6 / 20)
    /// - 0%   → silence
    /// - 50%  → -30 dB → 0.0316 gain
    /// - 100% →   0 dB → 1.0 gain (unity)
    fn calculate_linear_gain(level: u8) -> f32 {
        if level == 0 {
            return 0.0;
        }

        let db = (level as f32 - 100.0) * 0.6;
        10.0_f32.powf(db / 20.0)
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self::new(100, 0.3)
    }
}
