//! Master clock configuration.

/// Master clock configuration for a system.
///
/// Each system has a master crystal that drives all timing. Components run
/// at rational fractions of it; a fraction is exact only when the crystal
/// divides evenly, so derived rates are rounded down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MasterClock {
    /// Crystal frequency in Hz (e.g., `53_693_175` for an NTSC Mega Drive).
    pub frequency_hz: u64,
}

impl MasterClock {
    #[must_use]
    pub const fn new(frequency_hz: u64) -> Self {
        Self { frequency_hz }
    }

    /// Clock derived by multiplying by `numerator` and dividing by
    /// `denominator`.
    #[must_use]
    pub const fn scaled(&self, numerator: u64, denominator: u64) -> Self {
        Self::new(self.frequency_hz * numerator / denominator)
    }

    /// Whole cycles of this clock per second divided by `rate_hz`.
    #[must_use]
    pub const fn cycles_per(&self, rate_hz: u64) -> u64 {
        self.frequency_hz / rate_hz
    }
}
