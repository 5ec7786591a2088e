//! The host side of the cooperative scheduler.
//!
//! The 32X never owns the 68K or the Mega Drive raster. Whatever drives
//! them implements [`HostDomain`]; a core calls [`HostDomain::catch_up`]
//! before every shared access (and periodically while running) so the host
//! has performed every write and raster edge it would have made by then.

use emu_core::Ticks;

use crate::bus::SharedBus;

/// SH-2 clocks per 68000 clock; both derive from the same crystal.
pub const SH2_CLOCKS_PER_HOST_CYCLE: u64 = 3;

/// SH-2 clock at which the host reaches `cycles`.
#[must_use]
pub const fn sh2_clock_at(cycles: u64) -> Ticks {
    Ticks::new(cycles * SH2_CLOCKS_PER_HOST_CYCLE)
}

/// The 68K and its raster, as seen from the 32X.
pub trait HostDomain {
    /// Run the host until `until` (in SH-2 clocks).
    ///
    /// Every external access and every `vblank`/`hblank` edge the host
    /// produces up to that point must be applied to `bus` before
    /// returning. Calls with a target the host has already passed do
    /// nothing.
    fn catch_up(&mut self, bus: &mut SharedBus, until: Ticks);
}

/// No host: the cores run against a static Mega Drive side with no raster.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHost;

impl HostDomain for NoHost {
    fn catch_up(&mut self, _bus: &mut SharedBus, _until: Ticks) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_cycle_conversion() {
        assert_eq!(sh2_clock_at(488), Ticks::new(1464));
    }
}
