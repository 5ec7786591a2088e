//! Per-core interrupt latches for the five 32X interrupt sources.
//!
//! Each core has its own enable/active pair per source. A source stays
//! active until the core writes its clear register (VRES is the exception:
//! it is cleared when serviced). The router only answers "what is
//! pending"; the core wrapper decides when to take it.

use std::fmt;

use bincode::{Decode, Encode};

use crate::sh2::CoreId;

/// Interrupt sources in service priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Encode, Decode)]
pub enum InterruptSource {
    /// Reset button; Slave only, ignores the mask.
    Vres,
    Vint,
    Hint,
    /// Command interrupt written by the host.
    Cmd,
    Pwm,
}

impl InterruptSource {
    /// Highest priority first.
    pub const PRIORITY: [Self; 5] = [Self::Vres, Self::Vint, Self::Hint, Self::Cmd, Self::Pwm];

    #[must_use]
    pub const fn level(self) -> u8 {
        match self {
            Self::Vres => 14,
            Self::Vint => 12,
            Self::Hint => 10,
            Self::Cmd => 8,
            Self::Pwm => 6,
        }
    }

    #[must_use]
    pub const fn vector(self) -> u8 {
        match self {
            Self::Vres => 71,
            Self::Vint => 70,
            Self::Hint => 69,
            Self::Cmd => 68,
            Self::Pwm => 67,
        }
    }

    /// Bit in the per-core interrupt mask register ($4000), if maskable
    /// there.
    #[must_use]
    pub const fn mask_bit(self) -> Option<u16> {
        match self {
            Self::Vres => None,
            Self::Pwm => Some(0x01),
            Self::Cmd => Some(0x02),
            Self::Hint => Some(0x04),
            Self::Vint => Some(0x08),
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Vres => "vres",
            Self::Vint => "vint",
            Self::Hint => "hint",
            Self::Cmd => "cmd",
            Self::Pwm => "pwm",
        }
    }

    const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for InterruptSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name().to_uppercase())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Encode, Decode)]
pub struct Latch {
    pub enable: bool,
    pub active: bool,
}

/// One core's latches.
#[derive(Debug, Clone, PartialEq, Eq, Default, Encode, Decode)]
pub struct InterruptBlock {
    latches: [Latch; 5],
}

impl InterruptBlock {
    /// Power-on state: everything clear except the VRES enable.
    #[must_use]
    pub fn power() -> Self {
        let mut block = Self::default();
        block.latches[InterruptSource::Vres.index()].enable = true;
        block
    }

    #[must_use]
    pub fn latch(&self, source: InterruptSource) -> Latch {
        self.latches[source.index()]
    }

    pub fn set_enable(&mut self, source: InterruptSource, enable: bool) {
        self.latches[source.index()].enable = enable;
    }

    pub fn set_active(&mut self, source: InterruptSource, active: bool) {
        self.latches[source.index()].active = active;
    }

    /// Source to service next given the core's status register mask.
    ///
    /// VRES only needs to be enabled; the others must also outrank `mask`.
    #[must_use]
    pub fn next_pending(&self, mask: u8) -> Option<InterruptSource> {
        InterruptSource::PRIORITY.into_iter().find(|&source| {
            let latch = self.latch(source);
            latch.active
                && latch.enable
                && (source == InterruptSource::Vres || mask < source.level())
        })
    }

    /// Enable bits as seen in the interrupt mask register.
    #[must_use]
    pub fn mask_bits(&self) -> u16 {
        InterruptSource::PRIORITY
            .into_iter()
            .filter(|&source| self.latch(source).enable)
            .filter_map(InterruptSource::mask_bit)
            .fold(0, |bits, bit| bits | bit)
    }

    /// Load the enables from a mask register write. VRES is untouched.
    pub fn set_mask_bits(&mut self, bits: u16) {
        for source in InterruptSource::PRIORITY {
            if let Some(bit) = source.mask_bit() {
                self.set_enable(source, bits & bit != 0);
            }
        }
    }
}

/// Both cores' interrupt blocks.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct InterruptRouter {
    blocks: [InterruptBlock; 2],
}

impl Default for InterruptRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl InterruptRouter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            blocks: [InterruptBlock::power(), InterruptBlock::power()],
        }
    }

    /// Latch `source` on every core it applies to.
    pub fn raise(&mut self, source: InterruptSource) {
        for core in CoreId::ALL {
            self.raise_on(core, source);
        }
    }

    /// Latch `source` on one core. VRES is ignored on the Master.
    pub fn raise_on(&mut self, core: CoreId, source: InterruptSource) {
        if source == InterruptSource::Vres && core != CoreId::Slave {
            return;
        }
        self.blocks[core.index()].set_active(source, true);
    }

    /// Clear register written: drop the pending state.
    pub fn acknowledge(&mut self, core: CoreId, source: InterruptSource) {
        self.blocks[core.index()].set_active(source, false);
    }

    /// Changing an enable never fires anything by itself; the next poll
    /// sees the new state.
    pub fn set_enable(&mut self, core: CoreId, source: InterruptSource, enable: bool) {
        self.blocks[core.index()].set_enable(source, enable);
    }

    #[must_use]
    pub fn block(&self, core: CoreId) -> &InterruptBlock {
        &self.blocks[core.index()]
    }

    pub fn block_mut(&mut self, core: CoreId) -> &mut InterruptBlock {
        &mut self.blocks[core.index()]
    }

    #[must_use]
    pub fn next_pending(&self, core: CoreId, mask: u8) -> Option<InterruptSource> {
        self.block(core).next_pending(mask)
    }

    /// Core restarted by the adapter: clear its block back to power-on.
    pub fn restart(&mut self, core: CoreId) {
        self.blocks[core.index()] = InterruptBlock::power();
    }
}
