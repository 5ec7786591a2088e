//! Clocked SH-2 core wrapper.
//!
//! The instruction interpreter is external and plugs in through
//! [`Sh2Interpreter`]. Everything around it lives here: the per-core
//! context (clock, DMA controller, cache data array, boot ROM mapping),
//! the core's view of the internal bus, and [`step_core`], which decides
//! each poll whether the core idles in reset, takes an interrupt, or moves
//! a DMA unit and then executes one instruction.
//!
//! # Synchronization
//!
//! A [`CoreBus`] carries the other core and the host. Before any access to
//! shared state it calls [`CoreBus::synchronize`], which runs the other
//! core up to this core's clock, advances the shared devices, and lets the
//! host catch up. Writes to the framebuffer or palette then wait, one clock
//! at a time, until the VDP reports the resource disengaged.

use std::fmt;

use bincode::{Decode, Encode};
use emu_core::{Lanes, Ticks, WordBus, wait_until};
use sega_32x_vdp::{RegisterEffect, Resource};

use crate::bus::SharedBus;
use crate::config::{M32xConfig, SyncConfig};
use crate::decoder::{Decoded, InternalRegion};
use crate::dmac::{Dmac, TransferSize};
use crate::interrupt::InterruptSource;
use crate::sync::HostDomain;

/// Cache data array, 4 KiB.
pub const CACHE_WORDS: usize = 0x800;

/// End of the boot ROM window; a PC at or past this has left it.
const BOOT_ROM_END: u32 = 0x4000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Encode, Decode)]
pub enum CoreId {
    Master,
    Slave,
}

impl CoreId {
    pub const ALL: [Self; 2] = [Self::Master, Self::Slave];

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for CoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Master => f.write_str("master"),
            Self::Slave => f.write_str("slave"),
        }
    }
}

/// Architectural register file, as exchanged with the interpreter for
/// save states.
#[derive(Debug, Clone, Default, PartialEq, Eq, Encode, Decode)]
pub struct Sh2Registers {
    pub r: [u32; 16],
    pub pc: u32,
    pub pr: u32,
    pub gbr: u32,
    pub vbr: u32,
    pub mach: u32,
    pub macl: u32,
    pub sr: u32,
}

/// An SH-2 instruction interpreter.
pub trait Sh2Interpreter {
    /// Execute one instruction. Returns the clocks it took.
    fn execute<B: WordBus>(&mut self, bus: &mut B) -> u32;

    /// SR interrupt mask, 0-15.
    fn interrupt_mask(&self) -> u8;

    /// The next instruction is a branch delay slot.
    fn in_delay_slot(&self) -> bool;

    /// Take an external interrupt: stack SR and PC, set the mask to
    /// `level` and jump through `vector`. Returns the clocks it took.
    fn raise_exception<B: WordBus>(&mut self, bus: &mut B, level: u8, vector: u8) -> u32;

    fn pc(&self) -> u32;

    /// Power-on reset: load PC and SP from the vector table at address 0.
    fn reset<B: WordBus>(&mut self, bus: &mut B);

    fn registers(&self) -> Sh2Registers;

    fn set_registers(&mut self, registers: &Sh2Registers);
}

/// Per-core scheduling settings taken from the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoreOptions {
    pub sync: SyncConfig,
    pub unmap_boot_rom_after_jump: bool,
}

impl CoreOptions {
    #[must_use]
    pub fn from_config(config: &M32xConfig) -> Self {
        Self {
            sync: config.sync,
            unmap_boot_rom_after_jump: config.unmap_boot_rom_after_jump,
        }
    }
}

/// State the wrapper keeps for one core, besides the interpreter itself.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct CoreContext {
    id: CoreId,
    clock: Ticks,
    pub dmac: Dmac,
    cache: Vec<u16>,
    boot_rom_mapped: bool,
    /// Held by the adapter; restarted on release.
    in_reset: bool,
    /// Clocks until the other core is forced to catch up.
    sh2_countdown: u32,
    /// Clocks until the host is forced to catch up.
    host_countdown: u32,
    /// Last half-word this core saw on its bus.
    last_bus: u16,
}

impl CoreContext {
    #[must_use]
    pub fn new(id: CoreId, sync: SyncConfig) -> Self {
        Self {
            id,
            clock: Ticks::ZERO,
            dmac: Dmac::new(),
            cache: vec![0; CACHE_WORDS],
            boot_rom_mapped: true,
            in_reset: true,
            sh2_countdown: sync.sh2_interval,
            host_countdown: sync.host_interval,
            last_bus: 0,
        }
    }

    pub fn power(&mut self, sync: SyncConfig) {
        *self = Self::new(self.id, sync);
    }

    #[must_use]
    pub fn id(&self) -> CoreId {
        self.id
    }

    #[must_use]
    pub fn clock(&self) -> Ticks {
        self.clock
    }

    #[must_use]
    pub fn boot_rom_mapped(&self) -> bool {
        self.boot_rom_mapped
    }

    #[must_use]
    pub fn in_reset(&self) -> bool {
        self.in_reset
    }

    /// Memory arrays have their power-on sizes.
    pub(crate) fn is_well_formed(&self) -> bool {
        self.cache.len() == CACHE_WORDS
    }

    fn cache_slot(offset: u32) -> usize {
        ((offset >> 1) as usize) % CACHE_WORDS
    }
}

/// An interpreter and its context.
pub struct ClockedCore<S> {
    pub cpu: S,
    pub ctx: CoreContext,
}

impl<S> ClockedCore<S> {
    pub fn new(id: CoreId, cpu: S, sync: SyncConfig) -> Self {
        Self {
            cpu,
            ctx: CoreContext::new(id, sync),
        }
    }
}

/// One core's view of the internal bus.
///
/// Holds the shared state, the other core (absent while that core is
/// itself being caught up) and the host.
pub struct CoreBus<'a, S> {
    shared: &'a mut SharedBus,
    ctx: &'a mut CoreContext,
    other: Option<&'a mut ClockedCore<S>>,
    host: &'a mut dyn HostDomain,
    options: CoreOptions,
}

impl<'a, S: Sh2Interpreter> CoreBus<'a, S> {
    pub fn new(
        shared: &'a mut SharedBus,
        ctx: &'a mut CoreContext,
        other: Option<&'a mut ClockedCore<S>>,
        host: &'a mut dyn HostDomain,
        options: CoreOptions,
    ) -> Self {
        Self {
            shared,
            ctx,
            other,
            host,
            options,
        }
    }

    #[must_use]
    pub fn core(&self) -> CoreId {
        self.ctx.id
    }

    #[must_use]
    pub fn clock(&self) -> Ticks {
        self.ctx.clock
    }

    /// Advance this core's clock. Shared devices only move at
    /// synchronization points.
    pub fn step(&mut self, clocks: u32) {
        self.ctx.clock += u64::from(clocks);
        self.ctx.sh2_countdown = self.ctx.sh2_countdown.saturating_sub(clocks);
        self.ctx.host_countdown = self.ctx.host_countdown.saturating_sub(clocks);
    }

    /// Bring every other actor up to this core's clock.
    pub fn synchronize(&mut self) {
        let now = self.ctx.clock;
        if let Some(other) = self.other.as_mut() {
            let ClockedCore { cpu, ctx } = &mut **other;
            let mut nested = CoreBus {
                shared: &mut *self.shared,
                ctx,
                other: None,
                host: &mut *self.host,
                options: self.options,
            };
            while nested.ctx.clock < now {
                step_core(cpu, &mut nested);
            }
        }
        self.shared.advance_to(now);
        self.host.catch_up(self.shared, now);
        self.ctx.sh2_countdown = self.options.sync.sh2_interval;
        self.ctx.host_countdown = self.options.sync.host_interval;
    }

    /// Synchronize if either catch-up interval has run out.
    fn periodic_sync(&mut self) {
        if self.ctx.sh2_countdown == 0 || self.ctx.host_countdown == 0 {
            self.synchronize();
        }
    }

    /// Hold this core until `resource` is free.
    fn wait_for(&mut self, resource: Resource) {
        let waited = wait_until(
            self,
            |bus| !bus.shared.vdp.engaged(resource),
            |bus| {
                bus.step(1);
                bus.synchronize();
            },
        );
        if waited > 0 {
            log::trace!("{} waited {waited} clocks for {resource:?}", self.ctx.id);
        }
    }

    /// Autofill started by a core: every word waits for the framebuffer.
    fn run_autofill(&mut self, word_address: u16, data: u16, length: u8) {
        let mut next = word_address;
        for _ in 0..=length {
            self.wait_for(Resource::Framebuffer);
            next = self.shared.vdp.autofill_word(next, data);
        }
        self.shared.vdp.finish_autofill(next, length);
    }

    // === DMA ===

    /// Move at most one transfer unit on one channel. Returns true if a
    /// unit moved.
    fn service_dma(&mut self) -> bool {
        let core = self.ctx.id;
        for index in 0..2 {
            if !self.ctx.dmac.runnable(index) {
                continue;
            }
            let channel = &self.ctx.dmac.channels[index];
            let (size, source, destination) = (channel.size(), channel.source, channel.destination);
            let moved = if channel.auto_request() {
                let words = self.load_unit(size, source);
                self.store_unit(size, destination, &words);
                true
            } else if index == 0 {
                self.synchronize();
                let words = if self.shared.dreq.ready(core) {
                    self.shared.dreq.pop_unit(size.fifo_words())
                } else {
                    None
                };
                match words {
                    Some(words) => {
                        self.store_unit(size, destination, &words);
                        true
                    }
                    None => false,
                }
            } else if self.shared.dreq.pwm_request(core) {
                self.shared.dreq.clear_pwm_request(core);
                let words = self.load_unit(size, source);
                self.store_unit(size, destination, &words);
                true
            } else {
                false
            };
            if moved {
                if self.ctx.dmac.channels[index].complete_unit() {
                    log::debug!("{core} DMA channel {index} complete");
                }
                return true;
            }
        }
        false
    }

    /// Read one transfer unit as half-words, high first.
    fn load_unit(&mut self, size: TransferSize, address: u32) -> Vec<u16> {
        match size {
            TransferSize::Byte => vec![u16::from(self.read_byte(address))],
            TransferSize::Word => {
                let prior = self.ctx.last_bus;
                vec![self.read_word(Lanes::WORD, address & !1, prior)]
            }
            TransferSize::Long | TransferSize::Block16 => {
                let longs = size.bytes() / 4;
                let mut words = Vec::with_capacity(size.fifo_words());
                for i in 0..longs {
                    let long = self.read_long(address.wrapping_add(i * 4));
                    words.push((long >> 16) as u16);
                    words.push(long as u16);
                }
                words
            }
        }
    }

    fn store_unit(&mut self, size: TransferSize, address: u32, words: &[u16]) {
        match size {
            TransferSize::Byte => {
                if let Some(&word) = words.first() {
                    self.write_byte(address, word as u8);
                }
            }
            TransferSize::Word => {
                if let Some(&word) = words.first() {
                    self.write_word(Lanes::WORD, address & !1, word);
                }
            }
            TransferSize::Long | TransferSize::Block16 => {
                let mut target = address;
                for pair in words.chunks_exact(2) {
                    self.write_long(target, (u32::from(pair[0]) << 16) | u32::from(pair[1]));
                    target = target.wrapping_add(4);
                }
            }
        }
    }
}

impl<S: Sh2Interpreter> WordBus for CoreBus<'_, S> {
    fn read_word(&mut self, lanes: Lanes, address: u32, prior: u16) -> u16 {
        let value = self.decode_read(lanes, address, prior);
        self.ctx.last_bus = value;
        value
    }

    fn open_bus(&self) -> u16 {
        self.ctx.last_bus
    }

    fn write_word(&mut self, lanes: Lanes, address: u32, data: u16) {
        self.ctx.last_bus = data;
        self.decode_write(lanes, address, data);
    }
}

impl<S: Sh2Interpreter> CoreBus<'_, S> {
    fn decode_read(&mut self, lanes: Lanes, address: u32, prior: u16) -> u16 {
        let core = self.ctx.id;
        let Some(decoded) = self.shared.decode_internal(address) else {
            log::debug!("{core} read from unmapped {address:08X} ({lanes:?})");
            return prior;
        };
        let Decoded { region, offset } = decoded;
        match region {
            InternalRegion::BootRom => {
                if self.ctx.boot_rom_mapped {
                    self.shared.boot_rom_word(core, offset).unwrap_or(prior)
                } else {
                    prior
                }
            }
            InternalRegion::CacheData => {
                if self.ctx.dmac.cache_enabled() {
                    self.ctx.cache[CoreContext::cache_slot(offset)]
                } else {
                    prior
                }
            }
            InternalRegion::OnChip => self.ctx.dmac.read(address).unwrap_or_else(|| {
                log::debug!("{core} read from on-chip {address:08X} not modelled");
                prior
            }),
            InternalRegion::Sdram => self.shared.sdram_word(offset),
            _ => {
                self.synchronize();
                self.shared.read_internal(core, decoded, prior)
            }
        }
    }

    fn decode_write(&mut self, lanes: Lanes, address: u32, data: u16) {
        let core = self.ctx.id;
        let Some(decoded) = self.shared.decode_internal(address) else {
            log::debug!("{core} write to unmapped {address:08X} dropped: {data:04X}");
            return;
        };
        let Decoded { region, offset } = decoded;
        match region {
            InternalRegion::BootRom => {
                log::debug!("{core} write to boot ROM {address:08X} dropped: {data:04X}");
            }
            InternalRegion::CacheData => {
                if self.ctx.dmac.cache_enabled() {
                    let slot = &mut self.ctx.cache[CoreContext::cache_slot(offset)];
                    *slot = lanes.merge(*slot, data);
                }
            }
            InternalRegion::OnChip => {
                if !self.ctx.dmac.write(address, lanes, data) {
                    log::debug!("{core} write to on-chip {address:08X} not modelled: {data:04X}");
                }
            }
            InternalRegion::Sdram => {
                self.shared.write_internal(core, decoded, lanes, data);
            }
            _ => {
                self.synchronize();
                match region {
                    InternalRegion::Framebuffer | InternalRegion::Overwrite => {
                        self.wait_for(Resource::Framebuffer);
                    }
                    InternalRegion::Palette => self.wait_for(Resource::Palette),
                    _ => {}
                }
                if let RegisterEffect::Autofill {
                    word_address,
                    data,
                    length,
                } = self.shared.write_internal(core, decoded, lanes, data)
                {
                    self.run_autofill(word_address, data, length);
                }
            }
        }
    }
}

/// Run one poll of a core: reset hold, interrupt, or DMA unit plus one
/// instruction.
pub fn step_core<S: Sh2Interpreter>(cpu: &mut S, bus: &mut CoreBus<'_, S>) {
    let core = bus.ctx.id;

    if !bus.shared.registers.adapter_reset {
        bus.ctx.in_reset = true;
        bus.step(bus.options.sync.reset_idle_clocks.max(1));
        bus.synchronize();
        return;
    }
    if bus.ctx.in_reset {
        bus.ctx.in_reset = false;
        bus.ctx.boot_rom_mapped = true;
        bus.ctx.dmac.reset();
        bus.shared.irq.restart(core);
        cpu.reset(bus);
        log::debug!("{core} released from reset, PC {:08X}", cpu.pc());
    }

    if !cpu.in_delay_slot()
        && let Some(source) = bus.shared.irq.next_pending(core, cpu.interrupt_mask())
    {
        if source == InterruptSource::Vres {
            bus.shared.irq.acknowledge(core, source);
        }
        log::trace!("{core} takes {source} (level {})", source.level());
        let clocks = cpu.raise_exception(bus, source.level(), source.vector());
        bus.step(clocks.max(1));
        bus.periodic_sync();
        return;
    }

    bus.service_dma();

    let clocks = cpu.execute(bus);
    bus.step(clocks.max(1));

    if bus.options.unmap_boot_rom_after_jump
        && bus.ctx.boot_rom_mapped
        && cpu.pc() & 0x1FFF_FFFF >= BOOT_ROM_END
    {
        bus.ctx.boot_rom_mapped = false;
        log::debug!("{core} left the boot ROM, PC {:08X}", cpu.pc());
    }

    bus.shared.dreq.clear_pwm_request(core);
    bus.periodic_sync();
}
