//! State shared by the host and both SH-2 cores, and the two address
//! decoders in front of it.
//!
//! The external decoder is the whole host-facing surface: the 68K calls
//! [`SharedBus::read_external`] / [`SharedBus::write_external`] for every
//! access in the 32X's windows and [`SharedBus::vblank`] /
//! [`SharedBus::hblank`] from its raster. The internal decoder is split:
//! core-private regions (boot ROM, cache, on-chip registers) are resolved
//! by the core's own bus, shared regions land here after the core has
//! synchronized and, for writes, waited out engagement.

use emu_core::{Lanes, Tickable, Ticks};
use sega_32x_pwm::Pwm;
use sega_32x_vdp::{RegisterEffect, Vdp};

use crate::config::M32xConfig;
use crate::decoder::{
    self, Decoded, ExternalRegion, InternalRegion, RangeTable, external_map, internal_map,
    passthrough_map,
};
use crate::dreq::DreqBridge;
use crate::interrupt::{InterruptRouter, InterruptSource};
use crate::registers::{Accessor, Register, SharedRegisters, external_register, internal_register};
use crate::sh2::CoreId;

/// SDRAM size in half-words (256 KiB).
pub const SDRAM_WORDS: usize = 0x2_0000;

const FM: u16 = 0x8000;
const ADEN_INTERNAL: u16 = 0x0200;
const CART_ABSENT: u16 = 0x0100;
const HEN: u16 = 0x0080;
const REN: u16 = 0x0080;
const RES: u16 = 0x0002;
const ADEN: u16 = 0x0001;

/// ROM images; fixed for the life of the machine and never saved.
#[derive(Debug, Clone, Default)]
struct Roms {
    cartridge: Vec<u8>,
    vector: Vec<u8>,
    boot: [Vec<u8>; 2],
}

/// Big-endian word of `rom` at byte `offset`, if present.
fn rom_word(rom: &[u8], offset: u32) -> Option<u16> {
    let index = (offset & !1) as usize;
    Some(u16::from_be_bytes([*rom.get(index)?, *rom.get(index + 1)?]))
}

pub struct SharedBus {
    pub registers: SharedRegisters,
    pub dreq: DreqBridge,
    pub irq: InterruptRouter,
    pub vdp: Vdp,
    pub pwm: Pwm,
    pub(crate) sdram: Vec<u16>,
    /// Shared devices have run up to here, in SH-2 clocks.
    pub(crate) clock: Ticks,
    roms: Roms,
    internal_map: RangeTable<InternalRegion>,
    external_map: RangeTable<ExternalRegion>,
    passthrough_map: RangeTable<ExternalRegion>,
}

impl SharedBus {
    #[must_use]
    pub fn new(config: &M32xConfig) -> Self {
        Self {
            registers: SharedRegisters::new(),
            dreq: DreqBridge::new(),
            irq: InterruptRouter::new(),
            vdp: Vdp::new(config.vdp_timing, config.region == crate::config::Region::Pal),
            pwm: Pwm::new(),
            sdram: vec![0; SDRAM_WORDS],
            clock: Ticks::ZERO,
            roms: Roms {
                cartridge: config.cartridge.clone(),
                vector: config.vector_rom.clone(),
                boot: [config.master_boot_rom.clone(), config.slave_boot_rom.clone()],
            },
            internal_map: internal_map(),
            external_map: external_map(),
            passthrough_map: passthrough_map(),
        }
    }

    /// Power-on state. ROMs are kept; RAM is cleared.
    pub fn power(&mut self) {
        self.registers.reset();
        self.dreq.reset();
        self.irq = InterruptRouter::new();
        self.vdp.reset();
        self.pwm.reset();
        self.sdram.fill(0);
        self.clock = Ticks::ZERO;
    }

    #[must_use]
    pub fn clock(&self) -> Ticks {
        self.clock
    }

    /// Run shared devices up to `now` and route what they raised. Times
    /// earlier than the shared clock are ignored.
    pub fn advance_to(&mut self, now: Ticks) {
        let elapsed = now.since(self.clock);
        if elapsed == 0 {
            return;
        }
        self.pwm.tick_n(Ticks::new(elapsed));
        self.vdp.tick_wait(u32::try_from(elapsed).unwrap_or(u32::MAX));
        self.clock = now;
        if let Some(event) = self.pwm.take_timer_event() {
            self.irq.raise(InterruptSource::Pwm);
            if event.dreq {
                self.dreq.request_pwm();
            }
        }
    }

    // === Raster ===

    /// Host vertical blank line.
    pub fn vblank(&mut self, line: bool) {
        self.vdp.set_vblank(line);
        if line {
            self.irq.raise(InterruptSource::Vint);
        } else {
            self.registers.hcounter = self.registers.htarget;
        }
    }

    /// Host horizontal blank line. H interrupts count lines only outside
    /// vblank unless HEN is set.
    pub fn hblank(&mut self, line: bool) {
        self.vdp.set_hblank(line);
        if !line || (self.vdp.vblank() && !self.registers.hint_in_vblank) {
            return;
        }
        if self.registers.hcounter == 0 {
            self.registers.hcounter = self.registers.htarget;
            self.irq.raise(InterruptSource::Hint);
        } else {
            self.registers.hcounter -= 1;
        }
    }

    /// Reset button while the adapter is enabled.
    pub fn raise_vres(&mut self) {
        if self.registers.adapter_enable {
            self.irq.raise(InterruptSource::Vres);
        }
    }

    // === Memory ===

    fn cartridge_word(&self, offset: u32) -> Option<u16> {
        rom_word(&self.roms.cartridge, offset)
    }

    #[must_use]
    pub fn boot_rom_word(&self, core: CoreId, offset: u32) -> Option<u16> {
        rom_word(&self.roms.boot[core.index()], offset)
    }

    #[must_use]
    pub fn sdram_word(&self, offset: u32) -> u16 {
        self.sdram[((offset >> 1) as usize) % SDRAM_WORDS]
    }

    fn write_sdram(&mut self, offset: u32, lanes: Lanes, data: u16) {
        let word = &mut self.sdram[((offset >> 1) as usize) % SDRAM_WORDS];
        *word = lanes.merge(*word, data);
    }

    #[must_use]
    pub fn decode_internal(&self, address: u32) -> Option<Decoded<InternalRegion>> {
        self.internal_map.lookup(decoder::fold_cache_through(address))
    }

    // === Registers ===

    /// Side-effect free register value as `accessor` would read it.
    #[must_use]
    pub fn peek_register(&self, accessor: Accessor, register: Register) -> u16 {
        let regs = &self.registers;
        let flag = |set: bool, bit: u16| if set { bit } else { 0 };
        match register {
            Register::InterruptMask => {
                let mask = match accessor {
                    Accessor::Core(core) => self.irq.block(core).mask_bits(),
                    Accessor::Host => 0,
                };
                flag(self.vdp.framebuffer_access(), FM)
                    | flag(regs.adapter_enable, ADEN_INTERNAL)
                    | flag(self.roms.cartridge.is_empty(), CART_ABSENT)
                    | flag(regs.hint_in_vblank, HEN)
                    | mask
            }
            Register::AdapterControl => {
                flag(self.vdp.framebuffer_access(), FM)
                    | REN
                    | flag(regs.adapter_reset, RES)
                    | flag(regs.adapter_enable, ADEN)
            }
            Register::StandBy | Register::InterruptClear(_) => 0,
            Register::InterruptControl => {
                let active = |core| self.irq.block(core).latch(InterruptSource::Cmd).active;
                flag(active(CoreId::Master), 1) | flag(active(CoreId::Slave), 2)
            }
            Register::HCount => u16::from(regs.htarget),
            Register::BankSet => u16::from(regs.rom_bank),
            Register::DreqControl => self.dreq.control(),
            Register::DreqSourceHigh => self.dreq.source_high(),
            Register::DreqSourceLow => self.dreq.source_low(),
            Register::DreqDestinationHigh => self.dreq.destination_high(),
            Register::DreqDestinationLow => self.dreq.destination_low(),
            Register::DreqLength => self.dreq.length(),
            Register::DreqFifo => self.dreq.peek(),
            Register::SegaTv => regs.sega_tv,
            Register::Communication(port) => regs.communication[usize::from(port)],
            Register::Pwm(offset) => self.pwm.read(u32::from(offset)),
        }
    }

    pub fn read_register(&mut self, accessor: Accessor, register: Register) -> u16 {
        let value = match (accessor, register) {
            (Accessor::Core(_), Register::DreqFifo) => self.dreq.read_fifo(),
            _ => self.peek_register(accessor, register),
        };
        log::trace!("{accessor} read {register:?} = {value:04X}");
        value
    }

    pub fn write_register(&mut self, accessor: Accessor, register: Register, lanes: Lanes, data: u16) {
        let value = lanes.merge(self.peek_register(accessor, register), data);
        log::trace!("{accessor} write {register:?} = {value:04X}");
        match (accessor, register) {
            (Accessor::Core(core), Register::InterruptMask) => {
                self.vdp.set_framebuffer_access(value & FM != 0);
                self.registers.hint_in_vblank = value & HEN != 0;
                self.irq.block_mut(core).set_mask_bits(value);
            }
            (Accessor::Host, Register::AdapterControl) => {
                self.vdp.set_framebuffer_access(value & FM != 0);
                self.registers.adapter_enable = value & ADEN != 0;
                self.registers.adapter_reset = value & RES != 0;
            }
            (Accessor::Host, Register::InterruptControl) => {
                if value & 1 != 0 {
                    self.irq.raise_on(CoreId::Master, InterruptSource::Cmd);
                }
                if value & 2 != 0 {
                    self.irq.raise_on(CoreId::Slave, InterruptSource::Cmd);
                }
            }
            (Accessor::Core(_), Register::StandBy) => {}
            (Accessor::Core(_), Register::HCount) => self.registers.htarget = value as u8,
            (Accessor::Host, Register::BankSet) => self.registers.rom_bank = (value & 3) as u8,
            (Accessor::Host, Register::DreqControl) => self.dreq.write_control(value),
            (Accessor::Host, Register::DreqSourceHigh) => self.dreq.set_source_high(value),
            (Accessor::Host, Register::DreqSourceLow) => self.dreq.set_source_low(value),
            (Accessor::Host, Register::DreqDestinationHigh) => self.dreq.set_destination_high(value),
            (Accessor::Host, Register::DreqDestinationLow) => self.dreq.set_destination_low(value),
            (Accessor::Host, Register::DreqLength) => self.dreq.set_length(value),
            (Accessor::Host, Register::DreqFifo) => {
                // The FIFO takes the written word as-is.
                self.dreq.push(data);
            }
            (Accessor::Core(core), Register::InterruptClear(source)) => {
                self.irq.acknowledge(core, source);
            }
            (Accessor::Host, Register::SegaTv) => self.registers.sega_tv = value & 1,
            (_, Register::Communication(port)) => {
                self.registers.communication[usize::from(port)] = value;
            }
            (_, Register::Pwm(offset)) => self.pwm.write(u32::from(offset), value),
            _ => log::debug!("{accessor} write to read-only {register:?} dropped: {value:04X}"),
        }
    }

    // === Internal bus, shared regions ===

    /// Read from a shared internal region. The caller has synchronized.
    pub fn read_internal(
        &mut self,
        core: CoreId,
        decoded: Decoded<InternalRegion>,
        prior: u16,
    ) -> u16 {
        let Decoded { region, offset } = decoded;
        match region {
            InternalRegion::SystemRegisters => match internal_register(offset) {
                Some(register) => self.read_register(Accessor::Core(core), register),
                None => {
                    log::debug!("{core} read from unmapped register +{offset:02X}");
                    prior
                }
            },
            InternalRegion::VdpRegisters => self.vdp.read_register(offset),
            InternalRegion::Palette => self.vdp.read_palette(offset),
            InternalRegion::Cartridge => self.cartridge_word(offset).unwrap_or(prior),
            InternalRegion::Framebuffer | InternalRegion::Overwrite => {
                self.vdp.read_framebuffer(offset)
            }
            InternalRegion::Sdram => self.sdram_word(offset),
            InternalRegion::BootRom | InternalRegion::CacheData | InternalRegion::OnChip => prior,
        }
    }

    /// Write to a shared internal region. The caller has synchronized and
    /// waited for the target to disengage; an autofill request is handed
    /// back so the fill can be gated word by word.
    pub fn write_internal(
        &mut self,
        core: CoreId,
        decoded: Decoded<InternalRegion>,
        lanes: Lanes,
        data: u16,
    ) -> RegisterEffect {
        let Decoded { region, offset } = decoded;
        match region {
            InternalRegion::SystemRegisters => match internal_register(offset) {
                Some(register) => self.write_register(Accessor::Core(core), register, lanes, data),
                None => log::debug!("{core} write to unmapped register +{offset:02X} dropped"),
            },
            InternalRegion::VdpRegisters => {
                let value = lanes.merge(self.vdp.read_register(offset), data);
                log::trace!("{core} write VDP +{offset:X} = {value:04X}");
                return self.vdp.write_register(offset, value);
            }
            InternalRegion::Palette => self.vdp.write_palette(offset, lanes, data),
            InternalRegion::Framebuffer => self.vdp.write_framebuffer(offset, lanes, data),
            InternalRegion::Overwrite => self.vdp.write_overwrite(offset, lanes, data),
            InternalRegion::Sdram => self.write_sdram(offset, lanes, data),
            InternalRegion::Cartridge => {
                log::debug!("{core} write to cartridge +{offset:06X} dropped");
            }
            InternalRegion::BootRom | InternalRegion::CacheData | InternalRegion::OnChip => {}
        }
        RegisterEffect::None
    }

    // === External bus ===

    fn decode_external(&self, address: u32) -> Option<Decoded<ExternalRegion>> {
        let map = if self.registers.adapter_enable {
            &self.external_map
        } else {
            &self.passthrough_map
        };
        map.lookup(address & 0x00FF_FFFF)
    }

    /// Host read. Unclaimed addresses return `prior` unchanged.
    pub fn read_external(&mut self, lanes: Lanes, address: u32, prior: u16) -> u16 {
        let Some(Decoded { region, offset }) = self.decode_external(address) else {
            log::debug!("host read from unmapped {address:06X} ({lanes:?})");
            return prior;
        };
        let value = match region {
            ExternalRegion::CartridgePassthrough => self.cartridge_word(offset),
            ExternalRegion::VectorRom => rom_word(&self.roms.vector, offset),
            ExternalRegion::CartridgeLow => {
                if self.dreq.rom_to_vram() {
                    self.cartridge_word(offset)
                } else {
                    None
                }
            }
            ExternalRegion::Framebuffer | ExternalRegion::Overwrite => {
                Some(self.vdp.read_framebuffer(offset))
            }
            ExternalRegion::FixedRom => self.cartridge_word(offset),
            ExternalRegion::BankedRom => {
                self.cartridge_word((u32::from(self.registers.rom_bank) << 20) | offset)
            }
            ExternalRegion::SystemRegisters => external_register(offset)
                .map(|register| self.read_register(Accessor::Host, register)),
            ExternalRegion::VdpRegisters => Some(self.vdp.read_register(offset)),
            ExternalRegion::Palette => Some(self.vdp.read_palette(offset)),
        };
        value.unwrap_or_else(|| {
            log::debug!("host read from {region:?} +{offset:X} not answered");
            prior
        })
    }

    /// Host write. The host is never held off by engagement.
    pub fn write_external(&mut self, lanes: Lanes, address: u32, data: u16) {
        let Some(Decoded { region, offset }) = self.decode_external(address) else {
            log::debug!("host write to unmapped {address:06X} dropped: {data:04X}");
            return;
        };
        match region {
            ExternalRegion::CartridgePassthrough
            | ExternalRegion::VectorRom
            | ExternalRegion::CartridgeLow
            | ExternalRegion::FixedRom
            | ExternalRegion::BankedRom => {
                log::debug!("host write to ROM {address:06X} dropped: {data:04X}");
            }
            ExternalRegion::Framebuffer => self.vdp.write_framebuffer(offset, lanes, data),
            ExternalRegion::Overwrite => self.vdp.write_overwrite(offset, lanes, data),
            ExternalRegion::SystemRegisters => match external_register(offset) {
                Some(register) => self.write_register(Accessor::Host, register, lanes, data),
                None => log::debug!("host write to unmapped register +{offset:02X} dropped"),
            },
            ExternalRegion::VdpRegisters => {
                let value = lanes.merge(self.vdp.read_register(offset), data);
                log::trace!("host write VDP +{offset:X} = {value:04X}");
                if let RegisterEffect::Autofill {
                    word_address,
                    data,
                    length,
                } = self.vdp.write_register(offset, value)
                {
                    self.vdp.autofill(u32::from(word_address) << 1, data, length);
                }
            }
            ExternalRegion::Palette => self.vdp.write_palette(offset, lanes, data),
        }
    }
}
