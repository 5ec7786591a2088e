//! SH7604 on-chip DMA controller registers and the cache control register.
//!
//! Only register state and address arithmetic live here; the transfers
//! themselves go through the core's bus so they see the same memory map
//! and engagement rules as instructions do.
//!
//! | Address    | Register                 |
//! |------------|--------------------------|
//! | $FFFFFE71  | DRCR0 (request select)   |
//! | $FFFFFE72  | DRCR1                    |
//! | $FFFFFE92  | CCR (bit 0: cache enable)|
//! | $FFFFFF80  | SAR0                     |
//! | $FFFFFF84  | DAR0                     |
//! | $FFFFFF88  | TCR0 (24-bit)            |
//! | $FFFFFF8C  | CHCR0                    |
//! | $FFFFFF90  | SAR1 ... CHCR1           |
//! | $FFFFFFB0  | DMAOR (bit 0: DME)       |

use bincode::{Decode, Encode};
use emu_core::Lanes;

const CHCR_DE: u32 = 0x0001;
const CHCR_TE: u32 = 0x0002;
const CHCR_AR: u32 = 0x0200;
const CHCR_WRITABLE: u32 = 0xFFFD;

const DMAOR_DME: u32 = 0x0001;

const CCR_CE: u8 = 0x01;

/// A transfer counter of 0 runs for this many units.
const FULL_COUNT: u32 = 0x0100_0000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferSize {
    Byte,
    Word,
    Long,
    /// Four longs per request.
    Block16,
}

impl TransferSize {
    #[must_use]
    pub const fn bytes(self) -> u32 {
        match self {
            Self::Byte => 1,
            Self::Word => 2,
            Self::Long => 4,
            Self::Block16 => 16,
        }
    }

    /// DREQ FIFO half-words consumed per transfer unit.
    #[must_use]
    pub const fn fifo_words(self) -> usize {
        match self {
            Self::Byte | Self::Word => 1,
            Self::Long => 2,
            Self::Block16 => 8,
        }
    }

    /// Transfer counter decrement per unit; 16-byte units count as four
    /// longs.
    const fn count_step(self) -> u32 {
        match self {
            Self::Block16 => 4,
            _ => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressMode {
    Fixed,
    Increment,
    Decrement,
}

impl AddressMode {
    const fn from_bits(bits: u32) -> Self {
        match bits & 3 {
            1 => Self::Increment,
            2 => Self::Decrement,
            _ => Self::Fixed,
        }
    }

    /// Next address after moving `bytes`.
    #[must_use]
    pub const fn step(self, address: u32, bytes: u32) -> u32 {
        match self {
            Self::Fixed => address,
            Self::Increment => address.wrapping_add(bytes),
            Self::Decrement => address.wrapping_sub(bytes),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Encode, Decode)]
pub struct DmaChannel {
    pub source: u32,
    pub destination: u32,
    /// Transfer counter, 24 bits.
    pub count: u32,
    /// CHCR.
    pub control: u32,
    /// DRCR request source select (not modelled beyond storage).
    pub request_select: u8,
}

impl DmaChannel {
    /// `enable` (DE) set and `complete` (TE) clear.
    #[must_use]
    pub fn armed(&self) -> bool {
        self.control & (CHCR_DE | CHCR_TE) == CHCR_DE
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.control & CHCR_DE != 0
    }

    #[must_use]
    pub fn complete(&self) -> bool {
        self.control & CHCR_TE != 0
    }

    /// AR: memory-to-memory without an external request.
    #[must_use]
    pub fn auto_request(&self) -> bool {
        self.control & CHCR_AR != 0
    }

    #[must_use]
    pub fn size(&self) -> TransferSize {
        match (self.control >> 10) & 3 {
            0 => TransferSize::Byte,
            1 => TransferSize::Word,
            2 => TransferSize::Long,
            _ => TransferSize::Block16,
        }
    }

    #[must_use]
    pub fn source_mode(&self) -> AddressMode {
        AddressMode::from_bits(self.control >> 12)
    }

    #[must_use]
    pub fn destination_mode(&self) -> AddressMode {
        AddressMode::from_bits(self.control >> 14)
    }

    /// Account for one transfer unit. Returns true when the channel just
    /// completed.
    pub fn complete_unit(&mut self) -> bool {
        let size = self.size();
        let bytes = size.bytes();
        self.source = self.source_mode().step(self.source, bytes);
        self.destination = self.destination_mode().step(self.destination, bytes);
        let count = if self.count == 0 { FULL_COUNT } else { self.count };
        self.count = count.saturating_sub(size.count_step()) & 0x00FF_FFFF;
        if self.count == 0 {
            self.control &= !CHCR_DE;
            self.control |= CHCR_TE;
            return true;
        }
        false
    }

    fn write_control(&mut self, value: u32) {
        // TE can only be cleared by software, never set.
        let te = if value & CHCR_TE == 0 { 0 } else { self.control & CHCR_TE };
        self.control = (value & CHCR_WRITABLE) | te;
    }
}

/// One core's DMA controller plus its cache control register.
#[derive(Debug, Clone, Default, PartialEq, Eq, Encode, Decode)]
pub struct Dmac {
    pub channels: [DmaChannel; 2],
    /// DMAOR.
    pub operation: u32,
    /// CCR.
    pub cache_control: u8,
}

impl Dmac {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// DME set: channels may run.
    #[must_use]
    pub fn master_enable(&self) -> bool {
        self.operation & DMAOR_DME != 0
    }

    #[must_use]
    pub fn cache_enabled(&self) -> bool {
        self.cache_control & CCR_CE != 0
    }

    /// Channel `index` may transfer right now.
    #[must_use]
    pub fn runnable(&self, index: usize) -> bool {
        self.master_enable() && self.channels[index].armed()
    }

    /// Half-word read of an on-chip register; `None` if not decoded here.
    #[must_use]
    pub fn read(&self, address: u32) -> Option<u16> {
        let value = match address {
            0xFFFF_FE70 => u16::from(self.channels[0].request_select),
            0xFFFF_FE72 => u16::from(self.channels[1].request_select) << 8,
            0xFFFF_FE92 => u16::from(self.cache_control) << 8,
            0xFFFF_FF80..=0xFFFF_FF9E => {
                let channel = &self.channels[((address >> 4) & 1) as usize];
                let long = match address & 0xC {
                    0x0 => channel.source,
                    0x4 => channel.destination,
                    0x8 => channel.count,
                    _ => channel.control,
                };
                half(long, address)
            }
            0xFFFF_FFB0..=0xFFFF_FFB2 => half(self.operation, address),
            _ => return None,
        };
        Some(value)
    }

    /// Half-word write; returns false if not decoded here.
    pub fn write(&mut self, address: u32, lanes: Lanes, data: u16) -> bool {
        let Some(old) = self.read(address) else {
            return false;
        };
        let value = lanes.merge(old, data);
        match address {
            0xFFFF_FE70 => self.channels[0].request_select = value as u8 & 3,
            0xFFFF_FE72 => self.channels[1].request_select = (value >> 8) as u8 & 3,
            0xFFFF_FE92 => self.cache_control = (value >> 8) as u8,
            0xFFFF_FF80..=0xFFFF_FF9E => {
                let channel = &mut self.channels[((address >> 4) & 1) as usize];
                match address & 0xC {
                    0x0 => channel.source = set_half(channel.source, address, value),
                    0x4 => channel.destination = set_half(channel.destination, address, value),
                    0x8 => channel.count = set_half(channel.count, address, value) & 0x00FF_FFFF,
                    _ => {
                        let control = set_half(channel.control, address, value);
                        channel.write_control(control);
                    }
                }
            }
            _ => self.operation = set_half(self.operation, address, value) & 0x000F,
        }
        true
    }
}

fn half(long: u32, address: u32) -> u16 {
    if address & 2 == 0 { (long >> 16) as u16 } else { long as u16 }
}

fn set_half(long: u32, address: u32, value: u16) -> u32 {
    if address & 2 == 0 {
        (long & 0x0000_FFFF) | (u32::from(value) << 16)
    } else {
        (long & 0xFFFF_0000) | u32::from(value)
    }
}
