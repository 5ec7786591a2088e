//! The 32X system registers: one canonical store, two address views.
//!
//! Both buses resolve an address to a [`Register`] first; the register,
//! not the address, decides what is read or written. The internal view
//! ($4000 block on the SH-2 side) and the external view ($A15100 block on
//! the 68K side) differ only in which registers they expose and which are
//! writable.
//!
//! | Internal | External | Register                                   |
//! |----------|----------|--------------------------------------------|
//! | $4000    | $A15100  | Adapter control / interrupt mask           |
//! | $4002    | $A15102  | Standby / interrupt control (CMD raise)    |
//! | $4004    | $A15104  | H counter / bank set                       |
//! | $4006    | $A15106  | DREQ control                               |
//! | $4008-A  | $A15108-A| DREQ source                                |
//! | $400C-E  | $A1510C-E| DREQ destination                           |
//! | $4010    | $A15110  | DREQ length                                |
//! | $4012    | $A15112  | DREQ FIFO (read internal, write external)  |
//! | $4014-1C |          | VRES/VINT/HINT/CMD/PWM clear               |
//! |          | $A1511A  | SEGA TV                                    |
//! | $4020-2E | $A15120-2E | Communication ports                      |
//! | $4030-38 | $A15130-38 | PWM                                      |

use std::fmt;

use bincode::{Decode, Encode};

use crate::interrupt::InterruptSource;
use crate::sh2::CoreId;

/// Who is accessing a register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accessor {
    /// The 68K, through the external bus.
    Host,
    /// An SH-2 core, through the internal bus.
    Core(CoreId),
}

impl fmt::Display for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host => f.write_str("host"),
            Self::Core(core) => write!(f, "{core}"),
        }
    }
}

/// A system register, independent of the address it was reached through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    /// Internal $4000: FM, ADEN, HEN and the core's interrupt mask.
    InterruptMask,
    /// External $A15100: FM, REN, RES, ADEN.
    AdapterControl,
    /// Internal $4002.
    StandBy,
    /// External $A15102: INTM/INTS raise CMD on Master/Slave.
    InterruptControl,
    /// Internal $4004: H interrupt interval.
    HCount,
    /// External $A15104: cartridge bank at $900000.
    BankSet,
    DreqControl,
    DreqSourceHigh,
    DreqSourceLow,
    DreqDestinationHigh,
    DreqDestinationLow,
    DreqLength,
    DreqFifo,
    InterruptClear(InterruptSource),
    SegaTv,
    /// Communication port 0-7.
    Communication(u8),
    /// PWM register at this offset within the PWM block.
    Pwm(u8),
}

/// Internal view: `offset` within the $4000 block.
#[must_use]
pub fn internal_register(offset: u32) -> Option<Register> {
    let register = match offset & 0xFE {
        0x00 => Register::InterruptMask,
        0x02 => Register::StandBy,
        0x04 => Register::HCount,
        0x06 => Register::DreqControl,
        0x08 => Register::DreqSourceHigh,
        0x0A => Register::DreqSourceLow,
        0x0C => Register::DreqDestinationHigh,
        0x0E => Register::DreqDestinationLow,
        0x10 => Register::DreqLength,
        0x12 => Register::DreqFifo,
        0x14 => Register::InterruptClear(InterruptSource::Vres),
        0x16 => Register::InterruptClear(InterruptSource::Vint),
        0x18 => Register::InterruptClear(InterruptSource::Hint),
        0x1A => Register::InterruptClear(InterruptSource::Cmd),
        0x1C => Register::InterruptClear(InterruptSource::Pwm),
        0x20..=0x2E => Register::Communication(((offset & 0x0E) >> 1) as u8),
        0x30..=0x38 => Register::Pwm((offset & 0x0E) as u8),
        _ => return None,
    };
    Some(register)
}

/// External view: `offset` within the $A15100 block.
#[must_use]
pub fn external_register(offset: u32) -> Option<Register> {
    let register = match offset & 0xFE {
        0x00 => Register::AdapterControl,
        0x02 => Register::InterruptControl,
        0x04 => Register::BankSet,
        0x06 => Register::DreqControl,
        0x08 => Register::DreqSourceHigh,
        0x0A => Register::DreqSourceLow,
        0x0C => Register::DreqDestinationHigh,
        0x0E => Register::DreqDestinationLow,
        0x10 => Register::DreqLength,
        0x12 => Register::DreqFifo,
        0x1A => Register::SegaTv,
        0x20..=0x2E => Register::Communication(((offset & 0x0E) >> 1) as u8),
        0x30..=0x38 => Register::Pwm((offset & 0x0E) as u8),
        _ => return None,
    };
    Some(register)
}

/// Plain storage behind the system registers. DREQ, interrupt, PWM and
/// VDP state live with their own devices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Encode, Decode)]
pub struct SharedRegisters {
    /// ADEN: adapter enabled, 32X memory map visible to the host.
    pub adapter_enable: bool,
    /// RES: cores released from reset.
    pub adapter_reset: bool,
    /// HEN: H interrupts continue during vblank.
    pub hint_in_vblank: bool,
    /// Lines between H interrupts, minus one.
    pub htarget: u8,
    pub hcounter: u8,
    pub rom_bank: u8,
    pub sega_tv: u16,
    pub communication: [u16; 8],
}

impl SharedRegisters {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
