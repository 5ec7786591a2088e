//! Sega 32X coprocessor subsystem.
//!
//! Two SH-2 cores share a 32-bit internal bus with the framebuffer VDP,
//! the PWM sound source and a block of system registers that the 68K also
//! sees through its own window. Nothing runs in parallel: the cores and
//! the host are interleaved by a cooperative scheduler that synchronizes
//! them at every shared access.
//!
//! The crate owns everything between the CPUs. The SH-2 interpreter comes
//! in through [`Sh2Interpreter`], the 68K and its raster through
//! [`HostDomain`].
//!
//! ```text
//!   68K ──read/write_external──┐          ┌── CoreBus (Master) ── SH-2
//!   raster ──vblank/hblank─────┤          │
//!                              SharedBus ─┤
//!                  (registers, DREQ, IRQ, │
//!                   VDP, PWM, SDRAM)      └── CoreBus (Slave) ─── SH-2
//! ```

pub mod bus;
pub mod config;
pub mod decoder;
pub mod dmac;
pub mod dreq;
pub mod error;
pub mod interrupt;
pub mod m32x;
pub mod registers;
pub mod sh2;
pub mod snapshot;
pub mod sync;

pub use crate::bus::SharedBus;
pub use crate::config::{M32xConfig, Region, SyncConfig};
pub use crate::error::{ConfigError, SnapshotError};
pub use crate::interrupt::InterruptSource;
pub use crate::m32x::M32x;
pub use crate::sh2::{CoreId, Sh2Interpreter, Sh2Registers};
pub use crate::sync::{HostDomain, NoHost};
pub use emu_core;
pub use sega_32x_pwm;
pub use sega_32x_vdp;
