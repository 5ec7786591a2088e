//! Save states.
//!
//! A snapshot is the magic `32XS`, a version byte, then each component
//! bincode-encoded in a fixed order: shared registers, DREQ bridge, Master
//! (interpreter registers, then context), Slave, interrupt latches, VDP,
//! PWM, SDRAM, shared device clock. ROM images are not included.
//!
//! Decoded memory arrays must have their power-on sizes; anything else is
//! rejected before it reaches the machine.

use std::io::{Read, Write};

use bincode::config::{Configuration, standard};
use bincode::{Decode, Encode};
use sega_32x_pwm::Pwm;
use sega_32x_vdp::Vdp;

use crate::bus::SDRAM_WORDS;
use crate::error::SnapshotError;
use crate::m32x::M32x;
use crate::sh2::{ClockedCore, CoreContext, Sh2Interpreter, Sh2Registers};

const MAGIC: &[u8; 4] = b"32XS";
const VERSION: u8 = 1;

const CONFIG: Configuration = standard();

fn put<T: Encode, W: Write>(writer: &mut W, value: &T) -> Result<(), SnapshotError> {
    bincode::encode_into_std_write(value, writer, CONFIG)?;
    Ok(())
}

fn take<T: Decode<()>, R: Read>(reader: &mut R) -> Result<T, SnapshotError> {
    Ok(bincode::decode_from_std_read(reader, CONFIG)?)
}

fn put_core<S: Sh2Interpreter, W: Write>(
    writer: &mut W,
    core: &ClockedCore<S>,
) -> Result<(), SnapshotError> {
    put(writer, &core.cpu.registers())?;
    put(writer, &core.ctx)
}

fn check(well_formed: bool, part: &'static str) -> Result<(), SnapshotError> {
    if well_formed {
        Ok(())
    } else {
        Err(SnapshotError::Malformed(part))
    }
}

fn take_core<S: Sh2Interpreter, R: Read>(
    reader: &mut R,
    core: &mut ClockedCore<S>,
) -> Result<(), SnapshotError> {
    let registers: Sh2Registers = take(reader)?;
    let ctx: CoreContext = take(reader)?;
    check(ctx.is_well_formed(), "core context")?;
    core.cpu.set_registers(&registers);
    core.ctx = ctx;
    Ok(())
}

impl<S: Sh2Interpreter> M32x<S> {
    pub fn serialize<W: Write>(&self, writer: &mut W) -> Result<(), SnapshotError> {
        writer.write_all(MAGIC)?;
        writer.write_all(&[VERSION])?;
        let shared = &self.shared;
        put(writer, &shared.registers)?;
        put(writer, &shared.dreq)?;
        put_core(writer, &self.master)?;
        put_core(writer, &self.slave)?;
        put(writer, &shared.irq)?;
        put(writer, &shared.vdp)?;
        put(writer, &shared.pwm)?;
        put(writer, &shared.sdram)?;
        put(writer, &shared.clock)
    }

    /// Restore a snapshot written by [`M32x::serialize`].
    ///
    /// The header is checked before anything is touched; a payload that
    /// fails to decode part way leaves the machine partly restored.
    pub fn deserialize<R: Read>(&mut self, reader: &mut R) -> Result<(), SnapshotError> {
        let mut header = [0u8; 5];
        reader.read_exact(&mut header)?;
        if &header[..4] != MAGIC {
            return Err(SnapshotError::BadMagic);
        }
        if header[4] != VERSION {
            return Err(SnapshotError::UnsupportedVersion(header[4]));
        }
        self.shared.registers = take(reader)?;
        self.shared.dreq = take(reader)?;
        take_core(reader, &mut self.master)?;
        take_core(reader, &mut self.slave)?;
        self.shared.irq = take(reader)?;
        let vdp: Vdp = take(reader)?;
        check(vdp.is_well_formed(), "VDP")?;
        self.shared.vdp = vdp;
        let pwm: Pwm = take(reader)?;
        check(pwm.is_well_formed(), "PWM")?;
        self.shared.pwm = pwm;
        let sdram: Vec<u16> = take(reader)?;
        check(sdram.len() == SDRAM_WORDS, "SDRAM")?;
        self.shared.sdram = sdram;
        self.shared.clock = take(reader)?;
        log::debug!("snapshot restored at clock {}", self.clock().get());
        Ok(())
    }

    pub fn save_state(&self) -> Result<Vec<u8>, SnapshotError> {
        let mut bytes = Vec::new();
        self.serialize(&mut bytes)?;
        Ok(bytes)
    }

    pub fn load_state(&mut self, bytes: &[u8]) -> Result<(), SnapshotError> {
        let mut reader = bytes;
        self.deserialize(&mut reader)
    }
}
