//! Scripted stand-ins for the SH-2 interpreter and the 68K side.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};

use emu_core::{Lanes, Ticks, WordBus};
use machine_32x::sync::sh2_clock_at;
use machine_32x::{HostDomain, M32x, M32xConfig, Sh2Interpreter, Sh2Registers, SharedBus};

/// Value a [`ScriptedCpu`] puts on the bus before each read.
pub const OPEN_BUS: u16 = 0xA5A5;

/// Adapter control: ADEN and RES.
pub const ADAPTER_ON: u16 = 0x0003;

/// NTSC line, in SH-2 clocks.
pub const LINE_CLOCKS: u64 = sh2_clock_at(488).get();
pub const HBLANK_CLOCKS: u64 = 300;
pub const LINES: u16 = 262;
pub const ACTIVE_LINES: u16 = 224;
pub const FRAME_CLOCKS: u64 = LINE_CLOCKS * LINES as u64;

/// One scripted instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Read(u32),
    Write(u32, u16),
    WriteByte(u32, u8),
    WriteLong(u32, u32),
    /// Write then read inside the same instruction, with no time between.
    WriteRead { write: (u32, u16), read: u32 },
    /// Spend clocks without touching the bus.
    Idle(u32),
    /// Return from an exception handler.
    Return,
}

/// An interpreter that runs a list of bus operations.
///
/// Exceptions push the handler registered for their vector in front of the
/// remaining program and raise the mask to the interrupt level; `Return`
/// restores it.
#[derive(Debug, Clone, Default)]
pub struct ScriptedCpu {
    pub program: VecDeque<Op>,
    pub handlers: HashMap<u8, Vec<Op>>,
    /// Every read performed, in order.
    pub reads: Vec<(u32, u16)>,
    /// Vectors taken, in order.
    pub taken: Vec<u8>,
    pub mask: u8,
    saved_masks: Vec<u8>,
    pub pc: u32,
    /// Clocks an empty program spends per instruction.
    pub idle_clocks: u32,
}

impl ScriptedCpu {
    pub fn new(program: impl IntoIterator<Item = Op>) -> Self {
        Self {
            program: program.into_iter().collect(),
            idle_clocks: 4,
            ..Self::default()
        }
    }

    pub fn idle() -> Self {
        Self::new([])
    }

    pub fn on(mut self, vector: u8, handler: impl IntoIterator<Item = Op>) -> Self {
        self.handlers.insert(vector, handler.into_iter().collect());
        self
    }

    pub fn count(&self, vector: u8) -> usize {
        self.taken.iter().filter(|&&taken| taken == vector).count()
    }

    pub fn reads_of(&self, address: u32) -> Vec<u16> {
        self.reads
            .iter()
            .filter(|(read, _)| *read == address)
            .map(|&(_, value)| value)
            .collect()
    }

    fn read<B: WordBus>(&mut self, bus: &mut B, address: u32) {
        let value = bus.read_word(Lanes::WORD, address, OPEN_BUS);
        self.reads.push((address, value));
    }
}

impl Sh2Interpreter for ScriptedCpu {
    fn execute<B: WordBus>(&mut self, bus: &mut B) -> u32 {
        let Some(op) = self.program.pop_front() else {
            return self.idle_clocks;
        };
        self.pc = self.pc.wrapping_add(2);
        match op {
            Op::Read(address) => self.read(bus, address),
            Op::Write(address, data) => bus.write_word(Lanes::WORD, address, data),
            Op::WriteByte(address, data) => bus.write_byte(address, data),
            Op::WriteLong(address, data) => bus.write_long(address, data),
            Op::WriteRead { write, read } => {
                bus.write_word(Lanes::WORD, write.0, write.1);
                self.read(bus, read);
            }
            Op::Idle(clocks) => return clocks,
            Op::Return => self.mask = self.saved_masks.pop().unwrap_or(0),
        }
        1
    }

    fn interrupt_mask(&self) -> u8 {
        self.mask
    }

    fn in_delay_slot(&self) -> bool {
        false
    }

    fn raise_exception<B: WordBus>(&mut self, _bus: &mut B, level: u8, vector: u8) -> u32 {
        self.saved_masks.push(self.mask);
        self.mask = level;
        self.taken.push(vector);
        if let Some(handler) = self.handlers.get(&vector) {
            for op in handler.iter().rev() {
                self.program.push_front(op.clone());
            }
        }
        13
    }

    fn pc(&self) -> u32 {
        self.pc
    }

    fn reset<B: WordBus>(&mut self, bus: &mut B) {
        self.pc = bus.read_long(0);
        self.mask = 0;
        self.saved_masks.clear();
    }

    fn registers(&self) -> Sh2Registers {
        Sh2Registers {
            pc: self.pc,
            sr: u32::from(self.mask) << 4,
            ..Sh2Registers::default()
        }
    }

    fn set_registers(&mut self, registers: &Sh2Registers) {
        self.pc = registers.pc;
        self.mask = ((registers.sr >> 4) & 0xF) as u8;
    }
}

/// Something the host does at a given time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostAction {
    Write(u32, u16),
    Vblank(bool),
    Hblank(bool),
}

#[derive(Debug, Clone)]
struct Raster {
    line: u16,
    in_hblank: bool,
    next_edge: Ticks,
}

/// A 68K side that performs timed writes and, optionally, drives an NTSC
/// raster starting at line 0.
#[derive(Debug, Clone, Default)]
pub struct ScriptedHost {
    clock: Ticks,
    actions: VecDeque<(Ticks, HostAction)>,
    raster: Option<Raster>,
    pub vblanks: u32,
}

impl ScriptedHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_raster() -> Self {
        Self {
            raster: Some(Raster {
                line: 0,
                in_hblank: false,
                next_edge: Ticks::new(LINE_CLOCKS - HBLANK_CLOCKS),
            }),
            ..Self::default()
        }
    }

    /// Schedule `action` at SH-2 clock `at`. Actions must be added in time
    /// order.
    pub fn at(mut self, at: u64, action: HostAction) -> Self {
        self.actions.push_back((Ticks::new(at), action));
        self
    }

    pub fn clock(&self) -> Ticks {
        self.clock
    }

    fn next_event(&self) -> Option<Ticks> {
        let action = self.actions.front().map(|&(at, _)| at);
        let edge = self.raster.as_ref().map(|raster| raster.next_edge);
        match (action, edge) {
            (Some(a), Some(e)) => Some(a.min(e)),
            (a, e) => a.or(e),
        }
    }

    fn raster_edge(&mut self, bus: &mut SharedBus) {
        let Some(raster) = self.raster.as_mut() else {
            return;
        };
        if raster.in_hblank {
            bus.hblank(false);
            raster.in_hblank = false;
            raster.line = (raster.line + 1) % LINES;
            if raster.line == ACTIVE_LINES {
                bus.vblank(true);
                self.vblanks += 1;
            } else if raster.line == 0 {
                bus.vblank(false);
            }
            raster.next_edge += LINE_CLOCKS - HBLANK_CLOCKS;
        } else {
            bus.hblank(true);
            raster.in_hblank = true;
            raster.next_edge += HBLANK_CLOCKS;
        }
    }
}

impl HostDomain for ScriptedHost {
    fn catch_up(&mut self, bus: &mut SharedBus, until: Ticks) {
        while let Some(at) = self.next_event() {
            if at > until {
                break;
            }
            let action_due = self.actions.front().is_some_and(|&(when, _)| when == at);
            if action_due {
                if let Some((_, action)) = self.actions.pop_front() {
                    match action {
                        HostAction::Write(address, data) => {
                            bus.write_external(Lanes::WORD, address, data);
                        }
                        HostAction::Vblank(line) => bus.vblank(line),
                        HostAction::Hblank(line) => bus.hblank(line),
                    }
                }
            } else {
                self.raster_edge(bus);
            }
        }
        self.clock = self.clock.max(until);
    }
}

pub fn config() -> M32xConfig {
    M32xConfig::default()
}

/// Machine with the adapter enabled and both cores released.
pub fn machine(master: ScriptedCpu, slave: ScriptedCpu) -> M32x<ScriptedCpu> {
    machine_with(&config(), master, slave)
}

pub fn machine_with(
    config: &M32xConfig,
    master: ScriptedCpu,
    slave: ScriptedCpu,
) -> M32x<ScriptedCpu> {
    let mut m32x = M32x::new(config, master, slave).expect("valid config");
    m32x.write_external(Lanes::WORD, 0xA1_5100, ADAPTER_ON);
    m32x
}
