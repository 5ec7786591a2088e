//! Sega 32X PWM sound source.
//!
//! Two pulse-width FIFOs are drained at a rate set by a 12-bit cycle
//! divider of the SH-2 clock. Every `TM` sample periods the timer fires:
//! the subsystem raises the PWM interrupt on both cores and, with `RTP`
//! set, pulses DMA channel 1's request line so a core can refill the FIFOs.
//!
//! # Registers (offset from $4030 internal / $A15130 external)
//!
//! | Off | Name   | Description                                          |
//! |-----|--------|------------------------------------------------------|
//! | $0  | CTRL   | Bits 0-1 LMD, 2-3 RMD, 4 MONO, 7 RTP, 8-11 TM        |
//! | $2  | CYCLE  | 12-bit cycle register; 0 stops the engine            |
//! | $4  | LPW    | Left pulse write; read: bit 15 FULL, bit 14 EMPTY    |
//! | $6  | RPW    | Right pulse write; read: same status for right       |
//! | $8  | MONO   | Pulse write to both FIFOs; read: combined status     |
//!
//! `LMD`/`RMD`: 00 off, 01 own FIFO, 10 the other FIFO, 11 illegal (silent).

use std::collections::VecDeque;

use bincode::{Decode, Encode};
use emu_core::{Observable, Tickable, Value};

/// Samples each pulse FIFO holds.
pub const FIFO_DEPTH: usize = 3;

const CTRL_LMD: u16 = 0x0003;
const CTRL_RMD: u16 = 0x000C;
const CTRL_MONO: u16 = 0x0010;
const CTRL_RTP: u16 = 0x0080;
const CTRL_TM: u16 = 0x0F00;
const CTRL_WRITABLE: u16 = CTRL_LMD | CTRL_RMD | CTRL_MONO | CTRL_RTP | CTRL_TM;

const STATUS_FULL: u16 = 0x8000;
const STATUS_EMPTY: u16 = 0x4000;

/// A timer expiry not yet collected by the owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Encode, Decode)]
pub struct TimerEvent {
    /// `RTP` was set: request a DMA refill as well as the interrupt.
    pub dreq: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fifo {
    Left,
    Right,
}

#[derive(Debug, Clone, Encode, Decode)]
pub struct Pwm {
    control: u16,
    cycle: u16,
    fifos: [VecDeque<u16>; 2],
    /// Last pulse popped from each FIFO; held while the FIFO is empty.
    held: [Option<u16>; 2],
    /// SH-2 clocks until the next sample period ends.
    countdown: u16,
    /// Sample periods until the timer fires.
    timer: u8,
    pending: Option<TimerEvent>,
    buffer: Vec<(i16, i16)>,
}

impl Default for Pwm {
    fn default() -> Self {
        Self::new()
    }
}

impl Pwm {
    #[must_use]
    pub fn new() -> Self {
        Self {
            control: 0,
            cycle: 0,
            fifos: [VecDeque::with_capacity(FIFO_DEPTH), VecDeque::with_capacity(FIFO_DEPTH)],
            held: [None; 2],
            countdown: 1,
            timer: 16,
            pending: None,
            buffer: Vec::new(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Counters are non-zero, as the tick loop expects.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.countdown > 0 && self.timer > 0
    }

    /// SH-2 clocks per sample period, or `None` while stopped.
    #[must_use]
    pub fn period(&self) -> Option<u16> {
        (self.cycle != 0).then(|| self.cycle.saturating_sub(1).max(1))
    }

    /// Sample periods between timer expiries (`TM`, 0 meaning 16).
    #[must_use]
    pub fn timer_interval(&self) -> u8 {
        match (self.control & CTRL_TM) >> 8 {
            0 => 16,
            n => n as u8,
        }
    }

    #[must_use]
    pub fn dreq_on_timer(&self) -> bool {
        self.control & CTRL_RTP != 0
    }

    #[must_use]
    pub fn mono(&self) -> bool {
        self.control & CTRL_MONO != 0
    }

    // === Registers ===

    #[must_use]
    pub fn read(&self, offset: u32) -> u16 {
        match offset & 0xE {
            0x0 => self.control,
            0x2 => self.cycle,
            0x4 => self.status(Fifo::Left),
            0x6 => self.status(Fifo::Right),
            0x8 => {
                let left = self.status(Fifo::Left);
                let right = self.status(Fifo::Right);
                ((left | right) & STATUS_FULL) | (left & right & STATUS_EMPTY)
            }
            _ => 0,
        }
    }

    pub fn write(&mut self, offset: u32, value: u16) {
        match offset & 0xE {
            0x0 => {
                self.control = value & CTRL_WRITABLE;
                self.timer = self.timer_interval();
            }
            0x2 => {
                self.cycle = value & 0x0FFF;
                self.countdown = self.period().unwrap_or(1);
            }
            0x4 => self.push(Fifo::Left, value),
            0x6 => self.push(Fifo::Right, value),
            0x8 => {
                self.push(Fifo::Left, value);
                self.push(Fifo::Right, value);
            }
            _ => log::debug!("PWM write to unused register +{offset:X}: {value:04X}"),
        }
    }

    fn status(&self, fifo: Fifo) -> u16 {
        let queue = &self.fifos[fifo as usize];
        let mut value = 0;
        if queue.len() >= FIFO_DEPTH {
            value |= STATUS_FULL;
        }
        if queue.is_empty() {
            value |= STATUS_EMPTY;
        }
        value
    }

    fn push(&mut self, fifo: Fifo, value: u16) {
        let queue = &mut self.fifos[fifo as usize];
        if queue.len() >= FIFO_DEPTH {
            log::debug!("PWM {fifo:?} FIFO full, dropped {value:03X}");
            return;
        }
        queue.push_back(value & 0x0FFF);
    }

    #[must_use]
    pub fn fifo_len(&self, right: bool) -> usize {
        self.fifos[usize::from(right)].len()
    }

    // === Output ===

    /// FIFO feeding each output, `None` when that output is silent.
    fn routes(&self) -> [Option<Fifo>; 2] {
        let route = |mode: u16, own: Fifo, other: Fifo| match mode {
            1 => Some(own),
            2 => Some(other),
            _ => None,
        };
        let left = route(self.control & CTRL_LMD, Fifo::Left, Fifo::Right);
        let right = route((self.control & CTRL_RMD) >> 2, Fifo::Right, Fifo::Left);
        if self.mono() {
            [left.map(|_| Fifo::Left), right.map(|_| Fifo::Left)]
        } else {
            [left, right]
        }
    }

    /// Current stereo output, centred so that silence is 0.
    #[must_use]
    pub fn output(&self) -> (i16, i16) {
        let [left, right] = self.routes();
        (self.level(left), self.level(right))
    }

    fn level(&self, route: Option<Fifo>) -> i16 {
        let (Some(fifo), Some(cycle)) = (route, self.period()) else {
            return 0;
        };
        let Some(pulse) = self.held[fifo as usize] else {
            return 0;
        };
        let half = i32::from(cycle.max(2)) / 2;
        let centred = (i32::from(pulse) - half) * i32::from(i16::MAX) / half;
        centred.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
    }

    /// Take the samples produced since the last call.
    pub fn take_buffer(&mut self) -> Vec<(i16, i16)> {
        std::mem::take(&mut self.buffer)
    }

    // === Timer ===

    /// Collect the timer expiry, if any, since the last call.
    pub fn take_timer_event(&mut self) -> Option<TimerEvent> {
        self.pending.take()
    }

    fn sample_tick(&mut self) {
        let routes = self.routes();
        // Mono writes land in both FIFOs; they drain together.
        let mono = self.mono() && routes.iter().any(Option::is_some);
        for fifo in [Fifo::Left, Fifo::Right] {
            if (mono || routes.contains(&Some(fifo)))
                && let Some(pulse) = self.fifos[fifo as usize].pop_front()
            {
                self.held[fifo as usize] = Some(pulse);
            }
        }
        let output = self.output();
        self.buffer.push(output);

        self.timer -= 1;
        if self.timer == 0 {
            self.timer = self.timer_interval();
            let dreq = self.dreq_on_timer();
            let event = self.pending.get_or_insert_default();
            event.dreq |= dreq;
        }
    }
}

impl Tickable for Pwm {
    /// One SH-2 clock.
    fn tick(&mut self) {
        let Some(period) = self.period() else {
            return;
        };
        self.countdown -= 1;
        if self.countdown == 0 {
            self.countdown = period;
            self.sample_tick();
        }
    }

    fn tick_n(&mut self, count: emu_core::Ticks) {
        let Some(period) = self.period() else {
            return;
        };
        let mut remaining = count.get();
        while remaining > 0 {
            let step = remaining.min(u64::from(self.countdown));
            self.countdown -= step as u16;
            remaining -= step;
            if self.countdown == 0 {
                self.countdown = period;
                self.sample_tick();
            }
        }
    }
}

impl Observable for Pwm {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "control" => Some(self.control.into()),
            "cycle" => Some(self.cycle.into()),
            "left.fifo_len" => Some((self.fifos[0].len() as u8).into()),
            "right.fifo_len" => Some((self.fifos[1].len() as u8).into()),
            "timer" => Some(self.timer.into()),
            "timer_pending" => Some(self.pending.is_some().into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "control",
            "cycle",
            "left.fifo_len",
            "right.fifo_len",
            "timer",
            "timer_pending",
        ]
    }
}
