//! DREQ bridge: a small FIFO that lets the 68K stream half-words into SH-2
//! memory through a core's DMA channel 0.
//!
//! The host programs source, destination and length, sets `68S` to arm
//! the transfer, then writes the FIFO register. A write is accepted only
//! while armed and not full; the remaining count drops with every
//! accepted word and the bridge disarms itself when it reaches zero.
//! Clearing `68S` flushes everything.

use std::collections::VecDeque;

use bincode::{Decode, Encode};

use crate::sh2::CoreId;

/// FIFO capacity in half-words.
pub const FIFO_CAPACITY: usize = 8;

const CONTROL_RV: u16 = 0x0001;
const CONTROL_68S: u16 = 0x0004;
const CONTROL_FULL: u16 = 0x0080;

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct DreqBridge {
    /// RV: ROM-to-VRAM DMA mode, cartridge mapped low for the host.
    rom_to_vram: bool,
    /// 68S: transfer armed.
    active: bool,
    /// 24-bit source address (informational; the host drives the data).
    source: u32,
    /// 24-bit destination address.
    destination: u32,
    length: u16,
    remaining: u16,
    fifo: VecDeque<u16>,
    /// Last word drained; an empty FIFO reads back as this.
    last: u16,
    /// FIFO non-empty, as last published to each core.
    ready: [bool; 2],
    /// PWM timer DMA request, one pulse per core.
    pwm_request: [bool; 2],
}

impl Default for DreqBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl DreqBridge {
    #[must_use]
    pub fn new() -> Self {
        Self {
            rom_to_vram: false,
            active: false,
            source: 0,
            destination: 0,
            length: 0,
            remaining: 0,
            fifo: VecDeque::with_capacity(FIFO_CAPACITY),
            last: 0,
            ready: [false; 2],
            pwm_request: [false; 2],
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    #[must_use]
    pub fn active(&self) -> bool {
        self.active
    }

    #[must_use]
    pub fn rom_to_vram(&self) -> bool {
        self.rom_to_vram
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fifo.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fifo.is_empty()
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.fifo.len() >= FIFO_CAPACITY
    }

    #[must_use]
    pub fn remaining(&self) -> u16 {
        self.remaining
    }

    // === Control ===

    /// DREQ control register: RV bit 0, 68S bit 2, FULL bit 7.
    #[must_use]
    pub fn control(&self) -> u16 {
        let mut value = 0;
        if self.rom_to_vram {
            value |= CONTROL_RV;
        }
        if self.active {
            value |= CONTROL_68S;
        }
        if self.is_full() {
            value |= CONTROL_FULL;
        }
        value
    }

    pub fn write_control(&mut self, value: u16) {
        self.rom_to_vram = value & CONTROL_RV != 0;
        let arm = value & CONTROL_68S != 0;
        if arm && !self.active {
            self.remaining = self.length;
            self.active = self.remaining != 0;
        } else if !arm {
            self.active = false;
            self.fifo.clear();
            self.ready = [false; 2];
        }
    }

    #[must_use]
    pub fn source_high(&self) -> u16 {
        (self.source >> 16) as u16
    }

    #[must_use]
    pub fn source_low(&self) -> u16 {
        self.source as u16
    }

    pub fn set_source_high(&mut self, value: u16) {
        self.source = (self.source & 0xFFFF) | (u32::from(value & 0xFF) << 16);
    }

    pub fn set_source_low(&mut self, value: u16) {
        self.source = (self.source & 0xFF_0000) | u32::from(value & 0xFFFE);
    }

    #[must_use]
    pub fn destination_high(&self) -> u16 {
        (self.destination >> 16) as u16
    }

    #[must_use]
    pub fn destination_low(&self) -> u16 {
        self.destination as u16
    }

    pub fn set_destination_high(&mut self, value: u16) {
        self.destination = (self.destination & 0xFFFF) | (u32::from(value & 0xFF) << 16);
    }

    pub fn set_destination_low(&mut self, value: u16) {
        self.destination = (self.destination & 0xFF_0000) | u32::from(value);
    }

    /// Length register reads back the words still expected.
    #[must_use]
    pub fn length(&self) -> u16 {
        self.remaining
    }

    /// Writing the length restarts the countdown. A zero length disarms
    /// an armed transfer.
    pub fn set_length(&mut self, value: u16) {
        self.length = value;
        self.remaining = value;
        if value == 0 && self.active {
            log::debug!("DREQ length cleared mid-transfer, disarmed");
            self.active = false;
        }
    }

    // === FIFO ===

    /// Host write to the FIFO register. Returns false if the word was lost.
    pub fn push(&mut self, word: u16) -> bool {
        if !self.active {
            log::debug!("DREQ FIFO write {word:04X} while inactive, dropped");
            return false;
        }
        if self.is_full() {
            log::debug!("DREQ FIFO full, dropped {word:04X}");
            return false;
        }
        self.fifo.push_back(word);
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.active = false;
        }
        self.publish();
        true
    }

    /// Core-side drain of one word.
    pub fn pop(&mut self) -> Option<u16> {
        let word = self.fifo.pop_front();
        if let Some(word) = word {
            self.last = word;
        }
        self.publish();
        word
    }

    /// FIFO register read by a core: drains a word, or repeats the last
    /// one when empty.
    pub fn read_fifo(&mut self) -> u16 {
        self.pop().unwrap_or(self.last)
    }

    /// Front of the FIFO without draining it.
    #[must_use]
    pub fn peek(&self) -> u16 {
        self.fifo.front().copied().unwrap_or(self.last)
    }

    /// Drain `count` words at once, or nothing if fewer are queued.
    pub fn pop_unit(&mut self, count: usize) -> Option<Vec<u16>> {
        if self.fifo.len() < count {
            return None;
        }
        let words: Vec<u16> = self.fifo.drain(..count).collect();
        if let Some(&word) = words.last() {
            self.last = word;
        }
        self.publish();
        Some(words)
    }

    /// Republish FIFO occupancy to both cores.
    fn publish(&mut self) {
        self.ready = [!self.fifo.is_empty(); 2];
    }

    /// FIFO data pending for `core`'s channel 0.
    #[must_use]
    pub fn ready(&self, core: CoreId) -> bool {
        self.ready[core.index()]
    }

    // === PWM request ===

    /// PWM timer fired with RTP set: pulse channel 1 on both cores.
    pub fn request_pwm(&mut self) {
        self.pwm_request = [true; 2];
    }

    #[must_use]
    pub fn pwm_request(&self, core: CoreId) -> bool {
        self.pwm_request[core.index()]
    }

    pub fn clear_pwm_request(&mut self, core: CoreId) {
        self.pwm_request[core.index()] = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn armed(length: u16) -> DreqBridge {
        let mut dreq = DreqBridge::new();
        dreq.set_length(length);
        dreq.write_control(CONTROL_68S);
        dreq
    }

    #[test]
    fn inactive_push_is_lost() {
        let mut dreq = DreqBridge::new();
        assert!(!dreq.push(0x1234));
        assert!(dreq.is_empty());
    }

    #[test]
    fn disarms_when_length_reached() {
        let mut dreq = armed(2);
        assert!(dreq.push(1));
        assert!(dreq.active());
        assert!(dreq.push(2));
        assert!(!dreq.active());
        assert!(!dreq.push(3));
        assert_eq!(dreq.len(), 2);
    }

    #[test]
    fn full_fifo_applies_back_pressure() {
        let mut dreq = armed(20);
        for word in 0..FIFO_CAPACITY as u16 {
            assert!(dreq.push(word));
        }
        assert!(dreq.is_full());
        assert_ne!(dreq.control() & CONTROL_FULL, 0);
        assert!(!dreq.push(0xFFFF));
        assert_eq!(dreq.remaining(), 20 - FIFO_CAPACITY as u16);
        assert_eq!(dreq.pop(), Some(0));
        assert!(dreq.push(0xFFFF));
    }

    #[test]
    fn disable_flushes_and_clears_ready() {
        let mut dreq = armed(4);
        dreq.push(1);
        assert!(dreq.ready(CoreId::Master) && dreq.ready(CoreId::Slave));
        dreq.write_control(0);
        assert!(dreq.is_empty());
        assert!(!dreq.ready(CoreId::Master));
        assert!(!dreq.ready(CoreId::Slave));
    }

    #[test]
    fn ready_republished_after_drain() {
        let mut dreq = armed(4);
        dreq.push(1);
        dreq.push(2);
        assert_eq!(dreq.pop_unit(2), Some(vec![1, 2]));
        assert!(!dreq.ready(CoreId::Master));
        assert!(!dreq.ready(CoreId::Slave));
    }

    #[test]
    fn partial_unit_waits() {
        let mut dreq = armed(4);
        dreq.push(1);
        assert_eq!(dreq.pop_unit(2), None);
        assert_eq!(dreq.len(), 1);
    }

    #[test]
    fn empty_fifo_read_holds_last_word() {
        let mut dreq = armed(1);
        dreq.push(0xBEEF);
        assert_eq!(dreq.read_fifo(), 0xBEEF);
        assert_eq!(dreq.read_fifo(), 0xBEEF);
        assert_eq!(dreq.peek(), 0xBEEF);
    }

    #[test]
    fn zero_length_does_not_arm() {
        let dreq = armed(0);
        assert!(!dreq.active());
    }

    #[test]
    fn length_rewrite_mid_transfer() {
        let mut dreq = armed(4);
        assert!(dreq.push(1));
        dreq.set_length(2);
        assert!(dreq.active());
        assert!(dreq.push(2));
        assert!(dreq.push(3));
        assert!(!dreq.active(), "disarms on the rewritten count");

        let mut dreq = armed(4);
        assert!(dreq.push(1));
        dreq.set_length(0);
        assert!(!dreq.active());
        assert_eq!(dreq.control() & CONTROL_68S, 0);
        assert!(!dreq.push(2));
        assert_eq!(dreq.remaining(), 0);
        assert_eq!(dreq.len(), 1);
    }

    #[test]
    fn addresses_are_24_bit() {
        let mut dreq = DreqBridge::new();
        dreq.set_destination_high(0xFF06);
        dreq.set_destination_low(0x1000);
        assert_eq!(dreq.destination_high(), 0x0006);
        assert_eq!(dreq.destination_low(), 0x1000);
        dreq.set_source_low(0x1235);
        assert_eq!(dreq.source_low(), 0x1234);
    }

    #[test]
    fn pwm_request_is_per_core() {
        let mut dreq = DreqBridge::new();
        dreq.request_pwm();
        dreq.clear_pwm_request(CoreId::Master);
        assert!(!dreq.pwm_request(CoreId::Master));
        assert!(dreq.pwm_request(CoreId::Slave));
    }
}
