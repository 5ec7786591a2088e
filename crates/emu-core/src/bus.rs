//! Byte-lane word bus interface.

/// Byte lanes driven by a 16-bit bus cycle.
///
/// Big-endian: the upper lane carries the even byte, the lower lane the odd
/// byte. A word access drives both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lanes {
    pub upper: bool,
    pub lower: bool,
}

impl Lanes {
    pub const WORD: Self = Self {
        upper: true,
        lower: true,
    };
    pub const UPPER: Self = Self {
        upper: true,
        lower: false,
    };
    pub const LOWER: Self = Self {
        upper: false,
        lower: true,
    };

    #[must_use]
    pub const fn new(upper: bool, lower: bool) -> Self {
        Self { upper, lower }
    }

    /// Lane for a single byte at `address`.
    #[must_use]
    pub const fn for_byte(address: u32) -> Self {
        if address & 1 != 0 { Self::LOWER } else { Self::UPPER }
    }

    /// Bits of a half-word covered by the active lanes.
    #[must_use]
    pub const fn mask(self) -> u16 {
        let mut mask = 0;
        if self.upper {
            mask |= 0xFF00;
        }
        if self.lower {
            mask |= 0x00FF;
        }
        mask
    }

    /// Merge `data` into `old`, keeping the bytes of inactive lanes.
    #[must_use]
    pub const fn merge(self, old: u16, data: u16) -> u16 {
        let mask = self.mask();
        (old & !mask) | (data & mask)
    }
}

/// A 16-bit data bus with a 32-bit address space and byte lanes.
///
/// Reads take the value currently held on the bus: a device that does not
/// answer returns it unchanged (open bus). Byte and long helpers split
/// accesses into half-word cycles at even addresses and pass
/// [`WordBus::open_bus`] as that value.
pub trait WordBus {
    /// Read the half-word at the even `address`.
    fn read_word(&mut self, lanes: Lanes, address: u32, prior: u16) -> u16;

    /// Last value driven on the bus.
    fn open_bus(&self) -> u16 {
        0
    }

    /// Write the half-word at the even `address`; only active lanes are
    /// significant.
    fn write_word(&mut self, lanes: Lanes, address: u32, data: u16);

    /// Byte read. The odd byte travels on the lower lane.
    fn read_byte(&mut self, address: u32) -> u8 {
        let lanes = Lanes::for_byte(address);
        let prior = self.open_bus();
        let word = self.read_word(lanes, address & !1, prior);
        if lanes.lower { word as u8 } else { (word >> 8) as u8 }
    }

    /// Byte write, replicated on both halves of the data bus.
    fn write_byte(&mut self, address: u32, data: u8) {
        let word = (u16::from(data) << 8) | u16::from(data);
        self.write_word(Lanes::for_byte(address), address & !1, word);
    }

    /// Long read as two word cycles, high half first.
    fn read_long(&mut self, address: u32) -> u32 {
        let base = address & !3;
        let prior = self.open_bus();
        let hi = self.read_word(Lanes::WORD, base, prior);
        let prior = self.open_bus();
        let lo = self.read_word(Lanes::WORD, base | 2, prior);
        (u32::from(hi) << 16) | u32::from(lo)
    }

    /// Long write as two word cycles, high half first.
    fn write_long(&mut self, address: u32, data: u32) {
        let base = address & !3;
        self.write_word(Lanes::WORD, base, (data >> 16) as u16);
        self.write_word(Lanes::WORD, base | 2, data as u16);
    }
}
