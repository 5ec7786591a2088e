//! Sega 32X VDP: double-buffered framebuffer DRAM, palette and autofill.
//!
//! The VDP shares its DRAM and palette between the host raster and the two
//! SH-2 cores. One framebuffer bank is displayed while the other is open to
//! the CPUs; a page flip swaps them. Whether a core may write right now is
//! the *engagement* state: a pure function of the host's blanking lines, the
//! framebuffer-access (`FM`) flag and the autofill busy counter.
//!
//! # Registers (offset from $4100 internal / $A15180 external)
//!
//! | Off | Name   | Description                                        |
//! |-----|--------|----------------------------------------------------|
//! | $0  | BMMODE | Bits 0-1 mode, 6 LIN (240 lines), 7 PRI, 15 PAL    |
//! | $2  | SHIFT  | Bit 0: packed-pixel dot shift                      |
//! | $4  | AFLEN  | Autofill length minus one (8 bits)                 |
//! | $6  | AFADR  | Autofill start, word address                       |
//! | $8  | AFDATA | Autofill data; writing starts the fill             |
//! | $A  | FBCTL  | Bit 0 FS, 1 FEN, 13 PEN, 14 HBLK, 15 VBLK          |
//!
//! Framebuffer addresses in this crate are byte offsets within a bank.

use bincode::{Decode, Encode};
use emu_core::{Lanes, Observable, Value};

/// Half-words per framebuffer bank (128 KiB).
pub const BANK_WORDS: usize = 0x1_0000;
/// Byte offsets within a bank wrap at this mask.
pub const BANK_OFFSET_MASK: u32 = 0x1_FFFF;
/// Palette RAM entries.
pub const PALETTE_ENTRIES: usize = 256;
/// Pixels per rendered scanline.
pub const SCREEN_WIDTH: usize = 320;

const MODE_MASK: u16 = 0x0003;
const MODE_LIN: u16 = 0x0040;
const MODE_PRI: u16 = 0x0080;
const MODE_PAL: u16 = 0x8000;

const FBCTL_FS: u16 = 0x0001;
const FBCTL_FEN: u16 = 0x0002;
const FBCTL_PEN: u16 = 0x2000;
const FBCTL_HBLK: u16 = 0x4000;
const FBCTL_VBLK: u16 = 0x8000;

/// Bitmap display mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Encode, Decode)]
pub enum DisplayMode {
    #[default]
    Blank,
    /// One palette index per byte.
    PackedPixel,
    /// One 15-bit colour per half-word.
    DirectColor,
    /// Half-words of palette index (high byte) and run length minus one.
    RunLength,
}

impl DisplayMode {
    #[must_use]
    pub const fn from_bits(bits: u16) -> Self {
        match bits & MODE_MASK {
            0 => Self::Blank,
            1 => Self::PackedPixel,
            2 => Self::DirectColor,
            _ => Self::RunLength,
        }
    }

    #[must_use]
    pub const fn bits(self) -> u16 {
        match self {
            Self::Blank => 0,
            Self::PackedPixel => 1,
            Self::DirectColor => 2,
            Self::RunLength => 3,
        }
    }
}

/// A VDP memory that the host raster can observe mid-write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Framebuffer,
    Palette,
}

/// Engagement windows and autofill cost.
///
/// These are empirical approximations of the hardware and are meant to be
/// tuned against test ROMs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub struct VdpTiming {
    /// Horizontal blank opens the framebuffer window as well as vertical.
    pub framebuffer_in_hblank: bool,
    /// The palette is free whenever the display mode is blank.
    pub palette_when_display_blank: bool,
    /// Core clocks the framebuffer stays busy after an autofill starts.
    pub autofill_setup_clocks: u32,
    /// Additional busy clocks per filled word.
    pub autofill_clocks_per_word: u32,
}

impl Default for VdpTiming {
    fn default() -> Self {
        Self {
            framebuffer_in_hblank: false,
            palette_when_display_blank: true,
            autofill_setup_clocks: 16,
            autofill_clocks_per_word: 7,
        }
    }
}

/// Result of a register write that needs the caller's cooperation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterEffect {
    None,
    /// The autofill data register was written: run a fill of `length + 1`
    /// words of `data` from `word_address`.
    Autofill {
        word_address: u16,
        data: u16,
        length: u8,
    },
}

#[derive(Debug, Clone, Encode, Decode)]
pub struct Vdp {
    banks: [Vec<u16>; 2],
    palette: Vec<u16>,
    mode: DisplayMode,
    lines_240: bool,
    priority: bool,
    pal: bool,
    dot_shift: bool,
    autofill_length: u8,
    autofill_address: u16,
    autofill_data: u16,
    /// Bank shown by the raster; CPUs access the other one.
    displayed: u8,
    /// Flip requested outside vblank, applied at the next vblank start.
    pending_select: Option<u8>,
    framebuffer_access: bool,
    vblank: bool,
    hblank: bool,
    framebuffer_wait: u32,
    timing: VdpTiming,
    scanline: Vec<u16>,
}

impl Vdp {
    #[must_use]
    pub fn new(timing: VdpTiming, pal: bool) -> Self {
        Self {
            banks: [vec![0; BANK_WORDS], vec![0; BANK_WORDS]],
            palette: vec![0; PALETTE_ENTRIES],
            mode: DisplayMode::Blank,
            lines_240: false,
            priority: false,
            pal,
            dot_shift: false,
            autofill_length: 0,
            autofill_address: 0,
            autofill_data: 0,
            displayed: 0,
            pending_select: None,
            framebuffer_access: false,
            vblank: false,
            hblank: false,
            framebuffer_wait: 0,
            timing,
            scanline: vec![0; SCREEN_WIDTH],
        }
    }

    /// Power-on state. Memory contents survive a reset.
    pub fn reset(&mut self) {
        self.mode = DisplayMode::Blank;
        self.lines_240 = false;
        self.priority = false;
        self.dot_shift = false;
        self.autofill_length = 0;
        self.autofill_address = 0;
        self.autofill_data = 0;
        self.displayed = 0;
        self.pending_select = None;
        self.framebuffer_access = false;
        self.framebuffer_wait = 0;
    }

    /// Memory arrays and bank indices are in range, as after [`Vdp::new`].
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.banks.iter().all(|bank| bank.len() == BANK_WORDS)
            && self.palette.len() == PALETTE_ENTRIES
            && self.scanline.len() == SCREEN_WIDTH
            && self.displayed < 2
            && self.pending_select.is_none_or(|bank| bank < 2)
    }

    #[must_use]
    pub fn timing(&self) -> VdpTiming {
        self.timing
    }

    // === Engagement ===

    /// True while a core must not write `resource`.
    #[must_use]
    pub fn engaged(&self, resource: Resource) -> bool {
        match resource {
            Resource::Framebuffer => self.framebuffer_engaged(),
            Resource::Palette => self.palette_engaged(),
        }
    }

    #[must_use]
    pub fn framebuffer_engaged(&self) -> bool {
        if self.framebuffer_wait > 0 {
            return true;
        }
        if self.framebuffer_access {
            return false;
        }
        let window = self.vblank || (self.timing.framebuffer_in_hblank && self.hblank);
        !window
    }

    #[must_use]
    pub fn palette_engaged(&self) -> bool {
        if self.timing.palette_when_display_blank && self.mode == DisplayMode::Blank {
            return false;
        }
        !(self.vblank || self.hblank)
    }

    /// Host vertical blank line. A latched page flip lands on the rising edge.
    pub fn set_vblank(&mut self, line: bool) {
        self.vblank = line;
        if line && let Some(bank) = self.pending_select.take() {
            self.displayed = bank;
        }
    }

    pub fn set_hblank(&mut self, line: bool) {
        self.hblank = line;
    }

    #[must_use]
    pub fn vblank(&self) -> bool {
        self.vblank
    }

    #[must_use]
    pub fn hblank(&self) -> bool {
        self.hblank
    }

    /// `FM`: framebuffer access granted to the SH-2 side.
    pub fn set_framebuffer_access(&mut self, granted: bool) {
        self.framebuffer_access = granted;
    }

    #[must_use]
    pub fn framebuffer_access(&self) -> bool {
        self.framebuffer_access
    }

    /// Drain the autofill busy counter by `clocks` core clocks.
    pub fn tick_wait(&mut self, clocks: u32) {
        self.framebuffer_wait -= clocks.min(self.framebuffer_wait);
    }

    #[must_use]
    pub fn framebuffer_wait(&self) -> u32 {
        self.framebuffer_wait
    }

    // === Page flip ===

    /// Show `bank` (0 or 1). Outside vblank the flip waits for the next one.
    pub fn select_framebuffer(&mut self, bank: u8) {
        let bank = bank & 1;
        if self.vblank {
            self.displayed = bank;
            self.pending_select = None;
        } else if bank != self.displayed {
            self.pending_select = Some(bank);
        } else {
            self.pending_select = None;
        }
    }

    #[must_use]
    pub fn displayed_bank(&self) -> u8 {
        self.displayed
    }

    /// Bank the CPUs read and write.
    #[must_use]
    pub fn access_bank(&self) -> u8 {
        self.displayed ^ 1
    }

    // === Memory ===

    #[must_use]
    pub fn read_framebuffer(&self, offset: u32) -> u16 {
        let index = ((offset & BANK_OFFSET_MASK) >> 1) as usize;
        self.banks[usize::from(self.access_bank())][index]
    }

    /// Plain write to the access bank. Core callers must have confirmed the
    /// framebuffer is not engaged.
    pub fn write_framebuffer(&mut self, offset: u32, lanes: Lanes, data: u16) {
        let index = ((offset & BANK_OFFSET_MASK) >> 1) as usize;
        let bank = &mut self.banks[usize::from(self.access_bank())];
        bank[index] = lanes.merge(bank[index], data);
    }

    /// Overwrite-image write: zero bytes leave the framebuffer untouched.
    pub fn write_overwrite(&mut self, offset: u32, lanes: Lanes, data: u16) {
        let upper = lanes.upper && data & 0xFF00 != 0;
        let lower = lanes.lower && data & 0x00FF != 0;
        if upper || lower {
            self.write_framebuffer(offset, Lanes::new(upper, lower), data);
        }
    }

    /// Word of the displayed bank, for the raster and for debugging.
    #[must_use]
    pub fn peek_displayed(&self, word_index: usize) -> Option<u16> {
        self.banks[usize::from(self.displayed)].get(word_index).copied()
    }

    #[must_use]
    pub fn read_palette(&self, offset: u32) -> u16 {
        self.palette[((offset >> 1) as usize) % PALETTE_ENTRIES]
    }

    /// Core callers must have confirmed the palette is not engaged.
    pub fn write_palette(&mut self, offset: u32, lanes: Lanes, data: u16) {
        let entry = &mut self.palette[((offset >> 1) as usize) % PALETTE_ENTRIES];
        *entry = lanes.merge(*entry, data);
    }

    // === Autofill ===

    /// Write one autofill word and return the next word address.
    ///
    /// Only the low eight bits of the address count, so a fill wraps
    /// within its 256-word row.
    pub fn autofill_word(&mut self, word_address: u16, data: u16) -> u16 {
        self.write_framebuffer(u32::from(word_address) << 1, Lanes::WORD, data);
        (word_address & 0xFF00) | (word_address.wrapping_add(1) & 0x00FF)
    }

    /// Latch the final address and mark the framebuffer busy for the
    /// duration of a fill of `length + 1` words.
    pub fn finish_autofill(&mut self, next_word_address: u16, length: u8) {
        self.autofill_address = next_word_address;
        let words = u32::from(length) + 1;
        self.framebuffer_wait = self.timing.autofill_setup_clocks
            + self.timing.autofill_clocks_per_word * words;
    }

    /// Ungated fill of `length + 1` words of `data` from byte `address`.
    pub fn autofill(&mut self, address: u32, data: u16, length: u8) {
        let mut word_address = ((address & BANK_OFFSET_MASK) >> 1) as u16;
        self.autofill_data = data;
        self.autofill_length = length;
        for _ in 0..=length {
            word_address = self.autofill_word(word_address, data);
        }
        self.finish_autofill(word_address, length);
    }

    // === Registers ===

    /// Side-effect free register read; `offset` is relative to the block.
    #[must_use]
    pub fn read_register(&self, offset: u32) -> u16 {
        match offset & 0xE {
            0x0 => {
                let mut value = self.mode.bits();
                if self.lines_240 {
                    value |= MODE_LIN;
                }
                if self.priority {
                    value |= MODE_PRI;
                }
                if !self.pal {
                    value |= MODE_PAL;
                }
                value
            }
            0x2 => u16::from(self.dot_shift),
            0x4 => u16::from(self.autofill_length),
            0x6 => self.autofill_address,
            0x8 => self.autofill_data,
            0xA => {
                let mut value = u16::from(self.displayed);
                if self.framebuffer_engaged() {
                    value |= FBCTL_FEN;
                }
                if !self.palette_engaged() {
                    value |= FBCTL_PEN;
                }
                if self.hblank {
                    value |= FBCTL_HBLK;
                }
                if self.vblank {
                    value |= FBCTL_VBLK;
                }
                value
            }
            _ => 0,
        }
    }

    /// Register write of an already lane-merged value.
    pub fn write_register(&mut self, offset: u32, value: u16) -> RegisterEffect {
        match offset & 0xE {
            0x0 => {
                self.mode = DisplayMode::from_bits(value);
                self.lines_240 = value & MODE_LIN != 0;
                self.priority = value & MODE_PRI != 0;
            }
            0x2 => self.dot_shift = value & 1 != 0,
            0x4 => self.autofill_length = value as u8,
            0x6 => self.autofill_address = value,
            0x8 => {
                self.autofill_data = value;
                return RegisterEffect::Autofill {
                    word_address: self.autofill_address,
                    data: value,
                    length: self.autofill_length,
                };
            }
            0xA => self.select_framebuffer((value & FBCTL_FS) as u8),
            _ => log::debug!("VDP write to unused register +{offset:02X}: {value:04X}"),
        }
        RegisterEffect::None
    }

    // === Raster output ===

    #[must_use]
    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    /// 32X layer priority over the host planes.
    #[must_use]
    pub fn priority(&self) -> bool {
        self.priority
    }

    #[must_use]
    pub fn lines(&self) -> u16 {
        if self.lines_240 { 240 } else { 224 }
    }

    /// Render one line of the displayed bank into the scanline buffer.
    ///
    /// Pixels are raw 16-bit colours (15-bit BGR plus the through bit).
    /// Anything fetched from outside the bank renders as 0.
    pub fn render_scanline(&mut self, line: u16) -> &[u16] {
        self.scanline.fill(0);
        if line >= self.lines() {
            return &self.scanline;
        }

        let bank = &self.banks[usize::from(self.displayed)];
        let base = usize::from(bank[usize::from(line)]);
        match self.mode {
            DisplayMode::Blank => {}
            DisplayMode::PackedPixel => {
                let shift = usize::from(self.dot_shift);
                for (x, pixel) in self.scanline.iter_mut().enumerate() {
                    let byte = base * 2 + x + shift;
                    let Some(&word) = bank.get(byte >> 1) else {
                        break;
                    };
                    let index = if byte & 1 == 0 { word >> 8 } else { word & 0xFF };
                    *pixel = self.palette[usize::from(index)];
                }
            }
            DisplayMode::DirectColor => {
                for (x, pixel) in self.scanline.iter_mut().enumerate() {
                    let Some(&word) = bank.get(base + x) else {
                        break;
                    };
                    *pixel = word;
                }
            }
            DisplayMode::RunLength => {
                let mut x = 0;
                let mut cursor = base;
                while x < SCREEN_WIDTH {
                    let Some(&word) = bank.get(cursor) else {
                        break;
                    };
                    let color = self.palette[usize::from(word >> 8)];
                    let run = (usize::from(word & 0xFF) + 1).min(SCREEN_WIDTH - x);
                    self.scanline[x..x + run].fill(color);
                    x += run;
                    cursor += 1;
                }
            }
        }
        &self.scanline
    }
}

impl Observable for Vdp {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "mode" => Some(Value::U8(self.mode.bits() as u8)),
            "displayed_bank" => Some(self.displayed.into()),
            "pending_flip" => Some(self.pending_select.is_some().into()),
            "framebuffer_access" => Some(self.framebuffer_access.into()),
            "framebuffer_engaged" => Some(self.framebuffer_engaged().into()),
            "palette_engaged" => Some(self.palette_engaged().into()),
            "framebuffer_wait" => Some(self.framebuffer_wait.into()),
            "vblank" => Some(self.vblank.into()),
            "hblank" => Some(self.hblank.into()),
            "autofill.length" => Some(self.autofill_length.into()),
            "autofill.address" => Some(self.autofill_address.into()),
            "autofill.data" => Some(self.autofill_data.into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "mode",
            "displayed_bank",
            "pending_flip",
            "framebuffer_access",
            "framebuffer_engaged",
            "palette_engaged",
            "framebuffer_wait",
            "vblank",
            "hblank",
            "autofill.length",
            "autofill.address",
            "autofill.data",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vdp() -> Vdp {
        Vdp::new(VdpTiming::default(), false)
    }

    #[test]
    fn framebuffer_engaged_during_active_display() {
        let mut vdp = vdp();
        assert!(vdp.framebuffer_engaged());
        vdp.set_hblank(true);
        assert!(vdp.framebuffer_engaged(), "hblank window is off by default");
        vdp.set_vblank(true);
        assert!(!vdp.framebuffer_engaged());
    }

    #[test]
    fn hblank_window_is_configurable() {
        let timing = VdpTiming {
            framebuffer_in_hblank: true,
            ..VdpTiming::default()
        };
        let mut vdp = Vdp::new(timing, false);
        vdp.set_hblank(true);
        assert!(!vdp.framebuffer_engaged());
    }

    #[test]
    fn framebuffer_access_disengages() {
        let mut vdp = vdp();
        vdp.set_framebuffer_access(true);
        assert!(!vdp.engaged(Resource::Framebuffer));
    }

    #[test]
    fn autofill_busy_overrides_access() {
        let mut vdp = vdp();
        vdp.set_framebuffer_access(true);
        vdp.autofill(0, 0x1111, 0);
        let busy = vdp.framebuffer_wait();
        assert_eq!(busy, 16 + 7);
        assert!(vdp.framebuffer_engaged());
        vdp.tick_wait(busy - 1);
        assert!(vdp.framebuffer_engaged());
        vdp.tick_wait(5);
        assert!(!vdp.framebuffer_engaged());
    }

    #[test]
    fn palette_engaged_outside_blanking() {
        let mut vdp = vdp();
        vdp.write_register(0x0, 1);
        assert!(vdp.palette_engaged());
        vdp.set_hblank(true);
        assert!(!vdp.palette_engaged());
        vdp.set_hblank(false);
        vdp.set_vblank(true);
        assert!(!vdp.palette_engaged());
    }

    #[test]
    fn palette_free_while_display_blank() {
        let vdp = vdp();
        assert_eq!(vdp.mode(), DisplayMode::Blank);
        assert!(!vdp.palette_engaged());
    }

    #[test]
    fn autofill_scenario() {
        let mut vdp = vdp();
        vdp.set_vblank(true);
        vdp.autofill(0x0100, 0x55AA, 2);
        assert_eq!(vdp.read_framebuffer(0x0100), 0x55AA);
        assert_eq!(vdp.read_framebuffer(0x0102), 0x55AA);
        assert_eq!(vdp.read_framebuffer(0x0104), 0x55AA);
        assert_eq!(vdp.read_framebuffer(0x0106), 0);
        assert_eq!(vdp.read_framebuffer(0x00FE), 0);
    }

    #[test]
    fn autofill_wraps_within_row() {
        let mut vdp = vdp();
        vdp.autofill(0x01FC, 0x7777, 3);
        assert_eq!(vdp.read_framebuffer(0x01FC), 0x7777);
        assert_eq!(vdp.read_framebuffer(0x01FE), 0x7777);
        assert_eq!(vdp.read_framebuffer(0x0000), 0x7777);
        assert_eq!(vdp.read_framebuffer(0x0002), 0x7777);
        assert_eq!(vdp.read_framebuffer(0x0200), 0);
        assert_eq!(vdp.read_register(0x6), 0x0002);
    }

    #[test]
    fn autofill_register_reports_request() {
        let mut vdp = vdp();
        vdp.write_register(0x4, 2);
        vdp.write_register(0x6, 0x0080);
        let effect = vdp.write_register(0x8, 0x55AA);
        assert_eq!(
            effect,
            RegisterEffect::Autofill {
                word_address: 0x0080,
                data: 0x55AA,
                length: 2
            }
        );
    }

    #[test]
    fn flip_outside_vblank_is_latched() {
        let mut vdp = vdp();
        vdp.write_framebuffer(0, Lanes::WORD, 0xAAAA);
        vdp.select_framebuffer(1);
        assert_eq!(vdp.displayed_bank(), 0);
        assert_eq!(vdp.read_register(0xA) & FBCTL_FS, 0);
        vdp.set_vblank(true);
        assert_eq!(vdp.displayed_bank(), 1);
        assert_eq!(vdp.peek_displayed(0), Some(0xAAAA));
        assert_eq!(vdp.read_framebuffer(0), 0);
    }

    #[test]
    fn flip_inside_vblank_is_immediate() {
        let mut vdp = vdp();
        vdp.set_vblank(true);
        vdp.write_register(0xA, 1);
        assert_eq!(vdp.displayed_bank(), 1);
        assert_eq!(vdp.access_bank(), 0);
    }

    #[test]
    fn overwrite_skips_zero_bytes() {
        let mut vdp = vdp();
        vdp.write_framebuffer(0x10, Lanes::WORD, 0x1234);
        vdp.write_overwrite(0x10, Lanes::WORD, 0x00AB);
        assert_eq!(vdp.read_framebuffer(0x10), 0x12AB);
        vdp.write_overwrite(0x10, Lanes::WORD, 0xCD00);
        assert_eq!(vdp.read_framebuffer(0x10), 0xCDAB);
        vdp.write_overwrite(0x10, Lanes::WORD, 0x0000);
        assert_eq!(vdp.read_framebuffer(0x10), 0xCDAB);
    }

    #[test]
    fn palette_byte_write_merges() {
        let mut vdp = vdp();
        vdp.write_palette(0x20, Lanes::WORD, 0x7C1F);
        vdp.write_palette(0x20, Lanes::LOWER, 0x0000);
        assert_eq!(vdp.read_palette(0x20), 0x7C00);
    }

    #[test]
    fn repeated_write_is_idempotent() {
        let mut vdp = vdp();
        vdp.write_framebuffer(0x40, Lanes::WORD, 0x0F0F);
        let once = vdp.read_framebuffer(0x40);
        vdp.write_framebuffer(0x40, Lanes::WORD, 0x0F0F);
        assert_eq!(vdp.read_framebuffer(0x40), once);
    }

    /// Write through the access bank, then flip so the raster sees it.
    fn show(vdp: &mut Vdp, words: &[(u32, u16)]) {
        for &(offset, value) in words {
            vdp.write_framebuffer(offset, Lanes::WORD, value);
        }
        vdp.set_vblank(true);
        vdp.select_framebuffer(vdp.access_bank());
        vdp.set_vblank(false);
    }

    #[test]
    fn renders_packed_pixels() {
        let mut vdp = vdp();
        vdp.write_palette(0x02, Lanes::WORD, 0x001F);
        vdp.write_palette(0x04, Lanes::WORD, 0x03E0);
        vdp.write_register(0x0, DisplayMode::PackedPixel.bits());
        show(&mut vdp, &[(0x0000, 0x0100), (0x0200, 0x0102)]);
        let line = vdp.render_scanline(0);
        assert_eq!(&line[..3], &[0x001F, 0x03E0, 0]);
    }

    #[test]
    fn dot_shift_moves_packed_line() {
        let mut vdp = vdp();
        vdp.write_palette(0x02, Lanes::WORD, 0x001F);
        vdp.write_register(0x0, DisplayMode::PackedPixel.bits());
        vdp.write_register(0x2, 1);
        show(&mut vdp, &[(0x0000, 0x0100), (0x0200, 0x0001)]);
        assert_eq!(vdp.render_scanline(0)[0], 0x001F);
    }

    #[test]
    fn renders_direct_color() {
        let mut vdp = vdp();
        vdp.write_register(0x0, DisplayMode::DirectColor.bits());
        show(&mut vdp, &[(0x0002, 0x0100), (0x0200, 0x7FFF), (0x0202, 0x8001)]);
        let line = vdp.render_scanline(1);
        assert_eq!(&line[..3], &[0x7FFF, 0x8001, 0]);
    }

    #[test]
    fn renders_run_length() {
        let mut vdp = vdp();
        vdp.write_palette(0x0E, Lanes::WORD, 0x1234);
        vdp.write_palette(0x10, Lanes::WORD, 0x4321);
        vdp.write_register(0x0, DisplayMode::RunLength.bits());
        show(
            &mut vdp,
            &[(0x0000, 0x0100), (0x0200, 0x0702), (0x0202, 0x08FF), (0x0204, 0x08FF)],
        );
        let line = vdp.render_scanline(0);
        assert_eq!(&line[..4], &[0x1234, 0x1234, 0x1234, 0x4321]);
        assert_eq!(line[SCREEN_WIDTH - 1], 0x4321);
    }

    #[test]
    fn out_of_bank_fetch_renders_black() {
        let mut vdp = vdp();
        vdp.write_register(0x0, DisplayMode::DirectColor.bits());
        show(&mut vdp, &[(0x0000, 0xFFF0), (0x1FFE0, 0x7FFF)]);
        let line = vdp.render_scanline(0);
        assert_eq!(line[0], 0x7FFF);
        assert!(line[16..].iter().all(|&p| p == 0));
    }

    #[test]
    fn lines_beyond_screen_are_blank() {
        let mut vdp = vdp();
        vdp.write_register(0x0, DisplayMode::DirectColor.bits());
        assert_eq!(vdp.lines(), 224);
        assert!(vdp.render_scanline(230).iter().all(|&p| p == 0));
        vdp.write_register(0x0, DisplayMode::DirectColor.bits() | MODE_LIN);
        assert_eq!(vdp.lines(), 240);
    }

    #[test]
    fn control_register_reports_blanking() {
        let mut vdp = vdp();
        vdp.set_hblank(true);
        vdp.set_vblank(true);
        let value = vdp.read_register(0xA);
        assert_ne!(value & FBCTL_HBLK, 0);
        assert_ne!(value & FBCTL_VBLK, 0);
        assert_ne!(value & FBCTL_PEN, 0);
        assert_eq!(value & FBCTL_FEN, 0);
    }

    #[test]
    fn mode_register_reports_region() {
        assert_ne!(vdp().read_register(0) & MODE_PAL, 0);
        assert_eq!(Vdp::new(VdpTiming::default(), true).read_register(0) & MODE_PAL, 0);
    }
}
