//! Address decoding tables for both buses.
//!
//! Each map is a list of (range, region) pairs. Ranges may overlap; the
//! narrowest range containing an address wins, so a mirror carved out of a
//! larger window is declared as its own entry rather than by ordering.

use std::ops::RangeInclusive;

/// Regions on the SH-2 side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InternalRegion {
    BootRom,
    SystemRegisters,
    VdpRegisters,
    Palette,
    Cartridge,
    Framebuffer,
    Overwrite,
    Sdram,
    /// On-chip cache data array, present while the cache is enabled.
    CacheData,
    /// SH7604 on-chip peripheral registers.
    OnChip,
}

/// Regions on the 68K side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalRegion {
    /// $000000-$3FFFFF with the adapter disabled.
    CartridgePassthrough,
    VectorRom,
    /// $000100-$3FFFFF with the adapter enabled; only in RV mode.
    CartridgeLow,
    Framebuffer,
    Overwrite,
    FixedRom,
    BankedRom,
    SystemRegisters,
    VdpRegisters,
    Palette,
}

/// One inclusive range and the region behind it.
#[derive(Debug, Clone)]
struct Entry<R> {
    range: RangeInclusive<u32>,
    region: R,
}

/// A decoded address: region plus offset from the start of its range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoded<R> {
    pub region: R,
    pub offset: u32,
}

#[derive(Debug, Clone)]
pub struct RangeTable<R> {
    /// Sorted narrowest first, then by start address.
    entries: Vec<Entry<R>>,
}

impl<R: Copy> RangeTable<R> {
    #[must_use]
    pub fn new(ranges: impl IntoIterator<Item = (RangeInclusive<u32>, R)>) -> Self {
        let mut entries: Vec<Entry<R>> = ranges
            .into_iter()
            .map(|(range, region)| Entry { range, region })
            .collect();
        entries.sort_by_key(|entry| (entry.range.end() - entry.range.start(), *entry.range.start()));
        Self { entries }
    }

    /// Narrowest region containing `address`.
    #[must_use]
    pub fn lookup(&self, address: u32) -> Option<Decoded<R>> {
        self.entries
            .iter()
            .find(|entry| entry.range.contains(&address))
            .map(|entry| Decoded {
                region: entry.region,
                offset: address - entry.range.start(),
            })
    }
}

/// The $2xxxxxxx cache-through partition mirrors $0xxxxxxx.
#[must_use]
pub const fn fold_cache_through(address: u32) -> u32 {
    if address >> 29 == 1 { address & 0x1FFF_FFFF } else { address }
}

#[must_use]
pub fn internal_map() -> RangeTable<InternalRegion> {
    RangeTable::new([
        (0x0000_0000..=0x0000_3FFF, InternalRegion::BootRom),
        (0x0000_4000..=0x0000_40FF, InternalRegion::SystemRegisters),
        (0x0000_4100..=0x0000_410F, InternalRegion::VdpRegisters),
        (0x0000_4200..=0x0000_43FF, InternalRegion::Palette),
        (0x0200_0000..=0x023F_FFFF, InternalRegion::Cartridge),
        (0x0400_0000..=0x0403_FFFF, InternalRegion::Framebuffer),
        (0x0402_0000..=0x0403_FFFF, InternalRegion::Overwrite),
        (0x0600_0000..=0x0603_FFFF, InternalRegion::Sdram),
        (0xC000_0000..=0xC000_0FFF, InternalRegion::CacheData),
        (0xFFFF_FE00..=0xFFFF_FFFF, InternalRegion::OnChip),
    ])
}

/// Host map with the adapter enabled.
#[must_use]
pub fn external_map() -> RangeTable<ExternalRegion> {
    RangeTable::new([
        (0x00_0000..=0x3F_FFFF, ExternalRegion::CartridgeLow),
        (0x00_0000..=0x00_00FF, ExternalRegion::VectorRom),
        (0x84_0000..=0x85_FFFF, ExternalRegion::Framebuffer),
        (0x86_0000..=0x87_FFFF, ExternalRegion::Overwrite),
        (0x88_0000..=0x8F_FFFF, ExternalRegion::FixedRom),
        (0x90_0000..=0x9F_FFFF, ExternalRegion::BankedRom),
        (0xA1_5100..=0xA1_517F, ExternalRegion::SystemRegisters),
        (0xA1_5180..=0xA1_518F, ExternalRegion::VdpRegisters),
        (0xA1_5200..=0xA1_53FF, ExternalRegion::Palette),
    ])
}

/// Host map with the adapter disabled: the plain cartridge plus the
/// system registers needed to turn the adapter on.
#[must_use]
pub fn passthrough_map() -> RangeTable<ExternalRegion> {
    RangeTable::new([
        (0x00_0000..=0x3F_FFFF, ExternalRegion::CartridgePassthrough),
        (0xA1_5100..=0xA1_517F, ExternalRegion::SystemRegisters),
    ])
}
