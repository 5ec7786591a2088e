use thiserror::Error;

use crate::sh2::CoreId;

/// A configuration the machine cannot be built from.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{core} boot ROM is {len} bytes, window holds {max}")]
    BootRomTooLarge { core: CoreId, len: usize, max: usize },
    #[error("vector ROM is {len} bytes, window holds {max}")]
    VectorRomTooLarge { len: usize, max: usize },
    #[error("cartridge is {len} bytes, window holds {max}")]
    CartridgeTooLarge { len: usize, max: usize },
}

/// A save state that could not be written or restored.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("not a 32X snapshot")]
    BadMagic,
    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u8),
    #[error("snapshot {0} state is malformed")]
    Malformed(&'static str),
    #[error("snapshot encode failed: {0}")]
    Encode(#[from] bincode::error::EncodeError),
    #[error("snapshot decode failed: {0}")]
    Decode(#[from] bincode::error::DecodeError),
    #[error("snapshot I/O failed: {0}")]
    Io(#[from] std::io::Error),
}
