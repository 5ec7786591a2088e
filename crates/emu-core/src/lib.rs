//! Core traits and types for cycle-accurate emulation.
//!
//! Every clocked actor counts time in [`Ticks`] of its own clock. Actors
//! that share state meet at explicit synchronization points; nothing runs
//! in parallel.

mod bus;
mod clock;
mod observable;
mod sync;
mod tickable;
mod ticks;

pub use bus::{Lanes, WordBus};
pub use clock::MasterClock;
pub use observable::{Observable, Value};
pub use sync::wait_until;
pub use tickable::Tickable;
pub use ticks::Ticks;
