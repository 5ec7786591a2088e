//! Trait for components that can be advanced by clock ticks.

use crate::Ticks;

/// A component that advances one clock of its own domain at a time.
pub trait Tickable {
    /// Advance by one clock.
    fn tick(&mut self);

    /// Advance by `count` clocks.
    ///
    /// Implementations may skip ahead in bulk but must end in the state
    /// that `count` calls to `tick()` would produce.
    fn tick_n(&mut self, count: Ticks) {
        for _ in 0..count.get() {
            self.tick();
        }
    }
}
