//! Cooperative synchronization between clocked actors.

/// Advance an actor until a shared-state predicate holds.
///
/// `advance` moves the waiting actor forward by one clock and lets the
/// actors it depends on catch up; `ready` is evaluated before every step.
/// There is no timeout: the predicate must eventually be made true by the
/// other actors' progress.
///
/// Returns the number of steps taken.
pub fn wait_until<C: ?Sized>(
    ctx: &mut C,
    ready: impl Fn(&C) -> bool,
    mut advance: impl FnMut(&mut C),
) -> u64 {
    let mut steps = 0;
    while !ready(ctx) {
        advance(ctx);
        steps += 1;
    }
    steps
}
