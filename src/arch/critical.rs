/*
 * Critical-section primitive (component A)
 *
 * Masks the interrupts that can touch kernel state and returns the prior
 * mask so nested use restores exactly the outer state. Every kernel
 * data-structure mutation (ready queue, sleep queue, tick counter,
 * time-of-day base, listener list) occurs inside one of these sections
 * unless the caller is already serialized by construction.
 */

/// A hardware-specific interrupt mask/unmask pair.
///
/// `enter` disables the interrupts that can race with kernel state and
/// returns whatever token is needed to restore the prior state; `exit`
/// consumes that token. Nesting is safe: an inner `enter`/`exit` pair
/// restores exactly the state the outer pair observed, never blindly
/// re-enabling interrupts the outer caller had already masked.
pub trait CriticalSection {
    type Mask: Copy;

    fn enter() -> Self::Mask;
    fn exit(saved: Self::Mask);
}
