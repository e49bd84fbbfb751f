/*
 * x86_64 critical-section implementation
 *
 * Adapted from the board-support `interrupts` module's `DisableInterrupts`
 * guard: the same save-then-mask, restore-only-if-was-enabled discipline,
 * expressed as the kernel core's `CriticalSection` trait instead of an RAII
 * guard, since the kernel already threads an explicit `saved` token through
 * `enter`/`exit` pairs at every mutation site.
 */

use x86_64::instructions::interrupts;

use crate::arch::CriticalSection;

pub struct X86CriticalSection;

impl CriticalSection for X86CriticalSection {
    /// Whether interrupts were enabled before this `enter()`.
    type Mask = bool;

    fn enter() -> bool {
        let was_enabled = interrupts::are_enabled();
        if was_enabled {
            interrupts::disable();
        }
        was_enabled
    }

    fn exit(saved: bool) {
        if saved {
            interrupts::enable();
        }
    }
}
