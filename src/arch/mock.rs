/*
 * Host-testable architecture stand-in
 *
 * The kernel core is `#![cfg_attr(not(test), no_std)]` so its algorithms
 * can be driven by the ordinary `#[test]` harness on the developer's
 * machine, following the host-testable port pattern used by the
 * r3/Constance kernel family's `*_port_std` crates. `MockArch` never
 * performs a real stack swap — tests assert on `KernelState` transitions
 * (which task is `Running`, what's in the ready/sleep queues), not on
 * register contents, so the switch itself can be a no-op.
 */

use core::sync::atomic::{AtomicBool, Ordering};

use crate::arch::{Arch, CriticalSection};

static INTERRUPTS_ENABLED: AtomicBool = AtomicBool::new(true);

pub struct MockCriticalSection;

impl CriticalSection for MockCriticalSection {
    type Mask = bool;

    fn enter() -> bool {
        INTERRUPTS_ENABLED.swap(false, Ordering::SeqCst)
    }

    fn exit(saved: bool) {
        if saved {
            INTERRUPTS_ENABLED.store(true, Ordering::SeqCst);
        }
    }
}

pub struct MockArch;

impl Arch for MockArch {
    fn stack_init(stack: &mut [u8], entry: extern "C" fn(usize) -> !, arg: usize) -> usize {
        let _ = (entry, arg);
        stack.as_ptr() as usize
    }

    unsafe fn context_switch(_from_sp: *mut usize, _to_sp: usize) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_critical_sections_restore_outer_state() {
        INTERRUPTS_ENABLED.store(true, Ordering::SeqCst);

        let outer = MockCriticalSection::enter();
        assert!(!INTERRUPTS_ENABLED.load(Ordering::SeqCst));

        let inner = MockCriticalSection::enter();
        MockCriticalSection::exit(inner);
        assert!(!INTERRUPTS_ENABLED.load(Ordering::SeqCst));

        MockCriticalSection::exit(outer);
        assert!(INTERRUPTS_ENABLED.load(Ordering::SeqCst));
    }
}
