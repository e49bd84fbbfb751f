/*
 * Architecture abstraction
 *
 * This module is the kernel core's only hardware-facing surface: the
 * critical-section primitive (component A, `critical`) and the context
 * switch hook (component B, the `Arch` trait below). Everything else —
 * GDT/IDT setup, PIC programming, driver interrupt dispatch, board bring-up
 * — belongs to the board-support layer that consumes this crate and is out
 * of scope here; the kernel core only names the contracts it needs from
 * that layer.
 */

pub mod critical;

#[cfg(target_arch = "x86_64")]
pub mod x86_64;

pub mod mock;

pub use critical::CriticalSection;

/// Architecture hook (component B): initialize a fresh task stack and
/// perform context switches between tasks.
pub trait Arch {
    /// Lay out an initial machine frame on `stack` so that the first switch
    /// into the task resumes at `entry(arg)`. Returns the stack pointer to
    /// store in the task's `saved_sp`.
    fn stack_init(stack: &mut [u8], entry: extern "C" fn(usize) -> !, arg: usize) -> usize;

    /// Save the current context into `*from_sp` (skipped when `from_sp` is
    /// null — the first dispatch into the system has nothing to save) and
    /// resume execution from `to_sp`. Callable from both a voluntary yield
    /// and an interrupt-return path.
    ///
    /// # Safety
    /// `to_sp` must have been produced by `stack_init`, or be the `saved_sp`
    /// of a task that was itself switched out through this function.
    unsafe fn context_switch(from_sp: *mut usize, to_sp: usize);
}

#[cfg(all(target_arch = "x86_64", not(any(test, feature = "mock-arch"))))]
pub type ActiveArch = x86_64::context::X86Arch;
#[cfg(all(target_arch = "x86_64", not(any(test, feature = "mock-arch"))))]
pub type ActiveCriticalSection = x86_64::critical::X86CriticalSection;

// `cfg(test)` covers this crate's own `#[cfg(test)] mod tests` blocks; the
// `mock-arch` feature covers `tests/*.rs` integration tests, which link the
// library in its ordinary (non-`--test`) compilation and so never see
// `cfg(test)` true for the library itself.
#[cfg(any(test, feature = "mock-arch", not(target_arch = "x86_64")))]
pub type ActiveArch = mock::MockArch;
#[cfg(any(test, feature = "mock-arch", not(target_arch = "x86_64")))]
pub type ActiveCriticalSection = mock::MockCriticalSection;
