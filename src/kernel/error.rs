/*
 * Error kinds (component, §7)
 *
 * The kernel never panics on bad input from a public-contract call — it
 * returns one of these unchanged to the caller. It does halt (via
 * `debug_assert!`) on internal invariant violations such as a duplicate
 * task priority at creation or a double-registered listener; those are
 * programming errors, not runtime conditions.
 */

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum KernelError {
    /// Caller supplied nonsensical input (empty stack, both `tv`/`tz` null
    /// on `set_utc`, removing the running task).
    InvalidParam,
    /// Operation requires an initialized object that wasn't, or a task
    /// whose state makes the operation meaningless (e.g. `task_remove` on a
    /// task that is neither READY nor SLEEP).
    NotStarted,
    /// Preconditions unmet: the task holds a lock or is waiting on a
    /// synchronization primitive.
    Busy,
    /// Referenced object (a listener) is absent.
    NotFound,
    /// A tick/millisecond conversion does not fit in 32 bits.
    Overflow,
}

pub type KernelResult<T> = Result<T, KernelError>;
