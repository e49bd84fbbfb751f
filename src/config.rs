/*
 * Kernel tunables
 *
 * Compile-time constants that size the kernel's fixed-capacity storage and
 * govern tick/time conversions. There is no runtime configuration store;
 * changing any of these requires recompiling the kernel core, in keeping
 * with the "no dynamic memory management inside the kernel" design.
 */

/// Timer ticks per second. Conversions between ticks and milliseconds are
/// exact (identity) only when this equals 1000. Must not exceed `u32::MAX`.
pub const TICKS_PER_SECOND: u32 = 1000;

/// Maximum number of simultaneously live tasks (any state).
pub const MAX_TASKS: usize = 64;

/// Maximum number of registered time-change listeners.
pub const MAX_LISTENERS: usize = 16;

/// Maximum length of a task's human-readable name.
pub const MAX_TASK_NAME_LEN: usize = 16;

/// Byte pattern used to fill a fresh task stack for watermark measurement.
pub const STACK_SENTINEL: u8 = 0xAA;
