/*
 * cluu kernel core
 *
 * The preemptive, priority-based task scheduler at the heart of the cluu
 * embedded operating system: critical-section primitive, architecture
 * hook, tick source, ready/sleep queues, scheduler core, task lifecycle,
 * and time-of-day derivation. Hardware abstraction, drivers, shells, file
 * systems, IPC, and board bring-up live in the layers that consume this
 * crate, not in it.
 *
 * Built as `#![no_std]` outside of `cargo test`, so it can run on bare
 * metal; under `cargo test` it compiles against `std` so the scheduler,
 * tick, and queue algorithms can be exercised with the ordinary `#[test]`
 * harness instead of a custom no_std test runner.
 */

#![cfg_attr(not(test), no_std)]

pub mod arch;
pub mod config;
pub mod kernel;

pub use kernel::contract::*;
pub use kernel::error::{KernelError, KernelResult};
pub use kernel::task::{TaskId, TaskInfo, TaskState, WaitFlags};
pub use kernel::timeofday::{ListenerCallback, ListenerId, TimeChangeEvent, TimeValue, Timezone};
