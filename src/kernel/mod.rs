/*
 * Kernel core
 *
 * The preemptive, priority-based task scheduler and its companions: tick
 * source, ready/sleep queues, task lifecycle, and time-of-day derivation.
 * `contract` is the only module application code outside this crate should
 * need; it is re-exported at the crate root.
 */

pub mod contract;
pub mod error;
pub mod ready_queue;
pub mod scheduler;
pub mod sleep_queue;
pub mod state;
pub mod task;
pub mod tick;
pub mod timeofday;
