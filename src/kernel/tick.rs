/*
 * Tick source (component C)
 *
 * A process-wide 32-bit counter advanced from the timer ISR, wrapping
 * modulo 2^32. `advance` reports whether the add flipped the sign bit so
 * the caller (the kernel-state mutation in this module's free function)
 * can rebase the time-of-day base exactly once per crossing.
 */

use crate::arch::{ActiveCriticalSection, CriticalSection as _};
use crate::kernel::error::{KernelError, KernelResult};
use crate::kernel::scheduler;
use crate::kernel::state::KERNEL;
use crate::kernel::task::TaskState;

/// Distinguished duration sentinel: "wait forever", not an error.
pub const WAIT_FOREVER: u32 = u32::MAX;

pub struct TickSource {
    current_tick: u32,
}

impl TickSource {
    pub const fn new() -> Self {
        TickSource { current_tick: 0 }
    }

    pub fn get(&self) -> u32 {
        self.current_tick
    }

    /// `current_tick += n`. Returns whether the sign bit changed during the
    /// add (`(prev ^ new) >> 31 != 0`).
    fn advance(&mut self, n: u32) -> bool {
        let prev = self.current_tick;
        let new = prev.wrapping_add(n);
        self.current_tick = new;
        ((prev ^ new) >> 31) != 0
    }
}

/// Called from the timer ISR with `n >= 0`. Advances the tick inside a
/// critical section, rebases the time-of-day base if the sign bit flipped,
/// promotes any now-expired sleepers into the ready queue, and reconsiders
/// the running task. When the scheduler has not yet started, only the
/// counter advances. `n == 0` is a complete no-op: no state change, no
/// reschedule.
pub fn tick_advance(n: u32) {
    if n == 0 {
        return;
    }

    let saved = ActiveCriticalSection::enter();

    let started = {
        let mut kernel = KERNEL.lock();
        let wrapped = kernel.tick.advance(n);
        let now = kernel.tick.get();
        if wrapped {
            log::debug!("tick counter crossed the sign bit at {}, rebasing time-of-day", now);
            kernel.timeofday.rebase(now);
        }

        if kernel.started {
            let expired = kernel.sleep.drain_expired(now);
            for task_id in expired.iter().copied() {
                let priority = kernel.find_task(task_id).map(|t| t.priority);
                if let Some(priority) = priority {
                    kernel.ready.insert(priority, task_id);
                }
                if let Some(task) = kernel.find_task_mut(task_id) {
                    task.state = TaskState::Ready;
                }
            }
        }

        kernel.started
    };

    ActiveCriticalSection::exit(saved);

    if started {
        scheduler::schedule();
    }
}

/// `ticks = (ms * ticks_per_second) / 1000`, computed in 64 bits and
/// rejected with `Overflow` if the result does not fit in 32 bits.
pub fn ms_to_ticks(ms: u32, ticks_per_second: u32) -> KernelResult<u32> {
    let ticks = (ms as u64 * ticks_per_second as u64) / 1000;
    u32::try_from(ticks).map_err(|_| KernelError::Overflow)
}

/// `ms = (ticks * 1000) / ticks_per_second`, with the same overflow check.
pub fn ticks_to_ms(ticks: u32, ticks_per_second: u32) -> KernelResult<u32> {
    let ms = (ticks as u64 * 1000) / ticks_per_second as u64;
    u32::try_from(ms).map_err(|_| KernelError::Overflow)
}
