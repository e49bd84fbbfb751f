/*
 * Scheduler core (component F)
 *
 * State machine per task: created -> READY -> RUNNING <-> READY
 * (preemption/yield) or RUNNING -> SLEEP (voluntary wait) -> READY (wake)
 * -> RUNNING; any state -> REMOVED from outside the task.
 *
 * `schedule()` is the one reschedule decision point, called after tick
 * processing, after a task becomes READY, after the running task enters
 * SLEEP, and after a voluntary yield. The actual register swap happens
 * outside the kernel lock (but still inside the critical section) since
 * `Arch::context_switch` may not return to this call for a long time — the
 * outgoing task resumes exactly here, in its own stack frame, and restores
 * its own `saved` mask via the `ActiveCriticalSection::exit` below.
 */

use crate::arch::{ActiveArch, ActiveCriticalSection, Arch as _, CriticalSection as _};
use crate::kernel::error::{KernelError, KernelResult};
use crate::kernel::state::{KernelState, KERNEL};
use crate::kernel::task::{TaskId, TaskState};
use crate::kernel::tick::WAIT_FOREVER;

/// Re-evaluate who should run and switch if warranted. Rule: let
/// `cand = ready.head()`; if `cand` differs from `current` and has strictly
/// higher priority, or `current` is no longer RUNNING, perform
/// `context_switch(current, cand)`; otherwise return. Tie-breaking never
/// arises because priorities are unique.
pub fn schedule() {
    let saved = ActiveCriticalSection::enter();

    let switch = {
        let mut kernel = KERNEL.lock();
        if kernel.started {
            decide_switch(&mut kernel)
        } else {
            None
        }
    };

    if let Some((from_sp, to_sp)) = switch {
        log::trace!("schedule: switching sp {:p} -> {:#x}", from_sp, to_sp);
        // SAFETY: `from_sp` is null or points at a live task's `saved_sp`
        // slot; `to_sp` was produced by `stack_init` or a prior switch-out.
        unsafe {
            ActiveArch::context_switch(from_sp, to_sp);
        }
    }

    ActiveCriticalSection::exit(saved);
}

/// Mutates queues/task state for a reschedule and returns the `(from, to)`
/// saved-sp pair to switch between, if a switch is warranted. Must be
/// called with the kernel lock held and interrupts masked.
fn decide_switch(kernel: &mut KernelState) -> Option<(*mut usize, usize)> {
    let (cand_prio, cand_id) = kernel.ready.head()?;
    let current = kernel.current;

    if let Some(cur_id) = current {
        if cur_id == cand_id {
            return None;
        }

        let cur_is_running = kernel
            .find_task(cur_id)
            .map(|t| t.state == TaskState::Running)
            .unwrap_or(false);

        if cur_is_running {
            let cur_prio = kernel.find_task(cur_id).map(|t| t.priority).unwrap_or(0);
            if cand_prio >= cur_prio {
                return None;
            }
            // Preempted, not blocked: goes back to READY at the tail of its
            // own priority slot (there is only ever one task per priority).
            if let Some(task) = kernel.find_task_mut(cur_id) {
                task.state = TaskState::Ready;
            }
            kernel.ready.insert(cur_prio, cur_id);
        }
    }

    kernel.ready.remove(cand_prio);
    if let Some(task) = kernel.find_task_mut(cand_id) {
        task.state = TaskState::Running;
        task.stats.context_switches = task.stats.context_switches.wrapping_add(1);
    }
    log::debug!(
        "reschedule: task {:?} (priority {}) -> running",
        cand_id,
        cand_prio
    );
    kernel.current = Some(cand_id);

    let from_sp: *mut usize = match current {
        Some(cur_id) => kernel
            .find_task_mut(cur_id)
            .map(|t| core::ptr::addr_of_mut!(t.saved_sp))
            .unwrap_or(core::ptr::null_mut()),
        None => core::ptr::null_mut(),
    };
    let to_sp = kernel.find_task(cand_id).map(|t| t.saved_sp).unwrap_or(0);

    Some((from_sp, to_sp))
}

/// Voluntary sleep: move `task` from the ready queue to the sleep queue
/// with an absolute deadline of `current_tick + duration_ticks`, then
/// reschedule. `duration_ticks == 0` is a no-op. `duration_ticks ==
/// WAIT_FOREVER` places the task in the sleep queue with no deadline; only
/// an external `wake` moves it back.
pub fn sleep(task_id: TaskId, duration_ticks: u32) {
    if duration_ticks == 0 {
        return;
    }

    let saved = ActiveCriticalSection::enter();
    {
        let mut kernel = KERNEL.lock();
        let now = kernel.tick.get();
        let wake_at = if duration_ticks == WAIT_FOREVER {
            WAIT_FOREVER
        } else {
            now.wrapping_add(duration_ticks)
        };

        if let Some(priority) = kernel.find_task(task_id).map(|t| t.priority) {
            kernel.ready.remove(priority);
        }
        kernel.sleep.insert(task_id, wake_at, now);
        if let Some(task) = kernel.find_task_mut(task_id) {
            task.next_wakeup = wake_at;
            task.state = TaskState::Sleep;
        }
    }
    ActiveCriticalSection::exit(saved);

    log::debug!("task {:?} sleeping for {} ticks", task_id, duration_ticks);
    schedule();
}

/// External wake: moves a SLEEP task to READY unconditionally, regardless
/// of its deadline. Synchronization primitives outside the kernel core are
/// built on this; it is also how `tick_advance` promotes expired sleepers.
pub fn wake(task_id: TaskId) -> KernelResult<()> {
    let saved = ActiveCriticalSection::enter();
    let woke = (|| -> KernelResult<bool> {
        let mut kernel = KERNEL.lock();
        match kernel.find_task(task_id).map(|t| t.state) {
            Some(TaskState::Sleep) => {
                kernel.sleep.remove(task_id);
                let priority = kernel.find_task(task_id).map(|t| t.priority);
                if let Some(priority) = priority {
                    kernel.ready.insert(priority, task_id);
                }
                if let Some(task) = kernel.find_task_mut(task_id) {
                    task.state = TaskState::Ready;
                }
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(KernelError::NotFound),
        }
    })();
    ActiveCriticalSection::exit(saved);

    let woke = woke?;
    if woke {
        log::debug!("task {:?} woken, now ready", task_id);
        schedule();
    }
    Ok(())
}

/// Start the scheduler: mark it running and dispatch into the
/// highest-priority ready task (ordinarily an idle task the caller has
/// already created at the lowest priority). On real hardware this call
/// does not return to its caller — the very first `context_switch` has no
/// "from" to resume later. The host/test architecture's `context_switch` is
/// a no-op, so in tests this returns normally and callers can inspect the
/// resulting state.
pub fn start() {
    {
        let mut kernel = KERNEL.lock();
        kernel.started = true;
    }
    log::info!("scheduler started");
    schedule();
}
