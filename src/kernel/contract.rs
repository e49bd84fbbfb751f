/*
 * Public contract layer (component I)
 *
 * The surface the rest of the system calls: task lifecycle, delay/yield,
 * time-of-day get/set and listener registration, and tick/ms conversion.
 * Thin wrappers over the components above; re-exported at the crate root
 * so a consumer only ever needs `cluu_kernel_core::*`.
 */

use crate::arch::{ActiveCriticalSection, CriticalSection as _};
use crate::config::TICKS_PER_SECOND;
use crate::kernel::error::{KernelError, KernelResult};
use crate::kernel::scheduler;
use crate::kernel::state::KERNEL;
use crate::kernel::tick;
use crate::kernel::timeofday::{ListenerCallback, ListenerId, TimeValue, Timezone};

pub use crate::kernel::task::{task_create, task_iter, task_remove, task_sanity_checkin, TaskInfo};
pub use crate::kernel::tick::WAIT_FOREVER;

/// Suspend the calling task for at least `ticks` ticks. `delay(0)` is a
/// no-op: no context switch, no state change.
pub fn delay(ticks: u32) {
    if ticks == 0 {
        return;
    }
    if let Some(task_id) = KERNEL.lock().current {
        scheduler::sleep(task_id, ticks);
    }
}

/// Voluntarily surrender the CPU. Because priorities are unique, this only
/// ever surrenders to a strictly higher-priority ready task; otherwise it
/// is a no-op.
pub fn yield_now() {
    scheduler::schedule();
}

/// `(seconds, microseconds)` since boot.
pub fn get_uptime() -> (u32, u32) {
    let kernel = KERNEL.lock();
    let now = kernel.tick.get();
    kernel.timeofday.uptime(now)
}

/// Current wall-clock time and timezone.
pub fn get_utc() -> (TimeValue, Timezone) {
    let kernel = KERNEL.lock();
    let now = kernel.tick.get();
    kernel.timeofday.utc(now)
}

/// Set the wall-clock and/or timezone; at least one of `tv`/`tz` must be
/// `Some`. Notifies every registered listener, in registration order, with
/// interrupts re-enabled.
pub fn set_utc(tv: Option<TimeValue>, tz: Option<Timezone>) -> KernelResult<()> {
    if tv.is_none() && tz.is_none() {
        return Err(KernelError::InvalidParam);
    }

    let saved = ActiveCriticalSection::enter();
    let (event, listeners) = {
        let mut kernel = KERNEL.lock();
        let now = kernel.tick.get();
        let (cur_tv, cur_tz) = kernel.timeofday.utc(now);
        let event = kernel
            .timeofday
            .set_utc(now, tv.unwrap_or(cur_tv), tz.unwrap_or(cur_tz));
        let listeners = kernel.timeofday.listener_snapshot();
        (event, listeners)
    };
    ActiveCriticalSection::exit(saved);

    // Run outside both the critical section and the kernel lock: callbacks
    // execute with interrupts re-enabled, in the caller's own context, and
    // must be free to call back into the kernel without deadlocking on a
    // lock this function itself is no longer holding.
    for (id, callback) in listeners {
        callback(id, &event);
    }
    Ok(())
}

pub fn is_time_set() -> bool {
    KERNEL.lock().timeofday.is_time_set()
}

/// Register a time-change listener. It is a programming error to register
/// the same listener twice; not enforced here (callers own listener
/// identity), matching the design note that listener lifetime is external.
pub fn change_listen(callback: ListenerCallback) -> KernelResult<ListenerId> {
    KERNEL.lock().timeofday.register_listener(callback)
}

/// Remove a previously registered listener. A no-op (returns `NotFound`)
/// for an identity that isn't registered.
pub fn change_remove(id: ListenerId) -> KernelResult<()> {
    KERNEL.lock().timeofday.remove_listener(id)
}

pub fn ms_to_ticks(ms: u32) -> KernelResult<u32> {
    tick::ms_to_ticks(ms, TICKS_PER_SECOND)
}

pub fn ticks_to_ms(ticks: u32) -> KernelResult<u32> {
    tick::ticks_to_ms(ticks, TICKS_PER_SECOND)
}

/// Called from the timer ISR; see `tick::tick_advance`.
pub fn tick_advance(n: u32) {
    tick::tick_advance(n);
}

pub fn uptime_ticks() -> u32 {
    KERNEL.lock().tick.get()
}

/// External wake of a sleeping task, the hook synchronization primitives
/// outside the kernel core are built on.
pub fn wake(task_id: crate::kernel::task::TaskId) -> KernelResult<()> {
    scheduler::wake(task_id)
}

/// Start the scheduler. See `scheduler::start`.
pub fn start() {
    scheduler::start();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::state::{KernelState, KERNEL};
    use core::sync::atomic::{AtomicU32, Ordering};

    fn reset_kernel() {
        *KERNEL.lock() = KernelState::new();
    }

    #[test]
    fn ms_to_ticks_overflow_matches_spec_boundary() {
        assert_eq!(ms_to_ticks(4_294_967), Ok(4_294_967));
        assert_eq!(ms_to_ticks(4_294_968), Err(KernelError::Overflow));
    }

    #[test]
    fn set_utc_requires_at_least_one_field() {
        reset_kernel();
        assert_eq!(set_utc(None, None), Err(KernelError::InvalidParam));
    }

    static LISTENER_CALLS: AtomicU32 = AtomicU32::new(0);
    static LISTENER_ORDER: AtomicU32 = AtomicU32::new(0);

    fn listener_one(_id: ListenerId, _e: &crate::kernel::timeofday::TimeChangeEvent) {
        LISTENER_CALLS.fetch_add(1, Ordering::SeqCst);
        LISTENER_ORDER.store(1, Ordering::SeqCst);
    }

    fn listener_two(_id: ListenerId, _e: &crate::kernel::timeofday::TimeChangeEvent) {
        LISTENER_CALLS.fetch_add(1, Ordering::SeqCst);
        LISTENER_ORDER.store(2, Ordering::SeqCst);
    }

    #[test]
    fn set_utc_notifies_listeners_in_registration_order() {
        reset_kernel();
        LISTENER_CALLS.store(0, Ordering::SeqCst);
        LISTENER_ORDER.store(0, Ordering::SeqCst);

        let _l1 = change_listen(listener_one).unwrap();
        let _l2 = change_listen(listener_two).unwrap();

        set_utc(
            Some(TimeValue {
                sec: 1_700_000_000,
                usec: 0,
            }),
            Some(Timezone::default()),
        )
        .unwrap();

        assert_eq!(LISTENER_CALLS.load(Ordering::SeqCst), 2);
        assert_eq!(LISTENER_ORDER.load(Ordering::SeqCst), 2); // listener_two ran last
    }

    static CALLBACK_REENTRY_CALLS: AtomicU32 = AtomicU32::new(0);

    fn listener_calls_back_into_kernel(_id: ListenerId, _e: &crate::kernel::timeofday::TimeChangeEvent) {
        // Regression test for holding the kernel lock across a listener
        // callback: `get_uptime` takes the same lock `set_utc` uses, so this
        // would deadlock if `set_utc` still held it while invoking listeners.
        let _ = get_uptime();
        CALLBACK_REENTRY_CALLS.fetch_add(1, Ordering::SeqCst);
    }

    #[test]
    fn set_utc_listener_can_call_back_into_kernel_without_deadlock() {
        reset_kernel();
        CALLBACK_REENTRY_CALLS.store(0, Ordering::SeqCst);

        let _l = change_listen(listener_calls_back_into_kernel).unwrap();
        set_utc(
            Some(TimeValue {
                sec: 1,
                usec: 0,
            }),
            None,
        )
        .unwrap();

        assert_eq!(CALLBACK_REENTRY_CALLS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn is_time_set_reflects_set_utc() {
        reset_kernel();
        assert!(!is_time_set());
        set_utc(
            Some(TimeValue {
                sec: 1,
                usec: 0,
            }),
            None,
        )
        .unwrap();
        assert!(is_time_set());
    }
}
