/*
 * Time-of-day & listeners (component H)
 *
 * Wall-clock and uptime are both derived lazily from one base record plus
 * the current tick delta, so the kernel never has to keep a live clock
 * ticking anywhere but `TickSource`. The base is rebased whenever the tick
 * counter's sign bit flips (see `tick::tick_advance`) and whenever
 * `set_utc` is called.
 */

use heapless::Vec;

use crate::config::{MAX_LISTENERS, TICKS_PER_SECOND};
use crate::kernel::error::{KernelError, KernelResult};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TimeValue {
    pub sec: u32,
    pub usec: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Timezone {
    pub minutes_west: i16,
    pub dst_offset: i16,
}

pub type ListenerId = u16;

/// A time-change listener callback: invoked with its own id and the event
/// describing the transition. Callbacks run in the caller of `set_utc`'s
/// context with interrupts re-enabled, and must not themselves call
/// `set_utc`.
pub type ListenerCallback = fn(ListenerId, &TimeChangeEvent);

#[derive(Clone, Copy, Debug)]
pub struct TimeChangeEvent {
    pub prev_tv: TimeValue,
    pub cur_tv: TimeValue,
    pub prev_tz: Timezone,
    pub cur_tz: Timezone,
    /// True iff the kernel had never previously held a valid wall-clock
    /// (`utctime.sec == 0` before this update).
    pub newly_synced: bool,
}

struct Listener {
    id: ListenerId,
    callback: ListenerCallback,
}

pub struct TimeOfDay {
    ostime_ref: u32,
    uptime_at_ref: TimeValue,
    utctime_at_ref: TimeValue,
    timezone: Timezone,
    listeners: Vec<Listener, MAX_LISTENERS>,
    next_listener_id: ListenerId,
}

impl TimeOfDay {
    pub const fn new() -> Self {
        TimeOfDay {
            ostime_ref: 0,
            uptime_at_ref: TimeValue { sec: 0, usec: 0 },
            utctime_at_ref: TimeValue { sec: 0, usec: 0 },
            timezone: Timezone {
                minutes_west: 0,
                dst_offset: 0,
            },
            listeners: Vec::new(),
            next_listener_id: 0,
        }
    }

    fn delta_since_ref(&self, current_tick: u32) -> u32 {
        current_tick.wrapping_sub(self.ostime_ref)
    }

    fn delta_to_time(delta: u32) -> (u32, u32) {
        let sec = delta / TICKS_PER_SECOND;
        let usec = (delta % TICKS_PER_SECOND) * (1_000_000 / TICKS_PER_SECOND);
        (sec, usec)
    }

    fn add_delta(base: TimeValue, delta: u32) -> TimeValue {
        let (dsec, dusec) = Self::delta_to_time(delta);
        let mut sec = base.sec.wrapping_add(dsec);
        let mut usec = base.usec + dusec;
        if usec >= 1_000_000 {
            usec -= 1_000_000;
            sec = sec.wrapping_add(1);
        }
        TimeValue { sec, usec }
    }

    /// `(seconds, microseconds)` since boot, as of `current_tick`.
    pub fn uptime(&self, current_tick: u32) -> (u32, u32) {
        let tv = Self::add_delta(self.uptime_at_ref, self.delta_since_ref(current_tick));
        (tv.sec, tv.usec)
    }

    pub fn utc(&self, current_tick: u32) -> (TimeValue, Timezone) {
        let tv = Self::add_delta(self.utctime_at_ref, self.delta_since_ref(current_tick));
        (tv, self.timezone)
    }

    pub fn is_time_set(&self) -> bool {
        self.utctime_at_ref.sec > 0
    }

    /// Roll both cached bases forward by the delta accumulated so far and
    /// reset `ostime_ref`, without changing the wall-clock or uptime value
    /// this reports. Called when the tick counter's sign bit flips so that
    /// `current_tick - ostime_ref` never spans more than 2^31 ticks.
    pub fn rebase(&mut self, current_tick: u32) {
        let (uptime_sec, uptime_usec) = self.uptime(current_tick);
        let (utc, _tz) = self.utc(current_tick);
        self.uptime_at_ref = TimeValue {
            sec: uptime_sec,
            usec: uptime_usec,
        };
        self.utctime_at_ref = utc;
        self.ostime_ref = current_tick;
    }

    /// Advance the uptime base by the delta accumulated so far, overwrite
    /// the wall-clock/timezone, and reset `ostime_ref = current_tick`.
    /// Returns the event to notify listeners with once the caller has left
    /// its critical section.
    pub fn set_utc(&mut self, current_tick: u32, tv: TimeValue, tz: Timezone) -> TimeChangeEvent {
        let newly_synced = self.utctime_at_ref.sec == 0;
        let (prev_tv, prev_tz) = self.utc(current_tick);

        let (uptime_sec, uptime_usec) = self.uptime(current_tick);
        self.uptime_at_ref = TimeValue {
            sec: uptime_sec,
            usec: uptime_usec,
        };
        self.utctime_at_ref = tv;
        self.timezone = tz;
        self.ostime_ref = current_tick;

        TimeChangeEvent {
            prev_tv,
            cur_tv: tv,
            prev_tz,
            cur_tz: tz,
            newly_synced,
        }
    }

    /// The caller-supplied `callback` function pointer is the listener's
    /// identity (there is no separate opaque-argument slot to distinguish
    /// two registrations of the same callback). Registering the same
    /// callback twice is a programming error per §4.H/§7: it halts via
    /// `debug_assert!` and, in a release build where that assertion is
    /// compiled out, is still rejected with `InvalidParam` rather than
    /// silently accepted.
    pub fn register_listener(&mut self, callback: ListenerCallback) -> KernelResult<ListenerId> {
        let already_registered = self.listeners.iter().any(|l| l.callback == callback);
        debug_assert!(!already_registered, "listener callback registered twice");
        if already_registered {
            return Err(KernelError::InvalidParam);
        }

        let id = self.next_listener_id;
        self.next_listener_id = self.next_listener_id.wrapping_add(1);
        self.listeners
            .push(Listener { id, callback })
            .map_err(|_| KernelError::Overflow)?;
        Ok(id)
    }

    /// It is a no-op (reported as `NotFound`) to remove an unregistered
    /// listener.
    pub fn remove_listener(&mut self, id: ListenerId) -> KernelResult<()> {
        let pos = self
            .listeners
            .iter()
            .position(|l| l.id == id)
            .ok_or(KernelError::NotFound)?;
        self.listeners.remove(pos);
        Ok(())
    }

    /// Copy out `(id, callback)` pairs in registration order so a caller can
    /// invoke them after releasing the kernel lock. `spin::Mutex` is not
    /// reentrant, so running callbacks while the lock that guards this
    /// `TimeOfDay` is still held would deadlock the moment a listener calls
    /// back into anything that touches kernel state (e.g. `get_uptime`).
    pub fn listener_snapshot(&self) -> Vec<(ListenerId, ListenerCallback), MAX_LISTENERS> {
        let mut snapshot = Vec::new();
        for listener in self.listeners.iter() {
            let _ = snapshot.push((listener.id, listener.callback));
        }
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uptime_accumulates_from_tick_delta() {
        let tod = TimeOfDay::new();
        assert_eq!(tod.uptime(0), (0, 0));
        assert_eq!(tod.uptime(100), (0, 100_000));
        assert_eq!(tod.uptime(1_000), (1, 0));
        assert_eq!(tod.uptime(1_100), (1, 100_000));
    }

    #[test]
    fn set_utc_reports_newly_synced_once() {
        let mut tod = TimeOfDay::new();
        let tv = TimeValue {
            sec: 1_700_000_000,
            usec: 0,
        };
        let event = tod.set_utc(0, tv, Timezone::default());
        assert!(event.newly_synced);
        assert_eq!(event.cur_tv, tv);

        let event2 = tod.set_utc(10, tv, Timezone::default());
        assert!(!event2.newly_synced);
    }

    #[test]
    fn rebase_preserves_reported_uptime() {
        let mut tod = TimeOfDay::new();
        let before = tod.uptime(5_000);
        tod.rebase(5_000);
        let after = tod.uptime(5_000);
        assert_eq!(before, after);
        assert_eq!(tod.uptime(6_000), (before.0 + 1, before.1));
    }

    #[test]
    fn listener_not_found_on_double_remove() {
        let mut tod = TimeOfDay::new();
        fn cb(_id: ListenerId, _e: &TimeChangeEvent) {}
        let id = tod.register_listener(cb).unwrap();
        assert!(tod.remove_listener(id).is_ok());
        assert_eq!(tod.remove_listener(id), Err(KernelError::NotFound));
    }

    #[test]
    fn registering_the_same_callback_twice_is_rejected() {
        let mut tod = TimeOfDay::new();
        fn cb(_id: ListenerId, _e: &TimeChangeEvent) {}
        tod.register_listener(cb).unwrap();
        assert_eq!(tod.register_listener(cb), Err(KernelError::InvalidParam));
    }

    #[test]
    fn distinct_callbacks_can_both_register() {
        let mut tod = TimeOfDay::new();
        fn cb_a(_id: ListenerId, _e: &TimeChangeEvent) {}
        fn cb_b(_id: ListenerId, _e: &TimeChangeEvent) {}
        assert!(tod.register_listener(cb_a).is_ok());
        assert!(tod.register_listener(cb_b).is_ok());
    }
}
