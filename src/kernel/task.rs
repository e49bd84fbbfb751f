/*
 * Task lifecycle (component G)
 *
 * A `Task` is a small plain record; membership in the ready or sleep queue
 * is represented by position in those collections (see `ready_queue`,
 * `sleep_queue`), not by embedded link pointers, per the "intrusive links"
 * design note: the task arena here is the `heapless::Vec` owned by
 * `KernelState`.
 */

use heapless::String;

use crate::arch::{ActiveArch, ActiveCriticalSection, Arch as _, CriticalSection as _};
use crate::config::{MAX_TASK_NAME_LEN, STACK_SENTINEL};
use crate::kernel::error::{KernelError, KernelResult};
use crate::kernel::scheduler;
use crate::kernel::state::{KernelState, KERNEL};
use crate::kernel::tick::WAIT_FOREVER;

pub type TaskId = u16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Ready,
    Running,
    Sleep,
    Removed,
}

bitflags::bitflags! {
    /// A task cannot be removed while any of these are set.
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct WaitFlags: u8 {
        const MUTEX     = 0b001;
        const SEMAPHORE = 0b010;
        const EVENT     = 0b100;
    }
}

/// A per-task sanity-check record. The sanity-check subsystem itself is
/// external; the kernel only stores this record and exposes `checkin`/
/// `is_overdue` for that subsystem to call into.
#[derive(Clone, Copy, Debug)]
pub struct SanityRecord {
    /// `WAIT_FOREVER` means "not registered".
    interval_ticks: u32,
    last_checkin: u32,
}

impl SanityRecord {
    fn new(interval_ticks: u32, registered_at: u32) -> Self {
        SanityRecord {
            interval_ticks,
            last_checkin: registered_at,
        }
    }

    pub fn is_registered(&self) -> bool {
        self.interval_ticks != WAIT_FOREVER
    }

    pub fn is_overdue(&self, now: u32) -> bool {
        self.is_registered() && now.wrapping_sub(self.last_checkin) >= self.interval_ticks
    }

    pub fn checkin(&mut self, now: u32) {
        self.last_checkin = now;
    }

    pub fn next_checkin_due(&self) -> Option<u32> {
        self.is_registered()
            .then(|| self.last_checkin.wrapping_add(self.interval_ticks))
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TaskStats {
    pub context_switches: u32,
    pub run_time_ticks: u32,
}

pub struct Task {
    pub id: TaskId,
    pub name: String<MAX_TASK_NAME_LEN>,
    pub priority: u8,
    pub state: TaskState,
    pub next_wakeup: u32,
    pub saved_sp: usize,
    stack_base: usize,
    stack_size: usize,
    pub wait_flags: WaitFlags,
    pub lock_hold_count: u16,
    pub sanity: SanityRecord,
    pub stats: TaskStats,
}

impl Task {
    fn new(
        id: TaskId,
        name: &str,
        priority: u8,
        entry: extern "C" fn(usize) -> !,
        arg: usize,
        stack: &'static mut [u8],
        sanity_interval: u32,
        now: u32,
    ) -> Self {
        stack.fill(STACK_SENTINEL);
        let stack_base = stack.as_ptr() as usize;
        let stack_size = stack.len();
        let saved_sp = ActiveArch::stack_init(stack, entry, arg);

        // `heapless::String::push_str` fails atomically (leaving the string
        // untouched) if `name` doesn't fit, so truncate to the largest
        // prefix that both fits in `MAX_TASK_NAME_LEN` bytes and falls on a
        // char boundary, rather than silently ending up with an empty name.
        let mut end = name.len().min(MAX_TASK_NAME_LEN);
        while end > 0 && !name.is_char_boundary(end) {
            end -= 1;
        }
        let mut bounded_name = String::new();
        let _ = bounded_name.push_str(&name[..end]);

        Task {
            id,
            name: bounded_name,
            priority,
            state: TaskState::Ready,
            next_wakeup: 0,
            saved_sp,
            stack_base,
            stack_size,
            wait_flags: WaitFlags::empty(),
            lock_hold_count: 0,
            sanity: SanityRecord::new(sanity_interval, now),
            stats: TaskStats::default(),
        }
    }

    pub fn is_blocked(&self) -> bool {
        !self.wait_flags.is_empty() || self.lock_hold_count > 0
    }

    /// Scan the stack region from the low address upward for the first byte
    /// that no longer matches the fill sentinel. The offset of that byte,
    /// subtracted from the stack size, is the high-water mark of usage.
    pub fn stack_watermark(&self) -> usize {
        // SAFETY: the stack region is exclusively owned by this task from
        // creation to removal; reading it here does not race a live task
        // because watermark queries only happen through `task_iter`, which
        // never targets the running task's own in-flight stack frame for
        // anything but a read of already-written bytes.
        let stack =
            unsafe { core::slice::from_raw_parts(self.stack_base as *const u8, self.stack_size) };
        let untouched = stack.iter().take_while(|&&b| b == STACK_SENTINEL).count();
        self.stack_size.saturating_sub(untouched)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct TaskInfo {
    pub id: TaskId,
    pub priority: u8,
    pub state: TaskState,
    pub stack_watermark: usize,
    pub context_switches: u32,
    pub run_time_ticks: u32,
    pub next_checkin_due: Option<u32>,
}

/// `create(task, name, entry, arg, priority, sanity_interval, stack, stack_size)`
/// from the design: zero the record, assign a fresh id, fill the stack with
/// the watermark sentinel, lay out the initial frame, assert the priority
/// is unused, insert into the task list and ready queue, register sanity
/// checking if requested, and — if the scheduler is already running —
/// invoke `schedule()` so a higher-priority newcomer preempts immediately.
pub fn task_create(
    name: &str,
    priority: u8,
    entry: extern "C" fn(usize) -> !,
    arg: usize,
    stack: &'static mut [u8],
    sanity_interval: u32,
) -> KernelResult<TaskId> {
    if stack.is_empty() {
        return Err(KernelError::InvalidParam);
    }

    let saved = ActiveCriticalSection::enter();
    let outcome = (|| -> KernelResult<(TaskId, bool)> {
        let mut kernel = KERNEL.lock();

        debug_assert!(
            !kernel.priority_in_use(priority),
            "duplicate task priority {}",
            priority
        );
        if kernel.priority_in_use(priority) {
            return Err(KernelError::InvalidParam);
        }

        let id = kernel.fresh_task_id();
        let now = kernel.tick.get();
        let task = Task::new(id, name, priority, entry, arg, stack, sanity_interval, now);
        kernel
            .tasks
            .push(task)
            .map_err(|_| KernelError::Overflow)?;
        kernel.ready.insert(priority, id);

        Ok((id, kernel.started))
    })();
    ActiveCriticalSection::exit(saved);

    let (id, started) = outcome?;
    log::info!("task {:?} created: \"{}\" priority {}", id, name, priority);
    if started {
        scheduler::schedule();
    }
    Ok(id)
}

/// `remove(task)`: `INVALID_PARAM` if `task` is the running one,
/// `NOT_STARTED` if its state is neither READY nor SLEEP, `BUSY` if any
/// wait-flag is set or `lock_hold_count > 0`. Otherwise removes it from
/// whichever queue holds it and marks it REMOVED.
pub fn task_remove(id: TaskId) -> KernelResult<()> {
    let saved = ActiveCriticalSection::enter();
    let result = (|| -> KernelResult<()> {
        let mut kernel = KERNEL.lock();

        if kernel.current == Some(id) {
            return Err(KernelError::InvalidParam);
        }

        let (priority, state) = {
            let task = kernel.find_task(id).ok_or(KernelError::NotStarted)?;
            match task.state {
                TaskState::Ready | TaskState::Sleep => {}
                _ => return Err(KernelError::NotStarted),
            }
            if task.is_blocked() {
                return Err(KernelError::Busy);
            }
            (task.priority, task.state)
        };

        match state {
            TaskState::Ready => {
                kernel.ready.remove(priority);
            }
            TaskState::Sleep => {
                kernel.sleep.remove(id);
            }
            _ => unreachable!("checked above"),
        }

        if let Some(task) = kernel.find_task_mut(id) {
            task.state = TaskState::Removed;
        }

        Ok(())
    })();
    ActiveCriticalSection::exit(saved);
    if result.is_ok() {
        log::info!("task {:?} removed", id);
    }
    result
}

/// Stable iteration over the task list: pass `None` to begin, then the
/// previously returned id to continue. Returns `None` at end-of-iteration.
pub fn task_iter(prev: Option<TaskId>) -> Option<TaskInfo> {
    let saved = ActiveCriticalSection::enter();
    let info = {
        let kernel = KERNEL.lock();
        task_iter_locked(&kernel, prev)
    };
    ActiveCriticalSection::exit(saved);
    info
}

fn task_iter_locked(kernel: &KernelState, prev: Option<TaskId>) -> Option<TaskInfo> {
    let mut iter = kernel.tasks.iter();
    if let Some(prev_id) = prev {
        for task in iter.by_ref() {
            if task.id == prev_id {
                break;
            }
        }
    }
    iter.next().map(|task| TaskInfo {
        id: task.id,
        priority: task.priority,
        state: task.state,
        stack_watermark: task.stack_watermark(),
        context_switches: task.stats.context_switches,
        run_time_ticks: task.stats.run_time_ticks,
        next_checkin_due: task.sanity.next_checkin_due(),
    })
}

/// Record that `task` has checked in with the (external) sanity-check
/// subsystem at the current tick.
pub fn task_sanity_checkin(id: TaskId) -> KernelResult<()> {
    let saved = ActiveCriticalSection::enter();
    let result = {
        let mut kernel = KERNEL.lock();
        let now = kernel.tick.get();
        match kernel.find_task_mut(id) {
            Some(task) => {
                task.sanity.checkin(now);
                Ok(())
            }
            None => Err(KernelError::NotFound),
        }
    };
    ActiveCriticalSection::exit(saved);
    result
}
