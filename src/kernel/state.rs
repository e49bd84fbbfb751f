/*
 * Global kernel state
 *
 * One process-wide value holding the tick, the time-of-day base, the
 * listener list, and the ready/sleep queues and task arena, with explicit
 * initialization at startup and a single critical-section discipline for
 * every mutation — no hidden initialization at first use beyond the lazy
 * construction of the `Mutex` itself, which the teacher's codebase does the
 * same way for its own global scheduler state.
 */

use heapless::Vec;
use lazy_static::lazy_static;
use spin::Mutex;

use crate::config::MAX_TASKS;
use crate::kernel::ready_queue::ReadyQueue;
use crate::kernel::sleep_queue::SleepQueue;
use crate::kernel::task::{Task, TaskId, TaskState};
use crate::kernel::tick::TickSource;
use crate::kernel::timeofday::TimeOfDay;

pub struct KernelState {
    pub tasks: Vec<Task, MAX_TASKS>,
    pub ready: ReadyQueue,
    pub sleep: SleepQueue,
    pub tick: TickSource,
    pub timeofday: TimeOfDay,
    pub current: Option<TaskId>,
    pub started: bool,
    next_task_id: TaskId,
}

impl KernelState {
    pub const fn new() -> Self {
        KernelState {
            tasks: Vec::new(),
            ready: ReadyQueue::new(),
            sleep: SleepQueue::new(),
            tick: TickSource::new(),
            timeofday: TimeOfDay::new(),
            current: None,
            started: false,
            next_task_id: 0,
        }
    }

    pub fn fresh_task_id(&mut self) -> TaskId {
        let id = self.next_task_id;
        self.next_task_id = self.next_task_id.wrapping_add(1);
        id
    }

    pub fn find_task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn find_task_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    pub fn priority_in_use(&self, priority: u8) -> bool {
        self.tasks
            .iter()
            .any(|t| t.priority == priority && t.state != TaskState::Removed)
    }
}

impl Default for KernelState {
    fn default() -> Self {
        Self::new()
    }
}

lazy_static! {
    pub static ref KERNEL: Mutex<KernelState> = Mutex::new(KernelState::new());
}
