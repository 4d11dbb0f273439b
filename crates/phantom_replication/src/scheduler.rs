//! Tick-based task scheduling.
//!
//! Delays are counted in simulation ticks rather than wall time, so nothing
//! here blocks or spawns threads. The owner calls [`TickScheduler::advance`]
//! once per tick and runs whatever comes back.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Handle identifying a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskHandle(u64);

#[derive(Debug, Clone)]
struct ScheduledTask<T> {
    task: T,
    due_tick: u64,
    /// Repeat period in ticks, `None` for one-shot tasks
    period: Option<u64>,
}

/// Schedules one-shot and repeating tasks in ticks.
#[derive(Debug, Clone)]
pub struct TickScheduler<T> {
    current_tick: u64,
    next_handle: u64,
    tasks: BTreeMap<TaskHandle, ScheduledTask<T>>,
}

impl<T: Clone> TickScheduler<T> {
    pub fn new() -> Self {
        Self {
            current_tick: 0,
            next_handle: 1,
            tasks: BTreeMap::new(),
        }
    }

    /// Ticks advanced so far.
    pub fn current_tick(&self) -> u64 {
        self.current_tick
    }

    /// Runs `task` once, `delay` ticks from now (a delay of 0 runs on the next advance).
    pub fn schedule_once(&mut self, delay: u64, task: T) -> TaskHandle {
        self.insert(task, delay, None)
    }

    /// Runs `task` after `delay` ticks and then every `period` ticks.
    pub fn schedule_repeating(&mut self, delay: u64, period: u64, task: T) -> TaskHandle {
        self.insert(task, delay, Some(period.max(1)))
    }

    fn insert(&mut self, task: T, delay: u64, period: Option<u64>) -> TaskHandle {
        let handle = TaskHandle(self.next_handle);
        self.next_handle += 1;
        self.tasks.insert(
            handle,
            ScheduledTask {
                task,
                due_tick: self.current_tick + delay.max(1),
                period,
            },
        );
        handle
    }

    /// Cancels a task. Unknown or already-cancelled handles are a no-op.
    ///
    /// Returns whether a pending task was actually removed.
    pub fn cancel(&mut self, handle: TaskHandle) -> bool {
        self.tasks.remove(&handle).is_some()
    }

    /// Whether `handle` still refers to a pending task.
    pub fn is_scheduled(&self, handle: TaskHandle) -> bool {
        self.tasks.contains_key(&handle)
    }

    /// Number of pending tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Advances one tick and returns the tasks that became due, in handle order.
    pub fn advance(&mut self) -> Vec<(TaskHandle, T)> {
        self.current_tick += 1;
        let now = self.current_tick;

        let due: Vec<TaskHandle> = self
            .tasks
            .iter()
            .filter(|(_, scheduled)| scheduled.due_tick <= now)
            .map(|(handle, _)| *handle)
            .collect();

        let mut ready = Vec::with_capacity(due.len());
        for handle in due {
            let keep = match self.tasks.get_mut(&handle) {
                Some(scheduled) => {
                    ready.push((handle, scheduled.task.clone()));
                    match scheduled.period {
                        Some(period) => {
                            scheduled.due_tick = now + period;
                            true
                        }
                        None => false,
                    }
                }
                None => continue,
            };
            if !keep {
                self.tasks.remove(&handle);
            }
        }
        ready
    }
}

impl<T: Clone> Default for TickScheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}
