use std::collections::VecDeque;
use std::fmt;

use crate::page::Page;
use crate::{Error, Result};

pub type TimerId = i64;

pub(crate) type TaskCallback = Box<dyn FnOnce(&mut Page) -> Result<()>>;

pub(crate) struct ScheduledTask {
    pub(crate) id: TimerId,
    pub(crate) due_at: i64,
    pub(crate) order: i64,
    pub(crate) label: &'static str,
    pub(crate) callback: TaskCallback,
}

impl fmt::Debug for ScheduledTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledTask")
            .field("id", &self.id)
            .field("due_at", &self.due_at)
            .field("order", &self.order)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

pub(crate) struct Microtask {
    pub(crate) label: &'static str,
    pub(crate) callback: TaskCallback,
}

impl fmt::Debug for Microtask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Microtask")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTimer {
    pub id: TimerId,
    pub due_at: i64,
    pub order: i64,
    pub label: &'static str,
}

#[derive(Debug)]
pub(crate) struct SchedulerState {
    pub(crate) task_queue: Vec<ScheduledTask>,
    pub(crate) microtask_queue: VecDeque<Microtask>,
    pub(crate) now_ms: i64,
    pub(crate) timer_step_limit: usize,
    pub(crate) next_timer_id: TimerId,
    pub(crate) next_task_order: i64,
    pub(crate) task_depth: usize,
}

impl Default for SchedulerState {
    fn default() -> Self {
        Self {
            task_queue: Vec::new(),
            microtask_queue: VecDeque::new(),
            now_ms: 0,
            timer_step_limit: 10_000,
            next_timer_id: 1,
            next_task_order: 0,
            task_depth: 0,
        }
    }
}

impl SchedulerState {
    fn allocate_timer_id(&mut self) -> TimerId {
        let id = self.next_timer_id;
        self.next_timer_id += 1;
        id
    }

    fn allocate_task_order(&mut self) -> i64 {
        let order = self.next_task_order;
        self.next_task_order += 1;
        order
    }

    fn next_task_index(&self, due_limit: Option<i64>) -> Option<usize> {
        self.task_queue
            .iter()
            .enumerate()
            .filter(|(_, task)| due_limit.is_none_or(|limit| task.due_at <= limit))
            .min_by_key(|(_, task)| (task.due_at, task.order))
            .map(|(idx, _)| idx)
    }
}

impl Page {
    pub fn now_ms(&self) -> i64 {
        self.scheduler.now_ms
    }

    /// Schedules `callback` to run once after `delay_ms`. The label names the
    /// timer in traces and in [`Page::pending_timers`].
    pub fn set_timeout(
        &mut self,
        delay_ms: u64,
        label: &'static str,
        callback: impl FnOnce(&mut Page) -> Result<()> + 'static,
    ) -> TimerId {
        let delay_ms = i64::try_from(delay_ms).unwrap_or(i64::MAX);
        let id = self.scheduler.allocate_timer_id();
        let order = self.scheduler.allocate_task_order();
        let due_at = self.scheduler.now_ms.saturating_add(delay_ms);
        self.scheduler.task_queue.push(ScheduledTask {
            id,
            due_at,
            order,
            label,
            callback: Box::new(callback),
        });
        self.trace_timer_line(format!(
            "[timer] schedule id={id} label={label} due_at={due_at} delay_ms={delay_ms}"
        ));
        id
    }

    /// Cancels a pending timer. Returns false when it already ran or never existed.
    pub fn clear_timeout(&mut self, timer_id: TimerId) -> bool {
        let before = self.scheduler.task_queue.len();
        self.scheduler.task_queue.retain(|task| task.id != timer_id);
        let existed = self.scheduler.task_queue.len() != before;
        self.trace_timer_line(format!("[timer] clear id={timer_id} existed={existed}"));
        existed
    }

    pub fn clear_all_timers(&mut self) -> usize {
        let cleared = self.scheduler.task_queue.len();
        self.scheduler.task_queue.clear();
        self.trace_timer_line(format!("[timer] clear_all cleared={cleared}"));
        cleared
    }

    pub fn pending_timers(&self) -> Vec<PendingTimer> {
        let mut timers = self
            .scheduler
            .task_queue
            .iter()
            .map(|task| PendingTimer {
                id: task.id,
                due_at: task.due_at,
                order: task.order,
                label: task.label,
            })
            .collect::<Vec<_>>();
        timers.sort_by_key(|timer| (timer.due_at, timer.order));
        timers
    }

    pub fn advance_time(&mut self, delta_ms: i64) -> Result<()> {
        if delta_ms < 0 {
            return Err(Error::Runtime(
                "advance_time requires non-negative milliseconds".into(),
            ));
        }
        let target = self.scheduler.now_ms.saturating_add(delta_ms);
        let from = self.scheduler.now_ms;
        let ran = self.run_until(target)?;
        self.trace_timer_line(format!(
            "[timer] advance delta_ms={delta_ms} from={from} to={} ran_due={ran}",
            self.scheduler.now_ms
        ));
        Ok(())
    }

    pub fn advance_time_to(&mut self, target_ms: i64) -> Result<()> {
        if target_ms < self.scheduler.now_ms {
            return Err(Error::Runtime(format!(
                "advance_time_to requires target >= now_ms (target={target_ms}, now_ms={})",
                self.scheduler.now_ms
            )));
        }
        let from = self.scheduler.now_ms;
        let ran = self.run_until(target_ms)?;
        self.trace_timer_line(format!(
            "[timer] advance_to from={from} to={} ran_due={ran}",
            self.scheduler.now_ms
        ));
        Ok(())
    }

    /// Runs every pending timer, moving the clock forward as needed.
    pub fn flush(&mut self) -> Result<()> {
        let from = self.scheduler.now_ms;
        let ran = self.run_timer_queue(None)?;
        self.trace_timer_line(format!(
            "[timer] flush from={from} to={} ran={ran}",
            self.scheduler.now_ms
        ));
        Ok(())
    }

    pub fn run_due_timers(&mut self) -> Result<usize> {
        let ran = self.run_timer_queue(Some(self.scheduler.now_ms))?;
        self.trace_timer_line(format!(
            "[timer] run_due now_ms={} ran={ran}",
            self.scheduler.now_ms
        ));
        Ok(ran)
    }

    // Timers scheduled by a running timer still fire within the same advance
    // when they fall due before the target.
    fn run_until(&mut self, target_ms: i64) -> Result<usize> {
        let ran = self.run_timer_queue(Some(target_ms))?;
        self.scheduler.now_ms = self.scheduler.now_ms.max(target_ms);
        Ok(ran)
    }

    fn run_timer_queue(&mut self, due_limit: Option<i64>) -> Result<usize> {
        let mut steps = 0usize;
        while let Some(next_idx) = self.scheduler.next_task_index(due_limit) {
            steps += 1;
            if steps > self.scheduler.timer_step_limit {
                return Err(Error::Runtime(format!(
                    "timer queue exceeded max task steps: limit={}, now_ms={}, pending_tasks={}",
                    self.scheduler.timer_step_limit,
                    self.scheduler.now_ms,
                    self.scheduler.task_queue.len()
                )));
            }
            let task = self.scheduler.task_queue.remove(next_idx);
            if task.due_at > self.scheduler.now_ms {
                self.scheduler.now_ms = task.due_at;
            }
            self.execute_timer_task(task)?;
        }
        Ok(steps)
    }

    fn execute_timer_task(&mut self, task: ScheduledTask) -> Result<()> {
        self.trace_timer_line(format!(
            "[timer] run id={} label={} due_at={} now_ms={}",
            task.id, task.label, task.due_at, self.scheduler.now_ms
        ));
        let label = task.label;
        let callback = task.callback;
        self.run_in_task_context(|page| {
            if let Err(err) = callback(page) {
                page.record_listener_error(label, err);
            }
            Ok(())
        })
    }

    pub(crate) fn queue_microtask(
        &mut self,
        label: &'static str,
        callback: impl FnOnce(&mut Page) -> Result<()> + 'static,
    ) {
        self.scheduler.microtask_queue.push_back(Microtask {
            label,
            callback: Box::new(callback),
        });
        if self.scheduler.task_depth == 0 {
            self.run_microtasks();
        }
    }

    /// Runs `f` as one task; the microtask queue drains when the outermost task ends.
    pub(crate) fn run_in_task_context<R>(
        &mut self,
        f: impl FnOnce(&mut Page) -> Result<R>,
    ) -> Result<R> {
        self.scheduler.task_depth += 1;
        let result = f(self);
        self.scheduler.task_depth -= 1;
        if self.scheduler.task_depth == 0 {
            self.run_microtasks();
        }
        result
    }

    fn run_microtasks(&mut self) {
        self.scheduler.task_depth += 1;
        while let Some(microtask) = self.scheduler.microtask_queue.pop_front() {
            self.trace_timer_line(format!("[microtask] run label={}", microtask.label));
            if let Err(err) = (microtask.callback)(self) {
                self.record_listener_error(microtask.label, err);
            }
        }
        self.scheduler.task_depth -= 1;
    }
}
