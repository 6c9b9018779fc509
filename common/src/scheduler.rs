use std::collections::VecDeque;
use std::num::NonZeroU32;

use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repeat {
    Once,
    Times(NonZeroU32),
    Forever,
}

impl Repeat {
    fn budget(self) -> Option<u32> {
        match self {
            Self::Once => Some(1),
            Self::Times(count) => Some(count.get()),
            Self::Forever => None,
        }
    }
}

/// Externally observable lifecycle of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskPhase {
    /// Not scheduled; body will not run.
    Dormant,
    /// Scheduled; body runs once per elapsed interval.
    Armed,
    /// Iteration budget exhausted; stays off until restarted.
    Retired,
}

#[derive(Debug, Clone, Copy)]
enum State {
    Dormant,
    Armed {
        next_due_ms: u64,
        remaining: Option<u32>,
    },
    Retired,
}

/// Deferred scheduler operations, queued by a running body or hook and
/// applied once it has returned. Tasks never hold a reference to the
/// scheduler while it is dispatching them.
#[derive(Default)]
pub struct Requests {
    queue: VecDeque<Request>,
}

enum Request {
    Enable(TaskId),
    Disable(TaskId),
    Restart(TaskId),
    RestartDelayed(TaskId, u64),
}

impl Requests {
    fn new() -> Self {
        Self::default()
    }

    pub fn enable(&mut self, id: TaskId) {
        self.queue.push_back(Request::Enable(id));
    }

    pub fn disable(&mut self, id: TaskId) {
        self.queue.push_back(Request::Disable(id));
    }

    pub fn restart(&mut self, id: TaskId) {
        self.queue.push_back(Request::Restart(id));
    }

    pub fn restart_delayed(&mut self, id: TaskId, delay_ms: u64) {
        self.queue.push_back(Request::RestartDelayed(id, delay_ms));
    }
}

type Body<C> = Box<dyn FnMut(&mut C, &mut Requests)>;
type EnableGate<C> = Box<dyn FnMut(&mut C, &mut Requests) -> bool>;
type DisableHook<C> = Box<dyn FnMut(&mut C, &mut Requests)>;

pub struct Task<C> {
    interval_ms: u64,
    repeat: Repeat,
    body: Body<C>,
    on_enable: Option<EnableGate<C>>,
    on_disable: Option<DisableHook<C>>,
    state: State,
}

impl<C> Task<C> {
    pub fn new(
        interval_ms: u64,
        repeat: Repeat,
        body: impl FnMut(&mut C, &mut Requests) + 'static,
    ) -> Self {
        Self {
            interval_ms,
            repeat,
            body: Box::new(body),
            on_enable: None,
            on_disable: None,
            state: State::Dormant,
        }
    }

    /// Gate evaluated when the task is enabled. Returning `false` vetoes the
    /// activation: the task stays dormant and its disable hook does not run.
    pub fn with_enable_gate(
        mut self,
        gate: impl FnMut(&mut C, &mut Requests) -> bool + 'static,
    ) -> Self {
        self.on_enable = Some(Box::new(gate));
        self
    }

    /// Hook invoked whenever the task leaves the armed phase, whether through
    /// an explicit disable or through iteration exhaustion.
    pub fn with_disable_hook(
        mut self,
        hook: impl FnMut(&mut C, &mut Requests) + 'static,
    ) -> Self {
        self.on_disable = Some(Box::new(hook));
        self
    }
}

/// Cooperative single-threaded dispatcher over a fixed task set.
///
/// `tick` walks every task in registration order and runs the ones that are
/// due against the shared context `C`. All timing is driven by the caller's
/// millisecond clock, so tests tick with a virtual clock.
pub struct Scheduler<C> {
    tasks: Vec<Task<C>>,
}

impl<C> Scheduler<C> {
    pub fn new() -> Self {
        Self { tasks: Vec::new() }
    }

    pub fn add(&mut self, task: Task<C>) -> TaskId {
        self.tasks.push(task);
        TaskId(self.tasks.len() - 1)
    }

    pub fn phase(&self, id: TaskId) -> TaskPhase {
        match self.tasks[id.0].state {
            State::Dormant => TaskPhase::Dormant,
            State::Armed { .. } => TaskPhase::Armed,
            State::Retired => TaskPhase::Retired,
        }
    }

    pub fn enable(&mut self, id: TaskId, ctx: &mut C, now_ms: u64) {
        let mut requests = Requests::new();
        self.activate(id, ctx, now_ms, None, &mut requests);
        self.apply(ctx, now_ms, &mut requests);
    }

    pub fn disable(&mut self, id: TaskId, ctx: &mut C, now_ms: u64) {
        let mut requests = Requests::new();
        self.deactivate(id, ctx, &mut requests);
        self.apply(ctx, now_ms, &mut requests);
    }

    pub fn restart(&mut self, id: TaskId, ctx: &mut C, now_ms: u64) {
        let mut requests = Requests::new();
        requests.restart(id);
        self.apply(ctx, now_ms, &mut requests);
    }

    /// Dispatch every due task once. A task that was due multiple intervals
    /// ago still runs a single time and is re-based from `now_ms`; the loop
    /// never bursts to catch up after a stall.
    pub fn tick(&mut self, ctx: &mut C, now_ms: u64) {
        let mut requests = Requests::new();

        for index in 0..self.tasks.len() {
            let task = &mut self.tasks[index];
            let State::Armed {
                next_due_ms,
                remaining,
            } = task.state
            else {
                continue;
            };
            if now_ms < next_due_ms {
                continue;
            }

            (task.body)(ctx, &mut requests);

            let remaining = remaining.map(|left| left.saturating_sub(1));
            if remaining == Some(0) {
                task.state = State::Retired;
                if let Some(hook) = task.on_disable.as_mut() {
                    hook(ctx, &mut requests);
                }
            } else {
                task.state = State::Armed {
                    next_due_ms: now_ms.saturating_add(task.interval_ms),
                    remaining,
                };
            }

            self.apply(ctx, now_ms, &mut requests);
        }
    }

    fn apply(&mut self, ctx: &mut C, now_ms: u64, requests: &mut Requests) {
        while let Some(request) = requests.queue.pop_front() {
            match request {
                Request::Enable(id) => self.activate(id, ctx, now_ms, None, requests),
                Request::Disable(id) => self.deactivate(id, ctx, requests),
                Request::Restart(id) => {
                    self.deactivate(id, ctx, requests);
                    self.activate(id, ctx, now_ms, None, requests);
                }
                Request::RestartDelayed(id, delay_ms) => {
                    self.deactivate(id, ctx, requests);
                    self.activate(id, ctx, now_ms, Some(delay_ms), requests);
                }
            }
        }
    }

    fn activate(
        &mut self,
        id: TaskId,
        ctx: &mut C,
        now_ms: u64,
        first_delay_ms: Option<u64>,
        requests: &mut Requests,
    ) {
        let task = &mut self.tasks[id.0];
        if matches!(task.state, State::Armed { .. }) {
            warn!("task {} enabled while armed, ignoring; use restart", id.0);
            return;
        }

        if let Some(gate) = task.on_enable.as_mut() {
            if !gate(ctx, requests) {
                task.state = State::Dormant;
                return;
            }
        }

        let delay_ms = first_delay_ms.unwrap_or(task.interval_ms);
        task.state = State::Armed {
            next_due_ms: now_ms.saturating_add(delay_ms),
            remaining: task.repeat.budget(),
        };
    }

    fn deactivate(&mut self, id: TaskId, ctx: &mut C, requests: &mut Requests) {
        let task = &mut self.tasks[id.0];
        if !matches!(task.state, State::Armed { .. }) {
            return;
        }
        task.state = State::Dormant;
        if let Some(hook) = task.on_disable.as_mut() {
            hook(ctx, requests);
        }
    }
}

impl<C> Default for Scheduler<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Log = Vec<&'static str>;

    fn counting(label: &'static str, interval_ms: u64, repeat: Repeat) -> Task<Log> {
        Task::new(interval_ms, repeat, move |log: &mut Log, _| log.push(label))
    }

    #[test]
    fn runs_once_per_elapsed_interval() {
        let mut scheduler = Scheduler::new();
        let task = scheduler.add(counting("run", 100, Repeat::Forever));
        let mut log = Log::new();
        scheduler.enable(task, &mut log, 0);

        scheduler.tick(&mut log, 0);
        scheduler.tick(&mut log, 99);
        assert!(log.is_empty());

        scheduler.tick(&mut log, 100);
        scheduler.tick(&mut log, 150);
        scheduler.tick(&mut log, 199);
        scheduler.tick(&mut log, 200);
        assert_eq!(log, vec!["run", "run"]);
    }

    #[test]
    fn zero_interval_task_runs_every_tick() {
        let mut scheduler = Scheduler::new();
        let task = scheduler.add(counting("run", 0, Repeat::Forever));
        let mut log = Log::new();
        scheduler.enable(task, &mut log, 5);

        scheduler.tick(&mut log, 5);
        scheduler.tick(&mut log, 6);
        scheduler.tick(&mut log, 6);
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn stalled_clock_jump_runs_at_most_once() {
        let mut scheduler = Scheduler::new();
        let task = scheduler.add(counting("run", 100, Repeat::Forever));
        let mut log = Log::new();
        scheduler.enable(task, &mut log, 0);

        scheduler.tick(&mut log, 1_000);
        assert_eq!(log, vec!["run"]);
        scheduler.tick(&mut log, 1_099);
        assert_eq!(log.len(), 1);
        scheduler.tick(&mut log, 1_100);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn dispatch_follows_registration_order() {
        let mut scheduler = Scheduler::new();
        let first = scheduler.add(counting("first", 0, Repeat::Forever));
        let second = scheduler.add(counting("second", 0, Repeat::Forever));
        let mut log = Log::new();
        scheduler.enable(second, &mut log, 0);
        scheduler.enable(first, &mut log, 0);

        scheduler.tick(&mut log, 0);
        scheduler.tick(&mut log, 1);
        assert_eq!(log, vec!["first", "second", "first", "second"]);
    }

    #[test]
    fn one_shot_retires_and_runs_disable_hook() {
        let mut scheduler = Scheduler::new();
        let task = scheduler.add(
            Task::new(50, Repeat::Once, |log: &mut Log, _| log.push("body"))
                .with_disable_hook(|log: &mut Log, _| log.push("off")),
        );
        let mut log = Log::new();
        scheduler.enable(task, &mut log, 0);

        scheduler.tick(&mut log, 49);
        assert!(log.is_empty());
        scheduler.tick(&mut log, 50);
        assert_eq!(log, vec!["body", "off"]);
        assert_eq!(scheduler.phase(task), TaskPhase::Retired);

        scheduler.tick(&mut log, 500);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn bounded_repeat_decrements_to_zero_then_stays_off() {
        let mut scheduler = Scheduler::new();
        let task = scheduler.add(counting(
            "run",
            10,
            Repeat::Times(NonZeroU32::new(3).unwrap()),
        ));
        let mut log = Log::new();
        scheduler.enable(task, &mut log, 0);

        for now in (10..=100).step_by(10) {
            scheduler.tick(&mut log, now);
        }
        assert_eq!(log.len(), 3);
        assert_eq!(scheduler.phase(task), TaskPhase::Retired);
    }

    #[test]
    fn vetoed_enable_runs_neither_body_nor_hook() {
        let mut scheduler = Scheduler::new();
        let task = scheduler.add(
            Task::new(0, Repeat::Once, |log: &mut Log, _| log.push("body"))
                .with_enable_gate(|log: &mut Log, _| {
                    log.push("gate");
                    false
                })
                .with_disable_hook(|log: &mut Log, _| log.push("off")),
        );
        let mut log = Log::new();
        scheduler.enable(task, &mut log, 0);

        assert_eq!(scheduler.phase(task), TaskPhase::Dormant);
        scheduler.tick(&mut log, 0);
        scheduler.tick(&mut log, 100);
        assert_eq!(log, vec!["gate"]);
    }

    #[test]
    fn explicit_disable_runs_hook_before_first_iteration() {
        let mut scheduler = Scheduler::new();
        let task = scheduler.add(
            Task::new(100, Repeat::Once, |log: &mut Log, _| log.push("body"))
                .with_disable_hook(|log: &mut Log, _| log.push("off")),
        );
        let mut log = Log::new();
        scheduler.enable(task, &mut log, 0);
        scheduler.disable(task, &mut log, 10);

        assert_eq!(log, vec!["off"]);
        scheduler.tick(&mut log, 100);
        assert_eq!(log, vec!["off"]);
        assert_eq!(scheduler.phase(task), TaskPhase::Dormant);
    }

    #[test]
    fn restart_resets_elapsed_time_and_iteration_budget() {
        let mut scheduler = Scheduler::new();
        let task = scheduler.add(counting("run", 100, Repeat::Once));
        let mut log = Log::new();
        scheduler.enable(task, &mut log, 0);
        scheduler.tick(&mut log, 100);
        assert_eq!(log.len(), 1);
        assert_eq!(scheduler.phase(task), TaskPhase::Retired);

        scheduler.restart(task, &mut log, 150);
        assert_eq!(scheduler.phase(task), TaskPhase::Armed);
        scheduler.tick(&mut log, 249);
        assert_eq!(log.len(), 1);
        scheduler.tick(&mut log, 250);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn restart_of_armed_task_resets_its_countdown() {
        let mut scheduler = Scheduler::new();
        let task = scheduler.add(counting("run", 100, Repeat::Once));
        let mut log = Log::new();
        scheduler.enable(task, &mut log, 0);
        scheduler.tick(&mut log, 90);

        scheduler.restart(task, &mut log, 90);
        scheduler.tick(&mut log, 100);
        assert!(log.is_empty());
        scheduler.tick(&mut log, 190);
        assert_eq!(log, vec!["run"]);
    }

    #[test]
    fn double_enable_is_ignored_and_gate_runs_once() {
        let mut scheduler = Scheduler::new();
        let task = scheduler.add(
            Task::new(100, Repeat::Once, |_: &mut Log, _| {}).with_enable_gate(
                |log: &mut Log, _| {
                    log.push("gate");
                    true
                },
            ),
        );
        let mut log = Log::new();
        scheduler.enable(task, &mut log, 0);
        scheduler.enable(task, &mut log, 50);

        assert_eq!(log, vec!["gate"]);
        scheduler.tick(&mut log, 100);
        assert_eq!(scheduler.phase(task), TaskPhase::Retired);
    }

    #[test]
    fn body_can_rearm_another_task_through_requests() {
        let mut scheduler = Scheduler::new();
        let target = scheduler.add(counting("target", 0, Repeat::Once));
        let trigger = scheduler.add(Task::new(
            10,
            Repeat::Once,
            move |log: &mut Log, requests: &mut Requests| {
                log.push("trigger");
                requests.restart(target);
            },
        ));
        let mut log = Log::new();
        scheduler.enable(trigger, &mut log, 0);

        scheduler.tick(&mut log, 10);
        assert_eq!(log, vec!["trigger"]);
        assert_eq!(scheduler.phase(target), TaskPhase::Armed);

        scheduler.tick(&mut log, 11);
        assert_eq!(log, vec!["trigger", "target"]);
        assert_eq!(scheduler.phase(target), TaskPhase::Retired);
    }

    #[test]
    fn restart_delayed_postpones_first_run() {
        let mut scheduler = Scheduler::new();
        let task = scheduler.add(counting("run", 0, Repeat::Once));
        let mut log = Log::new();

        let mut requests = Requests::new();
        requests.restart_delayed(task, 500);
        scheduler.apply(&mut log, 1_000, &mut requests);

        scheduler.tick(&mut log, 1_400);
        assert!(log.is_empty());
        scheduler.tick(&mut log, 1_500);
        assert_eq!(log, vec!["run"]);
    }
}
