use std::cmp::Reverse;
use std::collections::VecDeque;

use super::{KernelError, Pid, ProcessTable};

use crate::config::PolicyKind;

/// Strategy picking the next process to dispatch.
///
/// Policies only read the process table, except for `quantum`, which they may
/// set on the entries they visit while deciding.
pub trait SchedulingPolicy {
    /// Returns the pid to dispatch, or `None` when no registered process is runnable.
    fn next_process(&mut self, table: &mut ProcessTable) -> Result<Option<Pid>, KernelError>;

    fn add_process(&mut self, pid: Pid);

    /// Whether a completed disk read should preempt the running process.
    fn reschedule_after_interrupt(&self) -> bool;

    fn name(&self) -> &'static str;
}

pub fn policy_for(kind: PolicyKind, quantum: u32) -> Box<dyn SchedulingPolicy> {
    match kind {
        PolicyKind::Fcfs => Box::new(FirstComeFirstServed::new()),
        PolicyKind::RoundRobin => Box::new(RoundRobin::new(quantum)),
        PolicyKind::Priority => Box::new(PrioritizedScheduling::new(quantum)),
    }
}

/// Rotates the queue once. The last runnable pid seen wins.
fn rotate(
    queue: &mut VecDeque<Pid>,
    table: &mut ProcessTable,
    quantum: Option<u32>,
) -> Result<Option<Pid>, KernelError> {
    let mut next_pid = None;

    for _ in 0..queue.len() {
        let Some(pid) = queue.pop_front() else { break };
        queue.push_back(pid);

        let entry = table.get_mut(pid)?;
        if quantum.is_some() {
            entry.quantum = quantum;
        }
        if entry.is_runnable() {
            next_pid = Some(pid);
        }
    }

    Ok(next_pid)
}

#[derive(Default)]
pub struct FirstComeFirstServed {
    process_queue: VecDeque<Pid>,
}

impl FirstComeFirstServed {
    pub fn new() -> FirstComeFirstServed {
        FirstComeFirstServed::default()
    }
}

impl SchedulingPolicy for FirstComeFirstServed {
    fn next_process(&mut self, table: &mut ProcessTable) -> Result<Option<Pid>, KernelError> {
        rotate(&mut self.process_queue, table, None)
    }

    fn add_process(&mut self, pid: Pid) {
        self.process_queue.push_back(pid);
    }

    fn reschedule_after_interrupt(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "FCFS"
    }
}

pub struct RoundRobin {
    process_queue: VecDeque<Pid>,
    quantum: u32,
}

impl RoundRobin {
    pub fn new(quantum: u32) -> RoundRobin {
        RoundRobin {
            process_queue: VecDeque::new(),
            quantum,
        }
    }
}

impl SchedulingPolicy for RoundRobin {
    fn next_process(&mut self, table: &mut ProcessTable) -> Result<Option<Pid>, KernelError> {
        rotate(&mut self.process_queue, table, Some(self.quantum))
    }

    fn add_process(&mut self, pid: Pid) {
        self.process_queue.push_back(pid);
    }

    fn reschedule_after_interrupt(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "Round Robin"
    }
}

pub struct PrioritizedScheduling {
    process_queue: Vec<Pid>,
    quantum: u32,
}

impl PrioritizedScheduling {
    pub fn new(quantum: u32) -> PrioritizedScheduling {
        PrioritizedScheduling {
            process_queue: Vec::new(),
            quantum,
        }
    }
}

impl SchedulingPolicy for PrioritizedScheduling {
    /// Scans by descending priority and stops at the first runnable pid.
    fn next_process(&mut self, table: &mut ProcessTable) -> Result<Option<Pid>, KernelError> {
        let mut by_priority = Vec::with_capacity(self.process_queue.len());
        for &pid in &self.process_queue {
            by_priority.push((pid, table.get(pid)?.priority));
        }
        // Stable, so equal priorities keep registration order.
        by_priority.sort_by_key(|&(_, priority)| Reverse(priority));

        for (pid, _) in by_priority {
            let entry = table.get_mut(pid)?;
            entry.quantum = Some(self.quantum);
            if entry.is_runnable() {
                return Ok(Some(pid));
            }
        }

        Ok(None)
    }

    fn add_process(&mut self, pid: Pid) {
        self.process_queue.push(pid);
    }

    fn reschedule_after_interrupt(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "Priority"
    }
}
