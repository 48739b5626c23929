use std::collections::VecDeque;
use std::rc::Rc;

use tracing::{debug, error, info, warn};

use super::{
    metrics, Cpu, ExecutionFault, KernelError, Pid, ProcessTable, ProcessTableEntry, SchedulingPolicy, Value,
};

use crate::io::{Code, CodeLoader, Disk, ReadTokenRequest};

/// Why the scheduler stopped the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltReason {
    /// The policy found no runnable process at all.
    NothingRunnable,
    /// Every process except the idle one has terminated.
    OnlyIdleRemains,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerOutcome {
    Dispatched(Pid),
    Halted(HaltReason),
}

/// The kernel. Owns the process table, the scheduling policy and the pending
/// read queue, and drives the CPU and disk contexts.
pub struct OperatingSystem {
    cpu: Cpu,
    disk: Disk,
    process_table: ProcessTable,
    read_requests: VecDeque<ReadTokenRequest>,
    policy: Box<dyn SchedulingPolicy>,
    loader: Box<dyn CodeLoader>,
    next_pid: Pid,
    default_priority: i32,
}

impl OperatingSystem {
    pub fn new(
        cpu: Cpu,
        disk: Disk,
        policy: Box<dyn SchedulingPolicy>,
        loader: Box<dyn CodeLoader>,
        default_priority: i32,
    ) -> OperatingSystem {
        let mut os = OperatingSystem {
            cpu,
            disk,
            process_table: ProcessTable::new(),
            read_requests: VecDeque::new(),
            policy,
            loader,
            next_pid: Pid::IDLE.next(),
            default_priority,
        };
        os.create_idle_process();
        os
    }

    fn create_idle_process(&mut self) {
        let entry = ProcessTableEntry::idle(Rc::new(Code::idle()), self.cpu.get_tick_count());
        self.process_table.insert(entry);
        self.policy.add_process(Pid::IDLE);
    }

    pub fn create_process(&mut self, source_id: &str, priority: Option<i32>) -> Result<Pid, KernelError> {
        let code = self.loader.load(source_id).map_err(|error| KernelError::Load {
            source_id: source_id.to_string(),
            error,
        })?;

        let pid = self.next_pid;
        self.next_pid = pid.next();

        let mut entry = ProcessTableEntry::new(pid, source_id, Rc::new(code), self.cpu.get_tick_count());
        entry.priority = priority.unwrap_or(self.default_priority);
        info!(%pid, source = source_id, priority = entry.priority, "process created");

        self.process_table.insert(entry);
        self.policy.add_process(pid);
        Ok(pid)
    }

    /// Terminates the running process. A fault is only reported; bookkeeping is the same.
    pub fn process_terminated(&mut self, fault: Option<ExecutionFault>) -> Result<SchedulerOutcome, KernelError> {
        let now = self.cpu.get_tick_count();

        if let Some(pid) = self.cpu.active_process {
            if let Some(fault) = &fault {
                error!(%pid, %fault, "process terminated unexpectedly");
            }

            let entry = self.process_table.get_mut(pid)?;
            if entry.is_idle() {
                warn!("termination reported for the idle process, ignored");
                return self.activate_scheduler();
            }

            // Final state stays in the table; the CPU no longer holds a process.
            entry.program_counter = self.cpu.program_counter;
            entry.address_space = std::mem::take(&mut self.cpu.active_address_space);
            if let Some(console) = self.cpu.active_console.take() {
                entry.console = Some(console);
            }
            if let Some(console) = entry.console.as_mut() {
                console.close();
            }
            entry.done = true;
            entry.end_time = Some(now);
            self.cpu.active_process = None;
            info!(%pid, tick = now, "process terminated");
        }

        self.activate_scheduler()
    }

    pub fn timeout_reached(&mut self) -> Result<SchedulerOutcome, KernelError> {
        self.activate_scheduler()
    }

    /// Blocks `pid` on a token read and hands the CPU to someone else.
    pub fn read_token(
        &mut self,
        file_name: &str,
        token_number: usize,
        pid: Pid,
        target_variable: &str,
    ) -> Result<SchedulerOutcome, KernelError> {
        let request = ReadTokenRequest::new(file_name, token_number, pid, target_variable);
        self.process_table.get_mut(pid)?.blocked = true;

        if self.disk.active_request.is_none() {
            self.disk.active_request = Some(request);
        } else {
            self.read_requests.push_back(request);
        }
        debug!(%pid, file = file_name, token_number, queued = self.read_requests.len(), "read requested");

        // Resume after the read once unblocked.
        if self.cpu.active_process == Some(pid) {
            self.cpu.program_counter += 1;
        } else {
            self.process_table.get_mut(pid)?.program_counter += 1;
        }

        self.activate_scheduler()
    }

    /// Handles a finished disk read.
    pub fn interrupt(&mut self, finished_request: ReadTokenRequest) -> Result<Option<SchedulerOutcome>, KernelError> {
        let pid = finished_request.process_id;
        let value = match &finished_request.token {
            Some(token) => token.trim().parse::<f64>().map(Value::Number).map_err(|_| KernelError::MalformedToken {
                pid,
                token: token.clone(),
            })?,
            None => Value::EndOfFile,
        };
        let now = self.cpu.get_tick_count();

        let entry = self.process_table.get_mut(pid)?;
        entry.address_space.insert(finished_request.target_variable.clone(), value);
        entry.blocked = false;
        entry.last_cpu_time = now;
        if self.cpu.active_process == Some(pid) {
            self.cpu
                .active_address_space
                .insert(finished_request.target_variable.clone(), value);
        }
        debug!(%pid, variable = %finished_request.target_variable, %value, "read delivered");

        if self.disk.active_request.is_none() {
            if let Some(next_request) = self.read_requests.pop_front() {
                self.disk.active_request = Some(next_request);
            }
        }

        if self.policy.reschedule_after_interrupt() {
            return self.activate_scheduler().map(Some);
        }
        Ok(None)
    }

    /// Saves the running context and installs the one of `entering_pid`.
    /// Returns the entry that was switched out, if any.
    pub fn context_switch(&mut self, entering_pid: Pid) -> Result<Option<&ProcessTableEntry>, KernelError> {
        let now = self.cpu.get_tick_count();

        let outgoing_pid = self.cpu.active_process;
        if let Some(pid) = outgoing_pid {
            let entry = self.process_table.get_mut(pid)?;
            entry.program_counter = self.cpu.program_counter;
            entry.address_space = std::mem::take(&mut self.cpu.active_address_space);
            if let Some(console) = self.cpu.active_console.take() {
                entry.console = Some(console);
            }
            entry.last_cpu_time = now;
        }

        let entering = self.process_table.get_mut(entering_pid)?;
        entering.record_starvation(now);

        self.cpu.active_process = Some(entering_pid);
        self.cpu.active_address_space = std::mem::take(&mut entering.address_space);
        self.cpu.active_console = entering.console.take();
        self.cpu.program_counter = entering.program_counter;
        self.cpu.remaining_time = entering.quantum;
        debug!(from = ?outgoing_pid, to = %entering_pid, tick = now, "context switch");

        match outgoing_pid {
            Some(pid) => Ok(Some(self.process_table.get(pid)?)),
            None => Ok(None),
        }
    }

    pub fn activate_scheduler(&mut self) -> Result<SchedulerOutcome, KernelError> {
        let Some(next_pid) = self.policy.next_process(&mut self.process_table)? else {
            info!("all processes terminated or blocked");
            self.cpu.done = true;
            return Ok(SchedulerOutcome::Halted(HaltReason::NothingRunnable));
        };

        let only_idle_remains = self.process_table.entries().all(|entry| entry.done || entry.is_idle());
        if only_idle_remains {
            info!("only the idle process remains");
            self.cpu.done = true;
            return Ok(SchedulerOutcome::Halted(HaltReason::OnlyIdleRemains));
        }

        self.context_switch(next_pid)?;
        Ok(SchedulerOutcome::Dispatched(next_pid))
    }

    pub fn average_turnaround(&self) -> f64 {
        metrics::average_turnaround(&self.process_table)
    }

    pub fn maximal_starvation(&self) -> u64 {
        metrics::maximal_starvation(&self.process_table)
    }

    /// Code of the process on the CPU.
    pub fn active_code(&self) -> Result<Option<Rc<Code>>, KernelError> {
        match self.cpu.active_process {
            Some(pid) => Ok(Some(self.process_table.get(pid)?.get_code())),
            None => Ok(None),
        }
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Cpu {
        &mut self.cpu
    }

    #[cfg(test)]
    pub fn disk(&self) -> &Disk {
        &self.disk
    }

    pub fn disk_mut(&mut self) -> &mut Disk {
        &mut self.disk
    }

    pub fn process_table(&self) -> &ProcessTable {
        &self.process_table
    }

    #[cfg(test)]
    pub fn pending_reads(&self) -> usize {
        self.read_requests.len()
    }

    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }
}
