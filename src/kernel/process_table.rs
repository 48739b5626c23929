use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;

use super::KernelError;

use crate::io::{Code, Console};

/// Process identifier. Allocated sequentially by the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pid(pub u32);

impl Pid {
    pub const IDLE: Pid = Pid(0);

    pub fn next(self) -> Pid {
        Pid(self.0 + 1)
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A variable slot in a process address space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Number(f64),
    /// Written by a token read that ran past the end of its file.
    EndOfFile,
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(number) => write!(f, "{}", number),
            Value::EndOfFile => write!(f, "EOF"),
        }
    }
}

pub type AddressSpace = HashMap<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessRole {
    Idle,
    User,
}

pub struct ProcessTableEntry {
    pub program_counter: usize,
    pub address_space: AddressSpace,
    pub console: Option<Console>,
    pub priority: i32,
    /// Ticks granted on the next dispatch. `None` runs until the process blocks or exits.
    pub quantum: Option<u32>,
    pub done: bool,
    pub blocked: bool,
    pub start_time: u64,
    pub end_time: Option<u64>,
    pub last_cpu_time: u64,
    pub max_starvation: u64,

    id: Pid,
    name: String,
    code: Rc<Code>,
    role: ProcessRole,
}

impl ProcessTableEntry {
    pub fn new(id: Pid, name: &str, code: Rc<Code>, start_time: u64) -> ProcessTableEntry {
        ProcessTableEntry {
            id,
            name: name.to_string(),
            code,
            role: ProcessRole::User,
            program_counter: 0,
            address_space: AddressSpace::new(),
            console: Some(Console::new(name)),
            priority: 0,
            quantum: None,
            done: false,
            blocked: false,
            start_time,
            end_time: None,
            last_cpu_time: start_time,
            max_starvation: 0,
        }
    }

    pub fn idle(code: Rc<Code>, start_time: u64) -> ProcessTableEntry {
        ProcessTableEntry {
            role: ProcessRole::Idle,
            priority: i32::MIN,
            console: None,
            ..ProcessTableEntry::new(Pid::IDLE, "IdleProcess", code, start_time)
        }
    }

    pub fn get_id(&self) -> Pid {
        self.id
    }

    pub fn get_name(&self) -> &str {
        &self.name
    }

    pub fn get_code(&self) -> Rc<Code> {
        Rc::clone(&self.code)
    }

    pub fn is_idle(&self) -> bool {
        self.role == ProcessRole::Idle
    }

    pub fn is_runnable(&self) -> bool {
        !self.done && !self.blocked
    }

    pub fn record_starvation(&mut self, now: u64) {
        let waited = now.saturating_sub(self.last_cpu_time);
        self.max_starvation = self.max_starvation.max(waited);
    }

    pub fn turnaround(&self) -> Option<u64> {
        self.end_time.map(|end_time| end_time.saturating_sub(self.start_time))
    }
}

/// Every process the kernel has ever created, keyed by pid.
#[derive(Default)]
pub struct ProcessTable {
    entries: BTreeMap<Pid, ProcessTableEntry>,
}

impl ProcessTable {
    pub fn new() -> ProcessTable {
        ProcessTable::default()
    }

    pub fn insert(&mut self, entry: ProcessTableEntry) {
        self.entries.insert(entry.get_id(), entry);
    }

    pub fn get(&self, pid: Pid) -> Result<&ProcessTableEntry, KernelError> {
        self.entries.get(&pid).ok_or(KernelError::ProcessNotFound(pid))
    }

    pub fn get_mut(&mut self, pid: Pid) -> Result<&mut ProcessTableEntry, KernelError> {
        self.entries.get_mut(&pid).ok_or(KernelError::ProcessNotFound(pid))
    }

    #[cfg(test)]
    pub fn contains(&self, pid: Pid) -> bool {
        self.entries.contains_key(&pid)
    }

    pub fn entries(&self) -> impl Iterator<Item = &ProcessTableEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(pid: u32) -> ProcessTableEntry {
        ProcessTableEntry::new(Pid(pid), "worker", Rc::new(Code::default()), 3)
    }

    #[test]
    fn test_process_table_entry_new_defaults() {
        let entry = entry(1);

        assert_eq!(entry.get_id(), Pid(1));
        assert!(!entry.is_idle());
        assert!(entry.is_runnable());
        assert_eq!(entry.start_time, 3);
        assert_eq!(entry.last_cpu_time, 3);
        assert_eq!(entry.end_time, None);
        assert_eq!(entry.quantum, None);
        assert!(entry.console.is_some());
    }

    #[test]
    fn test_process_table_entry_idle() {
        let idle = ProcessTableEntry::idle(Rc::new(Code::idle()), 0);

        assert_eq!(idle.get_id(), Pid::IDLE);
        assert!(idle.is_idle());
        assert_eq!(idle.priority, i32::MIN);
    }

    #[test]
    fn test_process_table_entry_blocked_or_done_is_not_runnable() {
        let mut entry = entry(1);
        entry.blocked = true;
        assert!(!entry.is_runnable());

        entry.blocked = false;
        entry.done = true;
        assert!(!entry.is_runnable());
    }

    #[test]
    fn test_process_table_entry_record_starvation_keeps_maximum() {
        let mut entry = entry(1);

        entry.record_starvation(10);
        assert_eq!(entry.max_starvation, 7);

        entry.last_cpu_time = 9;
        entry.record_starvation(11);
        assert_eq!(entry.max_starvation, 7);
    }

    #[test]
    fn test_process_table_get_missing_pid() {
        let mut table = ProcessTable::new();
        table.insert(entry(1));

        assert!(table.contains(Pid(1)));
        assert!(matches!(table.get(Pid(4)), Err(KernelError::ProcessNotFound(Pid(4)))));
        assert!(matches!(table.get_mut(Pid(4)), Err(KernelError::ProcessNotFound(Pid(4)))));
    }
}
