mod cpu;
mod error;
mod metrics;
mod operating_system;
mod process_table;

pub mod driver;
pub mod scheduling_policy;

pub use cpu::{Cpu, Trap};
pub use error::{ExecutionFault, KernelError};
pub use operating_system::OperatingSystem;
pub use process_table::{AddressSpace, Pid, ProcessTable, ProcessTableEntry, Value};
pub use scheduling_policy::{policy_for, SchedulingPolicy};

pub use driver::Driver;
