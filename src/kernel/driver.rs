use tracing::{info, warn};

use super::*;

use crate::config::SimulationConfig;
use crate::io::{Disk, FileCodeLoader};

/// Runs the tick loop: the CPU executes the active process and the disk
/// serves reads, both reporting back to the kernel.
pub struct Driver {
    os: OperatingSystem,
    max_ticks: u64,
}

impl Driver {
    pub fn new(os: OperatingSystem, max_ticks: u64) -> Driver {
        Driver { os, max_ticks }
    }

    pub fn from_config(config: &SimulationConfig) -> Result<Driver, KernelError> {
        let policy = policy_for(config.policy, config.quantum);
        let disk = Disk::new(&config.input_dir, config.disk_latency);
        let loader = FileCodeLoader::new(&config.program_dir);
        let mut os = OperatingSystem::new(Cpu::new(), disk, policy, Box::new(loader), config.default_priority);

        for process in &config.processes {
            os.create_process(&process.source, process.priority)?;
        }

        Ok(Driver::new(os, config.max_ticks))
    }

    pub fn os(&self) -> &OperatingSystem {
        &self.os
    }

    pub fn start(&mut self) -> Result<(), KernelError> {
        info!(policy = self.os.policy_name(), processes = self.os.process_table().len() - 1, "starting the driver");

        while !self.os.cpu().done {
            if self.os.cpu().get_tick_count() >= self.max_ticks {
                warn!(max_ticks = self.max_ticks, "tick limit reached, stopping");
                break;
            }
            self.step()?;
        }

        info!(tick = self.os.cpu().get_tick_count(), "simulation finished");
        Ok(())
    }

    /// One tick of the machine.
    pub fn step(&mut self) -> Result<(), KernelError> {
        let Some(code) = self.os.active_code()? else {
            self.os.activate_scheduler()?;
            return Ok(());
        };

        let trap = self.os.cpu_mut().execute(&code);
        match trap {
            Trap::Terminated(fault) => {
                self.os.process_terminated(fault)?;
            }
            Trap::ReadToken { file, token_number, target } => {
                if let Some(pid) = self.os.cpu().active_process {
                    self.os.read_token(&file, token_number, pid, &target)?;
                }
            }
            Trap::Yield => {
                self.os.timeout_reached()?;
            }
            Trap::None => {
                if self.os.cpu().quantum_expired() {
                    self.os.timeout_reached()?;
                }
            }
        }

        if self.os.cpu().done {
            return Ok(());
        }
        if let Some(request) = self.os.disk_mut().tick() {
            self.os.interrupt(request)?;
        }

        Ok(())
    }

    pub fn print_stats(&self) {
        println!("Stats for executed processes ({} Scheduling):", self.os.policy_name());
        println!("... PID | Name                 | Priority | Turnaround | Max Starvation");
        println!("...-----|----------------------|----------|------------|---------------");
        for entry in self.os.process_table().entries().filter(|entry| !entry.is_idle()) {
            let turnaround = match entry.turnaround() {
                Some(ticks) => ticks.to_string(),
                None => "-".to_string(),
            };
            println!(
                "... {:>3} | {:<20} | {:>8} | {:>10} | {:>14}",
                entry.get_id(),
                entry.get_name(),
                entry.priority,
                turnaround,
                entry.max_starvation
            );
        }
        println!("Average turnaround: {:.2} ticks", self.os.average_turnaround());
        println!("Maximal starvation: {} ticks", self.os.maximal_starvation());
    }
}
