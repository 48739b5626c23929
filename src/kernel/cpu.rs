use super::{AddressSpace, ExecutionFault, Pid, Value};

use crate::io::{Code, Console, Instruction, Operand};

/// What the CPU needs from the kernel after executing an instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum Trap {
    None,
    /// The running code gave up the CPU voluntarily.
    Yield,
    Terminated(Option<ExecutionFault>),
    ReadToken { file: String, token_number: usize, target: String },
}

/// Execution context of the single simulated processor.
#[derive(Debug, Default)]
pub struct Cpu {
    pub active_process: Option<Pid>,
    pub active_address_space: AddressSpace,
    pub active_console: Option<Console>,
    pub program_counter: usize,
    /// Ticks left in the current quantum. `None` never times out.
    pub remaining_time: Option<u32>,
    pub done: bool,

    tick_count: u64,
}

impl Cpu {
    pub fn new() -> Cpu {
        Cpu::default()
    }

    pub fn get_tick_count(&self) -> u64 {
        self.tick_count
    }

    #[cfg(test)]
    pub fn advance_clock(&mut self, ticks: u64) {
        self.tick_count += ticks;
    }

    pub fn quantum_expired(&self) -> bool {
        self.remaining_time == Some(0)
    }

    /// Runs one instruction of `code` against the active context. Costs one tick.
    pub fn execute(&mut self, code: &Code) -> Trap {
        self.tick_count += 1;
        if let Some(remaining_time) = self.remaining_time.as_mut() {
            *remaining_time = remaining_time.saturating_sub(1);
        }

        let Some(instruction) = code.fetch(self.program_counter) else {
            return Trap::Terminated(None);
        };

        match self.execute_instruction(instruction) {
            Ok(trap) => trap,
            Err(fault) => Trap::Terminated(Some(fault)),
        }
    }

    fn execute_instruction(&mut self, instruction: &Instruction) -> Result<Trap, ExecutionFault> {
        match instruction {
            Instruction::Set { target, value } => {
                let value = self.operand(value)?;
                self.store(target, value);
            }
            Instruction::Add { target, left, right } => {
                let sum = self.operand(left)? + self.operand(right)?;
                self.store(target, sum);
            }
            Instruction::Read { target, file, token } => {
                let token_number = self.operand(token)?;
                if token_number < 0.0 || token_number.fract() != 0.0 {
                    return Err(ExecutionFault::InvalidTokenIndex(token_number));
                }
                // The kernel moves the program counter past the read.
                return Ok(Trap::ReadToken {
                    file: file.clone(),
                    token_number: token_number as usize,
                    target: target.clone(),
                });
            }
            Instruction::Print(operand) => {
                let line = match operand {
                    Operand::Variable(name) => self.load(name)?.to_string(),
                    Operand::Literal(number) => number.to_string(),
                };
                if let Some(console) = self.active_console.as_mut() {
                    console.write_line(&line);
                }
            }
            Instruction::Jump(line) => {
                self.program_counter = *line;
                return Ok(Trap::None);
            }
            Instruction::JumpIfEof { variable, line } => {
                if self.load(variable)? == Value::EndOfFile {
                    self.program_counter = *line;
                    return Ok(Trap::None);
                }
            }
            Instruction::Work => {}
            Instruction::Fail(message) => return Err(ExecutionFault::Raised(message.clone())),
            Instruction::Exit => return Ok(Trap::Terminated(None)),
            Instruction::Idle => return Ok(Trap::Yield),
        }

        self.program_counter += 1;
        Ok(Trap::None)
    }

    fn operand(&self, operand: &Operand) -> Result<f64, ExecutionFault> {
        match operand {
            Operand::Literal(number) => Ok(*number),
            Operand::Variable(name) => match self.load(name)? {
                Value::Number(number) => Ok(number),
                Value::EndOfFile => Err(ExecutionFault::EndOfFileOperand(name.clone())),
            },
        }
    }

    fn load(&self, name: &str) -> Result<Value, ExecutionFault> {
        self.active_address_space
            .get(name)
            .copied()
            .ok_or_else(|| ExecutionFault::UndefinedVariable(name.to_string()))
    }

    fn store(&mut self, name: &str, number: f64) {
        self.active_address_space.insert(name.to_string(), Value::Number(number));
    }
}
