//! Reference executor for linked bytecode, used to check compiled programs
//! end to end. Words are 16 bits wide; arithmetic wraps.

use std::collections::HashMap;

use crate::bytecode::ir::Bytecode;
use crate::bytecode::link::Linker;
use crate::bytecode::op::{BOS, IO, MAX_INT, Opcode, PC};
use crate::lang::Program;

pub const REGISTERS: usize = 8;

#[derive(Debug, Clone)]
pub struct MachineConfig {
    pub max_steps: usize,
    pub max_stack_size: usize,
}

impl Default for MachineConfig {
    fn default() -> Self {
        MachineConfig {
            max_steps: 1_000_000,
            max_stack_size: 10_000,
        }
    }
}

#[derive(Debug)]
pub struct MachineError {
    pub message: String,
    pub pc: i64,
}

impl std::fmt::Display for MachineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "machine error at pc={}: {}", self.pc, self.message)
    }
}

pub struct Machine {
    registers: [i64; REGISTERS],
    stack: Vec<i64>,
    input: HashMap<(i64, i64), i64>,
    /// Every `OUTPUT` as `(x, y, value)`, in execution order.
    pub writes: Vec<(i64, i64, i64)>,
    config: MachineConfig,
    steps: usize,
    len: usize,
}

impl Machine {
    pub fn new() -> Self {
        Self::with_config(MachineConfig::default())
    }

    pub fn with_config(config: MachineConfig) -> Self {
        Self {
            registers: [0; REGISTERS],
            stack: Vec::new(),
            input: HashMap::new(),
            writes: Vec::new(),
            config,
            steps: 0,
            len: 0,
        }
    }

    pub fn set_input(&mut self, x: i64, y: i64, value: i64) {
        self.input.insert((x, y), value);
    }

    pub fn stack(&self) -> &[i64] {
        &self.stack
    }

    pub fn register(&self, r: i32) -> i64 {
        self.registers[r as usize]
    }

    pub fn halted(&self) -> bool {
        let pc = self.registers[PC as usize];
        pc < 0 || pc as usize >= self.len
    }

    pub fn run(&mut self, bc: &Bytecode) -> Result<(), MachineError> {
        self.len = bc.len();
        while !self.halted() {
            self.steps += 1;
            if self.steps > self.config.max_steps {
                return Err(self.error(format!(
                    "execution step limit exceeded ({})",
                    self.config.max_steps
                )));
            }
            self.step(bc)?;
            if self.stack.len() > self.config.max_stack_size {
                return Err(self.error("stack size limit exceeded"));
            }
        }
        Ok(())
    }

    fn step(&mut self, bc: &Bytecode) -> Result<(), MachineError> {
        let pc = self.registers[PC as usize];
        let instr = bc.code[pc as usize];
        self.registers[PC as usize] += 1;

        let a = instr.a.unwrap_or(0);
        let b = instr.b.unwrap_or(0);

        match instr.opcode {
            Opcode::Noop => return Err(self.error("marker survived linking")),
            Opcode::Const => self.stack.push(a as i64),
            Opcode::Push => {
                let v = self.reg(a)?;
                self.stack.push(v);
            }
            Opcode::Pop => {
                let v = self.pop()?;
                *self.reg_mut(a)? = v;
            }
            Opcode::Copy => {
                let v = self.reg(b)?;
                *self.reg_mut(a)? = v;
            }
            Opcode::Load => {
                let addr = self.frame_address(b)?;
                let v = self.stack[addr];
                *self.reg_mut(a)? = v;
            }
            Opcode::Store => {
                let addr = self.frame_address(b)?;
                let v = self.reg(a)?;
                self.stack[addr] = v;
            }
            Opcode::JumpIf => {
                if self.pop()? == 0 {
                    self.registers[PC as usize] = self.reg(a)?;
                }
            }
            Opcode::Not => {
                let x = self.pop()?;
                self.stack.push(!x & MAX_INT as i64);
            }
            op => {
                let y = self.pop()?;
                let x = self.pop()?;
                let wrap = |v: i64| v & MAX_INT as i64;
                match op {
                    Opcode::Input => {
                        self.registers[IO as usize] = self.input.get(&(x, y)).copied().unwrap_or(0);
                    }
                    Opcode::Output => {
                        self.writes.push((x, y, self.registers[IO as usize]));
                    }
                    Opcode::Add => self.stack.push(wrap(x + y)),
                    Opcode::Mult => self.stack.push(wrap(x * y)),
                    Opcode::And => self.stack.push(x & y),
                    Opcode::Or => self.stack.push(x | y),
                    Opcode::Xor => self.stack.push(x ^ y),
                    Opcode::LShift => {
                        self.stack.push(if y < 16 { wrap(x << y) } else { 0 });
                    }
                    Opcode::RShift => self.stack.push(if y < 64 { x >> y } else { 0 }),
                    Opcode::Equals => self.stack.push((x == y) as i64),
                    Opcode::LessThan => self.stack.push((x < y) as i64),
                    other => return Err(self.error(format!("unexpected opcode {}", other))),
                }
            }
        }
        Ok(())
    }

    fn pop(&mut self) -> Result<i64, MachineError> {
        self.stack
            .pop()
            .ok_or_else(|| self.error("stack underflow"))
    }

    fn reg(&self, r: i32) -> Result<i64, MachineError> {
        self.registers
            .get(r as usize)
            .copied()
            .ok_or_else(|| self.error(format!("no register {}", r)))
    }

    fn reg_mut(&mut self, r: i32) -> Result<&mut i64, MachineError> {
        if r < 0 || r as usize >= REGISTERS {
            return Err(self.error(format!("no register {}", r)));
        }
        Ok(&mut self.registers[r as usize])
    }

    fn frame_address(&self, r: i32) -> Result<usize, MachineError> {
        let addr = self.registers[BOS as usize] + self.reg(r)?;
        if addr < 0 || addr as usize >= self.stack.len() {
            return Err(self.error(format!("frame address {} out of bounds", addr)));
        }
        Ok(addr as usize)
    }

    fn error(&self, message: impl Into<String>) -> MachineError {
        MachineError {
            message: message.into(),
            pc: self.registers[PC as usize] - 1,
        }
    }
}

/// Links `program` and runs it to completion.
pub fn run_program(program: &Program) -> Machine {
    let bc = Linker::new().link(program).unwrap();
    let mut machine = Machine::new();
    if let Err(e) = machine.run(&bc) {
        panic!("{}\n{}", e, bc);
    }
    machine
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::ir::Instruction;

    fn ins(opcode: Opcode, a: Option<i32>, b: Option<i32>) -> Instruction {
        Instruction { opcode, a, b }
    }

    fn program(code: Vec<Instruction>) -> Bytecode {
        Bytecode {
            code,
            symbols: Vec::new(),
        }
    }

    #[test]
    fn test_jump_if_taken_on_zero() {
        let bc = program(vec![
            ins(Opcode::Const, Some(4), None),
            ins(Opcode::Pop, Some(IO), None),
            ins(Opcode::Const, Some(0), None),
            ins(Opcode::JumpIf, Some(IO), None),
            ins(Opcode::Const, Some(1), None),
        ]);
        let mut m = Machine::new();
        m.run(&bc).unwrap();
        // target 4 is the next instruction anyway
        assert_eq!(m.stack(), &[1]);

        let bc = program(vec![
            ins(Opcode::Const, Some(5), None),
            ins(Opcode::Pop, Some(IO), None),
            ins(Opcode::Const, Some(0), None),
            ins(Opcode::JumpIf, Some(IO), None),
            ins(Opcode::Const, Some(1), None),
        ]);
        let mut m = Machine::new();
        m.run(&bc).unwrap();
        assert!(m.stack().is_empty());
    }

    #[test]
    fn test_halt_sentinel() {
        let bc = program(vec![
            ins(Opcode::Const, Some(-1), None),
            ins(Opcode::Pop, Some(PC), None),
            ins(Opcode::Const, Some(1), None),
        ]);
        let mut m = Machine::new();
        m.run(&bc).unwrap();
        assert!(m.halted());
        assert!(m.stack().is_empty());
    }

    #[test]
    fn test_copy_destination_first() {
        let bc = program(vec![
            ins(Opcode::Const, Some(8), None),
            ins(Opcode::Pop, Some(3), None),
            ins(Opcode::Copy, Some(4), Some(3)),
        ]);
        let mut m = Machine::new();
        m.run(&bc).unwrap();
        assert_eq!(m.register(4), 8);
    }

    #[test]
    fn test_underflow_reported() {
        let bc = program(vec![ins(Opcode::Add, None, None)]);
        let err = Machine::new().run(&bc).unwrap_err();
        assert!(err.to_string().contains("underflow"));
        assert_eq!(err.pc, 0);
    }

    #[test]
    fn test_step_limit() {
        // CONST 0; POP PC loops forever
        let bc = program(vec![
            ins(Opcode::Const, Some(0), None),
            ins(Opcode::Pop, Some(PC), None),
        ]);
        let mut m = Machine::with_config(MachineConfig {
            max_steps: 100,
            ..MachineConfig::default()
        });
        assert!(m.run(&bc).unwrap_err().to_string().contains("step limit"));
    }
}
