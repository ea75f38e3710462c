//! # interpreter
//!
//! The fetch/decode/execute cycle. Each `step`:
//!  1. checks PC and PC+1 are inside memory, else faults
//!  2. fetches the big-endian word at PC
//!  3. advances PC by 2, so control flow in the handler wins
//!  4. decodes to an [`Opcode`]; unknown words are logged and skipped
//!  5. runs the opcode's handler against the machine state
//!
//! A fault halts the interpreter. Further steps return the same fault and
//! execute nothing until `reset`.
use std::collections::HashSet;
use std::io;

use tracing::{debug, error, trace, warn};

use crate::config::{Config, LoadPolicy};
use crate::error::{Fault, LoadError};
use crate::instruction::{Instruction, Opcode};
use crate::memory::MemoryMap;
use crate::ops::Context;
use crate::state::MachineState;

/// What a successful step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Executed(Opcode),
    Unhandled { word: u16, addr: u16 },
}

pub struct Chip8Interpreter {
    state: MachineState,
    context: Context,
    halted: Option<Fault>,
    cycles: u64,
    unhandled: u64,
    // words already warned about; repeats go to debug
    reported: HashSet<u16>,
}

impl Chip8Interpreter {
    pub fn new(config: &Config) -> Self {
        Chip8Interpreter {
            state: MachineState::new(),
            context: Context::new(config.quirks, config.seed),
            halted: None,
            cycles: 0,
            unhandled: 0,
            reported: HashSet::new(),
        }
    }

    /// load a chip8 program
    pub fn load_program(
        &mut self,
        reader: &mut impl io::Read,
        policy: LoadPolicy,
    ) -> Result<usize, LoadError> {
        self.state.memory.load_program(reader, policy)
    }

    pub fn state(&self) -> &MachineState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut MachineState {
        &mut self.state
    }

    pub fn halted(&self) -> Option<Fault> {
        self.halted
    }

    /// instructions fetched so far, unhandled ones included
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn unhandled_count(&self) -> u64 {
        self.unhandled
    }

    /// power-on state, program included; clears a halt
    pub fn reset(&mut self) {
        self.state.reset();
        self.halted = None;
        self.cycles = 0;
        self.unhandled = 0;
        self.reported.clear();
        debug!("machine reset");
    }

    /// one 60Hz timer tick
    pub fn tick_timers(&mut self) {
        self.state.tick_timers();
    }

    fn fetch(&self) -> Result<Instruction, Fault> {
        let pc = self.state.program_counter;
        if pc as usize + 1 >= self.state.memory.size() {
            return Err(Fault::ProgramCounterOutOfBounds { pc });
        }
        let word = self.state.memory.get_word(pc)?;
        Ok(Instruction::from_word(word))
    }

    /// run exactly one instruction
    pub fn step(&mut self) -> Result<Step, Fault> {
        if let Some(fault) = self.halted {
            return Err(fault);
        }
        match self.execute_next() {
            Ok(step) => Ok(step),
            Err(fault) => {
                error!(%fault, "machine halted");
                self.halted = Some(fault);
                Err(fault)
            }
        }
    }

    fn execute_next(&mut self) -> Result<Step, Fault> {
        let addr = self.state.program_counter;
        let ins = self.fetch()?;
        self.state.program_counter = addr + 2;
        self.cycles += 1;

        let op = match Opcode::decode(&ins) {
            Some(op) => op,
            None => {
                if self.reported.insert(ins.word()) {
                    warn!("unhandled instruction {} at {:#06x}", ins, addr);
                } else {
                    debug!("unhandled instruction {} at {:#06x}", ins, addr);
                }
                self.unhandled += 1;
                return Ok(Step::Unhandled {
                    word: ins.word(),
                    addr,
                });
            }
        };

        trace!("{:#06x}: {} {}", addr, ins, op.mnemonic());
        self.context.addr = addr;
        op.handler()(&mut self.state, &mut self.context, ins)?;
        Ok(Step::Executed(op))
    }

    /// run up to `budget` instructions, stopping early on a fault
    pub fn run(&mut self, budget: u64) -> Result<u64, Fault> {
        for n in 0..budget {
            if let Err(fault) = self.step() {
                debug!(executed = n, "run stopped early");
                return Err(fault);
            }
        }
        Ok(budget)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn with_program(prog: &[u8]) -> Chip8Interpreter {
        let mut i = Chip8Interpreter::new(&Config::default());
        let mut prog: &[u8] = prog;
        i.load_program(&mut prog, LoadPolicy::Reject).unwrap();
        i
    }

    #[test]
    fn test_program_load_ok() {
        let i = with_program(&[0x00, 0xe0]); // clear screen
        assert_eq!(i.state().memory.get_word(0x200), Ok(0x00e0));
    }

    #[test]
    fn test_step_advances_pc() {
        let mut i = with_program(&[0x61, 0x23, 0x71, 0x01]);
        assert_eq!(i.step(), Ok(Step::Executed(Opcode::LoadImm)));
        assert_eq!(i.state().program_counter, 0x202);
        assert_eq!(i.step(), Ok(Step::Executed(Opcode::AddImm)));
        assert_eq!(i.state().register(1), 0x24);
        assert_eq!(i.cycles(), 2);
    }

    #[test]
    fn test_unknown_opcode_is_skipped() {
        let mut i = with_program(&[0xff, 0xff, 0x60, 0x07]);
        assert_eq!(
            i.step(),
            Ok(Step::Unhandled {
                word: 0xffff,
                addr: 0x200
            })
        );
        assert_eq!(i.state().program_counter, 0x202);
        assert_eq!(i.halted(), None);
        assert_eq!(i.unhandled_count(), 1);
        i.step().unwrap();
        assert_eq!(i.state().register(0), 7);
    }

    #[test]
    fn test_repeated_unknown_opcode_reported_once() {
        // 0x200: unknown; 0x202: jump 0x200
        let mut i = with_program(&[0x0f, 0xff, 0x12, 0x00]);
        i.run(10).unwrap();
        assert_eq!(i.unhandled_count(), 5);
        assert_eq!(i.reported.len(), 1);
        i.reset();
        assert!(i.reported.is_empty());
    }

    #[test]
    fn test_jump_is_not_clobbered_by_advance() {
        let mut i = with_program(&[0x13, 0x00]);
        i.step().unwrap();
        assert_eq!(i.state().program_counter, 0x300);
    }

    #[test]
    fn test_fetch_at_last_byte_faults_and_halts() {
        let mut i = with_program(&[]);
        i.state_mut().program_counter = 4095;
        let fault = Fault::ProgramCounterOutOfBounds { pc: 4095 };
        assert_eq!(i.step(), Err(fault));
        assert_eq!(i.halted(), Some(fault));
        assert_eq!(i.cycles(), 0);
        // stays halted, PC untouched
        assert_eq!(i.step(), Err(fault));
        assert_eq!(i.state().program_counter, 4095);
    }

    #[test]
    fn test_fetch_past_memory_faults() {
        let mut i = with_program(&[]);
        i.state_mut().program_counter = 0x1000;
        assert_eq!(
            i.step(),
            Err(Fault::ProgramCounterOutOfBounds { pc: 0x1000 })
        );
    }

    #[test]
    fn test_last_full_word_is_fetchable() {
        let mut i = with_program(&[]);
        i.state_mut().program_counter = 4094;
        i.state_mut().memory.write(&[0x6a, 0x01], 4094).unwrap();
        assert_eq!(i.step(), Ok(Step::Executed(Opcode::LoadImm)));
        // and now we've run off the end
        assert!(i.step().is_err());
    }

    #[test]
    fn test_handler_fault_halts() {
        let mut i = with_program(&[0x00, 0xee]);
        assert_eq!(i.step(), Err(Fault::StackUnderflow { pc: 0x200 }));
        assert!(i.halted().is_some());
    }

    #[test]
    fn test_run_budget() {
        // 0x200: V0 += 1; jump 0x200
        let mut i = with_program(&[0x70, 0x01, 0x12, 0x00]);
        assert_eq!(i.run(10), Ok(10));
        assert_eq!(i.state().register(0), 5);
    }

    #[test]
    fn test_run_stops_on_fault() {
        let mut i = with_program(&[0x70, 0x01, 0x00, 0xee, 0x70, 0x01]);
        assert_eq!(i.run(10), Err(Fault::StackUnderflow { pc: 0x202 }));
        assert_eq!(i.state().register(0), 1);
    }

    #[test]
    fn test_reset_clears_halt() {
        let mut i = with_program(&[0x00, 0xee]);
        let _ = i.step();
        i.reset();
        assert_eq!(i.halted(), None);
        assert_eq!(i.state().program_counter, 0x200);
        assert_eq!(i.cycles(), 0);
    }

    #[test]
    fn test_subroutine() {
        // 0x200: call 0x206; 0x202: V1 = 2; 0x204: jump 0x204
        // 0x206: V0 = 1; 0x208: ret
        let mut i = with_program(&[
            0x22, 0x06, 0x61, 0x02, 0x12, 0x04, 0x60, 0x01, 0x00, 0xee,
        ]);
        i.run(6).unwrap();
        assert_eq!(i.state().register(0), 1);
        assert_eq!(i.state().register(1), 2);
        assert_eq!(i.state().program_counter, 0x204);
        assert_eq!(i.state().stack_pointer, 0);
    }
}
