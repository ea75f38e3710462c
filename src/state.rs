use crate::error::Fault;
use crate::framebuffer::Framebuffer;
use crate::memory::{Chip8MemoryMap, CHIP8_PROGRAM_ADDR};

/// number of V registers
pub const REGISTER_COUNT: usize = 16;
/// call stack depth
pub const STACK_DEPTH: usize = 16;
/// number of keys on the hex keypad
pub const KEY_COUNT: usize = 16;
/// VF
pub const FLAG_REGISTER: u8 = 0x0f;

/// All mutable machine state. A passive holder: no decoding or dispatch
/// lives here, and register and key indices are trusted to be < 16.
pub struct MachineState {
    pub memory: Chip8MemoryMap,
    pub v: [u8; REGISTER_COUNT],
    pub i: u16,
    pub program_counter: u16,
    pub stack: [u16; STACK_DEPTH],
    pub stack_pointer: usize,
    pub delay_timer: u8,
    pub sound_timer: u8,
    pub keys: [bool; KEY_COUNT],
    pub display: Framebuffer,
}

impl MachineState {
    pub fn new() -> Self {
        MachineState {
            memory: Chip8MemoryMap::new(),
            v: [0; REGISTER_COUNT],
            i: 0,
            program_counter: CHIP8_PROGRAM_ADDR,
            stack: [0; STACK_DEPTH],
            stack_pointer: 0,
            delay_timer: 0,
            sound_timer: 0,
            keys: [false; KEY_COUNT],
            display: Framebuffer::new(),
        }
    }

    /// power-on state, in place
    pub fn reset(&mut self) {
        self.memory.reset();
        self.v = [0; REGISTER_COUNT];
        self.i = 0;
        self.program_counter = CHIP8_PROGRAM_ADDR;
        self.stack = [0; STACK_DEPTH];
        self.stack_pointer = 0;
        self.delay_timer = 0;
        self.sound_timer = 0;
        self.keys = [false; KEY_COUNT];
        self.display.reset();
    }

    pub fn register(&self, x: u8) -> u8 {
        self.v[x as usize]
    }

    pub fn set_register(&mut self, x: u8, value: u8) {
        self.v[x as usize] = value;
    }

    pub fn set_flag(&mut self, flag: bool) {
        self.v[FLAG_REGISTER as usize] = flag as u8;
    }

    /// push a return address; `pc` is only used to report an overflow
    pub fn push(&mut self, addr: u16, pc: u16) -> Result<(), Fault> {
        if self.stack_pointer >= STACK_DEPTH {
            return Err(Fault::StackOverflow { pc });
        }
        self.stack[self.stack_pointer] = addr;
        self.stack_pointer += 1;
        Ok(())
    }

    pub fn pop(&mut self, pc: u16) -> Result<u16, Fault> {
        if self.stack_pointer == 0 {
            return Err(Fault::StackUnderflow { pc });
        }
        self.stack_pointer -= 1;
        Ok(self.stack[self.stack_pointer])
    }

    /// one 60Hz tick of the delay and sound timers
    pub fn tick_timers(&mut self) {
        self.delay_timer = self.delay_timer.saturating_sub(1);
        self.sound_timer = self.sound_timer.saturating_sub(1);
    }

    pub fn press_key(&mut self, key: u8) {
        self.keys[(key & 0x0f) as usize] = true;
    }

    pub fn release_key(&mut self, key: u8) {
        self.keys[(key & 0x0f) as usize] = false;
    }

    pub fn is_key_pressed(&self, key: u8) -> bool {
        self.keys[(key & 0x0f) as usize]
    }

    /// lowest-numbered key currently down
    pub fn first_pressed_key(&self) -> Option<u8> {
        self.keys.iter().position(|&k| k).map(|k| k as u8)
    }
}

impl Default for MachineState {
    fn default() -> Self {
        Self::new()
    }
}
