//! ## Design
//!
//! * a CHIP-8 virtual machine: 4K memory, 16 V registers, I, a 16-deep call
//!   stack, delay and sound timers, a 16-key keypad and a 64x32 display
//! * the core is the fetch/decode/execute cycle plus sprite drawing; display,
//!   keyboard and buzzer sit behind traits so they can be swapped (TUI
//!   in-console to start with, dummies for tests)
//! * instructions run as fast as they go in bursts, then sleep, to match
//!   timings; the burst size comes from the configured instruction rate, the
//!   sleep from the 60Hz timer rate
//!
//! Model
//!
//! ```text
//! Environment
//!  |-- display, input, sound, scheduler, key latches
//!  |-- interpreter(config)
//!  |    |-- machine state: memory map, registers, stack, timers, keys, frame buffer
//!  |    |-- instruction: word -> fields -> opcode
//!  |    `-- ops: opcode -> handler(state, context, instruction)
//!  `-- main loop, once per 60Hz tick
//!       |-- latch keys from input
//!       |-- interpreter.run(scheduler.cycles_for_tick())
//!       |-- tick timers; buzzer on/off
//!       |-- redraw if the frame buffer is dirty
//!       `-- sleep off the rest of the tick
//! ```
//!
//! Faults (PC off the end of memory, stack over/underflow, memory accesses
//! out of range) halt the interpreter. Unknown instructions are logged and
//! skipped.
pub mod config;
pub mod display;
pub mod environment;
pub mod error;
pub mod framebuffer;
pub mod input;
pub mod instruction;
pub mod interpreter;
pub mod memory;
pub mod ops;
pub mod sound;
pub mod state;
pub mod timing;
