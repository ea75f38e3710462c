//! # environment
//!
//! Sets everything up and runs the main loop. Each tick, in strict order:
//!
//!  1. read the keyboard into the key latches
//!  2. run this tick's instruction budget
//!  3. decrement the delay and sound timers
//!  4. start or stop the buzzer
//!  5. redraw, if the frame buffer changed
//!  6. sleep off the rest of the tick
//!
//! Everything happens on one thread, between instructions, so a renderer
//! never sees half a sprite and a key never changes under an instruction.
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::display::Display;
use crate::error::EnvironmentError;
use crate::input::{Input, KeyLatch};
use crate::interpreter::Chip8Interpreter;
use crate::sound::Sound;
use crate::timing::Scheduler;

/// Why the loop ended, when it wasn't a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// the input asked to quit
    Stopped,
    /// the configured instruction limit was reached
    CycleLimit,
}

pub struct Environment<'a> {
    interpreter: Chip8Interpreter,
    display: &'a mut dyn Display,
    input: &'a mut dyn Input,
    sound: &'a mut dyn Sound,
    scheduler: Scheduler,
    latch: KeyLatch,
    max_cycles: Option<u64>,
    // cleared when the sound device fails; the machine carries on silent
    sound_ok: bool,
}

impl<'a> Environment<'a> {
    pub fn new(
        interpreter: Chip8Interpreter,
        config: &Config,
        display: &'a mut dyn Display,
        input: &'a mut dyn Input,
        sound: &'a mut dyn Sound,
    ) -> Self {
        Environment {
            interpreter,
            display,
            input,
            sound,
            scheduler: Scheduler::from_config(config),
            latch: KeyLatch::new(config.key_hold_frames),
            max_cycles: config.max_cycles,
            sound_ok: true,
        }
    }

    pub fn interpreter(&self) -> &Chip8Interpreter {
        &self.interpreter
    }

    fn limit_reached(&self) -> bool {
        matches!(self.max_cycles, Some(max) if self.interpreter.cycles() >= max)
    }

    /// one scheduler tick, without the sleep
    pub fn tick(&mut self) -> Result<(), EnvironmentError> {
        for &key in self.input.peek_keys()? {
            self.latch.press(key);
        }
        self.input.flush_keys()?;
        self.latch.apply(self.interpreter.state_mut());

        let mut budget = self.scheduler.cycles_for_tick();
        if let Some(max) = self.max_cycles {
            budget = budget.min(max.saturating_sub(self.interpreter.cycles()));
        }
        self.interpreter.run(budget)?;

        self.interpreter.tick_timers();
        if self.sound_ok {
            if let Err(e) = self.sound.update(self.interpreter.state().sound_timer) {
                warn!("sound device failed, continuing without sound: {}", e);
                self.sound_ok = false;
            }
        }

        let state = self.interpreter.state_mut();
        if state.display.take_dirty() {
            self.display.draw(&state.display)?;
        }
        Ok(())
    }

    /// run `ticks` ticks back to back, for tests and benchmarks
    pub fn run_ticks(&mut self, ticks: u32) -> Result<(), EnvironmentError> {
        for _ in 0..ticks {
            self.tick()?;
        }
        Ok(())
    }

    /// run in real time until stopped, the cycle limit, or a fault
    pub fn run(&mut self) -> Result<Exit, EnvironmentError> {
        let mut pacer = self.scheduler.pacer();
        info!(timer_hz = self.scheduler.timer_hz(), "running");
        let exit = loop {
            pacer.loop_start();
            if self.input.stop_requested() {
                break Ok(Exit::Stopped);
            }
            if self.limit_reached() {
                break Ok(Exit::CycleLimit);
            }
            if let Err(e) = self.tick() {
                break Err(e);
            }
            if let Some(rate) = pacer.report_rate() {
                debug!(rate, cycles = self.interpreter.cycles(), "tick rate");
            }
            pacer.loop_sleep();
        };
        // never leave the buzzer on
        if self.sound_ok {
            let _ = self.sound.stop();
        }
        info!(
            cycles = self.interpreter.cycles(),
            unhandled = self.interpreter.unhandled_count(),
            "stopped"
        );
        exit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::DummyDisplay;
    use crate::error::Fault;
    use crate::input::DummyInput;
    use crate::sound::Mute;
    use crate::config::LoadPolicy;
    use std::error::Error;

    /// a buzzer that is never there
    #[derive(Default)]
    struct BrokenSound {
        attempts: usize,
    }

    impl Sound for BrokenSound {
        fn beep(&mut self) -> Result<(), Box<dyn Error>> {
            self.attempts += 1;
            Err("no console".into())
        }

        fn stop(&mut self) -> Result<(), Box<dyn Error>> {
            self.attempts += 1;
            Err("no console".into())
        }

        fn is_beeping(&self) -> bool {
            false
        }
    }

    fn interpreter(config: &Config, prog: &[u8]) -> Chip8Interpreter {
        let mut i = Chip8Interpreter::new(config);
        let mut prog: &[u8] = prog;
        i.load_program(&mut prog, LoadPolicy::Reject).unwrap();
        i
    }

    #[test]
    fn test_tick_runs_budget_and_draws() {
        let config = Config {
            cpu_hz: 120,
            ..Config::default()
        };
        // CLS; jump to self
        let i = interpreter(&config, &[0x00, 0xe0, 0x12, 0x02]);
        let (mut d, mut inp, mut snd) = (DummyDisplay::new(), DummyInput::new(&[]), Mute::new());
        let mut env = Environment::new(i, &config, &mut d, &mut inp, &mut snd);
        env.tick().unwrap();
        assert_eq!(env.interpreter().cycles(), 2);
        env.tick().unwrap();
        assert_eq!(env.interpreter().cycles(), 4);
        drop(env);
        // only the clear dirtied the display
        assert_eq!(d.frames, 1);
    }

    #[test]
    fn test_timers_tick_once_per_tick() {
        let config = Config::default();
        // V0 = 3; sound = V0; delay = V0; jump to self
        let i = interpreter(&config, &[0x60, 0x03, 0xf0, 0x18, 0xf0, 0x15, 0x12, 0x06]);
        let (mut d, mut inp, mut snd) = (DummyDisplay::new(), DummyInput::new(&[]), Mute::new());
        let mut env = Environment::new(i, &config, &mut d, &mut inp, &mut snd);
        env.tick().unwrap();
        assert_eq!(env.interpreter().state().delay_timer, 2);
        assert_eq!(env.interpreter().state().sound_timer, 2);
        env.run_ticks(2).unwrap();
        assert_eq!(env.interpreter().state().sound_timer, 0);
        drop(env);
        assert_eq!(snd.beeps, 1);
        assert!(!snd.is_beeping());
    }

    #[test]
    fn test_keys_reach_the_machine() {
        let config = Config::default();
        // wait for key into V3, then spin
        let i = interpreter(&config, &[0xf3, 0x0a, 0x12, 0x02]);
        let (mut d, mut inp, mut snd) = (DummyDisplay::new(), DummyInput::new(&[0xb]), Mute::new());
        let mut env = Environment::new(i, &config, &mut d, &mut inp, &mut snd);
        env.tick().unwrap();
        assert_eq!(env.interpreter().state().register(3), 0xb);
    }

    #[test]
    fn test_fault_stops_run() {
        let config = Config::default();
        let i = interpreter(&config, &[0x00, 0xee]);
        let (mut d, mut inp, mut snd) = (DummyDisplay::new(), DummyInput::new(&[]), Mute::new());
        let mut env = Environment::new(i, &config, &mut d, &mut inp, &mut snd);
        match env.run() {
            Err(EnvironmentError::Fault(f)) => assert_eq!(f, Fault::StackUnderflow { pc: 0x200 }),
            other => panic!("expected a fault, got {:?}", other),
        }
    }

    #[test]
    fn test_stop_request_ends_run() {
        let config = Config::default();
        let i = interpreter(&config, &[0x12, 0x00]);
        let (mut d, mut inp, mut snd) = (DummyDisplay::new(), DummyInput::stopping(), Mute::new());
        let mut env = Environment::new(i, &config, &mut d, &mut inp, &mut snd);
        assert_eq!(env.run().unwrap(), Exit::Stopped);
        assert_eq!(env.interpreter().cycles(), 0);
    }

    #[test]
    fn test_cycle_limit_ends_run() {
        let config = Config {
            max_cycles: Some(25),
            ..Config::default()
        };
        let i = interpreter(&config, &[0x12, 0x00]);
        let (mut d, mut inp, mut snd) = (DummyDisplay::new(), DummyInput::new(&[]), Mute::new());
        let mut env = Environment::new(i, &config, &mut d, &mut inp, &mut snd);
        assert_eq!(env.run().unwrap(), Exit::CycleLimit);
        assert_eq!(env.interpreter().cycles(), 25);
    }

    #[test]
    fn test_broken_sound_does_not_stop_the_machine() {
        let config = Config {
            max_cycles: Some(40),
            ..Config::default()
        };
        // V0 = 3; sound = V0; V1 += 1; jump back to the add
        let i = interpreter(&config, &[0x60, 0x03, 0xf0, 0x18, 0x71, 0x01, 0x12, 0x04]);
        let (mut d, mut inp, mut snd) = (DummyDisplay::new(), DummyInput::new(&[]), BrokenSound::default());
        let mut env = Environment::new(i, &config, &mut d, &mut inp, &mut snd);
        env.tick().unwrap();
        env.tick().unwrap();
        assert_eq!(env.run().unwrap(), Exit::CycleLimit);
        assert_eq!(env.interpreter().cycles(), 40);
        assert_eq!(env.interpreter().state().register(1), 19);
        drop(env);
        // the device is given up on after the first failure
        assert_eq!(snd.attempts, 1);
    }
}
