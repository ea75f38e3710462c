use std::collections::HashMap;
use std::io;
use std::time::Duration;

use crossterm::event::{poll, read, Event, KeyCode, KeyModifiers};
use crossterm::terminal;
use tracing::{debug, warn};

use crate::state::{MachineState, KEY_COUNT};

/// map of the left-hand side of a qwerty keyboard onto the COSMAC keypad
///   1 2 3 4      1 2 3 C
///   q w e r  =>  4 5 6 D
///   a s d f      7 8 9 E
///   z x c v      A 0 B F
const CHIP8_CONVENTIONAL_KEYMAP: [(char, u8); 16] = [
    ('x', 0x00),
    ('1', 0x01),
    ('2', 0x02),
    ('3', 0x03),
    ('q', 0x04),
    ('w', 0x05),
    ('e', 0x06),
    ('a', 0x07),
    ('s', 0x08),
    ('d', 0x09),
    ('z', 0x0a),
    ('c', 0x0b),
    ('4', 0x0c),
    ('r', 0x0d),
    ('f', 0x0e),
    ('v', 0x0f),
];

/// reads keypresses
pub trait Input {
    /// get a list of all the mapped keys that have been pressed recently,
    /// without flushing them from the buffer
    fn peek_keys(&mut self) -> Result<&[u8], io::Error>;

    /// flush all the keypresses from the buffer
    fn flush_keys(&mut self) -> Result<(), io::Error>;

    /// has the user asked to quit
    fn stop_requested(&self) -> bool {
        false
    }
}

/// Input from the terminal via crossterm. Esc or Ctrl-C asks to stop.
pub struct StdinInput {
    buffer: Vec<u8>,
    keymap: HashMap<char, u8>,
    stop: bool,
}

impl StdinInput {
    pub fn new() -> Result<Self, io::Error> {
        terminal::enable_raw_mode()?;
        Ok(StdinInput {
            buffer: Vec::new(),
            keymap: HashMap::from(CHIP8_CONVENTIONAL_KEYMAP),
            stop: false,
        })
    }

    fn read_stdin(&mut self) -> Result<(), io::Error> {
        while poll(Duration::from_millis(0))? {
            match read()? {
                Event::Key(evt) => match evt.code {
                    KeyCode::Char('c') if evt.modifiers.contains(KeyModifiers::CONTROL) => {
                        self.stop = true;
                    }
                    KeyCode::Char(key) => match self.keymap.get(&key.to_ascii_lowercase()) {
                        Some(mapped_key) => self.buffer.push(*mapped_key),
                        None => debug!("can't map {:?} to a COSMAC key", key),
                    },
                    KeyCode::Esc => {
                        debug!("stop requested from keyboard");
                        self.stop = true;
                    }
                    other => debug!("ignoring key {:?}", other),
                },
                Event::Resize(..) => {}
                other => warn!("unknown event received: {:?}", other),
            }
        }
        Ok(())
    }
}

impl Drop for StdinInput {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

impl Input for StdinInput {
    fn peek_keys(&mut self) -> Result<&[u8], io::Error> {
        self.read_stdin()?;
        Ok(self.buffer.as_slice())
    }

    fn flush_keys(&mut self) -> Result<(), io::Error> {
        // presses that arrived since the peek stay queued in the terminal
        self.buffer.clear();
        Ok(())
    }

    fn stop_requested(&self) -> bool {
        self.stop
    }
}

/// dummy Input implementation for testing; replays the same keys until flushed
pub struct DummyInput {
    bytes: Vec<u8>,
    stop: bool,
}

impl DummyInput {
    pub fn new(keys: &[u8]) -> Self {
        DummyInput {
            bytes: Vec::from(keys),
            stop: false,
        }
    }

    /// behave as if the user asked to quit
    pub fn stopping() -> Self {
        DummyInput {
            bytes: Vec::new(),
            stop: true,
        }
    }
}

impl Input for DummyInput {
    fn peek_keys(&mut self) -> Result<&[u8], io::Error> {
        Ok(self.bytes.as_slice())
    }

    fn flush_keys(&mut self) -> Result<(), io::Error> {
        self.bytes.clear();
        Ok(())
    }

    fn stop_requested(&self) -> bool {
        self.stop
    }
}

/// Terminals only report presses, never releases, so a key is held down for a
/// number of ticks after its last press and then let go.
pub struct KeyLatch {
    hold_frames: u32,
    remaining: [u32; KEY_COUNT],
}

impl KeyLatch {
    /// a hold of zero would release every key before it was seen, so it
    /// counts as one
    pub fn new(hold_frames: u32) -> Self {
        KeyLatch {
            hold_frames: hold_frames.max(1),
            remaining: [0; KEY_COUNT],
        }
    }

    pub fn press(&mut self, key: u8) {
        self.remaining[(key & 0x0f) as usize] = self.hold_frames;
    }

    /// write the latches into the machine, then age them by one tick
    pub fn apply(&mut self, state: &mut MachineState) {
        for (key, left) in self.remaining.iter_mut().enumerate() {
            if *left > 0 {
                state.press_key(key as u8);
                *left -= 1;
            } else {
                state.release_key(key as u8);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keymap_covers_keypad() {
        let map = HashMap::from(CHIP8_CONVENTIONAL_KEYMAP);
        let mut keys: Vec<u8> = map.values().copied().collect();
        keys.sort_unstable();
        assert_eq!(keys, (0..16).collect::<Vec<u8>>());
    }

    #[test]
    fn test_dummy_input() {
        let mut i = DummyInput::new(&[1, 0xa]);
        assert_eq!(i.peek_keys().unwrap(), &[1, 0xa]);
        i.flush_keys().unwrap();
        assert!(i.peek_keys().unwrap().is_empty());
        assert!(!i.stop_requested());
        assert!(DummyInput::stopping().stop_requested());
    }

    #[test]
    fn test_latch_holds_then_releases() {
        let mut latch = KeyLatch::new(2);
        let mut s = MachineState::new();
        latch.press(0x5);
        latch.apply(&mut s);
        assert!(s.is_key_pressed(0x5));
        latch.apply(&mut s);
        assert!(s.is_key_pressed(0x5));
        latch.apply(&mut s);
        assert!(!s.is_key_pressed(0x5));
    }

    #[test]
    fn test_latch_zero_hold_still_presses() {
        let mut latch = KeyLatch::new(0);
        let mut s = MachineState::new();
        latch.press(0x5);
        latch.apply(&mut s);
        assert!(s.is_key_pressed(0x5));
        latch.apply(&mut s);
        assert!(!s.is_key_pressed(0x5));
    }

    #[test]
    fn test_flush_only_drops_buffered_keys() {
        let mut i = StdinInput {
            buffer: vec![0x1, 0xa],
            keymap: HashMap::from(CHIP8_CONVENTIONAL_KEYMAP),
            stop: false,
        };
        i.flush_keys().unwrap();
        assert!(i.buffer.is_empty());
        assert!(!i.stop_requested());
    }

    #[test]
    fn test_latch_repress_extends_hold() {
        let mut latch = KeyLatch::new(1);
        let mut s = MachineState::new();
        latch.press(0x2);
        latch.apply(&mut s);
        latch.press(0x2);
        latch.apply(&mut s);
        assert!(s.is_key_pressed(0x2));
        latch.apply(&mut s);
        assert!(!s.is_key_pressed(0x2));
    }
}
