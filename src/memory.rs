use std::io;
use std::ops::Range;

use tracing::{debug, warn};

use crate::config::LoadPolicy;
use crate::error::{Fault, LoadError};

// NB. addresses are u16 as per the chip-8; lengths are usize to stop endless casting

/// Represents the addressable memory. Every access is bounds-checked; running
/// off the end is a fault, never a wrap or a panic.
pub trait MemoryMap {
    /// how many bytes are addressable
    fn size(&self) -> usize;

    /// get a r/w slice of the underlying memory
    fn get_rw_slice(&mut self, addr: u16, len: usize) -> Result<&mut [u8], Fault>;

    /// get a r/o slice of the underlying memory
    fn get_ro_slice(&self, addr: u16, len: usize) -> Result<&[u8], Fault>;

    /// write a chunk of bytes into "RAM"
    fn write(&mut self, data: &[u8], addr: u16) -> Result<(), Fault> {
        self.get_rw_slice(addr, data.len())?.copy_from_slice(data);
        Ok(())
    }

    fn get_byte(&self, addr: u16) -> Result<u8, Fault> {
        Ok(self.get_ro_slice(addr, 1)?[0])
    }

    /// get a big-endian two-byte word (instructions)
    fn get_word(&self, addr: u16) -> Result<u16, Fault> {
        let word = self.get_ro_slice(addr, 2)?;
        Ok(((word[0] as u16) << 8) | (word[1] as u16))
    }
}

/// Defines the CHIP-8 memory map, 4K configuration:
///   0x0000-0x01ff  reserved for the interpreter; the hex font lives at 0x0050
///   0x0200-0x0fff  program and data
pub struct Chip8MemoryMap {
    bytes: Box<[u8]>,
    pub program_addr: u16,
    pub font_addr: u16,
}

impl MemoryMap for Chip8MemoryMap {
    fn size(&self) -> usize {
        self.bytes.len()
    }

    fn get_rw_slice(&mut self, addr: u16, len: usize) -> Result<&mut [u8], Fault> {
        let r = self.bounds(addr, len)?;
        Ok(&mut self.bytes[r])
    }

    fn get_ro_slice(&self, addr: u16, len: usize) -> Result<&[u8], Fault> {
        let r = self.bounds(addr, len)?;
        Ok(&self.bytes[r])
    }
}

/// how much RAM we have
pub const CHIP8_RAM_SIZE_BYTES: usize = 4096;

/// where the program is loaded
pub const CHIP8_PROGRAM_ADDR: u16 = 0x0200;

/// how much room a program has
pub const CHIP8_PROGRAM_CAPACITY: usize = CHIP8_RAM_SIZE_BYTES - CHIP8_PROGRAM_ADDR as usize;

const CHIP8_FONT_ADDR: u16 = 0x050;
const CHIP8_GLYPH_BYTES: u16 = 5;

impl Chip8MemoryMap {
    /// zeroed memory with the hex font baked into the reserved area
    pub fn new() -> Self {
        let mut mm = Chip8MemoryMap {
            bytes: vec![0u8; CHIP8_RAM_SIZE_BYTES].into_boxed_slice(),
            program_addr: CHIP8_PROGRAM_ADDR,
            font_addr: CHIP8_FONT_ADDR,
        };
        mm.bake_font();
        mm
    }

    /// back to power-on contents
    pub fn reset(&mut self) {
        self.bytes.fill(0);
        self.bake_font();
    }

    fn bake_font(&mut self) {
        let start = self.font_addr as usize;
        self.bytes[start..start + CHIP8_CONTEMPORARY_FONT.len()]
            .copy_from_slice(&CHIP8_CONTEMPORARY_FONT);
    }

    fn bounds(&self, addr: u16, len: usize) -> Result<Range<usize>, Fault> {
        let start = addr as usize;
        match start.checked_add(len) {
            Some(end) if end <= self.bytes.len() => Ok(start..end),
            _ => Err(Fault::MemoryOutOfBounds { addr, len }),
        }
    }

    /// address of the 5-byte sprite for a hex digit; only the low nibble counts
    pub fn glyph_addr(&self, digit: u8) -> u16 {
        self.font_addr + (digit & 0x0f) as u16 * CHIP8_GLYPH_BYTES
    }

    /// load a CHIP-8 program at 0x200, returning how many bytes landed
    pub fn load_program(
        &mut self,
        reader: &mut impl io::Read,
        policy: LoadPolicy,
    ) -> Result<usize, LoadError> {
        let mut buf = Vec::new();
        let len = reader.read_to_end(&mut buf)?;
        let capacity = CHIP8_PROGRAM_CAPACITY;
        let kept = if len > capacity {
            match policy {
                LoadPolicy::Reject => return Err(LoadError::TooLarge { len, capacity }),
                LoadPolicy::Truncate => {
                    warn!(len, capacity, "program truncated to fit memory");
                    capacity
                }
            }
        } else {
            len
        };
        let start = self.program_addr as usize;
        self.bytes[start..start + kept].copy_from_slice(&buf[..kept]);
        debug!(bytes = kept, addr = self.program_addr, "program loaded");
        Ok(kept)
    }
}

impl Default for Chip8MemoryMap {
    fn default() -> Self {
        Self::new()
    }
}

const CHIP8_CONTEMPORARY_FONT: [u8; 80] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];
