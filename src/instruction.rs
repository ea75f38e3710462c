//! # instruction
//!
//! A fetched word splits into nibbles like so:
//!
//! | Field | Bits | Location                         |
//! |-------|------|----------------------------------|
//! | class | 4    | high byte, high nibble           |
//! | x     | 4    | high byte, low nibble            |
//! | y     | 4    | low byte, high nibble            |
//! | n     | 4    | low byte, low nibble             |
//! | nn    | 8    | low byte                         |
//! | nnn   | 12   | high byte low nibble + low byte  |
//!
//! Decoding maps the fields onto a closed set of [`Opcode`] tags; anything
//! outside the table decodes to `None` and is skipped by the interpreter.
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub class: u8,
    pub x: u8,
    pub y: u8,
    pub n: u8,
    pub nn: u8,
    pub nnn: u16,
}

impl Instruction {
    pub fn from_bytes(b0: u8, b1: u8) -> Self {
        Instruction {
            class: b0 >> 4,
            x: b0 & 0x0f,
            y: b1 >> 4,
            n: b1 & 0x0f,
            nn: b1,
            nnn: ((b0 as u16 & 0x0f) << 8) | b1 as u16,
        }
    }

    pub fn from_word(word: u16) -> Self {
        Self::from_bytes((word >> 8) as u8, word as u8)
    }

    pub fn word(&self) -> u16 {
        ((self.class as u16) << 12) | self.nnn
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X}", self.word())
    }
}

/// Every instruction the interpreter implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    /// 00E0
    Cls,
    /// 00EE
    Ret,
    /// 1NNN
    Jump,
    /// 2NNN
    Call,
    /// 3XNN
    SkipEqImm,
    /// 4XNN
    SkipNeImm,
    /// 5XY0
    SkipEqReg,
    /// 6XNN
    LoadImm,
    /// 7XNN
    AddImm,
    /// 8XY0
    Move,
    /// 8XY1
    Or,
    /// 8XY2
    And,
    /// 8XY3
    Xor,
    /// 8XY4
    AddReg,
    /// 8XY5
    SubReg,
    /// 8XY6
    ShiftRight,
    /// 8XY7
    SubReverse,
    /// 8XYE
    ShiftLeft,
    /// 9XY0
    SkipNeReg,
    /// ANNN
    LoadIndex,
    /// BNNN
    JumpOffset,
    /// CXNN
    Random,
    /// DXYN
    Draw,
    /// EX9E
    SkipKeyDown,
    /// EXA1
    SkipKeyUp,
    /// FX07
    LoadDelay,
    /// FX0A
    WaitKey,
    /// FX15
    SetDelay,
    /// FX18
    SetSound,
    /// FX1E
    AddIndex,
    /// FX29
    LoadGlyph,
    /// FX33
    StoreBcd,
    /// FX55
    StoreRegs,
    /// FX65
    LoadRegs,
}

impl Opcode {
    pub fn decode(ins: &Instruction) -> Option<Opcode> {
        use Opcode::*;
        let op = match (ins.class, ins.nnn, ins.n, ins.nn) {
            (0x0, 0x0e0, _, _) => Cls,
            (0x0, 0x0ee, _, _) => Ret,
            (0x1, _, _, _) => Jump,
            (0x2, _, _, _) => Call,
            (0x3, _, _, _) => SkipEqImm,
            (0x4, _, _, _) => SkipNeImm,
            (0x5, _, 0x0, _) => SkipEqReg,
            (0x6, _, _, _) => LoadImm,
            (0x7, _, _, _) => AddImm,
            (0x8, _, 0x0, _) => Move,
            (0x8, _, 0x1, _) => Or,
            (0x8, _, 0x2, _) => And,
            (0x8, _, 0x3, _) => Xor,
            (0x8, _, 0x4, _) => AddReg,
            (0x8, _, 0x5, _) => SubReg,
            (0x8, _, 0x6, _) => ShiftRight,
            (0x8, _, 0x7, _) => SubReverse,
            (0x8, _, 0xe, _) => ShiftLeft,
            (0x9, _, 0x0, _) => SkipNeReg,
            (0xa, _, _, _) => LoadIndex,
            (0xb, _, _, _) => JumpOffset,
            (0xc, _, _, _) => Random,
            (0xd, _, _, _) => Draw,
            (0xe, _, _, 0x9e) => SkipKeyDown,
            (0xe, _, _, 0xa1) => SkipKeyUp,
            (0xf, _, _, 0x07) => LoadDelay,
            (0xf, _, _, 0x0a) => WaitKey,
            (0xf, _, _, 0x15) => SetDelay,
            (0xf, _, _, 0x18) => SetSound,
            (0xf, _, _, 0x1e) => AddIndex,
            (0xf, _, _, 0x29) => LoadGlyph,
            (0xf, _, _, 0x33) => StoreBcd,
            (0xf, _, _, 0x55) => StoreRegs,
            (0xf, _, _, 0x65) => LoadRegs,
            _ => return None,
        };
        Some(op)
    }

    /// assembler-ish mnemonic, for logs
    pub fn mnemonic(&self) -> &'static str {
        use Opcode::*;
        match self {
            Cls => "CLS",
            Ret => "RET",
            Jump => "JP",
            Call => "CALL",
            SkipEqImm | SkipEqReg => "SE",
            SkipNeImm | SkipNeReg => "SNE",
            LoadImm | Move | LoadIndex | LoadDelay | WaitKey | SetDelay | SetSound
            | LoadGlyph | StoreBcd | StoreRegs | LoadRegs => "LD",
            AddImm | AddReg | AddIndex => "ADD",
            Or => "OR",
            And => "AND",
            Xor => "XOR",
            SubReg => "SUB",
            ShiftRight => "SHR",
            SubReverse => "SUBN",
            ShiftLeft => "SHL",
            JumpOffset => "JP V0",
            Random => "RND",
            Draw => "DRW",
            SkipKeyDown => "SKP",
            SkipKeyUp => "SKNP",
        }
    }
}
