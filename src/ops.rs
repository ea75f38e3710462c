//! # ops
//!
//! One handler per [`Opcode`], all with the same shape: they get the machine
//! state, the execution context and the decoded instruction, and report a
//! fault or nothing. By the time a handler runs the program counter already
//! points past the instruction, so control flow simply overwrites it and a
//! skip adds 2.
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::Quirks;
use crate::error::Fault;
use crate::instruction::{Instruction, Opcode};
use crate::memory::MemoryMap;
use crate::state::MachineState;

/// Everything a handler may need that isn't machine state.
pub struct Context {
    pub quirks: Quirks,
    pub rng: StdRng,
    /// address of the instruction being executed
    pub addr: u16,
}

impl Context {
    pub fn new(quirks: Quirks, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Context {
            quirks,
            rng,
            addr: 0,
        }
    }
}

pub type Handler = fn(&mut MachineState, &mut Context, Instruction) -> Result<(), Fault>;

impl Opcode {
    pub fn handler(self) -> Handler {
        use Opcode::*;
        match self {
            Cls => cls,
            Ret => ret,
            Jump => jump,
            Call => call,
            SkipEqImm => skip_eq_imm,
            SkipNeImm => skip_ne_imm,
            SkipEqReg => skip_eq_reg,
            LoadImm => load_imm,
            AddImm => add_imm,
            Move => mov,
            Or => or,
            And => and,
            Xor => xor,
            AddReg => add_reg,
            SubReg => sub_reg,
            ShiftRight => shift_right,
            SubReverse => sub_reverse,
            ShiftLeft => shift_left,
            SkipNeReg => skip_ne_reg,
            LoadIndex => load_index,
            JumpOffset => jump_offset,
            Random => random,
            Draw => draw,
            SkipKeyDown => skip_key_down,
            SkipKeyUp => skip_key_up,
            LoadDelay => load_delay,
            WaitKey => wait_key,
            SetDelay => set_delay,
            SetSound => set_sound,
            AddIndex => add_index,
            LoadGlyph => load_glyph,
            StoreBcd => store_bcd,
            StoreRegs => store_regs,
            LoadRegs => load_regs,
        }
    }
}

fn skip_if(s: &mut MachineState, cond: bool) {
    if cond {
        s.program_counter = s.program_counter.wrapping_add(2);
    }
}

fn cls(s: &mut MachineState, _: &mut Context, _: Instruction) -> Result<(), Fault> {
    s.display.clear();
    Ok(())
}

fn ret(s: &mut MachineState, ctx: &mut Context, _: Instruction) -> Result<(), Fault> {
    s.program_counter = s.pop(ctx.addr)?;
    Ok(())
}

fn jump(s: &mut MachineState, _: &mut Context, ins: Instruction) -> Result<(), Fault> {
    s.program_counter = ins.nnn;
    Ok(())
}

fn call(s: &mut MachineState, ctx: &mut Context, ins: Instruction) -> Result<(), Fault> {
    s.push(s.program_counter, ctx.addr)?;
    s.program_counter = ins.nnn;
    Ok(())
}

fn skip_eq_imm(s: &mut MachineState, _: &mut Context, ins: Instruction) -> Result<(), Fault> {
    let cond = s.register(ins.x) == ins.nn;
    skip_if(s, cond);
    Ok(())
}

fn skip_ne_imm(s: &mut MachineState, _: &mut Context, ins: Instruction) -> Result<(), Fault> {
    let cond = s.register(ins.x) != ins.nn;
    skip_if(s, cond);
    Ok(())
}

fn skip_eq_reg(s: &mut MachineState, _: &mut Context, ins: Instruction) -> Result<(), Fault> {
    let cond = s.register(ins.x) == s.register(ins.y);
    skip_if(s, cond);
    Ok(())
}

fn skip_ne_reg(s: &mut MachineState, _: &mut Context, ins: Instruction) -> Result<(), Fault> {
    let cond = s.register(ins.x) != s.register(ins.y);
    skip_if(s, cond);
    Ok(())
}

fn load_imm(s: &mut MachineState, _: &mut Context, ins: Instruction) -> Result<(), Fault> {
    s.set_register(ins.x, ins.nn);
    Ok(())
}

// no carry flag for this one
fn add_imm(s: &mut MachineState, _: &mut Context, ins: Instruction) -> Result<(), Fault> {
    s.set_register(ins.x, s.register(ins.x).wrapping_add(ins.nn));
    Ok(())
}

fn mov(s: &mut MachineState, _: &mut Context, ins: Instruction) -> Result<(), Fault> {
    s.set_register(ins.x, s.register(ins.y));
    Ok(())
}

fn logic(s: &mut MachineState, ctx: &Context, ins: Instruction, f: fn(u8, u8) -> u8) {
    s.set_register(ins.x, f(s.register(ins.x), s.register(ins.y)));
    if ctx.quirks.logic_resets_flag {
        s.set_flag(false);
    }
}

fn or(s: &mut MachineState, ctx: &mut Context, ins: Instruction) -> Result<(), Fault> {
    logic(s, ctx, ins, |a, b| a | b);
    Ok(())
}

fn and(s: &mut MachineState, ctx: &mut Context, ins: Instruction) -> Result<(), Fault> {
    logic(s, ctx, ins, |a, b| a & b);
    Ok(())
}

fn xor(s: &mut MachineState, ctx: &mut Context, ins: Instruction) -> Result<(), Fault> {
    logic(s, ctx, ins, |a, b| a ^ b);
    Ok(())
}

// NB. the flag is written last so that VF as a destination ends up holding it
fn add_reg(s: &mut MachineState, _: &mut Context, ins: Instruction) -> Result<(), Fault> {
    let (sum, carry) = s.register(ins.x).overflowing_add(s.register(ins.y));
    s.set_register(ins.x, sum);
    s.set_flag(carry);
    Ok(())
}

fn sub_reg(s: &mut MachineState, _: &mut Context, ins: Instruction) -> Result<(), Fault> {
    let (diff, borrow) = s.register(ins.x).overflowing_sub(s.register(ins.y));
    s.set_register(ins.x, diff);
    s.set_flag(!borrow);
    Ok(())
}

fn sub_reverse(s: &mut MachineState, _: &mut Context, ins: Instruction) -> Result<(), Fault> {
    let (diff, borrow) = s.register(ins.y).overflowing_sub(s.register(ins.x));
    s.set_register(ins.x, diff);
    s.set_flag(!borrow);
    Ok(())
}

fn shift_source(s: &MachineState, ctx: &Context, ins: Instruction) -> u8 {
    if ctx.quirks.shift_uses_vy {
        s.register(ins.y)
    } else {
        s.register(ins.x)
    }
}

fn shift_right(s: &mut MachineState, ctx: &mut Context, ins: Instruction) -> Result<(), Fault> {
    let src = shift_source(s, ctx, ins);
    s.set_register(ins.x, src >> 1);
    s.set_flag(src & 0x01 != 0);
    Ok(())
}

fn shift_left(s: &mut MachineState, ctx: &mut Context, ins: Instruction) -> Result<(), Fault> {
    let src = shift_source(s, ctx, ins);
    s.set_register(ins.x, src << 1);
    s.set_flag(src & 0x80 != 0);
    Ok(())
}

fn load_index(s: &mut MachineState, _: &mut Context, ins: Instruction) -> Result<(), Fault> {
    s.i = ins.nnn;
    Ok(())
}

fn jump_offset(s: &mut MachineState, ctx: &mut Context, ins: Instruction) -> Result<(), Fault> {
    let base = if ctx.quirks.jump_offset_uses_vx {
        s.register(ins.x)
    } else {
        s.register(0)
    };
    s.program_counter = ins.nnn + base as u16;
    Ok(())
}

fn random(s: &mut MachineState, ctx: &mut Context, ins: Instruction) -> Result<(), Fault> {
    let r: u8 = ctx.rng.gen();
    s.set_register(ins.x, r & ins.nn);
    Ok(())
}

/// DXYN: XOR an N-row sprite from memory at I onto the display at (VX, VY);
/// VF reports whether any lit pixel was turned off.
fn draw(s: &mut MachineState, ctx: &mut Context, ins: Instruction) -> Result<(), Fault> {
    // coordinates first, in case X or Y is VF
    let x = s.register(ins.x);
    let y = s.register(ins.y);
    let sprite = s.memory.get_ro_slice(s.i, ins.n as usize)?;
    let collision = s.display.draw_sprite(x, y, sprite, ctx.quirks.clip_sprites);
    s.set_flag(collision);
    Ok(())
}

fn skip_key_down(s: &mut MachineState, _: &mut Context, ins: Instruction) -> Result<(), Fault> {
    let down = s.is_key_pressed(s.register(ins.x));
    skip_if(s, down);
    Ok(())
}

fn skip_key_up(s: &mut MachineState, _: &mut Context, ins: Instruction) -> Result<(), Fault> {
    let down = s.is_key_pressed(s.register(ins.x));
    skip_if(s, !down);
    Ok(())
}

fn load_delay(s: &mut MachineState, _: &mut Context, ins: Instruction) -> Result<(), Fault> {
    s.set_register(ins.x, s.delay_timer);
    Ok(())
}

// re-executes itself until a key is down
fn wait_key(s: &mut MachineState, ctx: &mut Context, ins: Instruction) -> Result<(), Fault> {
    match s.first_pressed_key() {
        Some(key) => s.set_register(ins.x, key),
        None => s.program_counter = ctx.addr,
    }
    Ok(())
}

fn set_delay(s: &mut MachineState, _: &mut Context, ins: Instruction) -> Result<(), Fault> {
    s.delay_timer = s.register(ins.x);
    Ok(())
}

fn set_sound(s: &mut MachineState, _: &mut Context, ins: Instruction) -> Result<(), Fault> {
    s.sound_timer = s.register(ins.x);
    Ok(())
}

fn add_index(s: &mut MachineState, _: &mut Context, ins: Instruction) -> Result<(), Fault> {
    s.i = s.i.wrapping_add(s.register(ins.x) as u16);
    Ok(())
}

fn load_glyph(s: &mut MachineState, _: &mut Context, ins: Instruction) -> Result<(), Fault> {
    s.i = s.memory.glyph_addr(s.register(ins.x));
    Ok(())
}

fn store_bcd(s: &mut MachineState, _: &mut Context, ins: Instruction) -> Result<(), Fault> {
    let v = s.register(ins.x);
    s.memory.write(&[v / 100, v / 10 % 10, v % 10], s.i)
}

fn store_regs(s: &mut MachineState, ctx: &mut Context, ins: Instruction) -> Result<(), Fault> {
    let count = ins.x as usize + 1;
    s.memory.write(&s.v[..count], s.i)?;
    if ctx.quirks.load_store_increments_index {
        s.i = s.i.wrapping_add(count as u16);
    }
    Ok(())
}

fn load_regs(s: &mut MachineState, ctx: &mut Context, ins: Instruction) -> Result<(), Fault> {
    let count = ins.x as usize + 1;
    let src = s.memory.get_ro_slice(s.i, count)?;
    s.v[..count].copy_from_slice(src);
    if ctx.quirks.load_store_increments_index {
        s.i = s.i.wrapping_add(count as u16);
    }
    Ok(())
}
