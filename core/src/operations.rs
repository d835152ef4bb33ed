use rand::RngCore;

use crate::constants::{DISPLAY_HEIGHT, DISPLAY_WIDTH, FONT_SPRITE_HEIGHT, STACK_SIZE};
use crate::error::{Result, VmError};
use crate::opcode::Fields;
use crate::state::State;

/// What the cycle driver should do with the program counter once an operation has run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// pc += 2
    Next,
    /// pc += 4; the next instruction is skipped
    Skip,
    /// pc = addr; the operation redirected execution itself
    Jump(u16),
}

fn skip_if(condition: bool) -> Flow {
    if condition {
        Flow::Skip
    } else {
        Flow::Next
    }
}

/// clear
pub fn clr(_op: &Fields, state: &mut State, _rng: &mut dyn RngCore) -> Result<Flow> {
    state.frame_buffer = [[0; DISPLAY_WIDTH]; DISPLAY_HEIGHT];
    state.draw_flag = true;
    Ok(Flow::Next)
}

/// PC = STACK.pop()
pub fn rts(_op: &Fields, state: &mut State, _rng: &mut dyn RngCore) -> Result<Flow> {
    if state.sp == 0 {
        return Err(VmError::StackUnderflow);
    }
    let address = state.stack[state.sp as usize];
    state.sp -= 1;
    Ok(Flow::Jump(address))
}

/// PC = addr
pub fn jump(op: &Fields, _state: &mut State, _rng: &mut dyn RngCore) -> Result<Flow> {
    Ok(Flow::Jump(op.nnn))
}

/// STACK.push(PC + 2); PC = addr
pub fn call(op: &Fields, state: &mut State, _rng: &mut dyn RngCore) -> Result<Flow> {
    if state.sp as usize >= STACK_SIZE - 1 {
        return Err(VmError::StackOverflow { target: op.nnn });
    }
    state.sp += 1;
    state.stack[state.sp as usize] = state.pc.wrapping_add(2);
    Ok(Flow::Jump(op.nnn))
}

/// if Vx == kk then pc += 2
pub fn ske(op: &Fields, state: &mut State, _rng: &mut dyn RngCore) -> Result<Flow> {
    Ok(skip_if(state.v[op.x as usize] == op.kk))
}

/// if Vx != kk then pc += 2
pub fn skne(op: &Fields, state: &mut State, _rng: &mut dyn RngCore) -> Result<Flow> {
    Ok(skip_if(state.v[op.x as usize] != op.kk))
}

/// if Vx == Vy then pc += 2
pub fn skre(op: &Fields, state: &mut State, _rng: &mut dyn RngCore) -> Result<Flow> {
    Ok(skip_if(state.v[op.x as usize] == state.v[op.y as usize]))
}

/// Vx = kk
pub fn load(op: &Fields, state: &mut State, _rng: &mut dyn RngCore) -> Result<Flow> {
    state.v[op.x as usize] = op.kk;
    Ok(Flow::Next)
}

/// Vx += kk
/// Add kk to Vx; allow for overflow but implicitly drop it
pub fn add(op: &Fields, state: &mut State, _rng: &mut dyn RngCore) -> Result<Flow> {
    let x = op.x as usize;
    state.v[x] = state.v[x].wrapping_add(op.kk);
    Ok(Flow::Next)
}

/// Vx = Vy
pub fn mv(op: &Fields, state: &mut State, _rng: &mut dyn RngCore) -> Result<Flow> {
    state.v[op.x as usize] = state.v[op.y as usize];
    Ok(Flow::Next)
}

/// Vx |= Vy
pub fn or(op: &Fields, state: &mut State, _rng: &mut dyn RngCore) -> Result<Flow> {
    state.v[op.x as usize] |= state.v[op.y as usize];
    Ok(Flow::Next)
}

/// Vx &= Vy
pub fn and(op: &Fields, state: &mut State, _rng: &mut dyn RngCore) -> Result<Flow> {
    state.v[op.x as usize] &= state.v[op.y as usize];
    Ok(Flow::Next)
}

/// Vx ^= Vy
pub fn xor(op: &Fields, state: &mut State, _rng: &mut dyn RngCore) -> Result<Flow> {
    state.v[op.x as usize] ^= state.v[op.y as usize];
    Ok(Flow::Next)
}

// The ALU operations below write VF after Vx, so the flag is what survives
// when x is 0xF.

/// Vx += Vy; VF = carry
pub fn addr(op: &Fields, state: &mut State, _rng: &mut dyn RngCore) -> Result<Flow> {
    let (res, carry) = state.v[op.x as usize].overflowing_add(state.v[op.y as usize]);
    state.v[op.x as usize] = res;
    state.flag(carry);
    Ok(Flow::Next)
}

/// Vx -= Vy; VF = Vx > Vy
pub fn sub(op: &Fields, state: &mut State, _rng: &mut dyn RngCore) -> Result<Flow> {
    let (vx, vy) = (state.v[op.x as usize], state.v[op.y as usize]);
    state.v[op.x as usize] = vx.wrapping_sub(vy);
    state.flag(vx > vy);
    Ok(Flow::Next)
}

/// Vx >>= 1; VF = the bit shifted out
/// Vy is ignored
pub fn shr(op: &Fields, state: &mut State, _rng: &mut dyn RngCore) -> Result<Flow> {
    let vx = state.v[op.x as usize];
    state.v[op.x as usize] = vx >> 1;
    state.flag(vx & 0x1 == 0x1);
    Ok(Flow::Next)
}

/// Vx = Vy - Vx; VF = Vy > Vx
pub fn subn(op: &Fields, state: &mut State, _rng: &mut dyn RngCore) -> Result<Flow> {
    let (vx, vy) = (state.v[op.x as usize], state.v[op.y as usize]);
    state.v[op.x as usize] = vy.wrapping_sub(vx);
    state.flag(vy > vx);
    Ok(Flow::Next)
}

/// Vx <<= 1; VF = the bit shifted out
/// Vy is ignored
pub fn shl(op: &Fields, state: &mut State, _rng: &mut dyn RngCore) -> Result<Flow> {
    let vx = state.v[op.x as usize];
    state.v[op.x as usize] = vx << 1;
    state.flag(vx & 0x80 == 0x80);
    Ok(Flow::Next)
}

/// if Vx != Vy then pc +=2
pub fn skrne(op: &Fields, state: &mut State, _rng: &mut dyn RngCore) -> Result<Flow> {
    Ok(skip_if(state.v[op.x as usize] != state.v[op.y as usize]))
}

/// I = addr
pub fn loadi(op: &Fields, state: &mut State, _rng: &mut dyn RngCore) -> Result<Flow> {
    state.i = op.nnn;
    Ok(Flow::Next)
}

/// PC = V0 + addr
pub fn jumpi(op: &Fields, state: &mut State, _rng: &mut dyn RngCore) -> Result<Flow> {
    Ok(Flow::Jump(op.nnn + u16::from(state.v[0x0])))
}

/// Vx = rand_byte & kk
pub fn rand(op: &Fields, state: &mut State, rng: &mut dyn RngCore) -> Result<Flow> {
    let rand_byte = (rng.next_u32() & 0xFF) as u8;
    state.v[op.x as usize] = rand_byte & op.kk;
    Ok(Flow::Next)
}

/// draw_sprite(x=Vx y=Vy size=n)
/// XORs a sprite from memory i..i+n onto the FrameBuffer.
///
/// The origin wraps around the screen but the sprite itself is clipped at the
/// right and bottom edges. Sets VF if any lit pixel is erased.
pub fn draw(op: &Fields, state: &mut State, _rng: &mut dyn RngCore) -> Result<Flow> {
    let height = op.n as usize;
    let mut sprite = [0u8; 0xF];
    // a zero row sprite reads nothing, wherever I points
    if height > 0 {
        sprite[..height].copy_from_slice(state.read(state.i as usize, height)?);
    }

    let origin_x = state.v[op.x as usize] as usize % DISPLAY_WIDTH;
    let origin_y = state.v[op.y as usize] as usize % DISPLAY_HEIGHT;

    let mut collision = false;
    for (row, &byte) in sprite[..height].iter().enumerate() {
        let y = origin_y + row;
        if y >= DISPLAY_HEIGHT {
            break;
        }
        for bit in 0..8 {
            let x = origin_x + bit;
            if x >= DISPLAY_WIDTH {
                break;
            }
            let pixel = (byte >> (7 - bit)) & 1;
            collision |= (pixel & state.frame_buffer[y][x]) == 1;
            state.frame_buffer[y][x] ^= pixel;
        }
    }

    state.flag(collision);
    state.draw_flag = true;
    Ok(Flow::Next)
}

/// if Vx.pressed then pc += 2
pub fn skpr(op: &Fields, state: &mut State, _rng: &mut dyn RngCore) -> Result<Flow> {
    Ok(skip_if(state.keypad[key_index(op, state)]))
}

/// if !Vx.pressed then pc += 2
pub fn skup(op: &Fields, state: &mut State, _rng: &mut dyn RngCore) -> Result<Flow> {
    Ok(skip_if(!state.keypad[key_index(op, state)]))
}

/// Only the low nibble of Vx names a key
fn key_index(op: &Fields, state: &State) -> usize {
    (state.v[op.x as usize] & 0xF) as usize
}

/// Vx = DT
pub fn moved(op: &Fields, state: &mut State, _rng: &mut dyn RngCore) -> Result<Flow> {
    state.v[op.x as usize] = state.delay_timer;
    Ok(Flow::Next)
}

/// await keypress for Vx
/// Re-runs itself every cycle until a key is down, then takes the lowest one.
pub fn keyd(op: &Fields, state: &mut State, _rng: &mut dyn RngCore) -> Result<Flow> {
    match state.keypad.iter().position(|&pressed| pressed) {
        Some(key) => {
            state.v[op.x as usize] = key as u8;
            Ok(Flow::Next)
        }
        None => Ok(Flow::Jump(state.pc)),
    }
}

/// DT = Vx
pub fn loads(op: &Fields, state: &mut State, _rng: &mut dyn RngCore) -> Result<Flow> {
    state.delay_timer = state.v[op.x as usize];
    Ok(Flow::Next)
}

/// ST = Vx
pub fn ld(op: &Fields, state: &mut State, _rng: &mut dyn RngCore) -> Result<Flow> {
    state.sound_timer = state.v[op.x as usize];
    Ok(Flow::Next)
}

/// I += Vx
pub fn addi(op: &Fields, state: &mut State, _rng: &mut dyn RngCore) -> Result<Flow> {
    state.i = state.i.wrapping_add(u16::from(state.v[op.x as usize]));
    Ok(Flow::Next)
}

/// I = Vx * 5
/// Set I to the memory address of the sprite for Vx
/// See constants::SPRITE_SHEET for more details
pub fn ldspr(op: &Fields, state: &mut State, _rng: &mut dyn RngCore) -> Result<Flow> {
    state.i = u16::from(state.v[op.x as usize]) * FONT_SPRITE_HEIGHT;
    Ok(Flow::Next)
}

/// mem[I..I+3] = bcd(Vx)
/// Store BCD repr of Vx in memory starting at address i
pub fn bcd(op: &Fields, state: &mut State, _rng: &mut dyn RngCore) -> Result<Flow> {
    let vx = state.v[op.x as usize];
    state.write(state.i as usize, &[vx / 100, vx / 10 % 10, vx % 10])?;
    Ok(Flow::Next)
}

/// mem[I..=I+x] = V0..=Vx
/// I is left as it was
pub fn stor(op: &Fields, state: &mut State, _rng: &mut dyn RngCore) -> Result<Flow> {
    let v = state.v;
    state.write(state.i as usize, &v[..=op.x as usize])?;
    Ok(Flow::Next)
}

/// V0..=Vx = mem[I..=I+x]
/// I is left as it was
pub fn read(op: &Fields, state: &mut State, _rng: &mut dyn RngCore) -> Result<Flow> {
    let count = op.x as usize + 1;
    let mut values = [0u8; 16];
    values[..count].copy_from_slice(state.read(state.i as usize, count)?);
    state.v[..count].copy_from_slice(&values[..count]);
    Ok(Flow::Next)
}
