use rand::RngCore;

use crate::error::{Result, VmError};
use crate::opcode::Fields;
use crate::operations::*;
use crate::state::State;

/// The shape every operation shares
pub type Operation = fn(op: &Fields, state: &mut State, rng: &mut dyn RngCore) -> Result<Flow>;

/// An executable instruction and the mnemonic it's traced under
#[derive(Clone, Copy)]
pub struct Instruction {
    pub mnemonic: &'static str,
    pub operation: Operation,
}

impl Instruction {
    pub fn execute(&self, op: &Fields, state: &mut State, rng: &mut dyn RngCore) -> Result<Flow> {
        (self.operation)(op, state, rng)
    }
}

/// Selects the correct Instruction for a given Opcode
pub fn from_op(op: &Fields) -> Result<Instruction> {
    let (mnemonic, operation): (&'static str, Operation) = match op.nibbles() {
        (0x0, 0x0, 0xE, 0x0) => ("CLS", clr),
        (0x0, 0x0, 0xE, 0xE) => ("RET", rts),
        (0x1, ..) => ("JP addr", jump),
        (0x2, ..) => ("CALL addr", call),
        (0x3, ..) => ("SE Vx, byte", ske),
        (0x4, ..) => ("SNE Vx, byte", skne),
        (0x5, .., 0x0) => ("SE Vx, Vy", skre),
        (0x6, ..) => ("LD Vx, byte", load),
        (0x7, ..) => ("ADD Vx, byte", add),
        (0x8, .., 0x0) => ("LD Vx, Vy", mv),
        (0x8, .., 0x1) => ("OR Vx, Vy", or),
        (0x8, .., 0x2) => ("AND Vx, Vy", and),
        (0x8, .., 0x3) => ("XOR Vx, Vy", xor),
        (0x8, .., 0x4) => ("ADD Vx, Vy", addr),
        (0x8, .., 0x5) => ("SUB Vx, Vy", sub),
        (0x8, .., 0x6) => ("SHR Vx", shr),
        (0x8, .., 0x7) => ("SUBN Vx, Vy", subn),
        (0x8, .., 0xE) => ("SHL Vx", shl),
        (0x9, .., 0x0) => ("SNE Vx, Vy", skrne),
        (0xA, ..) => ("LD I, addr", loadi),
        (0xB, ..) => ("JP V0, addr", jumpi),
        (0xC, ..) => ("RND Vx, byte", rand),
        (0xD, ..) => ("DRW Vx, Vy, nibble", draw),
        (0xE, .., 0x9, 0xE) => ("SKP Vx", skpr),
        (0xE, .., 0xA, 0x1) => ("SKNP Vx", skup),
        (0xF, .., 0x0, 0x7) => ("LD Vx, DT", moved),
        (0xF, .., 0x0, 0xA) => ("LD Vx, K", keyd),
        (0xF, .., 0x1, 0x5) => ("LD DT, Vx", loads),
        (0xF, .., 0x1, 0x8) => ("LD ST, Vx", ld),
        (0xF, .., 0x1, 0xE) => ("ADD I, Vx", addi),
        (0xF, .., 0x2, 0x9) => ("LD F, Vx", ldspr),
        (0xF, .., 0x3, 0x3) => ("LD B, Vx", bcd),
        (0xF, .., 0x5, 0x5) => ("LD [I], Vx", stor),
        (0xF, .., 0x6, 0x5) => ("LD Vx, [I]", read),
        _ => return Err(VmError::UnknownOpcode { word: op.word }),
    };
    Ok(Instruction {
        mnemonic,
        operation,
    })
}
