//! A CHIP-8 virtual machine.
//!
//! The whole machine lives in a [`State`] value owned by a [`Chip8`] session,
//! which is advanced one instruction at a time with [`Chip8::tick`]. Presenting
//! the frame buffer, capturing keys and pacing the clock are left to the host.

pub use chip8::Chip8;
pub use constants::CLOCK_HZ;
pub use error::{Result, VmError};
pub use opcode::{decode, Fields};
pub use operations::Flow;
pub use state::{FrameBuffer, State};

mod chip8;
pub mod constants;
mod error;
pub mod instruction;
mod opcode;
mod operations;
pub mod state;
