use tracing::debug;

use crate::constants::{
    DISPLAY_HEIGHT, DISPLAY_WIDTH, FLAG_REGISTER, KEY_COUNT, MAX_ROM_SIZE, MEMORY_SIZE,
    PROGRAM_START, REGISTER_COUNT, SPRITE_SHEET, STACK_SIZE,
};
use crate::error::{Result, VmError};

/// A snapshot of the Chip-8 internal state
///
/// ## CPU
/// Registers
/// - (v) 16 primary 8-bit registers (V0..VF)
///     - the first 15 (V0..VE) are general purpose registers
///     - the 16th (VF) is the carry/borrow/collision flag
/// - (i) a 16-bit memory address register
///
/// Counter
/// - (pc) a 16-bit program counter
///
/// Pointer
/// - (sp) an 8-bit stack pointer; it points at the most recent return address
///   and slot 0 is never written
///
/// Timers
/// - 2 8-bit timers (delay & sound) that count down to 0
///
/// ## Memory
/// - 16 slot stack of return addresses
/// - 4096 bytes of addressable memory
///     - 0x000..0x050 holds the font sprite sheet
///     - 0x200.. holds the loaded program
/// - 32x64 frame buffer and a flag marking it as changed since it was last drawn
///
/// ## Input
/// - the pressed status of keys 0..F, as last written by the host
///
/// ## Diagnostics
/// - the number of cycles run and the last instruction fetched
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct State {
    pub v: [u8; REGISTER_COUNT],
    pub i: u16,
    pub pc: u16,
    pub sp: u8,
    pub delay_timer: u8,
    pub sound_timer: u8,
    pub stack: [u16; STACK_SIZE],
    pub memory: [u8; MEMORY_SIZE],
    pub frame_buffer: FrameBuffer,
    pub draw_flag: bool,
    pub keypad: [bool; KEY_COUNT],
    pub cycle_count: u64,
    pub current_instruction: u16,
}

impl State {
    pub fn new() -> Self {
        let mut memory = [0; MEMORY_SIZE];
        memory[..SPRITE_SHEET.len()].copy_from_slice(&SPRITE_SHEET);

        State {
            v: [0; REGISTER_COUNT],
            i: 0,
            pc: PROGRAM_START,
            sp: 0,
            delay_timer: 0,
            sound_timer: 0,
            stack: [0; STACK_SIZE],
            memory,
            frame_buffer: [[0; DISPLAY_WIDTH]; DISPLAY_HEIGHT],
            draw_flag: false,
            keypad: [false; KEY_COUNT],
            cycle_count: 0,
            current_instruction: 0,
        }
    }

    /// Copy a program image into memory at `PROGRAM_START`.
    ///
    /// Images that don't fit are rejected before anything is written.
    pub fn load(&mut self, rom: &[u8]) -> Result<()> {
        if rom.len() > MAX_ROM_SIZE {
            return Err(VmError::ImageTooLarge {
                size: rom.len(),
                max: MAX_ROM_SIZE,
            });
        }
        let start = PROGRAM_START as usize;
        self.memory[start..start + rom.len()].copy_from_slice(rom);
        debug!(size = rom.len(), "loaded program image");
        Ok(())
    }

    /// Borrow `len` bytes of memory starting at `address`.
    pub fn read(&self, address: usize, len: usize) -> Result<&[u8]> {
        let end = checked_end(address, len)?;
        Ok(&self.memory[address..end])
    }

    /// Overwrite memory starting at `address` with `bytes`.
    pub fn write(&mut self, address: usize, bytes: &[u8]) -> Result<()> {
        let end = checked_end(address, bytes.len())?;
        self.memory[address..end].copy_from_slice(bytes);
        Ok(())
    }

    /// Set VF to 1 or 0
    pub fn flag(&mut self, set: bool) {
        self.v[FLAG_REGISTER] = u8::from(set);
    }
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

/// Reports the first address past the end of memory when `address..address + len` doesn't fit.
fn checked_end(address: usize, len: usize) -> Result<usize> {
    match address.checked_add(len) {
        Some(end) if end <= MEMORY_SIZE => Ok(end),
        _ => Err(VmError::AddressOutOfRange {
            address: address.max(MEMORY_SIZE),
        }),
    }
}

/// The FrameBuffer is indexed as [y][x]; lit pixels are 1
pub type FrameBuffer = [[u8; DISPLAY_WIDTH]; DISPLAY_HEIGHT];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_is_reset() {
        let state = State::new();
        assert_eq!(state.pc, 0x200);
        assert_eq!(state.sp, 0);
        assert_eq!(state.i, 0);
        assert_eq!(state.v, [0; 16]);
        assert_eq!(state.cycle_count, 0);
        assert!(!state.draw_flag);
        assert_eq!(state.memory[0..80], SPRITE_SHEET);
        assert!(state.memory[80..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_load_copies_to_program_start() {
        let mut state = State::new();
        state.load(&[0xAA, 0xBB, 0xCC]).unwrap();
        assert_eq!(state.memory[0x200..0x203], [0xAA, 0xBB, 0xCC]);
        assert_eq!(state.pc, 0x200);
    }

    #[test]
    fn test_load_accepts_image_filling_memory() {
        let mut state = State::new();
        state.load(&[0x11; MAX_ROM_SIZE]).unwrap();
        assert_eq!(state.memory[MEMORY_SIZE - 1], 0x11);
    }

    #[test]
    fn test_load_rejects_oversized_image() {
        let mut state = State::new();
        let err = state.load(&[0x11; MAX_ROM_SIZE + 1]).unwrap_err();
        assert_eq!(
            err,
            VmError::ImageTooLarge {
                size: MAX_ROM_SIZE + 1,
                max: MAX_ROM_SIZE
            }
        );
        // nothing was written
        assert!(state.memory[0x200..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_read_at_end_of_memory() {
        let state = State::new();
        assert_eq!(state.read(0xFFF, 1).unwrap(), &[0u8][..]);
        assert!(state.read(0x1000, 0).unwrap().is_empty());
    }

    #[test]
    fn test_read_past_end_of_memory() {
        let state = State::new();
        assert_eq!(
            state.read(0xFFE, 3).unwrap_err(),
            VmError::AddressOutOfRange { address: 0x1000 }
        );
        assert_eq!(
            state.read(0x10FE, 1).unwrap_err(),
            VmError::AddressOutOfRange { address: 0x10FE }
        );
    }

    #[test]
    fn test_write_past_end_leaves_memory_untouched() {
        let mut state = State::new();
        assert!(state.write(0xFFF, &[1, 2]).is_err());
        assert_eq!(state.memory[0xFFF], 0);
    }

    #[test]
    fn test_flag() {
        let mut state = State::new();
        state.flag(true);
        assert_eq!(state.v[0xF], 1);
        state.flag(false);
        assert_eq!(state.v[0xF], 0);
    }
}
