use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tracing::{debug, trace};

use crate::constants::{CPU_CYCLES_PER_TIMER_CYCLE, KEY_COUNT};
use crate::error::Result;
use crate::instruction::from_op;
use crate::opcode::decode;
use crate::operations::Flow;
use crate::state::{FrameBuffer, State};

/// # Chip-8
/// Chip-8 is a virtual machine and corresponding interpreted language.
///
/// Tracks:
///  - current `state`
///  - the random source used by `RND`
///
/// Supplies interfaces for:
/// - loading roms
/// - pressing and releasing keys
/// - advancing the CPU and its timers one tick at a time
/// - inspecting its frame buffer for rendering by some display
///
/// Each `Chip8` is an independent session; nothing is shared between them.
pub struct Chip8 {
    state: State,
    rng: Box<dyn RngCore>,
}

impl Chip8 {
    pub fn new() -> Self {
        Self::with_rng(Box::new(StdRng::from_entropy()))
    }

    /// A session whose `RND` results are reproducible
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(Box::new(StdRng::seed_from_u64(seed)))
    }

    /// A session drawing random bytes from `rng`
    pub fn with_rng(rng: Box<dyn RngCore>) -> Self {
        Chip8 {
            state: State::new(),
            rng,
        }
    }

    /// Put the machine back in its power-on state, keeping the random source
    pub fn reset(&mut self) {
        debug!("resetting machine state");
        self.state = State::new();
    }

    /// Load a rom image at the program start address
    ///
    /// # Arguments
    /// * `rom` the raw program bytes
    pub fn load_rom(&mut self, rom: &[u8]) -> Result<()> {
        self.state.load(rom)
    }

    /// Returns the FrameBuffer if the display should be redrawn
    pub fn get_frame(&self) -> Option<FrameBuffer> {
        if self.state.draw_flag {
            Some(self.state.frame_buffer)
        } else {
            None
        }
    }

    /// Mark the current frame as presented
    pub fn clear_draw_flag(&mut self) {
        self.state.draw_flag = false;
    }

    /// Whether a tone should be playing
    pub fn sound_active(&self) -> bool {
        self.state.sound_timer > 0
    }

    /// Set the pressed status of key
    ///
    /// # Arguments
    /// * `key` the 4-bit representation of the key that was pressed
    pub fn key_press(&mut self, key: u8) {
        self.state.keypad[key as usize & 0xF] = true;
    }

    /// Unset the pressed status of key
    ///
    /// # Arguments
    /// * `key` the 4-bit representation of the key that was released
    pub fn key_release(&mut self, key: u8) {
        self.state.keypad[key as usize & 0xF] = false;
    }

    /// Replace the whole keypad snapshot
    pub fn set_keypad(&mut self, keypad: [bool; KEY_COUNT]) {
        self.state.keypad = keypad;
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    /// The most recently fetched instruction word
    pub fn current_instruction(&self) -> u16 {
        self.state.current_instruction
    }

    /// Advances the machine by a single cycle
    /// - counts the cycle and runs the timers every `CPU_CYCLES_PER_TIMER_CYCLE` cycles
    /// - fetches, decodes and executes the opcode at the pc
    /// - moves the pc on unless the instruction redirected it
    ///
    /// The cycle runs against a copy of the state, so if it fails the machine is
    /// left exactly as it was before the call.
    pub fn tick(&mut self) -> Result<()> {
        let mut next = self.state;

        next.cycle_count += 1;
        if next.cycle_count % CPU_CYCLES_PER_TIMER_CYCLE == 0 {
            Self::advance_timers(&mut next);
        }

        let word = Self::get_op(&next)?;
        next.current_instruction = word;
        let op = decode(word);
        let instruction = from_op(&op)?;
        trace!(
            pc = format_args!("{:04X}", next.pc),
            op = %op,
            mnemonic = instruction.mnemonic,
            x = op.x,
            y = op.y,
            kk = op.kk,
            nnn = op.nnn,
            i = format_args!("{:04X}", next.i),
            v = ?next.v,
        );

        next.pc = match instruction.execute(&op, &mut next, self.rng.as_mut())? {
            Flow::Next => next.pc.wrapping_add(2),
            Flow::Skip => next.pc.wrapping_add(4),
            Flow::Jump(address) => address,
        };

        self.state = next;
        Ok(())
    }

    /// Decrements both timers, stopping at 0
    fn advance_timers(state: &mut State) {
        state.delay_timer = state.delay_timer.saturating_sub(1);
        state.sound_timer = state.sound_timer.saturating_sub(1);
    }

    /// Gets the opcode currently pointed at by the pc.
    /// Memory is stored as bytes, but opcodes are 16 bits so we combine two subsequent bytes.
    fn get_op(state: &State) -> Result<u16> {
        let bytes = state.read(state.pc as usize, 2)?;
        Ok(u16::from(bytes[0]) << 8 | u16::from(bytes[1]))
    }
}

impl Default for Chip8 {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VmError;
    use rand::rngs::mock::StepRng;

    fn with_program(program: &[u8]) -> Chip8 {
        let mut chip8 = Chip8::with_rng(Box::new(StepRng::new(0, 1)));
        chip8.load_rom(program).unwrap();
        chip8
    }

    #[test]
    fn test_chip8_gets_op() {
        let chip8 = with_program(&[0xAA, 0xBB]);
        assert_eq!(Chip8::get_op(&chip8.state).unwrap(), 0xAABB);
    }

    #[test]
    fn test_fetch_past_end_of_memory_fails() {
        let mut chip8 = with_program(&[]);
        chip8.state.pc = 0xFFF;
        assert_eq!(
            chip8.tick(),
            Err(VmError::AddressOutOfRange { address: 0x1000 })
        );
    }

    #[test]
    fn test_tick_advances_pc() {
        // insert a cls opcode so we don't fail on reading empty memory
        let mut chip8 = with_program(&[0x00, 0xE0]);
        chip8.tick().unwrap();
        assert_eq!(chip8.state.pc, 0x202);
        assert_eq!(chip8.current_instruction(), 0x00E0);
        assert_eq!(chip8.state.cycle_count, 1);
    }

    #[test]
    fn test_tick_skips() {
        // SE V0, 0x00 is always taken on a fresh machine
        let mut chip8 = with_program(&[0x30, 0x00]);
        chip8.tick().unwrap();
        assert_eq!(chip8.state.pc, 0x204);
    }

    #[test]
    fn test_jump_is_not_advanced() {
        let mut chip8 = with_program(&[0x13, 0x45]);
        chip8.tick().unwrap();
        assert_eq!(chip8.state.pc, 0x345);
    }

    #[test]
    fn test_call_then_return_resumes_after_call() {
        let mut program = vec![0x23, 0x00];
        program.resize(0x100, 0);
        program.extend_from_slice(&[0x00, 0xEE]);
        let mut chip8 = with_program(&program);

        chip8.tick().unwrap();
        assert_eq!(chip8.state.pc, 0x300);
        chip8.tick().unwrap();
        assert_eq!(chip8.state.pc, 0x202);
        assert_eq!(chip8.state.sp, 0);
    }

    #[test]
    fn test_return_on_fresh_machine_underflows() {
        let mut chip8 = with_program(&[0x00, 0xEE]);
        assert_eq!(chip8.tick(), Err(VmError::StackUnderflow));
    }

    #[test]
    fn test_failed_tick_leaves_state_untouched() {
        let mut chip8 = with_program(&[0xFF, 0xFF]);
        chip8.state.delay_timer = 5;
        for _ in 0..8 {
            chip8.state.cycle_count += 1;
        }
        assert_eq!(chip8.tick(), Err(VmError::UnknownOpcode { word: 0xFFFF }));
        assert_eq!(chip8.state.pc, 0x200);
        assert_eq!(chip8.state.cycle_count, 8);
        assert_eq!(chip8.state.delay_timer, 5);
        assert_eq!(chip8.current_instruction(), 0);
    }

    #[test]
    fn test_timers_decrement_every_ninth_cycle() {
        // JP 0x200 keeps the machine spinning in place
        let mut chip8 = with_program(&[0x12, 0x00]);
        chip8.state.delay_timer = 5;
        chip8.state.sound_timer = 1;
        for _ in 0..8 {
            chip8.tick().unwrap();
            assert_eq!(chip8.state.delay_timer, 5);
        }
        chip8.tick().unwrap();
        assert_eq!(chip8.state.delay_timer, 4);
        assert_eq!(chip8.state.sound_timer, 0);
        assert!(!chip8.sound_active());

        for _ in 0..9 {
            chip8.tick().unwrap();
        }
        assert_eq!(chip8.state.delay_timer, 3);
        assert_eq!(chip8.state.sound_timer, 0);
    }

    #[test]
    fn test_waits_for_key() {
        let mut chip8 = with_program(&[0xF3, 0x0A]);
        chip8.tick().unwrap();
        chip8.tick().unwrap();
        assert_eq!(chip8.state.pc, 0x200);

        chip8.key_press(0x7);
        chip8.tick().unwrap();
        assert_eq!(chip8.state.pc, 0x202);
        assert_eq!(chip8.state.v[0x3], 0x7);
    }

    #[test]
    fn test_captures_key_presses() {
        let mut chip8 = Chip8::with_seed(1);
        chip8.key_press(0xE);
        assert!(chip8.state.keypad[0xE]);
        chip8.key_release(0xE);
        assert!(!chip8.state.keypad[0xE]);

        let mut keypad = [false; KEY_COUNT];
        keypad[0x2] = true;
        chip8.set_keypad(keypad);
        assert_eq!(chip8.state().keypad, keypad);
    }

    #[test]
    fn test_frame_only_when_dirty() {
        let mut chip8 = with_program(&[0xD0, 0x05]);
        assert!(chip8.get_frame().is_none());
        chip8.tick().unwrap();
        let frame = chip8.get_frame().unwrap();
        assert_eq!(frame[0][0..4], [1, 1, 1, 1]);
        chip8.clear_draw_flag();
        assert!(chip8.get_frame().is_none());
    }

    #[test]
    fn test_seeded_sessions_agree() {
        let program = [0xC0, 0xFF, 0xC1, 0xFF, 0xC2, 0xFF];
        let mut a = Chip8::with_seed(42);
        let mut b = Chip8::with_seed(42);
        a.load_rom(&program).unwrap();
        b.load_rom(&program).unwrap();
        for _ in 0..3 {
            a.tick().unwrap();
            b.tick().unwrap();
        }
        assert_eq!(a.state.v, b.state.v);
    }

    #[test]
    fn test_reset() {
        let mut chip8 = with_program(&[0x61, 0x22]);
        chip8.tick().unwrap();
        chip8.reset();
        assert_eq!(chip8.state.pc, 0x200);
        assert_eq!(chip8.state.v[0x1], 0);
        assert_eq!(chip8.state.memory[0x200], 0);
    }
}
