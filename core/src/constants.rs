/// Bytes of addressable memory
pub const MEMORY_SIZE: usize = 4096;

/// Where ROMs are loaded into memory and where execution starts
pub const PROGRAM_START: u16 = 0x200;

/// The largest ROM that fits between `PROGRAM_START` and the end of memory
pub const MAX_ROM_SIZE: usize = MEMORY_SIZE - PROGRAM_START as usize;

pub const REGISTER_COUNT: usize = 16;

/// VF doubles as the carry, borrow and collision flag
pub const FLAG_REGISTER: usize = 0xF;

/// Slot 0 is never written, so at most `STACK_SIZE - 1` calls can be nested
pub const STACK_SIZE: usize = 16;

pub const KEY_COUNT: usize = 16;

pub const DISPLAY_WIDTH: usize = 64;
pub const DISPLAY_HEIGHT: usize = 32;

/// Each font glyph is 4 pixels wide and 5 rows tall
pub const FONT_SPRITE_HEIGHT: u16 = 5;

/// The COSMAC VIP ran at roughly 540Hz against 60Hz timers
pub const CPU_CYCLES_PER_TIMER_CYCLE: u64 = 9;

/// Default host pacing in CPU cycles per second
pub const CLOCK_HZ: u64 = 540;

/// # Sprite Sheet
/// Hex digits 0..F, 5 bytes each, stored at the very start of memory.
///
/// Only the high nibble of each byte is drawn, e.g. the sprite for `0`:
/// ```text
/// 0xF0  ****
/// 0x90  *  *
/// 0x90  *  *
/// 0x90  *  *
/// 0xF0  ****
/// ```
pub const SPRITE_SHEET: [u8; 80] = [
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
