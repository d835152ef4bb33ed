use std::fmt;

/// # Opcodes
///
/// Chip-8 opcodes are 16 bits each. Their behavior is cased on some combination of:
/// - `(n, _, _, _)` broad categorization; applies to all opcodes
/// - `(_, _, _, n)` specific behavior within a category
/// - `(_, _, n, n)` more specific behavior within a category
/// - `(_, n, n, n)` some fixed function that doesn't require variables (e.g. CLS; clear screen)
///
/// Nibbles not used to determine the operation often (but not always) carry important data.
/// - `(_, n, n, n)` represent a 12-bit address
/// - `(_, _, n, n)` encodes some data that is assigned to and/or compared with Vx
/// - `(_, n, _, _)` refers either to the register Vx or a range of registers V0..Vx
/// - `(_, _, n, _)` refers to the the register Vy
///
/// Every field is extracted whether or not the instruction uses it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fields {
    /// The whole instruction word
    pub word: u16,
    /// `[c___]`
    pub class: u8,
    /// `[_x__]`
    pub x: u8,
    /// `[__y_]`
    pub y: u8,
    /// `[___n]`
    pub n: u8,
    /// `[__kk]`
    pub kk: u8,
    /// `[_nnn]`
    pub nnn: u16,
}

impl Fields {
    /// Returns the Opcode's component nibbles.
    pub fn nibbles(&self) -> (u8, u8, u8, u8) {
        (self.class, self.x, self.y, self.n)
    }
}

/// Split an instruction word into its fixed-width fields.
pub fn decode(word: u16) -> Fields {
    Fields {
        word,
        class: ((word & 0xF000) >> 12) as u8,
        x: ((word & 0x0F00) >> 8) as u8,
        y: ((word & 0x00F0) >> 4) as u8,
        n: (word & 0x000F) as u8,
        kk: (word & 0x00FF) as u8,
        nnn: word & 0x0FFF,
    }
}

impl From<u16> for Fields {
    fn from(word: u16) -> Self {
        decode(word)
    }
}

impl fmt::Display for Fields {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:04X}", self.word)
    }
}
