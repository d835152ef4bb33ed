use thiserror::Error;

/// Everything that can end an emulation session.
///
/// A failed `tick` leaves the machine as it was; the host decides what to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum VmError {
    #[error("unknown opcode {word:#06X}")]
    UnknownOpcode { word: u16 },

    #[error("stack overflow: call to {target:#05X} with every stack slot in use")]
    StackOverflow { target: u16 },

    #[error("stack underflow: return with an empty call stack")]
    StackUnderflow,

    #[error("ROM is too large ({size} bytes), max size is {max} bytes")]
    ImageTooLarge { size: usize, max: usize },

    #[error("memory access out of range at address {address:#06X}")]
    AddressOutOfRange { address: usize },
}

pub type Result<T> = std::result::Result<T, VmError>;
