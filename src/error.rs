//! Error kinds the machine can surface.
//!
//! Everything else in the instruction set is total over its decoded inputs.

use core::fmt;

/// Errors raised while loading a program or executing a single step.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Error {
    /// Program image does not fit between the load origin and the end of
    /// memory.
    ProgramTooLarge { len: usize },
    /// A computed memory address left its valid range. The step that caused
    /// it is aborted; the machine can be `reset` and reused.
    OutOfBounds { addr: u16 },
    /// Call depth exceeded the stack capacity.
    StackOverflow,
    /// Return executed with an empty call stack.
    StackUnderflow,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Error::ProgramTooLarge { len } => {
                write!(f, "program of {} bytes does not fit in memory", len)
            }
            Error::OutOfBounds { addr } => {
                write!(f, "address {:#06X} is out of bounds", addr)
            }
            Error::StackOverflow => write!(f, "call stack is full"),
            Error::StackUnderflow => write!(f, "return without a matching call"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Errors raised by the stream-reading loader.
#[cfg(feature = "std")]
#[derive(Debug)]
pub enum LoadError {
    /// The underlying reader failed; the program was not started.
    Io(std::io::Error),
    /// The image was read but does not fit in memory.
    Vm(Error),
}

#[cfg(feature = "std")]
impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Io(e) => write!(f, "failed to read program: {}", e),
            LoadError::Vm(e) => e.fmt(f),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Io(e) => Some(e),
            LoadError::Vm(e) => Some(e),
        }
    }
}

#[cfg(feature = "std")]
impl From<std::io::Error> for LoadError {
    fn from(e: std::io::Error) -> Self {
        LoadError::Io(e)
    }
}

#[cfg(feature = "std")]
impl From<Error> for LoadError {
    fn from(e: Error) -> Self {
        LoadError::Vm(e)
    }
}
