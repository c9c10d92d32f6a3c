#![cfg_attr(not(feature = "std"), no_std)]
pub mod builder;
pub mod context;
pub mod error;
pub mod frame;
pub mod multi;
pub mod opcode;
pub mod timer;
pub mod utils;

pub use builder::Builder;
pub use context::Context;
pub use error::Error;
#[cfg(feature = "std")]
pub use error::LoadError;
pub use frame::{Frame, FrameView};
pub use multi::Multi8;
pub use opcode::OpCode;

#[cfg(feature = "embedded-graphics")]
pub use embedded_graphics;
pub use nb;
