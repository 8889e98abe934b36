//! Generic response packets.
//!
//! The first payload byte plus context disambiguates these in the command
//! phase: OK (`0x00`), EOF (`0xFE`), ERR (`0xFF`) and AuthMoreData (`0x01`).

mod eof;
mod err;
mod ok;

pub use eof::EofPacket;
pub use err::ErrPacket;
pub use ok::OkPacket;
