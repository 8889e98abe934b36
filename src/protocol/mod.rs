//! Typed MySQL wire-protocol messages and their binary forms.
//!
//! Each packet kind lives in its own file and knows how to decode itself
//! from a payload and encode itself back, byte-exact. Which kind a payload
//! *is* depends on connection state; that dispatch lives in [`crate::codec`].

mod capabilities;
mod packet;
mod status;
mod r#type;
mod value;

pub mod auth;
pub mod connect;
pub mod response;
pub mod statement;
pub mod text;

pub use capabilities::Capabilities;
pub use packet::{Message, Packet, PacketHeader};
pub use r#type::TypeId;
pub use status::Status;
pub use value::BindValue;
