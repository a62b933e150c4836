//! Art-Net UDP transport.
//!
//! Every Art-Net datagram starts with the same 10-byte prefix:
//! - The 8-byte packet ID `"Art-Net\0"`
//! - A 2-byte little-endian OpCode selecting the packet type
//!
//! This crate validates that prefix and hands the remaining bytes to the
//! handler registered for the OpCode. Interpreting the body is left to the
//! layers above.

pub mod error;
pub mod packet;
pub mod udp;

pub use error::{Result, TransportError};
pub use packet::{
    encode_packet, op_name, split_packet, ARTNET_ID, ARTNET_PORT, OP_DMX, OP_POLL, OP_POLL_REPLY,
    OP_SYNC, PACKET_HEADER_SIZE,
};
pub use udp::{ArtNetReceiver, ArtNetSender, PacketHandler};
