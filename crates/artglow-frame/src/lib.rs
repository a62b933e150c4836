//! ArtDmx frame decoding.
//!
//! The body of an ArtDmx packet (after the Art-Net ID and OpCode) starts with
//! an 8-byte header:
//! - A 2-byte big-endian protocol version
//! - A 1-byte sequence number and a 1-byte physical port
//! - The 15-bit port-address, low byte (sub-net/universe) first, then net
//! - A 2-byte big-endian channel count
//!
//! followed by up to 512 channel values. Frames addressed to another
//! port-address decode to [`Decoded::Skip`], which is not an error.

pub mod codec;
pub mod error;

pub use codec::{
    decode_dmx, encode_dmx, port_address, Decoded, Frame, HEADER_SIZE, MAX_CHANNELS,
    PROTOCOL_VERSION,
};
pub use error::{FrameError, Result};
