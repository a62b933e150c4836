use bytes::{BufMut, BytesMut};

use crate::error::{Result, TransportError};

/// Packet ID carried by every Art-Net datagram.
pub const ARTNET_ID: [u8; 8] = *b"Art-Net\0";

/// Well-known Art-Net UDP port.
pub const ARTNET_PORT: u16 = 6454;

/// Packet ID (8) + OpCode (2) = 10 bytes.
pub const PACKET_HEADER_SIZE: usize = 10;

/// Node discovery request.
pub const OP_POLL: u16 = 0x2000;

/// Node discovery reply.
pub const OP_POLL_REPLY: u16 = 0x2100;

/// DMX channel data (ArtDmx).
pub const OP_DMX: u16 = 0x5000;

/// Output synchronisation (ArtSync).
pub const OP_SYNC: u16 = 0x5200;

/// Returns a human-readable name for an OpCode.
pub fn op_name(opcode: u16) -> &'static str {
    match opcode {
        OP_POLL => "OpPoll",
        OP_POLL_REPLY => "OpPollReply",
        OP_DMX => "OpDmx",
        OP_SYNC => "OpSync",
        _ => "OpOther",
    }
}

/// Split an Art-Net datagram into its OpCode and body.
///
/// ```text
/// ┌────────────────────┬────────────┬──────────────────┐
/// │ ID (8B)            │ OpCode     │ Body             │
/// │ "Art-Net\0"        │ (2B LE)    │ (rest of packet) │
/// └────────────────────┴────────────┴──────────────────┘
/// ```
pub fn split_packet(datagram: &[u8]) -> Result<(u16, &[u8])> {
    if datagram.len() < PACKET_HEADER_SIZE {
        return Err(TransportError::TooShort {
            len: datagram.len(),
            min: PACKET_HEADER_SIZE,
        });
    }

    if datagram[..8] != ARTNET_ID {
        return Err(TransportError::InvalidId);
    }

    let opcode = u16::from_le_bytes([datagram[8], datagram[9]]);
    Ok((opcode, &datagram[PACKET_HEADER_SIZE..]))
}

/// Encode an Art-Net datagram (ID + OpCode + body).
pub fn encode_packet(opcode: u16, body: &[u8], dst: &mut BytesMut) {
    dst.reserve(PACKET_HEADER_SIZE + body.len());
    dst.put_slice(&ARTNET_ID);
    dst.put_u16_le(opcode);
    dst.put_slice(body);
}
