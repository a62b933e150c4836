use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::trace;

use crate::error::{FrameError, Result};

/// ArtDmx header: version (2) + sequence (1) + physical (1) + sub-net (1) + net (1) + length (2).
pub const HEADER_SIZE: usize = 8;

/// Channel values in one DMX universe.
pub const MAX_CHANNELS: usize = 512;

/// Art-Net protocol revision written by [`encode_dmx`].
pub const PROTOCOL_VERSION: u16 = 14;

/// A decoded ArtDmx frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Protocol version reported by the sender.
    pub version: u16,
    /// Sender sequence number; wraps, 0 means sequencing is disabled.
    pub sequence: u8,
    /// Physical input port on the sender.
    pub physical: u8,
    /// Low byte of the port-address (sub-net and universe nibbles).
    pub subnet: u8,
    /// High byte of the port-address.
    pub net: u8,
    /// Channel count announced in the header.
    pub length: u16,
    /// Channel values; channel 1 is `data[0]`.
    pub data: Bytes,
}

impl Frame {
    /// The 15-bit port-address this frame targets.
    pub fn port_address(&self) -> u16 {
        port_address(self.subnet, self.net)
    }

    /// Value of a 1-based channel, or `None` when the frame does not carry it.
    pub fn channel(&self, channel: u16) -> Option<u8> {
        let index = usize::from(channel).checked_sub(1)?;
        self.data.get(index).copied()
    }
}

/// Outcome of decoding an ArtDmx body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// The frame targets the configured port-address.
    Frame(Frame),
    /// The frame targets another port-address and was ignored.
    Skip { port_address: u16 },
}

/// Combine sub-net and net bytes into a port-address.
pub fn port_address(subnet: u8, net: u8) -> u16 {
    u16::from(subnet) + (u16::from(net) << 8)
}

/// Decode an ArtDmx body addressed to `expected_port`.
///
/// Wire format:
/// ```text
/// ┌──────────┬─────┬──────┬────────┬─────┬──────────┬───────────────┐
/// │ Version  │ Seq │ Phys │ SubUni │ Net │ Length   │ Channel data  │
/// │ (2B BE)  │ 1B  │ 1B   │ 1B     │ 1B  │ (2B BE)  │ (rest)        │
/// └──────────┴─────┴──────┴────────┴─────┴──────────┴───────────────┘
/// ```
///
/// The channel data is not checked against `Length`; callers read channels
/// through [`Frame::channel`] and choose their own default for missing ones.
pub fn decode_dmx(raw: &[u8], expected_port: u16) -> Result<Decoded> {
    if raw.len() < HEADER_SIZE {
        return Err(FrameError::Malformed {
            len: raw.len(),
            min: HEADER_SIZE,
        });
    }

    let mut header = &raw[..HEADER_SIZE];
    // Version and length are big-endian while the port-address is low byte first.
    let version = header.get_u16();
    let sequence = header.get_u8();
    let physical = header.get_u8();
    let subnet = header.get_u8();
    let net = header.get_u8();
    let length = header.get_u16();

    let address = port_address(subnet, net);
    if address != expected_port {
        trace!(port_address = address, expected_port, "skipping frame for other port");
        return Ok(Decoded::Skip {
            port_address: address,
        });
    }

    Ok(Decoded::Frame(Frame {
        version,
        sequence,
        physical,
        subnet,
        net,
        length,
        data: Bytes::copy_from_slice(&raw[HEADER_SIZE..]),
    }))
}

/// Encode an ArtDmx body.
///
/// Odd channel counts are padded with a trailing zero, as Art-Net requires an
/// even length of at least 2.
pub fn encode_dmx(
    sequence: u8,
    physical: u8,
    port_address: u16,
    data: &[u8],
    dst: &mut BytesMut,
) -> Result<()> {
    if data.len() > MAX_CHANNELS {
        return Err(FrameError::TooManyChannels {
            count: data.len(),
            max: MAX_CHANNELS,
        });
    }

    let padded = (data.len() + data.len() % 2).max(2);
    let [subnet, net] = port_address.to_le_bytes();

    dst.reserve(HEADER_SIZE + padded);
    dst.put_u16(PROTOCOL_VERSION);
    dst.put_u8(sequence);
    dst.put_u8(physical);
    dst.put_u8(subnet);
    dst.put_u8(net);
    dst.put_u16(padded as u16);
    dst.put_slice(data);
    dst.put_bytes(0, padded - data.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(version: u16, sequence: u8, subnet: u8, net: u8, length: u16) -> Vec<u8> {
        let mut raw = Vec::new();
        raw.extend_from_slice(&version.to_be_bytes());
        raw.push(sequence);
        raw.push(0);
        raw.push(subnet);
        raw.push(net);
        raw.extend_from_slice(&length.to_be_bytes());
        raw
    }

    #[test]
    fn decodes_header_fields_with_swapped_words() {
        let mut raw = header(14, 1, 0, 0, 8);
        raw.extend_from_slice(&[255, 0, 0, 128, 0, 0, 0, 0]);

        let frame = match decode_dmx(&raw, 0).unwrap() {
            Decoded::Frame(frame) => frame,
            other => panic!("expected frame, got {other:?}"),
        };

        assert_eq!(frame.version, 14);
        assert_eq!(frame.sequence, 1);
        assert_eq!(frame.length, 8);
        assert_eq!(frame.port_address(), 0);
        assert_eq!(frame.data.as_ref(), &[255, 0, 0, 128, 0, 0, 0, 0]);
    }

    #[test]
    fn version_bytes_are_big_endian() {
        // 0x000e on the wire; a little-endian read would give 0x0e00.
        let raw = [0x00, 0x0e, 0, 0, 0, 0, 0x02, 0x00];
        let Decoded::Frame(frame) = decode_dmx(&raw, 0).unwrap() else {
            panic!("expected frame");
        };
        assert_eq!(frame.version, 14);
        assert_eq!(frame.length, 512);
    }

    #[test]
    fn short_input_is_malformed() {
        for len in 0..HEADER_SIZE {
            let raw = vec![0u8; len];
            let err = decode_dmx(&raw, 0).unwrap_err();
            assert!(matches!(err, FrameError::Malformed { min: HEADER_SIZE, .. }));
        }
    }

    #[test]
    fn other_port_address_is_skipped() {
        let raw = header(14, 3, 1, 0, 0);
        assert_eq!(
            decode_dmx(&raw, 0).unwrap(),
            Decoded::Skip { port_address: 1 }
        );

        let raw = header(14, 3, 0, 1, 0);
        assert_eq!(
            decode_dmx(&raw, 0).unwrap(),
            Decoded::Skip { port_address: 256 }
        );
    }

    #[test]
    fn net_is_the_high_byte_of_the_port_address() {
        let mut raw = header(14, 0, 0x12, 0x03, 2);
        raw.extend_from_slice(&[7, 7]);
        assert!(matches!(decode_dmx(&raw, 0x0312).unwrap(), Decoded::Frame(_)));
    }

    #[test]
    fn header_only_frame_has_no_channels() {
        let raw = header(14, 0, 0, 0, 512);
        let Decoded::Frame(frame) = decode_dmx(&raw, 0).unwrap() else {
            panic!("expected frame");
        };
        assert!(frame.data.is_empty());
        assert_eq!(frame.channel(1), None);
    }

    #[test]
    fn channel_lookup_is_one_based() {
        let mut raw = header(14, 0, 0, 0, 4);
        raw.extend_from_slice(&[10, 20, 30, 40]);
        let Decoded::Frame(frame) = decode_dmx(&raw, 0).unwrap() else {
            panic!("expected frame");
        };
        assert_eq!(frame.channel(0), None);
        assert_eq!(frame.channel(1), Some(10));
        assert_eq!(frame.channel(4), Some(40));
        assert_eq!(frame.channel(5), None);
    }

    #[test]
    fn encoded_frame_decodes_on_its_port() {
        let mut buf = BytesMut::new();
        encode_dmx(9, 0, 0x0105, &[1, 2, 3], &mut buf).unwrap();

        assert_eq!(buf.len(), HEADER_SIZE + 4);
        assert_eq!(
            decode_dmx(&buf, 0).unwrap(),
            Decoded::Skip {
                port_address: 0x0105
            }
        );

        let Decoded::Frame(frame) = decode_dmx(&buf, 0x0105).unwrap() else {
            panic!("expected frame");
        };
        assert_eq!(frame.version, PROTOCOL_VERSION);
        assert_eq!(frame.sequence, 9);
        assert_eq!(frame.length, 4);
        assert_eq!(frame.data.as_ref(), &[1, 2, 3, 0]);
    }

    #[test]
    fn encode_rejects_oversized_universe() {
        let mut buf = BytesMut::new();
        let err = encode_dmx(0, 0, 0, &[0u8; 513], &mut buf).unwrap_err();
        assert!(matches!(err, FrameError::TooManyChannels { count: 513, max: 512 }));
    }
}
