use std::net::{IpAddr, SocketAddr};

use artglow_frame::encode_dmx;
use artglow_transport::{ArtNetSender, ARTNET_PORT, OP_DMX};
use bytes::BytesMut;

use crate::cmd::{runtime, SendArgs};
use crate::exit::{frame_error, transport_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_sent, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let target = parse_target(&args.target)?;
    if args.port_address > 0x7fff {
        return Err(CliError::new(
            USAGE,
            format!("port-address must be at most 32767, got {}", args.port_address),
        ));
    }

    let mut body = BytesMut::new();
    encode_dmx(args.sequence, 0, args.port_address, &args.channels, &mut body)
        .map_err(|err| frame_error("cannot encode frame", err))?;

    runtime()?.block_on(async {
        let mut sender = ArtNetSender::connect(target)
            .await
            .map_err(|err| transport_error("failed to open socket", err))?;
        sender
            .send(OP_DMX, &body)
            .await
            .map_err(|err| transport_error("send failed", err))
    })?;

    print_sent(
        target,
        args.port_address,
        args.sequence,
        args.channels.len(),
        format,
    );
    Ok(SUCCESS)
}

fn parse_target(input: &str) -> CliResult<SocketAddr> {
    if let Ok(addr) = input.parse::<SocketAddr>() {
        return Ok(addr);
    }
    input
        .parse::<IpAddr>()
        .map(|ip| SocketAddr::new(ip, ARTNET_PORT))
        .map_err(|_| CliError::new(USAGE, format!("invalid target address: {input}")))
}
