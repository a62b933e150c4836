use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("artglow {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: artglow");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("ARTGLOW_BUILD_TARGET").unwrap_or("unknown")
    );
    println!(
        "profile: {}",
        option_env!("ARTGLOW_BUILD_PROFILE").unwrap_or("unknown")
    );
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!(
        "art-net: port {}, protocol version {}",
        artglow_transport::ARTNET_PORT,
        artglow_frame::PROTOCOL_VERSION
    );
    println!("fixtures: yeelight (port {})", artglow_fixture::DEFAULT_PORT);

    Ok(SUCCESS)
}
