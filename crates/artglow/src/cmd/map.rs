use artglow_bridge::ChannelMap;

use crate::cmd::MapArgs;
use crate::config::Settings;
use crate::exit::{bridge_error, CliResult, SUCCESS};
use crate::output::{print_map, OutputFormat};

pub fn run(args: MapArgs, format: OutputFormat) -> CliResult<i32> {
    let settings = Settings::load(&args.config)?;
    let fixtures = settings.plan()?;
    let map = ChannelMap::layout(
        fixtures.iter().map(|fixture| (fixture.id.clone(), fixture.dmx_start)),
        settings.channels_per_fixture,
    );

    let validation = map.validate();
    let message = validation.as_ref().err().map(ToString::to_string);
    print_map(
        &map,
        &fixtures,
        settings.port_address,
        message.as_deref(),
        format,
    );

    validation.map_err(|err| bridge_error("invalid channel map", err))?;
    Ok(SUCCESS)
}
