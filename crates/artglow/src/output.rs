use std::io::IsTerminal;
use std::net::SocketAddr;

use artglow_bridge::ChannelMap;
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

use crate::config::PlannedFixture;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct MapOutput<'a> {
    port_address: u16,
    channels_per_fixture: u16,
    first_channel: Option<u32>,
    last_channel: Option<u32>,
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
    fixtures: Vec<FixtureOutput<'a>>,
}

#[derive(Serialize)]
struct FixtureOutput<'a> {
    id: &'a str,
    name: &'a str,
    red: u16,
    green: u16,
    blue: u16,
    brightness: u16,
}

/// Print the channel map and the outcome of validating it.
pub fn print_map(
    map: &ChannelMap,
    fixtures: &[PlannedFixture],
    port_address: u16,
    error: Option<&str>,
    format: OutputFormat,
) {
    let range = map.channel_range();
    let rows: Vec<FixtureOutput<'_>> = map
        .iter()
        .map(|mapping| FixtureOutput {
            id: mapping.id.as_str(),
            name: fixtures
                .iter()
                .find(|fixture| fixture.id == mapping.id)
                .map_or(mapping.id.as_str(), |fixture| fixture.name.as_str()),
            red: mapping.red,
            green: mapping.green,
            blue: mapping.blue,
            brightness: mapping.brightness,
        })
        .collect();

    match format {
        OutputFormat::Json => {
            let out = MapOutput {
                port_address,
                channels_per_fixture: map.channels_per_fixture(),
                first_channel: range.map(|(first, _)| first),
                last_channel: range.map(|(_, last)| last),
                valid: error.is_none(),
                error,
                fixtures: rows,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIXTURE", "NAME", "RED", "GREEN", "BLUE", "BRIGHTNESS"]);
            for row in &rows {
                table.add_row(vec![
                    row.id.to_string(),
                    row.name.to_string(),
                    row.red.to_string(),
                    row.green.to_string(),
                    row.blue.to_string(),
                    row.brightness.to_string(),
                ]);
            }
            println!("{table}");
            println!("{}", summary(port_address, range, error));
        }
        OutputFormat::Pretty => {
            for row in &rows {
                println!(
                    "{} ({}) rgb={}/{}/{} brightness={}",
                    row.id, row.name, row.red, row.green, row.blue, row.brightness
                );
            }
            println!("{}", summary(port_address, range, error));
        }
    }
}

fn summary(port_address: u16, range: Option<(u32, u32)>, error: Option<&str>) -> String {
    let channels = match range {
        Some((first, last)) => format!("channels {first}-{last}"),
        None => "no channels".to_string(),
    };
    match error {
        None => format!("port-address {port_address}, {channels}, valid"),
        Some(error) => format!("port-address {port_address}, {channels}, invalid: {error}"),
    }
}

#[derive(Serialize)]
struct SentOutput {
    target: String,
    port_address: u16,
    sequence: u8,
    channels: usize,
}

/// Report a frame sent by `artglow send`.
pub fn print_sent(
    target: SocketAddr,
    port_address: u16,
    sequence: u8,
    channels: usize,
    format: OutputFormat,
) {
    match format {
        OutputFormat::Json => {
            let out = SentOutput {
                target: target.to_string(),
                port_address,
                sequence,
                channels,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["TARGET", "PORT-ADDRESS", "SEQUENCE", "CHANNELS"])
                .add_row(vec![
                    target.to_string(),
                    port_address.to_string(),
                    sequence.to_string(),
                    channels.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "sent {channels} channels to {target} (port-address {port_address}, sequence {sequence})"
            );
        }
    }
}
