use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::exit::{io_error, CliResult};
use crate::output::OutputFormat;

pub mod map;
pub mod run;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Drive the configured fixtures from incoming Art-Net until Ctrl-C.
    Run(RunArgs),
    /// Print and validate the channel map of a configuration.
    Map(MapArgs),
    /// Send a single ArtDmx frame.
    Send(SendArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Run(args) => run::run(args),
        Command::Map(args) => map::run(args, format),
        Command::Send(args) => send::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Runtime for the commands that do network I/O.
pub(crate) fn runtime() -> CliResult<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| io_error("failed to start async runtime", err))
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Bridge configuration file (JSON).
    #[arg(long, short = 'c', value_name = "FILE", env = "ARTGLOW_CONFIG")]
    pub config: PathBuf,
    /// Log fixture commands instead of talking to real fixtures.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct MapArgs {
    /// Bridge configuration file (JSON).
    #[arg(long, short = 'c', value_name = "FILE", env = "ARTGLOW_CONFIG")]
    pub config: PathBuf,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Destination `ip` or `ip:port` (port defaults to 6454).
    pub target: String,
    /// Channel values starting at channel 1 (comma-separated).
    #[arg(long, value_delimiter = ',', required = true, num_args = 1..)]
    pub channels: Vec<u8>,
    /// Port-address to send to.
    #[arg(long, default_value = "0")]
    pub port_address: u16,
    /// Sequence number (0 disables sequencing).
    #[arg(long, default_value = "0")]
    pub sequence: u8,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
