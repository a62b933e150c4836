mod cmd;
mod config;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "artglow", version, about = "Art-Net to networked fixture bridge")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_subcommand() {
        let cli = Cli::try_parse_from(["artglow", "run", "--config", "bridge.json", "--dry-run"])
            .expect("run args should parse");

        match cli.command {
            Command::Run(args) => {
                assert!(args.dry_run);
                assert_eq!(args.config, std::path::PathBuf::from("bridge.json"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_send_channel_list() {
        let cli = Cli::try_parse_from([
            "artglow",
            "send",
            "127.0.0.1",
            "--channels",
            "255,0,0,128",
            "--port-address",
            "3",
        ])
        .expect("send args should parse");

        match cli.command {
            Command::Send(args) => {
                assert_eq!(args.channels, vec![255, 0, 0, 128]);
                assert_eq!(args.port_address, 3);
                assert_eq!(args.sequence, 0);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn channel_values_must_fit_a_byte() {
        let err = Cli::try_parse_from(["artglow", "send", "127.0.0.1", "--channels", "256"])
            .expect_err("out of range channel should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn send_requires_channels() {
        let err = Cli::try_parse_from(["artglow", "send", "127.0.0.1"])
            .expect_err("missing channels should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }
}
