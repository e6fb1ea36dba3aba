//! `ehr-merge` entry point.

use std::io::{self, IsTerminal};

use clap::{ColorChoice, Parser};
use tracing::error;
use tracing::level_filters::LevelFilter;

use ehr_cli::cli::{Cli, Command, LogFormatArg, LogLevelArg};
use ehr_cli::commands::{run_features, run_merge, run_sources};
use ehr_cli::logging::{LogConfig, LogFormat, init_logging};
use ehr_cli::summary::{print_feature_summary, print_merge_summary};

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }
    let result = match &cli.command {
        Command::Merge(args) => run_merge(args, cli.log_data).map(|output| {
            print_merge_summary(&output);
        }),
        Command::Sources(args) => run_sources(args),
        Command::Features(args) => run_features(args).map(|summary| {
            print_feature_summary(&summary);
        }),
    };
    let exit_code = match result {
        Ok(()) => 0,
        Err(err) => {
            error!(error = %format!("{err:#}"), "command failed");
            eprintln!("error: {err:#}");
            1
        }
    };
    std::process::exit(exit_code);
}

/// Build logging configuration from CLI flags with consistent precedence.
fn log_config_from_cli(cli: &Cli) -> LogConfig {
    let mut config = LogConfig {
        level_filter: cli.verbosity.tracing_level_filter(),
        ..LogConfig::default()
    };
    config.use_env_filter = !(cli.verbosity.is_present() || cli.log_level.is_some());
    if let Some(level) = cli.log_level {
        config.level_filter = match level {
            LogLevelArg::Error => LevelFilter::ERROR,
            LogLevelArg::Warn => LevelFilter::WARN,
            LogLevelArg::Info => LevelFilter::INFO,
            LogLevelArg::Debug => LevelFilter::DEBUG,
            LogLevelArg::Trace => LevelFilter::TRACE,
        };
    }
    config.format = match cli.log_format {
        LogFormatArg::Pretty => LogFormat::Pretty,
        LogFormatArg::Compact => LogFormat::Compact,
        LogFormatArg::Json => LogFormat::Json,
    };
    config.log_file = cli.log_file.clone();
    config.with_ansi = match cli.color.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => cli.log_file.is_none() && io::stderr().is_terminal(),
    };
    config
}
