mod commands;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::{EXIT_CONFIG_ERROR, EXIT_FAILURE};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "nexinit",
    version,
    about = "Idempotent bootstrap provisioner for Nexus repository managers"
)]
struct Cli {
    /// Base configuration file (default: ./config.json or ./config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output logs and results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    /// Defaults to `provision`.
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Wait for the server, then create or complete every configured resource.
    Provision,
    /// Block until the server answers its status endpoint.
    Wait,
    /// Print the effective configuration with credentials redacted.
    Config,
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

fn init_logging(cli: &Cli) {
    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_env("NEXINIT_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if cli.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn exit_code_for(msg: &str) -> u8 {
    if msg.starts_with("config error:")
        || msg.starts_with("failed to read config")
        || msg.starts_with("failed to parse config")
    {
        EXIT_CONFIG_ERROR
    } else {
        EXIT_FAILURE
    }
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();
    init_logging(&cli);

    let config_path = cli.config.as_deref();
    let json_output = cli.json;

    let result = match cli.command.unwrap_or(Commands::Provision) {
        Commands::Provision => commands::provision::run(config_path, json_output),
        Commands::Wait => commands::wait::run(config_path, json_output),
        Commands::Config => commands::config::run(config_path),
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            ExitCode::from(exit_code_for(&msg))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_provision() {
        let cli = Cli::try_parse_from(["nexinit"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["nexinit", "wait", "--json", "--config", "c.toml"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.config, Some(PathBuf::from("c.toml")));
        assert!(matches!(cli.command, Some(Commands::Wait)));
    }

    #[test]
    fn config_failures_map_to_config_exit_code() {
        assert_eq!(
            exit_code_for("config error: address must not be empty"),
            EXIT_CONFIG_ERROR
        );
        assert_eq!(
            exit_code_for("failed to parse config 'config.json': expected value"),
            EXIT_CONFIG_ERROR
        );
        assert_eq!(
            exit_code_for("remote error: read blob store 'docker' returned unexpected status 500: "),
            EXIT_FAILURE
        );
        assert_eq!(
            exit_code_for("reconcile error: blob store 'docker' still absent after 1 accepted creation attempt(s)"),
            EXIT_FAILURE
        );
    }
}
