use clap::Parser;
use nexinit_mock::NexusState;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "nexinit-mock", about = "In-memory Nexus administrative API for local testing")]
struct Cli {
    /// Port to listen on.
    #[arg(long, default_value_t = 8081)]
    port: u16,

    /// Number of status probes answered with 503 before reporting ready.
    #[arg(long, default_value_t = 0)]
    warmup: u32,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let addr = format!("0.0.0.0:{}", cli.port);
    info!("starting nexinit-mock on {addr}");

    let state = NexusState::new().with_warmup(cli.warmup);
    if let Err(e) = nexinit_mock::run_server(&state, &addr) {
        error!("server failed: {e}");
        std::process::exit(1);
    }
}
