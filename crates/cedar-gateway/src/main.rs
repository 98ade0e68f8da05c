//! Cedar Gateway - HTTP API for the Ego/Superego mirror

use cedar_core::{AuthMode, BindMode};
use cedar_gateway::{start_gateway, CedarConfig};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "cedar", about = "Cedar: Ego/Superego conversation gateway")]
struct Cli {
    /// Config file (TOML)
    #[arg(short, long, default_value = "cedar.toml", global = true)]
    config: PathBuf,
    /// Print the effective configuration and exit
    #[arg(long)]
    dump_config: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway (default)
    Serve {
        #[arg(short, long)]
        port: Option<u16>,
        /// `loopback` or `lan`
        #[arg(short, long)]
        bind: Option<String>,
        /// Require this bearer token on /api routes
        #[arg(short, long)]
        token: Option<String>,
        #[arg(long)]
        no_auth: bool,
    },
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cedar=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = CedarConfig::load(&cli.config);
    config.apply_env();

    if cli.dump_config {
        let mut shown = config.clone();
        if shown.llm.api_key.is_some() {
            shown.llm.api_key = Some("<redacted>".into());
        }
        if shown.server.auth.token.is_some() {
            shown.server.auth.token = Some("<redacted>".into());
        }
        print!("{}", shown.to_toml());
        return Ok(());
    }

    match cli.command {
        Some(Commands::Version) => {
            println!("cedar v{}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Serve {
            port,
            bind,
            token,
            no_auth,
        }) => {
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(bind) = bind {
                config.server.bind = match bind.as_str() {
                    "loopback" | "localhost" | "127.0.0.1" => BindMode::Loopback,
                    _ => BindMode::Lan,
                };
            }
            if token.is_some() {
                config.server.auth.token = token;
            }
            if no_auth {
                config.server.auth.mode = AuthMode::None;
                config.server.auth.token = None;
            }
            start_gateway(config).await?;
        }
        None => start_gateway(config).await?,
    }

    Ok(())
}
