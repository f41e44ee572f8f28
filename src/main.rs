use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use line_relay::db::{self, HistoryRepo};
use line_relay::{ApiServer, ApiState, Config, GeminiClient, LineChannel, MessageHandler};

/// LINE Relay - LINE webhook bot backed by Gemini
#[derive(Parser)]
#[command(name = "line-relay", version, about)]
struct Cli {
    /// Port to listen on (overrides PORT and the config file)
    #[arg(long)]
    port: Option<u16>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,line_relay=info",
        1 => "info,line_relay=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load()?;
    tracing::debug!(?config, "loaded configuration");

    let port = cli.port.unwrap_or(config.server.port);

    let channel = Arc::new(LineChannel::new(config.line.channel_token));
    let gemini = GeminiClient::new(config.gemini.api_key, config.gemini.model);
    tracing::debug!(model = gemini.model(), "Gemini client ready");
    let model = Arc::new(gemini);

    let mut handler = MessageHandler::new(channel, model);
    if let Some(path) = &config.database_path {
        let pool = db::init(path)?;
        handler = handler
            .with_history(HistoryRepo::new(pool))
            .describe_images(config.describe_images);
    } else if config.describe_images {
        tracing::warn!("image description needs DATABASE_PATH, ignoring");
    }

    tracing::info!(
        port,
        history = handler.has_history(),
        describe_images = config.describe_images,
        "starting line relay"
    );

    let state = ApiState {
        channel_secret: config.line.channel_secret,
        handler,
    };

    ApiServer::new(state, port).run().await?;

    Ok(())
}
