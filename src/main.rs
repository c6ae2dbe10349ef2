use anyhow::Result;
use clap::Parser;
use gaia::app::App;
use gaia::cli::{broadcast_language, run_command, Cli};
use gaia::config::Config;
use gaia::logging;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    cli.apply(&mut config);
    config.validate()?;

    if let Some(command) = cli.command {
        logging::init_stderr();
        return run_command(command, &config).await;
    }

    let log_path = config
        .ui
        .log_file
        .clone()
        .unwrap_or_else(Config::default_log_path);
    logging::init_file(&log_path)?;
    tracing::info!(api = %config.api.base_url, "starting dashboard");

    let location = config.broadcast.location();
    let lang = broadcast_language(&config);
    let mut app = App::new(config, location, lang)?;
    app.run().await
}
