use anyhow::Context;
use clap::Parser;
use tracing::info;

use app_audio_switcher::cli::{Cli, Commands, init_config};
use app_audio_switcher::config::Config;
use app_audio_switcher::host::{self, StdioHost};
use app_audio_switcher::logging;
use app_audio_switcher::plugin::Plugin;
use app_audio_switcher::switcher;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = &cli.config;

    if cli.command() == Commands::Init {
        return init_config(config_path);
    }

    logging::init();
    let config = Config::load_or_default(config_path)
        .with_context(|| format!("Failed to load config from '{}'", config_path))?;

    match cli.command() {
        Commands::Switch { process, device } => {
            let program = config.resolved_worker_path();
            switcher::switch_app_device(&program, process, &device)
                .await
                .with_context(|| format!("Failed to switch process {} to '{}'", process, device))?;
        }
        Commands::Run | Commands::Init => {
            info!(worker = %config.resolved_worker_path().display(), endpoint = %config.endpoint(), "starting plugin");
            let events = host::spawn_event_reader(tokio::io::stdin());
            let plugin = Plugin::new(&config, StdioHost::new(std::io::stdout()));
            plugin.run(events).await;
        }
    }

    Ok(())
}
