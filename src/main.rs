use clap::Parser;

use tabwatch::Settings;
use tabwatch::cli::commands::{history, init, watch};
use tabwatch::cli::{Cli, Commands};
use tabwatch::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::Init { force, paths } = &cli.command {
        return init::run_init(*force, paths);
    }

    let config = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    }
    .unwrap_or_else(|e| {
        eprintln!("Configuration error: {e}");
        eprintln!("Using default configuration for now.");
        Settings::default()
    });

    logging::init_with_config(&config.logging);

    match cli.command {
        Commands::Init { .. } => unreachable!("handled above"),
        Commands::Config => init::run_config(&config),
        Commands::Watch {
            paths,
            interval,
            no_archive,
        } => {
            let options = watch::WatchOptions {
                paths,
                interval,
                no_archive,
            };
            watch::run_watch(&config, options).await?;
        }
        Commands::History { path } => history::run_history(&config, path.as_deref())?,
        Commands::Purge { path } => history::run_purge(&config, &path)?,
    }

    Ok(())
}
