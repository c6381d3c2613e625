//! Watch command: poll files until interrupted.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, bail};

use crate::config::Settings;
use crate::host::WatchHost;
use crate::notifier::{FnHandler, HandlerError, LogSubscriber};
use crate::types::{ChangeEvent, Owner, ResourceId};

/// Options for `tabwatch watch`.
#[derive(Debug, Clone)]
pub struct WatchOptions {
    pub paths: Vec<PathBuf>,
    pub interval: Option<u64>,
    pub no_archive: bool,
}

/// Build a host with every configured and requested watch running.
///
/// Each change is printed to stdout as one JSON line.
pub fn start_watches(settings: &Settings, options: &WatchOptions) -> anyhow::Result<WatchHost> {
    let interval = match options.interval {
        Some(0) => bail!("--interval must be at least 1 second"),
        Some(secs) => Duration::from_secs(secs),
        None => settings.watch.default_interval(),
    };

    let mut host = WatchHost::from_settings(settings).with_context(|| {
        format!(
            "failed to open archive at {}",
            settings.archive.path.display()
        )
    })?;
    if options.no_archive {
        host.disable_archiving();
    }

    host.notifier().subscribe(LogSubscriber::new());
    host.notifier().subscribe(FnHandler::new("stdout", |event: &ChangeEvent| {
        let line = serde_json::to_string(event).map_err(|e| HandlerError::failed("stdout", e))?;
        println!("{line}");
        Ok(())
    }));

    let mut started = host.load_configured_watches(settings).len();

    let owner = Owner::new(settings.watch.owner.clone());

    for path in &options.paths {
        let resource = ResourceId::from(path.as_path());
        let description = format!("Watcher for {}", path.display());
        match host.watch(&owner, resource, interval, description) {
            Ok(_) => started += 1,
            Err(e) => eprintln!("Skipping {}: {e}", path.display()),
        }
    }

    if started == 0 {
        bail!("nothing to watch: pass file paths or add [[watch.resources]] to settings.toml");
    }

    eprintln!(
        "Watching {started} file(s), archive: {}",
        if options.no_archive {
            "off"
        } else {
            host.archive().store_name()
        }
    );
    Ok(host)
}

/// Run watch command - poll until Ctrl-C, then stop every loop.
pub async fn run_watch(settings: &Settings, options: WatchOptions) -> anyhow::Result<()> {
    let host = start_watches(settings, &options)?;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;

    eprintln!("Stopping watchers...");
    host.shutdown().await;
    Ok(())
}
