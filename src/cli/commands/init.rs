//! Init and Config commands.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};

use crate::config::{Settings, WatchedResource};

/// Default settings, plus one persistent watch per distinct path.
pub fn initial_settings(paths: &[PathBuf]) -> Settings {
    let mut settings = Settings::default();
    for path in paths {
        if settings.watch.resources.iter().any(|r| &r.path == path) {
            continue;
        }
        settings.watch.resources.push(WatchedResource {
            path: path.clone(),
            interval_secs: None,
            description: None,
        });
    }
    settings
}

/// Set up `.tabwatch` under `root`: settings file and archive directory.
pub fn init_project(root: &Path, force: bool, paths: &[PathBuf]) -> anyhow::Result<PathBuf> {
    let settings = initial_settings(paths);

    for resource in &settings.watch.resources {
        if !root.join(&resource.path).is_file() {
            eprintln!(
                "Warning: {} does not exist yet; it will be polled once it appears",
                resource.path.display()
            );
        }
    }

    let config_path = settings
        .init_config_file(root, force)
        .map_err(|e| anyhow!("{e}"))?;

    let archive_dir = root.join(&settings.archive.path);
    fs::create_dir_all(&archive_dir)
        .with_context(|| format!("failed to create {}", archive_dir.display()))?;

    Ok(config_path)
}

/// Run init command - create configuration in the current directory.
pub fn run_init(force: bool, paths: &[PathBuf]) -> anyhow::Result<()> {
    let config_path = init_project(Path::new("."), force, paths)?;

    println!("Created configuration file at: {}", config_path.display());
    match paths.len() {
        0 => println!("Add files under [[watch.resources]] to watch them on startup."),
        n => println!("{n} file(s) will be watched by `tabwatch watch`."),
    }
    Ok(())
}

/// Run config command - display current configuration.
pub fn run_config(config: &Settings) {
    println!("Current Configuration:");
    println!("{}", "=".repeat(50));
    match toml::to_string_pretty(config) {
        Ok(toml_str) => println!("{toml_str}"),
        Err(e) => eprintln!("Error displaying config: {e}"),
    }
}
