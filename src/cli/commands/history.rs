//! History and Purge commands.

use std::path::Path;

use anyhow::Context;

use crate::archive::VersionedArchive;
use crate::config::{ArchiveBackend, Settings};
use crate::host::open_archive;
use crate::types::ResourceId;

fn open(settings: &Settings) -> anyhow::Result<VersionedArchive> {
    if settings.archive.backend == ArchiveBackend::Memory {
        eprintln!("Warning: archive backend is 'memory'; nothing persists between runs.");
    }
    open_archive(&settings.archive).with_context(|| {
        format!(
            "failed to open archive at {}",
            settings.archive.path.display()
        )
    })
}

/// Run history command - print archived versions as JSON.
///
/// Without a path, prints one summary per archived file.
pub fn run_history(settings: &Settings, path: Option<&Path>) -> anyhow::Result<()> {
    let archive = open(settings)?;

    let json = match path {
        Some(path) => {
            let versions = archive.query(&ResourceId::from(path))?;
            serde_json::to_string_pretty(&versions)?
        }
        None => serde_json::to_string_pretty(&archive.resources()?)?,
    };
    println!("{json}");
    Ok(())
}

/// Run purge command - delete a file's archived versions.
pub fn run_purge(settings: &Settings, path: &Path) -> anyhow::Result<()> {
    let archive = open(settings)?;
    let resource = ResourceId::from(path);

    let removed = archive.delete_versions(&resource)?;
    let current = archive.current_version(&resource)?;
    println!(
        "Removed {removed} version(s) of {resource}; numbering continues after v{current}"
    );
    Ok(())
}
