use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use tidemark_core::error::{MigrateError, Result};
use tidemark_core::migration::{Catalogue, Lexicographic, MigrationId, MigrationOrdering};

use super::script::parse_migration;

/// Load the migration catalogue from a directory.
///
/// Migrations should be named like:
/// - `0001_create_users.sql`
/// - `0002_add_posts.sql`
///
/// Only regular files with the given extension are considered; the file name
/// minus the extension is the unit identifier. Units are sorted with
/// `ordering`.
pub fn load_catalogue(
    dir: &Path,
    extension: &str,
    ordering: Arc<dyn MigrationOrdering>,
) -> Result<Catalogue> {
    let entries = std::fs::read_dir(dir).map_err(|e| match e.kind() {
        ErrorKind::NotFound => MigrateError::DirectoryNotFound(dir.to_path_buf()),
        _ => MigrateError::DirectoryUnreadable {
            path: dir.to_path_buf(),
            source: e,
        },
    })?;

    let unreadable = |source: std::io::Error| MigrateError::DirectoryUnreadable {
        path: dir.to_path_buf(),
        source,
    };

    let mut units = Vec::new();
    for entry in entries {
        let entry = entry.map_err(unreadable)?;
        let path = entry.path();

        // Follows symlinks, so a linked migration file still counts.
        let metadata = std::fs::metadata(&path).map_err(unreadable)?;
        if !metadata.is_file() {
            continue;
        }

        let Some(id) = entry
            .file_name()
            .to_str()
            .and_then(|name| MigrationId::from_file_name(name, extension))
        else {
            debug!("Ignoring non-migration file {:?}", path);
            continue;
        };

        let content = std::fs::read_to_string(&path).map_err(unreadable)?;
        let unit = parse_migration(id, &content)?.with_source(path);
        units.push(unit);
    }

    let catalogue = Catalogue::new(units, ordering)?;
    debug!("Loaded {} migrations from {:?}", catalogue.len(), dir);
    Ok(catalogue)
}

/// Load with the default `.sql` extension and lexicographic ordering.
pub fn load_migrations_from_dir(dir: &Path) -> Result<Catalogue> {
    load_catalogue(dir, "sql", Arc::new(Lexicographic))
}
