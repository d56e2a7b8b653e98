use std::borrow::Borrow;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Identifier of a migration unit, derived from its file name.
///
/// Identifiers carry no ordering of their own. Comparisons go through a
/// [`MigrationOrdering`](super::MigrationOrdering) so the catalogue and the
/// sequencer always agree on what "earlier" means.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MigrationId(String);

impl MigrationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derive an identifier from a file name carrying the given extension.
    ///
    /// The extension is matched case-insensitively. Returns `None` when the
    /// name has a different extension or nothing is left once it is removed.
    pub fn from_file_name(file_name: &str, extension: &str) -> Option<Self> {
        let path = Path::new(file_name);
        let ext = path.extension()?.to_str()?;
        if !ext.eq_ignore_ascii_case(extension) {
            return None;
        }
        let stem = path.file_stem()?.to_str()?;
        if stem.is_empty() {
            return None;
        }
        Some(Self(stem.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for MigrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for MigrationId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for MigrationId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MigrationId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for MigrationId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl PartialEq<str> for MigrationId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for MigrationId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
