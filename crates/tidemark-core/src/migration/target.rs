use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use super::MigrationId;

/// Version a run should bring the database to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Target {
    /// Apply every unit not yet applied.
    #[default]
    Latest,
    /// Bring the database to exactly this unit.
    Version(MigrationId),
}

impl Target {
    /// Parse an optional version argument. Absent or blank means latest.
    pub fn from_arg(version: Option<&str>) -> Self {
        match version.map(str::trim) {
            None | Some("") => Target::Latest,
            Some(v) => Target::Version(MigrationId::new(v)),
        }
    }

    pub fn is_latest(&self) -> bool {
        matches!(self, Target::Latest)
    }

    pub fn version(&self) -> Option<&MigrationId> {
        match self {
            Target::Latest => None,
            Target::Version(id) => Some(id),
        }
    }
}

impl FromStr for Target {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Target::from_arg(Some(s)))
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Latest => f.write_str("latest"),
            Target::Version(id) => write!(f, "{}", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_means_latest() {
        assert_eq!(Target::from_arg(None), Target::Latest);
        assert_eq!(Target::from_arg(Some("")), Target::Latest);
        assert_eq!("  ".parse::<Target>().unwrap(), Target::Latest);
    }

    #[test]
    fn test_explicit_version() {
        let target = Target::from_arg(Some("002_add_col"));
        assert_eq!(target.version().unwrap(), "002_add_col");
        assert!(!target.is_latest());
        assert_eq!(target.to_string(), "002_add_col");
    }
}
