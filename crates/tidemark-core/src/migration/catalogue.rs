use std::collections::HashMap;
use std::sync::Arc;

use super::{Lexicographic, MigrationId, MigrationOrdering, MigrationUnit};
use crate::error::{MigrateError, Result};

/// Ordered, duplicate-free set of migration units.
#[derive(Debug, Clone)]
pub struct Catalogue {
    units: Vec<MigrationUnit>,
    index: HashMap<MigrationId, usize>,
    ordering: Arc<dyn MigrationOrdering>,
}

impl Catalogue {
    /// Build a catalogue, sorting units ascending with `ordering`.
    pub fn new(mut units: Vec<MigrationUnit>, ordering: Arc<dyn MigrationOrdering>) -> Result<Self> {
        units.sort_by(|a, b| ordering.compare(&a.id, &b.id));

        let mut index = HashMap::with_capacity(units.len());
        for (pos, unit) in units.iter().enumerate() {
            if index.insert(unit.id.clone(), pos).is_some() {
                return Err(MigrateError::DuplicateMigration(unit.id.to_string()));
            }
        }

        Ok(Self {
            units,
            index,
            ordering,
        })
    }

    /// Build a catalogue with the default lexicographic ordering.
    pub fn lexicographic(units: Vec<MigrationUnit>) -> Result<Self> {
        Self::new(units, Arc::new(Lexicographic))
    }

    pub fn empty() -> Self {
        Self {
            units: Vec::new(),
            index: HashMap::new(),
            ordering: Arc::new(Lexicographic),
        }
    }

    pub fn ordering(&self) -> &dyn MigrationOrdering {
        self.ordering.as_ref()
    }

    pub fn ordering_handle(&self) -> Arc<dyn MigrationOrdering> {
        Arc::clone(&self.ordering)
    }

    /// Units in ascending order.
    pub fn iter(&self) -> std::slice::Iter<'_, MigrationUnit> {
        self.units.iter()
    }

    pub fn ids(&self) -> impl DoubleEndedIterator<Item = &MigrationId> {
        self.units.iter().map(|u| &u.id)
    }

    pub fn get(&self, id: &str) -> Option<&MigrationUnit> {
        self.index.get(id).map(|&pos| &self.units[pos])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn latest(&self) -> Option<&MigrationUnit> {
        self.units.last()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

impl<'a> IntoIterator for &'a Catalogue {
    type Item = &'a MigrationUnit;
    type IntoIter = std::slice::Iter<'a, MigrationUnit>;

    fn into_iter(self) -> Self::IntoIter {
        self.units.iter()
    }
}
