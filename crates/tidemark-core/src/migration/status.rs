use serde::Serialize;

use super::{AppliedLedger, Catalogue, LedgerEntry, MigrationId};

/// Applied/pending breakdown of a catalogue against a ledger.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MigrationStatus {
    /// Ledger entries that match a catalogue unit, in ledger order.
    pub applied: Vec<LedgerEntry>,
    /// Catalogue units not yet applied, in catalogue order.
    pub pending: Vec<MigrationId>,
    /// Ledger entries with no matching file on disk.
    pub unknown: Vec<LedgerEntry>,
    /// Applied units that declare no down action.
    pub irreversible: Vec<MigrationId>,
}

impl MigrationStatus {
    pub fn compute(catalogue: &Catalogue, ledger: &AppliedLedger) -> Self {
        let mut status = Self::default();

        for entry in ledger.entries() {
            match catalogue.get(entry.id.as_str()) {
                Some(unit) => {
                    if !unit.is_reversible() {
                        status.irreversible.push(unit.id.clone());
                    }
                    status.applied.push(entry.clone());
                }
                None => status.unknown.push(entry.clone()),
            }
        }

        status.pending = catalogue
            .ids()
            .filter(|id| !ledger.contains(id.as_str()))
            .cloned()
            .collect();

        status
    }

    pub fn is_up_to_date(&self) -> bool {
        self.pending.is_empty()
    }
}
