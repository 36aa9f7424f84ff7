use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::plan::FilePlan;
use crate::types::PartResult;
use crate::{TransferError, TransferResult};

/// Per-session record of which parts have actually landed on the backend.
///
/// The ledger is the single source of truth for part integrity: an entry is
/// only written after the backend reported success for that part upload.
/// Entries are keyed by part number; re-recording a part number replaces the
/// prior entry, so the last completed upload wins.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PartLedger {
    parts: BTreeMap<u32, PartResult>,
    received_bytes: u64,
}

impl PartLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a committed part result, replacing any earlier result for the
    /// same part number
    pub fn record(&mut self, result: PartResult) {
        self.parts.insert(result.part_number, result);
        self.received_bytes = self.parts.values().map(|p| p.byte_length).sum();
    }

    pub fn get(&self, part_number: u32) -> Option<&PartResult> {
        self.parts.get(&part_number)
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Total bytes across all committed parts
    pub fn received_bytes(&self) -> u64 {
        self.received_bytes
    }

    /// Part numbers of the plan that have no committed result yet.
    ///
    /// An entry with an empty checksum counts as missing; finalize requires a
    /// verifiable digest for every part.
    pub fn missing_parts(&self, plan: &FilePlan) -> Vec<u32> {
        (1..=plan.part_count)
            .filter(|n| !matches!(self.parts.get(n), Some(p) if !p.checksum.is_empty()))
            .collect()
    }

    /// Whether every part number of the plan has a committed result
    pub fn is_complete(&self, plan: &FilePlan) -> bool {
        self.missing_parts(plan).is_empty()
    }

    /// Checksums in ascending part-number order, independent of upload order.
    ///
    /// Fails with `IncompletePartSet` when any part number of the plan lacks
    /// a committed result.
    pub fn ordered_checksums(&self, plan: &FilePlan) -> TransferResult<Vec<String>> {
        let missing = self.missing_parts(plan);
        if !missing.is_empty() {
            return Err(TransferError::IncompletePartSet { missing });
        }
        Ok((1..=plan.part_count)
            .filter_map(|n| self.parts.get(&n).map(|p| p.checksum.clone()))
            .collect())
    }

    /// Committed results in ascending part-number order
    pub fn results(&self) -> impl Iterator<Item = &PartResult> {
        self.parts.values()
    }
}
